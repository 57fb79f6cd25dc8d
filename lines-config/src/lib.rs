use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use lines_core::{
    geometry::{Canvas, DEVICE_HEIGHT, DEVICE_WIDTH},
    options::ConvertOptions,
};
use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "LINES_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。画布尺寸必须为有限正数。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if !config.render.canvas().is_valid() {
            return Err(ConfigError::InvalidCanvas {
                path: path.to_path_buf(),
                width: config.render.output_width,
                height: config.render.output_height,
            });
        }
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `LINES_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 输出画布与配色。
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "RenderConfig::default_width")]
    pub output_width: f64,
    #[serde(default = "RenderConfig::default_height")]
    pub output_height: f64,
    #[serde(default)]
    pub colored_annotations: bool,
}

impl RenderConfig {
    fn default_width() -> f64 {
        DEVICE_WIDTH
    }

    fn default_height() -> f64 {
        DEVICE_HEIGHT
    }

    #[inline]
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.output_width, self.output_height)
    }

    pub fn to_options(&self) -> ConvertOptions {
        ConvertOptions::default()
            .with_canvas(self.output_width, self.output_height)
            .with_colored_annotations(self.colored_annotations)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_width: Self::default_width(),
            output_height: Self::default_height(),
            colored_annotations: false,
        }
    }
}

impl From<&RenderConfig> for ConvertOptions {
    fn from(config: &RenderConfig) -> Self {
        config.to_options()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置文件 {path:?} 中的画布尺寸无效: {width}×{height}")]
    InvalidCanvas { path: PathBuf, width: f64, height: f64 },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// 出错的配置文件路径；获取工作目录失败时没有路径。
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Io { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::InvalidCanvas { path, .. } => Some(path.as_path()),
            ConfigError::Context { .. } => None,
        }
    }
}
