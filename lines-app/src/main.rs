use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, error::ErrorKind};
use lines_config::{AppConfig, ConfigError};
use lines_render::convert_file;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 将 reMarkable `.lines` 页面转换为 SVG。
#[derive(Parser, Debug)]
#[command(name = "lines2svg", version, about)]
struct CliArgs {
    /// 配置文件路径，缺省时读取 `LINES_CONFIG` 或 `./config/default.toml`
    #[arg(long)]
    config: Option<PathBuf>,
    /// 启用彩色批注配色
    #[arg(long)]
    colored: bool,
    /// 输出画布宽度（像素）
    #[arg(long, value_parser = parse_dimension)]
    width: Option<f64>,
    /// 输出画布高度（像素）
    #[arg(long, value_parser = parse_dimension)]
    height: Option<f64>,
    /// 输出文件，仅限单个输入
    #[arg(long, short)]
    output: Option<PathBuf>,
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

impl CliArgs {
    fn validate(&self) -> Result<(), String> {
        if self.output.is_some() && self.inputs.len() > 1 {
            return Err("`--output` 只能用于单个输入文件".to_string());
        }
        Ok(())
    }
}

fn main() {
    let args = CliArgs::parse();
    if let Err(message) = args.validate() {
        CliArgs::command()
            .error(ErrorKind::ArgumentConflict, message)
            .exit();
    }

    let (config, config_error) = load_configuration(args.config.clone());
    init_logging(&config);
    if let Some(err) = &config_error {
        report_config_error(err);
    }

    let mut options = config.render.to_options();
    if args.colored {
        options = options.with_colored_annotations(true);
    }
    if args.width.is_some() || args.height.is_some() {
        options = options.with_canvas(
            args.width.unwrap_or(options.canvas.width),
            args.height.unwrap_or(options.canvas.height),
        );
    }

    let mut failures = 0usize;
    for input in &args.inputs {
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| default_output(input));
        match convert_file(input, Some(&output), &options) {
            Ok(conversion) => {
                info!(
                    input = %input.display(),
                    width = conversion.width,
                    height = conversion.height,
                    "转换完成"
                );
            }
            Err(err) => {
                error!(input = %input.display(), error = %err, "转换失败");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}

fn parse_dimension(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(format!("无效的画布尺寸：{raw}")),
    }
}

fn default_output(input: &Path) -> PathBuf {
    input.with_extension("svg")
}

/// 加载配置；失败时回退到内建默认值，并把错误交给调用方在日志就绪后报告。
fn load_configuration(override_path: Option<PathBuf>) -> (AppConfig, Option<ConfigError>) {
    let loaded = match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    match loaded {
        Ok(cfg) => (cfg, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

fn report_config_error(err: &ConfigError) {
    match err.path() {
        Some(path) => {
            warn!(path = %path.display(), error = %err, "加载配置失败，使用内建默认值")
        }
        None => warn!(error = %err, "加载配置失败，使用内建默认值"),
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
