pub mod render;
pub mod svg;

use std::fs;
use std::path::Path;

use lines_core::{document::Document, options::ConvertOptions};
use lines_io::{DecodeError, DocumentLoader, IoError, LinesFacade, decode_with_options};
use tracing::info;

use render::Renderer;

/// 一次转换的产物：SVG 文本与实际使用的画布尺寸。
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub svg: String,
    pub width: f64,
    pub height: f64,
}

/// 字节进、SVG 出。解码失败时不产生任何输出。
pub fn convert(data: &[u8], options: &ConvertOptions) -> Result<Conversion, DecodeError> {
    let document = decode_with_options(data, options)?;
    Ok(render_document(&document, options))
}

/// 渲染已解码的文档。渲染阶段对任何合法文档都不会失败。
pub fn render_document(document: &Document, options: &ConvertOptions) -> Conversion {
    let page = Renderer::new(options.canvas).render(document);
    Conversion {
        svg: svg::to_svg(&page),
        width: page.canvas.width,
        height: page.canvas.height,
    }
}

/// 读取 `.lines` 文件并转换；提供 `output` 时同时写出 SVG。
pub fn convert_file(
    input: &Path,
    output: Option<&Path>,
    options: &ConvertOptions,
) -> Result<Conversion, IoError> {
    let document = LinesFacade::new(options).load(input)?;
    let conversion = render_document(&document, options);

    if let Some(path) = output {
        fs::write(path, conversion.svg.as_bytes()).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            input = %input.display(),
            output = %path.display(),
            layers = document.layer_count(),
            strokes = document.stroke_count(),
            "已写出 SVG"
        );
    }
    Ok(conversion)
}
