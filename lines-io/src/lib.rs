use std::fs;
use std::path::Path;

use lines_core::{
    document::{Document, FormatVersion, Layer, Segment, Stroke},
    options::ConvertOptions,
    pen::{PenCatalog, PenKind},
};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

/// 头部文本，设备以空格右补齐。
const MAGIC_PREFIX_V3: &[u8] = b"reMarkable .lines file, version=3";
const MAGIC_PREFIX_V5: &[u8] = b"reMarkable .lines file, version=5";

/// 规范头部宽度：45 字节 ASCII + 4 字节图层数。
pub const MAGIC_LEN: usize = 45;
pub const HEADER_LEN: usize = MAGIC_LEN + 4;
/// 部分固件写出的头部只补齐到 43 字节。
const DEVICE_MAGIC_LEN: usize = 43;

const STROKE_RECORD_V3: usize = 20;
const STROKE_RECORD_V5: usize = 24;
const SEGMENT_RECORD: usize = 24;

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("input too short: {len} bytes, at least {required} required")]
    TruncatedInput { len: usize, required: usize },
    #[error("unsupported format: {reason}")]
    UnsupportedFormat { reason: String },
    #[error("corrupt record at offset {offset}: {context} needs {needed} bytes, {available} left")]
    CorruptRecord {
        offset: usize,
        needed: usize,
        available: usize,
        context: String,
    },
}

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path:?}: {source}")]
    Decode {
        path: std::path::PathBuf,
        #[source]
        source: DecodeError,
    },
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

/// 按文件路径读取并解码 `.lines` 页面。
#[derive(Debug, Clone, Copy, Default)]
pub struct LinesFacade {
    catalog: PenCatalog,
}

impl LinesFacade {
    pub fn new(options: &ConvertOptions) -> Self {
        Self {
            catalog: PenCatalog::new(options.colored_annotations),
        }
    }
}

impl DocumentLoader for LinesFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let data = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        decode(&data, &self.catalog).map_err(|source| IoError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// 头部识别结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version: FormatVersion,
    pub layer_count: u32,
    /// 头部之后第一个字节的偏移。
    pub body_offset: usize,
}

/// 识别版本与图层数，不读取头部之后的内容。
pub fn detect_format(data: &[u8]) -> Result<FormatHeader, DecodeError> {
    if data.len() < HEADER_LEN {
        return Err(DecodeError::TruncatedInput {
            len: data.len(),
            required: HEADER_LEN,
        });
    }

    let (version, magic_len) = match_magic(data).ok_or_else(|| DecodeError::UnsupportedFormat {
        reason: format!(
            "unrecognized header {:?}",
            String::from_utf8_lossy(&data[..MAGIC_LEN]).trim_end()
        ),
    })?;

    let mut reader = ByteReader::at(data, magic_len);
    let layer_count = reader.read_u32("layer count")?;
    if layer_count == 0 {
        return Err(DecodeError::UnsupportedFormat {
            reason: "header declares zero layers".to_string(),
        });
    }

    debug!(version = version.number(), layer_count, "识别 .lines 头部");
    Ok(FormatHeader {
        version,
        layer_count,
        body_offset: reader.offset(),
    })
}

/// 解码整个缓冲区。任何越界读取都会使整次解码失败，不返回部分结果。
pub fn decode(data: &[u8], catalog: &PenCatalog) -> Result<Document, DecodeError> {
    let header = detect_format(data)?;
    RecordDecoder::new(data, header, catalog).decode()
}

/// 以转换参数解码，等价于用对应的 [`PenCatalog`] 调用 [`decode`]。
pub fn decode_with_options(data: &[u8], options: &ConvertOptions) -> Result<Document, DecodeError> {
    decode(data, &PenCatalog::new(options.colored_annotations))
}

fn match_magic(data: &[u8]) -> Option<(FormatVersion, usize)> {
    [
        (MAGIC_PREFIX_V3, FormatVersion::V3),
        (MAGIC_PREFIX_V5, FormatVersion::V5),
    ]
    .into_iter()
    .find_map(|(prefix, version)| {
        [MAGIC_LEN, DEVICE_MAGIC_LEN]
            .into_iter()
            .find(|&len| is_padded(&data[..len], prefix))
            .map(|len| (version, len))
    })
}

fn is_padded(field: &[u8], prefix: &[u8]) -> bool {
    field.starts_with(prefix) && field[prefix.len()..].iter().all(|&byte| byte == b' ')
}

struct RecordDecoder<'a> {
    reader: ByteReader<'a>,
    header: FormatHeader,
    catalog: &'a PenCatalog,
}

impl<'a> RecordDecoder<'a> {
    fn new(data: &'a [u8], header: FormatHeader, catalog: &'a PenCatalog) -> Self {
        Self {
            reader: ByteReader::at(data, header.body_offset),
            header,
            catalog,
        }
    }

    fn decode(mut self) -> Result<Document, DecodeError> {
        let mut layers = Vec::with_capacity(self.capacity_hint(self.header.layer_count, 4));
        for layer_id in 0..self.header.layer_count {
            layers.push(self.decode_layer(layer_id)?);
        }
        let document = Document::new(self.header.version, layers);
        debug!(
            layers = document.layer_count(),
            strokes = document.stroke_count(),
            segments = document.segment_count(),
            "解码 .lines 文档完成"
        );
        Ok(document)
    }

    fn decode_layer(&mut self, layer_id: u32) -> Result<Layer, DecodeError> {
        let stroke_count = self.reader.read_u32("stroke count")?;
        let record_len = match self.header.version {
            FormatVersion::V3 => STROKE_RECORD_V3,
            FormatVersion::V5 => STROKE_RECORD_V5,
        };
        let mut strokes = Vec::with_capacity(self.capacity_hint(stroke_count, record_len));
        for stroke_id in 0..stroke_count {
            strokes.push(self.decode_stroke(layer_id, stroke_id)?);
        }
        Ok(Layer {
            id: layer_id,
            strokes,
        })
    }

    fn decode_stroke(&mut self, layer_id: u32, stroke_id: u32) -> Result<Stroke, DecodeError> {
        let pen_number = self.reader.read_u32("stroke pen")?;
        let color_id = self.reader.read_u32("stroke colour")?;
        let _flag = self.reader.read_u32("stroke flag")?;
        let width = self.reader.read_f32("stroke width")?;
        if self.header.version == FormatVersion::V5 {
            // v5 在宽度之后多出一个含义未知的浮点字段。
            let _unknown = self.reader.read_f32("stroke reserved float")?;
        }
        let segment_count = self.reader.read_u32("segment count")?;

        if PenKind::from_number(pen_number).is_none() {
            warn!(
                pen_number,
                layer = layer_id,
                stroke = stroke_id,
                "未知笔号，使用默认画笔"
            );
        }
        let pen = self.catalog.resolve(pen_number, color_id, width);

        let mut segments = Vec::with_capacity(self.capacity_hint(segment_count, SEGMENT_RECORD));
        for _ in 0..segment_count {
            segments.push(Segment {
                xpos: self.reader.read_f32("segment x")?,
                ypos: self.reader.read_f32("segment y")?,
                speed: self.reader.read_f32("segment speed")?,
                tilt: self.reader.read_f32("segment tilt")?,
                width: self.reader.read_f32("segment width")?,
                pressure: self.reader.read_f32("segment pressure")?,
            });
        }

        Ok(Stroke {
            id: stroke_id,
            pen,
            segments,
        })
    }

    /// 预分配上限受剩余字节约束，避免声明的记录数过大时一次性分配。
    fn capacity_hint(&self, declared: u32, record_len: usize) -> usize {
        let declared = usize::try_from(declared).unwrap_or(usize::MAX);
        declared.min(self.reader.remaining() / record_len)
    }
}

/// 只前进不回退的小端读取游标。
struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    #[inline]
    fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    fn take<const N: usize>(&mut self, context: &str) -> Result<[u8; N], DecodeError> {
        let bytes = self
            .offset
            .checked_add(N)
            .and_then(|end| self.data.get(self.offset..end))
            .ok_or_else(|| DecodeError::CorruptRecord {
                offset: self.offset,
                needed: N,
                available: self.remaining(),
                context: context.to_string(),
            })?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(bytes);
        self.offset += N;
        Ok(buf)
    }

    fn read_u32(&mut self, context: &str) -> Result<u32, DecodeError> {
        self.take::<4>(context).map(u32::from_le_bytes)
    }

    fn read_f32(&mut self, context: &str) -> Result<f32, DecodeError> {
        self.take::<4>(context).map(f32::from_le_bytes)
    }
}
