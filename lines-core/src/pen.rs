//! 笔型目录与各笔型的渲染公式。
//!
//! 每种笔型根据原始遥测（速度、倾角、上报宽度、压力）计算分段的线宽、颜色与不透明度。
//! 常量取自设备实测，修改任何系数都会改变输出外观。

use rgb::RGB8;
use serde::{Deserialize, Serialize};

use crate::document::Segment;
use crate::palette::Palette;

/// 未分组笔型的分段长度，实际上整条笔画只生成一条折线。
const UNGROUPED: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrokeCap {
    Round,
    Square,
}

impl StrokeCap {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            StrokeCap::Round => "round",
            StrokeCap::Square => "square",
        }
    }
}

/// 封闭的笔型集合。未知笔号解析为 `Generic`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PenKind {
    Brush,
    Calligraphy,
    Marker,
    Ballpoint,
    Fineliner,
    Pencil,
    MechanicalPencil,
    Highlighter,
    EraseArea,
    Eraser,
    Generic,
}

impl PenKind {
    pub const ALL: [PenKind; 11] = [
        PenKind::Brush,
        PenKind::Calligraphy,
        PenKind::Marker,
        PenKind::Ballpoint,
        PenKind::Fineliner,
        PenKind::Pencil,
        PenKind::MechanicalPencil,
        PenKind::Highlighter,
        PenKind::EraseArea,
        PenKind::Eraser,
        PenKind::Generic,
    ];

    /// 将原始笔号映射为笔型。两代固件的笔号并存，因此同一笔型可能对应多个编号。
    pub fn from_number(pen_number: u32) -> Option<Self> {
        let kind = match pen_number {
            0 | 12 => PenKind::Brush,
            21 => PenKind::Calligraphy,
            3 | 16 => PenKind::Marker,
            2 | 15 => PenKind::Ballpoint,
            4 | 17 => PenKind::Fineliner,
            1 | 14 => PenKind::Pencil,
            7 | 13 => PenKind::MechanicalPencil,
            5 | 18 => PenKind::Highlighter,
            8 => PenKind::EraseArea,
            6 => PenKind::Eraser,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            PenKind::Brush => "Brush",
            PenKind::Calligraphy => "Calligraphy",
            PenKind::Marker => "Marker",
            PenKind::Ballpoint => "Ballpoint",
            PenKind::Fineliner => "Fineliner",
            PenKind::Pencil => "Pencil",
            PenKind::MechanicalPencil => "Mechanical Pencil",
            PenKind::Highlighter => "Highlighter",
            PenKind::EraseArea => "Erase Area",
            PenKind::Eraser => "Eraser",
            PenKind::Generic => "Basic Pen",
        }
    }

    /// 共享同一条子折线的连续采样点数量，始终 ≥ 1。
    pub fn segment_group_length(self) -> usize {
        match self {
            PenKind::Brush | PenKind::Calligraphy | PenKind::Pencil => 2,
            PenKind::Marker => 3,
            PenKind::Ballpoint => 5,
            PenKind::Fineliner
            | PenKind::MechanicalPencil
            | PenKind::Highlighter
            | PenKind::EraseArea
            | PenKind::Eraser
            | PenKind::Generic => UNGROUPED,
        }
    }

    pub fn stroke_cap(self) -> StrokeCap {
        match self {
            PenKind::Highlighter | PenKind::Eraser | PenKind::EraseArea => StrokeCap::Square,
            _ => StrokeCap::Round,
        }
    }

    /// 彩色批注模式下强制使用的颜色编号。
    fn annotation_color(self) -> Option<u32> {
        match self {
            PenKind::Ballpoint => Some(4),
            PenKind::Highlighter => Some(3),
            _ => None,
        }
    }

    fn base_width(self, raw_width: f64) -> f64 {
        match self {
            PenKind::Fineliner => raw_width.powf(2.1) * 1.3,
            PenKind::MechanicalPencil => raw_width * raw_width,
            PenKind::Highlighter => 15.0,
            PenKind::Eraser => raw_width * 2.0,
            _ => raw_width,
        }
    }

    fn base_opacity(self) -> f64 {
        match self {
            PenKind::MechanicalPencil => 0.7,
            PenKind::Highlighter => 0.3,
            PenKind::EraseArea => 0.0,
            _ => 1.0,
        }
    }
}

/// 某个子折线的渲染样式。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentStyle {
    pub width: f64,
    pub color: RGB8,
    pub opacity: f64,
}

/// 已解析的笔：笔型加上笔画级的基础宽度、颜色与不透明度。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pen {
    pub kind: PenKind,
    pub base_width: f64,
    pub base_color: RGB8,
    pub base_opacity: f64,
}

impl Pen {
    /// 根据笔型构造，基础宽度在此一次性换算（如 Fineliner 的指数曲线）。
    pub fn new(kind: PenKind, raw_width: f32, base_color: RGB8) -> Self {
        Self {
            kind,
            base_width: kind.base_width(f64::from(raw_width)),
            base_color,
            base_opacity: kind.base_opacity(),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    #[inline]
    pub fn segment_group_length(&self) -> usize {
        self.kind.segment_group_length()
    }

    #[inline]
    pub fn stroke_cap(&self) -> StrokeCap {
        self.kind.stroke_cap()
    }

    /// Pencil 的线宽上限为 `10·baseWidth`。倾角为负时 `tilt^1.8` 为 NaN，
    /// `f64::min` 会忽略 NaN，结果落在该上限上。
    pub fn width_of(&self, segment: &Segment, last_width: f64) -> f64 {
        let t = Telemetry::from(segment);
        match self.kind {
            PenKind::Brush => {
                0.7 * ((1.0 + 1.4 * t.pressure) * t.width - 0.5 * t.tilt - 0.5 * t.speed / 50.0)
            }
            PenKind::Calligraphy => {
                0.9 * ((1.0 + t.pressure) * t.width - 0.3 * t.tilt) + 0.1 * last_width
            }
            PenKind::Marker => 0.9 * (t.width - 0.4 * t.tilt) + 0.1 * last_width,
            PenKind::Ballpoint => (0.5 + t.pressure) + t.width - 0.5 * (t.speed / 50.0),
            PenKind::Pencil => {
                let width = 0.7
                    * (((0.8 * self.base_width) + (0.5 * t.pressure)) * t.width
                        - 0.25 * t.tilt.powf(1.8)
                        - 0.6 * t.speed / 50.0);
                width.min(self.base_width * 10.0)
            }
            _ => self.base_width,
        }
    }

    pub fn color_of(&self, segment: &Segment, _last_width: f64) -> RGB8 {
        let t = Telemetry::from(segment);
        match self.kind {
            PenKind::Brush => {
                let intensity = cutoff((t.pressure.powf(1.5) - 0.2 * (t.speed / 50.0)) * 1.5);
                let inverse = (intensity - 1.0).abs();
                let channel = |base: u8| (inverse * (255.0 - f64::from(base))) as u8;
                RGB8::new(
                    channel(self.base_color.r),
                    channel(self.base_color.g),
                    channel(self.base_color.b),
                )
            }
            PenKind::Ballpoint => {
                let intensity = cutoff(0.1 * -(t.speed / 35.0) + 1.2 * t.pressure + 0.5);
                let value = ((intensity - 1.0).abs() * 255.0) as u8;
                RGB8::new(value, value, value)
            }
            _ => self.base_color,
        }
    }

    pub fn opacity_of(&self, segment: &Segment, _last_width: f64) -> f64 {
        let t = Telemetry::from(segment);
        match self.kind {
            PenKind::Pencil => cutoff(0.1 * -(t.speed / 35.0) + t.pressure) - 0.1,
            _ => self.base_opacity,
        }
    }

    /// 一次性求出某个采样点起始的子折线样式。
    pub fn style_of(&self, segment: &Segment, last_width: f64) -> SegmentStyle {
        SegmentStyle {
            width: self.width_of(segment, last_width),
            color: self.color_of(segment, last_width),
            opacity: self.opacity_of(segment, last_width),
        }
    }
}

/// 笔号解析入口。目录本身不可变，可在线程间共享。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenCatalog {
    palette: Palette,
    colored_annotations: bool,
}

impl PenCatalog {
    pub fn new(colored_annotations: bool) -> Self {
        Self {
            palette: Palette::for_mode(colored_annotations),
            colored_annotations,
        }
    }

    #[inline]
    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// 解析笔号与颜色。未知笔号返回 `Generic` 笔，不视为错误。
    pub fn resolve(&self, pen_number: u32, color_id: u32, raw_width: f32) -> Pen {
        let kind = PenKind::from_number(pen_number).unwrap_or(PenKind::Generic);
        let color_id = if self.colored_annotations {
            kind.annotation_color().unwrap_or(color_id)
        } else {
            color_id
        };
        Pen::new(kind, raw_width, self.palette.resolve(color_id))
    }
}

impl Default for PenCatalog {
    fn default() -> Self {
        Self::new(false)
    }
}

/// 限制到 [0, 1]。NaN 归为 0。
#[inline]
fn cutoff(value: f64) -> f64 {
    value.max(0.0).min(1.0)
}

struct Telemetry {
    speed: f64,
    tilt: f64,
    width: f64,
    pressure: f64,
}

impl From<&Segment> for Telemetry {
    fn from(segment: &Segment) -> Self {
        Self {
            speed: f64::from(segment.speed),
            tilt: f64::from(segment.tilt),
            width: f64::from(segment.width),
            pressure: f64::from(segment.pressure),
        }
    }
}
