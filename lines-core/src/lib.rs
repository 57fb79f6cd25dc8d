pub mod pen;

pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 设备原生画布宽度（像素）。
    pub const DEVICE_WIDTH: f64 = 1404.0;
    /// 设备原生画布高度（像素）。
    pub const DEVICE_HEIGHT: f64 = 1872.0;

    /// 二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    /// 输出画布尺寸。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Canvas {
        pub width: f64,
        pub height: f64,
    }

    impl Canvas {
        #[inline]
        pub fn new(width: f64, height: f64) -> Self {
            Self { width, height }
        }

        /// 宽高均为有限正数时才能参与坐标换算。
        #[inline]
        pub fn is_valid(&self) -> bool {
            [self.width, self.height]
                .iter()
                .all(|value| value.is_finite() && *value > 0.0)
        }

        /// 设备原生画布 1404×1872。
        #[inline]
        pub fn device() -> Self {
            Self::new(DEVICE_WIDTH, DEVICE_HEIGHT)
        }
    }

    impl Default for Canvas {
        fn default() -> Self {
            Self::device()
        }
    }
}

pub mod palette {
    use rgb::RGB8;
    use serde::{Deserialize, Serialize};

    pub const BLACK: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

    const STANDARD: [RGB8; 4] = [
        BLACK,
        RGB8 { r: 125, g: 125, b: 125 },
        RGB8 { r: 255, g: 255, b: 255 },
        RGB8 { r: 251, g: 247, b: 25 },
    ];

    const COLORED_ANNOTATIONS: [RGB8; 5] = [
        BLACK,
        RGB8 { r: 255, g: 0, b: 0 },
        RGB8 { r: 255, g: 255, b: 255 },
        RGB8 { r: 150, g: 0, b: 0 },
        RGB8 { r: 0, g: 0, b: 125 },
    ];

    /// 颜色编号到 RGB 的查找表。
    ///
    /// 表外编号一律解析为黑色，以兼容新固件引入的颜色。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum Palette {
        /// 黑、灰、白、黄。
        Standard,
        /// 批注模式：黑、红、白、暗红、深蓝。
        ColoredAnnotations,
    }

    impl Palette {
        #[inline]
        pub fn for_mode(colored_annotations: bool) -> Self {
            if colored_annotations {
                Palette::ColoredAnnotations
            } else {
                Palette::Standard
            }
        }

        fn table(self) -> &'static [RGB8] {
            match self {
                Palette::Standard => &STANDARD,
                Palette::ColoredAnnotations => &COLORED_ANNOTATIONS,
            }
        }

        pub fn resolve(self, color_id: u32) -> RGB8 {
            usize::try_from(color_id)
                .ok()
                .and_then(|index| self.table().get(index).copied())
                .unwrap_or(BLACK)
        }
    }
}

pub mod options {
    use serde::{Deserialize, Serialize};

    use crate::geometry::Canvas;

    /// 单次转换所需的全部参数。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct ConvertOptions {
        pub canvas: Canvas,
        pub colored_annotations: bool,
    }

    impl ConvertOptions {
        pub fn with_canvas(mut self, width: f64, height: f64) -> Self {
            self.canvas = Canvas::new(width, height);
            self
        }

        pub fn with_colored_annotations(mut self, enabled: bool) -> Self {
            self.colored_annotations = enabled;
            self
        }
    }

    impl Default for ConvertOptions {
        fn default() -> Self {
            Self {
                canvas: Canvas::device(),
                colored_annotations: false,
            }
        }
    }
}

pub mod document {
    use serde::{Deserialize, Serialize};

    use crate::pen::Pen;

    /// `.lines` 文件版本，仅支持 v3 与 v5。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum FormatVersion {
        V3,
        V5,
    }

    impl FormatVersion {
        #[inline]
        pub fn number(self) -> u32 {
            match self {
                FormatVersion::V3 => 3,
                FormatVersion::V5 => 5,
            }
        }
    }

    /// 单个采样点的原始遥测数据，坐标位于设备空间。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Segment {
        pub xpos: f32,
        pub ypos: f32,
        pub speed: f32,
        pub tilt: f32,
        pub width: f32,
        pub pressure: f32,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Stroke {
        pub id: u32,
        pub pen: Pen,
        pub segments: Vec<Segment>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub id: u32,
        pub strokes: Vec<Stroke>,
    }

    /// 一页笔迹：按绘制顺序排列的图层。构建后不再修改。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Document {
        version: FormatVersion,
        layers: Vec<Layer>,
    }

    impl Document {
        pub fn new(version: FormatVersion, layers: Vec<Layer>) -> Self {
            Self { version, layers }
        }

        #[inline]
        pub fn version(&self) -> FormatVersion {
            self.version
        }

        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.iter()
        }

        #[inline]
        pub fn layer_count(&self) -> usize {
            self.layers.len()
        }

        pub fn stroke_count(&self) -> usize {
            self.layers.iter().map(|layer| layer.strokes.len()).sum()
        }

        pub fn segment_count(&self) -> usize {
            self.layers
                .iter()
                .flat_map(|layer| layer.strokes.iter())
                .map(|stroke| stroke.segments.len())
                .sum()
        }
    }
}
