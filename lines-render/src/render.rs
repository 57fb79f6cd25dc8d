//! 将解码后的笔迹转换为带样式的折线分块。
//!
//! 单条 SVG 折线无法表达连续变化的线宽与颜色，因此每条笔画按笔型的分段长度切成多块，
//! 每块在起始采样点上求一次样式；相邻块共享衔接点以避免缝隙。

use glam::DVec2;
use lines_core::{
    document::{Document, Layer, Segment, Stroke},
    geometry::{Canvas, DEVICE_HEIGHT, DEVICE_WIDTH, Point2},
    pen::{SegmentStyle, StrokeCap},
};
use tracing::debug;

/// 设备坐标到输出画布的映射。宽高独立缩放时通过 `ratio` 保持纵横比。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasTransform {
    canvas: Canvas,
    ratio: f64,
}

impl CanvasTransform {
    pub fn new(canvas: Canvas) -> Self {
        let ratio = (canvas.height / canvas.width) / (DEVICE_HEIGHT / DEVICE_WIDTH);
        Self { canvas, ratio }
    }

    #[inline]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn apply(&self, xpos: f32, ypos: f32) -> Point2 {
        let raw = DVec2::new(f64::from(xpos), f64::from(ypos));
        let x = (raw.x * self.canvas.width) / DEVICE_WIDTH;
        let y = (raw.y * self.canvas.height) / DEVICE_HEIGHT;
        if self.ratio > 1.0 {
            Point2::new(self.ratio * x, y)
        } else {
            Point2::new(x, (1.0 / self.ratio) * y)
        }
    }

    #[inline]
    fn apply_segment(&self, segment: &Segment) -> Point2 {
        self.apply(segment.xpos, segment.ypos)
    }
}

/// 一段共享样式的折线。
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub style: SegmentStyle,
    pub cap: StrokeCap,
    pub points: Vec<Point2>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedStroke {
    pub id: u32,
    pub pen_name: &'static str,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLayer {
    pub id: u32,
    pub strokes: Vec<RenderedStroke>,
}

/// 渲染结果：按图层、笔画、分块的遍历顺序排列，同一输入的顺序始终一致。
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub canvas: Canvas,
    pub layers: Vec<RenderedLayer>,
}

impl RenderedPage {
    /// 按绘制顺序展开所有分块，附带所属笔画。
    pub fn chunks(&self) -> impl Iterator<Item = (&RenderedStroke, &Chunk)> {
        self.layers
            .iter()
            .flat_map(|layer| layer.strokes.iter())
            .flat_map(|stroke| stroke.chunks.iter().map(move |chunk| (stroke, chunk)))
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks().count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    transform: CanvasTransform,
}

impl Renderer {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            transform: CanvasTransform::new(canvas),
        }
    }

    #[inline]
    pub fn canvas(&self) -> Canvas {
        self.transform.canvas
    }

    pub fn render(&self, document: &Document) -> RenderedPage {
        let layers: Vec<RenderedLayer> = document
            .layers()
            .map(|layer| self.render_layer(layer))
            .collect();
        let page = RenderedPage {
            canvas: self.canvas(),
            layers,
        };
        debug!(
            chunks = page.chunk_count(),
            width = page.canvas.width,
            height = page.canvas.height,
            "渲染页面完成"
        );
        page
    }

    fn render_layer(&self, layer: &Layer) -> RenderedLayer {
        RenderedLayer {
            id: layer.id,
            strokes: layer
                .strokes
                .iter()
                .map(|stroke| self.render_stroke(stroke))
                .collect(),
        }
    }

    pub fn render_stroke(&self, stroke: &Stroke) -> RenderedStroke {
        let pen = &stroke.pen;
        let group = pen.segment_group_length().max(1);
        let mut chunks = Vec::new();
        let mut current: Option<Chunk> = None;
        let mut last_width = 0.0;

        for (index, segment) in stroke.segments.iter().enumerate() {
            if index % group == 0 {
                let style = pen.style_of(segment, last_width);
                let mut next = Chunk {
                    style,
                    cap: pen.stroke_cap(),
                    points: Vec::with_capacity(group.min(stroke.segments.len()) + 1),
                };
                if let Some(previous) = current.take() {
                    if let Some(&joint) = previous.points.last() {
                        next.points.push(joint);
                    }
                    chunks.push(previous);
                }
                last_width = style.width;
                current = Some(next);
            }
            if let Some(chunk) = current.as_mut() {
                chunk.points.push(self.transform.apply_segment(segment));
            }
        }
        chunks.extend(current);

        RenderedStroke {
            id: stroke.id,
            pen_name: pen.name(),
            chunks,
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(Canvas::device())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lines_core::pen::{Pen, PenCatalog, PenKind};
    use lines_core::palette::BLACK;

    fn segment(x: f32, y: f32) -> Segment {
        Segment {
            xpos: x,
            ypos: y,
            speed: 0.0,
            tilt: 0.5,
            width: 2.0,
            pressure: 0.5,
        }
    }

    fn stroke(pen: Pen, count: usize) -> Stroke {
        Stroke {
            id: 0,
            pen,
            segments: (0..count)
                .map(|i| segment(i as f32 * 10.0, i as f32 * 20.0))
                .collect(),
        }
    }

    #[test]
    fn device_canvas_is_identity() {
        let transform = CanvasTransform::new(Canvas::device());
        assert_eq!(transform.ratio(), 1.0);
        let point = transform.apply(123.25, 987.5);
        assert_eq!(point, Point2::new(123.25, 987.5));
    }

    #[test]
    fn taller_canvas_stretches_x() {
        // 702×1872：ratio = 2，x 先按宽度缩放再乘 ratio。
        let transform = CanvasTransform::new(Canvas::new(702.0, 1872.0));
        assert_eq!(transform.ratio(), 2.0);
        let point = transform.apply(1404.0, 936.0);
        assert_eq!(point, Point2::new(1404.0, 936.0));
    }

    #[test]
    fn wider_canvas_stretches_y() {
        // 1404×936：ratio = 0.5，y 乘以 1/ratio。
        let transform = CanvasTransform::new(Canvas::new(1404.0, 936.0));
        assert_eq!(transform.ratio(), 0.5);
        let point = transform.apply(100.0, 1872.0);
        assert_eq!(point, Point2::new(100.0, 1872.0));
    }

    #[test]
    fn half_scale_keeps_aspect() {
        let transform = CanvasTransform::new(Canvas::new(702.0, 936.0));
        let point = transform.apply(200.0, 400.0);
        assert!((point.x() - 100.0).abs() < 1e-9);
        assert!((point.y() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn grouped_pen_splits_into_joined_chunks() {
        let pen = PenCatalog::default().resolve(3, 0, 2.0);
        assert_eq!(pen.segment_group_length(), 3);
        let rendered = Renderer::default().render_stroke(&stroke(pen, 7));

        assert_eq!(rendered.pen_name, "Marker");
        assert_eq!(rendered.chunks.len(), 3);
        let lens: Vec<usize> = rendered.chunks.iter().map(|c| c.points.len()).collect();
        assert_eq!(lens, vec![3, 4, 2]);

        let first = &rendered.chunks[0];
        let second = &rendered.chunks[1];
        let third = &rendered.chunks[2];
        assert_eq!(second.points[0], *first.points.last().expect("首块末点"));
        assert_eq!(third.points[0], *second.points.last().expect("次块末点"));
        assert_eq!(third.points[1], Point2::new(60.0, 120.0));
    }

    #[test]
    fn last_width_feeds_next_chunk() {
        let pen = PenCatalog::default().resolve(3, 0, 2.0);
        let rendered = Renderer::default().render_stroke(&stroke(pen, 4));
        let first = rendered.chunks[0].style.width;
        let second = rendered.chunks[1].style.width;
        let base = 0.9 * (2.0 - 0.4 * 0.5);
        assert!((first - base).abs() < 1e-9);
        assert!((second - (base + 0.1 * first)).abs() < 1e-9);
    }

    #[test]
    fn ungrouped_pen_yields_single_chunk() {
        let pen = Pen::new(PenKind::Fineliner, 2.0, BLACK);
        let rendered = Renderer::default().render_stroke(&stroke(pen, 12));
        assert_eq!(rendered.chunks.len(), 1);
        assert_eq!(rendered.chunks[0].points.len(), 12);
        assert_eq!(rendered.chunks[0].cap, StrokeCap::Round);
    }

    #[test]
    fn empty_stroke_has_no_chunks() {
        let pen = Pen::new(PenKind::Ballpoint, 2.0, BLACK);
        let rendered = Renderer::default().render_stroke(&stroke(pen, 0));
        assert!(rendered.chunks.is_empty());
    }

    #[test]
    fn group_boundary_exactly_at_end() {
        let pen = PenCatalog::default().resolve(21, 0, 2.0);
        let rendered = Renderer::default().render_stroke(&stroke(pen, 4));
        let lens: Vec<usize> = rendered.chunks.iter().map(|c| c.points.len()).collect();
        assert_eq!(lens, vec![2, 3]);
    }
}
