//! SVG 输出。纯文本格式化，相同的渲染结果必然得到逐字节相同的文档。

use std::fmt::Write;

use lines_core::geometry::Point2;
use rgb::RGB8;

use crate::render::{Chunk, RenderedPage};

const PAGE_SCRIPT: &str = r#"    <script type="application/ecmascript"> <![CDATA[
        var visiblePage = 'p1';
        function goToPage(page) {
            document.getElementById(visiblePage).setAttribute('style', 'display: none');
            document.getElementById(page).setAttribute('style', 'display: inline');
            visiblePage = page;
        }
    ]]>
    </script>"#;

const INDENT: &str = "        ";

/// 生成完整 SVG 文档：根元素、页面分组、图层与笔画的来源注释，以及每个分块一条折线。
pub fn to_svg(page: &RenderedPage) -> String {
    let width = page.canvas.width;
    let height = page.canvas.height;
    let mut out = String::new();

    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" height="{height}" width="{width}">"#
    );
    let _ = writeln!(out, "{PAGE_SCRIPT}");
    let _ = writeln!(out, r#"    <g id="p1" style="display:inline">"#);
    let _ = writeln!(
        out,
        r#"{INDENT}<filter id="blurMe"><feGaussianBlur in="SourceGraphic" stdDeviation="10" /></filter>"#
    );

    for layer in &page.layers {
        let _ = writeln!(out, "{INDENT}<!-- layer: {} -->", layer.id);
        for stroke in &layer.strokes {
            let _ = writeln!(
                out,
                r#"{INDENT}<!-- stroke: {} pen: "{}" -->"#,
                stroke.id, stroke.pen_name
            );
            for chunk in &stroke.chunks {
                write_polyline(&mut out, chunk);
            }
        }
    }

    let _ = writeln!(
        out,
        r#"{INDENT}<rect x="0" y="0" width="{width}" height="{height}" fill-opacity="0"/>"#
    );
    let _ = writeln!(out, "    </g>");
    let _ = writeln!(out, "</svg>");
    out
}

fn write_polyline(out: &mut String, chunk: &Chunk) {
    let _ = writeln!(
        out,
        r#"{INDENT}<polyline style="fill:none;stroke:{};stroke-width:{:.3};opacity:{}" stroke-linecap="{}" points="{}"/>"#,
        css_rgb(chunk.style.color),
        chunk.style.width,
        chunk.style.opacity,
        chunk.cap.as_str(),
        format_points(&chunk.points)
    );
}

fn css_rgb(color: RGB8) -> String {
    format!("rgb({},{},{})", color.r, color.g, color.b)
}

/// 坐标保留三位小数，点之间以空格分隔。
pub fn format_points(points: &[Point2]) -> String {
    let mut out = String::with_capacity(points.len() * 16);
    for (index, point) in points.iter().enumerate() {
        if index > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:.3},{:.3}", point.x(), point.y());
    }
    out
}
