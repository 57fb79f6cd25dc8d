
use lines_core::{geometry::Canvas, options::ConvertOptions};
use lines_io::testing::{LinesBuilder, StrokeSpec};
use lines_io::{DecodeError, IoError, decode_with_options};
use lines_render::{convert, convert_file, render::Renderer};
use proptest::prelude::*;
use serde_json::json;
use snapshot::assert_stream;

fn fineliner_page() -> Vec<u8> {
    LinesBuilder::new(3)
        .layer(vec![
            StrokeSpec::new(4, 0, 2.0)
                .point([100.0, 200.0, 0.0, 0.0, 2.0, 0.5])
                .point([150.0, 250.0, 0.0, 0.0, 2.0, 0.5]),
        ])
        .build()
}

#[test]
fn fineliner_stroke_renders_single_polyline() {
    let conversion = convert(&fineliner_page(), &ConvertOptions::default()).expect("转换失败");
    assert_eq!(conversion.width, 1404.0);
    assert_eq!(conversion.height, 1872.0);

    let svg = &conversion.svg;
    assert_eq!(svg.matches("<polyline").count(), 1);
    assert!(svg.contains(r#"points="100.000,200.000 150.000,250.000""#));
    assert!(svg.contains("stroke-width:5.573;"));
    assert!(svg.contains("stroke:rgb(0,0,0);"));
    assert!(svg.contains(r#"<!-- stroke: 0 pen: "Fineliner" -->"#));
}

#[test]
fn ballpoint_chunk_stream_matches_expected() {
    let data = LinesBuilder::new(5)
        .layer(vec![
            StrokeSpec::new(15, 0, 1.0)
                .point([0.0, 0.0, 35.0, 0.0, 1.0, 0.25])
                .point([10.0, 0.0, 35.0, 0.0, 1.0, 0.25])
                .point([20.0, 0.0, 35.0, 0.0, 1.0, 0.25])
                .point([30.0, 0.0, 35.0, 0.0, 1.0, 0.25])
                .point([40.0, 0.0, 35.0, 0.0, 1.0, 0.25])
                .point([50.0, 5.0, 0.0, 0.0, 2.0, 0.5]),
        ])
        .layer(vec![StrokeSpec::new(5, 3, 1.0).point([7.0, 8.0, 0.0, 0.0, 0.0, 0.0])])
        .build();
    let document = decode_with_options(&data, &ConvertOptions::default()).expect("解码失败");
    let page = Renderer::new(Canvas::device()).render(&document);

    assert_stream(
        &page,
        json!([
            {
                "stroke": 0,
                "pen": "Ballpoint",
                "color": [76, 76, 76],
                "width": "1.400",
                "opacity": 1.0,
                "cap": "round",
                "points": "0.000,0.000 10.000,0.000 20.000,0.000 30.000,0.000 40.000,0.000"
            },
            {
                "stroke": 0,
                "pen": "Ballpoint",
                "color": [0, 0, 0],
                "width": "3.000",
                "opacity": 1.0,
                "cap": "round",
                "points": "40.000,0.000 50.000,5.000"
            },
            {
                "stroke": 0,
                "pen": "Highlighter",
                "color": [251, 247, 25],
                "width": "15.000",
                "opacity": 0.3,
                "cap": "square",
                "points": "7.000,8.000"
            }
        ]),
    );
}

#[test]
fn grouped_stroke_repeats_joint_points() {
    let mut stroke = StrokeSpec::new(16, 0, 2.0);
    for i in 0..7 {
        stroke = stroke.point([i as f32, 0.0, 0.0, 0.0, 2.0, 0.0]);
    }
    let data = LinesBuilder::new(3).layer(vec![stroke]).build();
    let svg = convert(&data, &ConvertOptions::default())
        .expect("转换失败")
        .svg;

    assert_eq!(svg.matches("<polyline").count(), 3);
    assert!(svg.contains(r#"points="0.000,0.000 1.000,0.000 2.000,0.000""#));
    assert!(svg.contains(r#"points="2.000,0.000 3.000,0.000 4.000,0.000 5.000,0.000""#));
    assert!(svg.contains(r#"points="5.000,0.000 6.000,0.000""#));
}

#[test]
fn unknown_pen_still_converts() {
    let data = LinesBuilder::new(5)
        .layer(vec![
            StrokeSpec::new(99, 42, 3.0)
                .point([1.0, 1.0, 0.0, 0.0, 0.0, 0.0])
                .point([2.0, 2.0, 0.0, 0.0, 0.0, 0.0]),
        ])
        .build();
    let svg = convert(&data, &ConvertOptions::default())
        .expect("未知笔号不应失败")
        .svg;
    assert!(svg.contains(r#"pen: "Basic Pen""#));
    assert!(svg.contains("stroke:rgb(0,0,0);stroke-width:3.000;opacity:1"));
}

#[test]
fn colored_annotations_recolor_highlighter() {
    let data = LinesBuilder::new(5)
        .layer(vec![StrokeSpec::new(5, 0, 1.0).point([1.0, 1.0, 0.0, 0.0, 0.0, 0.0])])
        .build();
    let options = ConvertOptions::default().with_colored_annotations(true);
    let svg = convert(&data, &options).expect("转换失败").svg;
    assert!(svg.contains("stroke:rgb(150,0,0);"));
}

#[test]
fn scaled_canvas_sets_root_size() {
    let options = ConvertOptions::default().with_canvas(702.0, 936.0);
    let conversion = convert(&fineliner_page(), &options).expect("转换失败");
    assert_eq!((conversion.width, conversion.height), (702.0, 936.0));
    assert!(conversion.svg.starts_with(
        r#"<svg xmlns="http://www.w3.org/2000/svg" height="936" width="702">"#
    ));
    assert!(conversion.svg.contains(r#"points="50.000,100.000 75.000,125.000""#));
}

#[test]
fn conversion_is_deterministic() {
    let data = fineliner_page();
    let options = ConvertOptions::default();
    let first = convert(&data, &options).expect("首次转换");
    let second = convert(&data, &options).expect("再次转换");
    assert_eq!(first.svg.as_bytes(), second.svg.as_bytes());
}

#[test]
fn malformed_input_produces_no_output() {
    let mut data = fineliner_page();
    data[5] = b'?';
    assert!(matches!(
        convert(&data, &ConvertOptions::default()),
        Err(DecodeError::UnsupportedFormat { .. })
    ));

    let data = fineliner_page();
    let truncated = &data[..data.len() - 10];
    assert!(matches!(
        convert(truncated, &ConvertOptions::default()),
        Err(DecodeError::CorruptRecord { .. })
    ));
    assert!(matches!(
        convert(&data[..20], &ConvertOptions::default()),
        Err(DecodeError::TruncatedInput { .. })
    ));
}

#[test]
fn convert_file_writes_svg() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let input = dir.path().join("page.rm");
    let output = dir.path().join("page.svg");
    std::fs::write(&input, fineliner_page()).expect("写入输入文件");

    let conversion =
        convert_file(&input, Some(&output), &ConvertOptions::default()).expect("转换文件失败");
    let written = std::fs::read_to_string(&output).expect("读取输出文件");
    assert_eq!(written, conversion.svg);

    let missing = convert_file(&dir.path().join("missing.rm"), None, &ConvertOptions::default());
    assert!(matches!(missing, Err(IoError::ReadError { .. })));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn identity_canvas_preserves_raw_coordinates(
        points in prop::collection::vec((0.0f32..1404.0, 0.0f32..1872.0), 1..40),
        pen in prop::sample::select(vec![0u32, 1, 2, 3, 4, 5, 6, 7, 8, 21, 99]),
    ) {
        let mut stroke = StrokeSpec::new(pen, 0, 2.0);
        for &(x, y) in &points {
            stroke = stroke.point([x, y, 1.0, 0.5, 2.0, 0.5]);
        }
        let data = LinesBuilder::new(5).layer(vec![stroke]).build();
        let document = decode_with_options(&data, &ConvertOptions::default()).expect("解码失败");
        let page = Renderer::default().render(&document);

        let mut rendered = Vec::new();
        for (index, (_, chunk)) in page.chunks().enumerate() {
            // 除首块外，每块第一个点是上一块的衔接点。
            let skip = usize::from(index > 0);
            rendered.extend(chunk.points.iter().skip(skip).copied());
        }
        prop_assert_eq!(rendered.len(), points.len());
        for (point, &(x, y)) in rendered.iter().zip(&points) {
            prop_assert!((point.x() - f64::from(x)).abs() < 1e-9);
            prop_assert!((point.y() - f64::from(y)).abs() < 1e-9);
        }
    }
}
