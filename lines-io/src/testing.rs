//! 在内存中拼装 `.lines` 缓冲区的测试工具，供本仓库各 crate 的测试共用。

use crate::MAGIC_LEN;

#[derive(Debug, Clone)]
pub struct StrokeSpec {
    pub pen: u32,
    pub colour: u32,
    pub width: f32,
    pub segments: Vec<[f32; 6]>,
}

impl StrokeSpec {
    pub fn new(pen: u32, colour: u32, width: f32) -> Self {
        Self {
            pen,
            colour,
            width,
            segments: Vec::new(),
        }
    }

    /// 追加采样点：x, y, speed, tilt, width, pressure。
    pub fn point(mut self, values: [f32; 6]) -> Self {
        self.segments.push(values);
        self
    }
}

#[derive(Debug, Clone)]
pub struct LinesBuilder {
    version: u32,
    layers: Vec<Vec<StrokeSpec>>,
}

impl LinesBuilder {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            layers: Vec::new(),
        }
    }

    pub fn layer(mut self, strokes: Vec<StrokeSpec>) -> Self {
        self.layers.push(strokes);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = format!("reMarkable .lines file, version={}", self.version).into_bytes();
        data.resize(MAGIC_LEN, b' ');
        push_u32(&mut data, self.layers.len() as u32);
        for strokes in &self.layers {
            push_u32(&mut data, strokes.len() as u32);
            for stroke in strokes {
                push_u32(&mut data, stroke.pen);
                push_u32(&mut data, stroke.colour);
                push_u32(&mut data, 0);
                push_f32(&mut data, stroke.width);
                if self.version == 5 {
                    push_f32(&mut data, 0.0);
                }
                push_u32(&mut data, stroke.segments.len() as u32);
                for segment in &stroke.segments {
                    for value in segment {
                        push_f32(&mut data, *value);
                    }
                }
            }
        }
        data
    }
}

fn push_u32(data: &mut Vec<u8>, value: u32) {
    data.extend_from_slice(&value.to_le_bytes());
}

fn push_f32(data: &mut Vec<u8>, value: f32) {
    data.extend_from_slice(&value.to_le_bytes());
}
