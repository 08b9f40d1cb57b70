//! 标注器 (Annotator)
//! 计数区域轮廓与InCount/OutCount标签绘制

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut, draw_text_mut};
use imageproc::point::Point;
use tracing::warn;

use crate::heatmap::region::CountingRegion;

/// 标签字号
const LABEL_SCALE: f32 = 28.0;
/// 标签左上角位置
const LABEL_ORIGIN: (i32, i32) = (10, 10);

/// 叠加标注绘制器
///
/// 字体从磁盘加载, 缺失时降级为不绘制文字标签 (区域轮廓不受影响)
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    pub fn new(font_path: Option<&Path>) -> Self {
        let font = font_path.and_then(|path| match std::fs::read(path) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => Some(font),
                Err(err) => {
                    warn!("label font {} unusable: {err}", path.display());
                    None
                }
            },
            Err(err) => {
                warn!("label font {} unreadable: {err}", path.display());
                None
            }
        });
        Self { font }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 绘制计数区域轮廓
    pub fn draw_region(
        &self,
        img: &mut RgbImage,
        region: &CountingRegion,
        color: Rgb<u8>,
        thickness: u32,
    ) {
        let pts = region.points();
        let n = pts.len();
        for i in 0..n {
            let a = pts[i];
            let b = pts[(i + 1) % n];
            draw_thick_line(img, a, b, color, thickness);
        }
    }

    /// 绘制进出计数标签
    pub fn count_labels(
        &self,
        img: &mut RgbImage,
        in_count: u64,
        out_count: u64,
        thickness: u32,
    ) {
        let Some(font) = self.font.as_ref() else {
            return;
        };
        let in_label = format!("InCount : {in_count}");
        let out_label = format!("OutCount : {out_count}");
        let scale = PxScale::from(LABEL_SCALE);
        let (x, y) = LABEL_ORIGIN;
        let line_step = LABEL_SCALE as i32 + 6;
        // 横向重绘模拟笔画粗细
        for off in 0..thickness.max(1) as i32 {
            draw_text_mut(img, Rgb([255, 255, 255]), x + off, y, scale, font, &in_label);
            draw_text_mut(
                img,
                Rgb([255, 255, 255]),
                x + off,
                y + line_step,
                scale,
                font,
                &out_label,
            );
        }
    }
}

/// 带宽度的线段: 宽度>1时展开为四边形填充
fn draw_thick_line(
    img: &mut RgbImage,
    a: (f32, f32),
    b: (f32, f32),
    color: Rgb<u8>,
    thickness: u32,
) {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len = (dx * dx + dy * dy).sqrt();
    if thickness <= 1 || len < 1.0 {
        draw_line_segment_mut(img, a, b, color);
        return;
    }

    let half = thickness as f32 / 2.0;
    let nx = -dy / len * half;
    let ny = dx / len * half;
    let quad = [
        Point::new((a.0 + nx).round() as i32, (a.1 + ny).round() as i32),
        Point::new((b.0 + nx).round() as i32, (b.1 + ny).round() as i32),
        Point::new((b.0 - nx).round() as i32, (b.1 - ny).round() as i32),
        Point::new((a.0 - nx).round() as i32, (a.1 - ny).round() as i32),
    ];
    // 极短边取整后可能退化, draw_polygon_mut要求首尾不同
    if quad[0] == quad[3] || quad[0] == quad[1] {
        draw_line_segment_mut(img, a, b, color);
        return;
    }
    draw_polygon_mut(img, &quad, color);
}
