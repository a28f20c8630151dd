use crate::report::Detection;
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::Path;

const PALETTE: [Rgb<u8>; 8] = [
    Rgb([255, 56, 56]),
    Rgb([255, 157, 151]),
    Rgb([255, 112, 31]),
    Rgb([255, 178, 29]),
    Rgb([72, 249, 10]),
    Rgb([26, 147, 52]),
    Rgb([0, 194, 255]),
    Rgb([132, 56, 255]),
];

pub fn class_color(class_id: u32) -> Rgb<u8> {
    PALETTE[class_id as usize % PALETTE.len()]
}

/// Draws each detection box (`line_width` pixels thick, inset) onto `img`.
pub fn draw_detections(img: &mut RgbImage, detections: &[Detection], line_width: u32) {
    let (width, height) = img.dimensions();
    for det in detections {
        let [x1, y1, x2, y2] = det.bbox;
        let x = (x1.max(0.0) as u32).min(width);
        let y = (y1.max(0.0) as u32).min(height);
        let w = (x2.max(0.0) as u32).min(width).saturating_sub(x);
        let h = (y2.max(0.0) as u32).min(height).saturating_sub(y);
        if w == 0 || h == 0 {
            continue;
        }

        let color = class_color(det.class_id);
        for t in 0..line_width.max(1) {
            let inner_w = w.saturating_sub(2 * t);
            let inner_h = h.saturating_sub(2 * t);
            if inner_w == 0 || inner_h == 0 {
                break;
            }
            let rect = Rect::at((x + t) as i32, (y + t) as i32).of_size(inner_w, inner_h);
            draw_hollow_rect_mut(img, rect, color);
        }
    }
}

pub fn annotate_file(
    src: &Path,
    dest: &Path,
    detections: &[Detection],
    line_width: u32,
) -> Result<()> {
    let mut img = image::open(src)
        .with_context(|| format!("open image: {}", src.display()))?
        .to_rgb8();
    draw_detections(&mut img, detections, line_width);
    img.save(dest)
        .with_context(|| format!("save annotated image: {}", dest.display()))
}
