use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;

use crate::models::Detection;
use crate::pipeline::StageOutput;

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Load a TrueType/OpenType font for labels
pub fn load_font(path: &Path) -> Result<FontVec> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read font {}", path.display()))?;
    FontVec::try_from_vec(bytes)
        .map_err(|e| anyhow::anyhow!("Failed to parse font {}: {}", path.display(), e))
}

/// How detections are drawn
pub struct RenderOptions<'a> {
    pub box_color: Rgb<u8>,
    pub thickness: u32,
    /// Labels and summary lines are only drawn when a font is available
    pub font: Option<&'a FontVec>,
    pub label_scale: f32,
    pub summary_scale: f32,
    /// Lines written in the top-left corner
    pub summary: Vec<String>,
}

impl Default for RenderOptions<'_> {
    fn default() -> Self {
        Self {
            box_color: GREEN,
            thickness: 3,
            font: None,
            label_scale: 20.0,
            summary_scale: 28.0,
            summary: Vec::new(),
        }
    }
}

impl RenderOptions<'_> {
    pub fn draws_labels(&self) -> bool {
        self.font.is_some()
    }
}

fn pixel_rect(x: i32, y: i32, width: u32, height: u32) -> Option<Rect> {
    if width == 0 || height == 0 {
        return None;
    }
    Some(Rect::at(x, y).of_size(width, height))
}

/// Draw every detection as a box (plus label when a font is set) on a copy of `image`
pub fn annotate(image: &RgbImage, detections: &[Detection], options: &RenderOptions) -> RgbImage {
    let mut canvas = image.clone();
    let (w, h) = canvas.dimensions();

    if !options.draws_labels() && (!detections.is_empty() || !options.summary.is_empty()) {
        log::warn!("no font loaded, drawing {} boxes without labels", detections.len());
    }

    for detection in detections {
        let bbox = detection.bbox.clamp_to(w, h);
        let x1 = bbox.x1.round() as i32;
        let y1 = bbox.y1.round() as i32;
        let bw = bbox.width().round() as u32;
        let bh = bbox.height().round() as u32;

        for i in 0..options.thickness {
            let grow = i as i32;
            if let Some(rect) = pixel_rect(x1 - grow, y1 - grow, bw + 2 * i, bh + 2 * i) {
                draw_hollow_rect_mut(&mut canvas, rect, options.box_color);
            }
        }

        if let Some(font) = options.font {
            let label = detection.label();
            let scale = PxScale::from(options.label_scale);
            let (tw, th) = text_size(scale, font, &label);
            let bg_height = th + 10;
            let bg_y = if y1 >= bg_height as i32 { y1 - bg_height as i32 } else { y1 };
            if let Some(rect) = pixel_rect(x1, bg_y, tw, bg_height) {
                draw_filled_rect_mut(&mut canvas, rect, options.box_color);
            }
            draw_text_mut(&mut canvas, BLACK, x1, bg_y + 5, scale, font, &label);
        }
    }

    if let Some(font) = options.font {
        let scale = PxScale::from(options.summary_scale);
        let mut y = 10;
        for line in &options.summary {
            draw_text_mut(&mut canvas, WHITE, 10, y, scale, font, line);
            let (_, th) = text_size(scale, font, line);
            y += th as i32 + 10;
        }
    }

    canvas
}

/// Stage outputs side by side, each resized to `height`, optionally labelled
pub fn comparison_strip(stages: &[StageOutput], height: u32, font: Option<&FontVec>) -> RgbImage {
    let height = height.max(1);
    let resized: Vec<RgbImage> = stages
        .iter()
        .map(|stage| {
            let (w, h) = stage.image.dimensions();
            let width = ((w as u64 * height as u64) / h.max(1) as u64).max(1) as u32;
            imageops::resize(&stage.image, width, height, FilterType::Triangle)
        })
        .collect();

    let total_width: u32 = resized.iter().map(|img| img.width()).sum();
    let mut strip = RgbImage::new(total_width.max(1), height);

    let mut x = 0i64;
    for (stage, img) in stages.iter().zip(&resized) {
        imageops::replace(&mut strip, img, x, 0);
        if let Some(font) = font {
            let label = if stage.name == "input" { "Original" } else { stage.name.as_str() };
            draw_text_mut(&mut strip, WHITE, x as i32 + 10, 10, PxScale::from(20.0), font, label);
        }
        x += img.width() as i64;
    }

    strip
}
