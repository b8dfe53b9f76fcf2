//! Contrast-limited adaptive histogram equalization.
//!
//! The image is split into a grid of tiles, each tile gets its own clipped
//! equalization lookup table, and every pixel is mapped through a bilinear
//! blend of the four nearest tile tables so tile borders do not show.

use image::{GrayImage, Luma};

const BINS: usize = 256;

/// Tile grid and clip limit for [`equalize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaheParams {
    /// Histogram clip limit relative to a flat histogram. Values <= 0 disable clipping.
    pub clip_limit: f32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 3.0,
            tiles_x: 8,
            tiles_y: 8,
        }
    }
}

/// Start offsets of each tile along one axis, plus the final end offset.
fn tile_bounds(len: u32, tiles: u32) -> Vec<u32> {
    (0..=tiles)
        .map(|i| ((i as u64 * len as u64) / tiles as u64) as u32)
        .collect()
}

fn clip_histogram(hist: &mut [u32; BINS], clip: u32) {
    let mut excess = 0u32;
    for count in hist.iter_mut() {
        if *count > clip {
            excess += *count - clip;
            *count = clip;
        }
    }

    let batch = excess / BINS as u32;
    let mut residual = excess % BINS as u32;
    for count in hist.iter_mut() {
        *count += batch;
    }

    if residual > 0 {
        let step = (BINS as u32 / residual).max(1) as usize;
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

fn tile_lut(img: &GrayImage, x0: u32, x1: u32, y0: u32, y1: u32, clip_limit: f32) -> [u8; BINS] {
    let mut hist = [0u32; BINS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[img.get_pixel(x, y)[0] as usize] += 1;
        }
    }

    let area = (x1 - x0) * (y1 - y0);
    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
        clip_histogram(&mut hist, clip);
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; BINS];
    let mut cumulative = 0u32;
    for (value, count) in hist.iter().enumerate() {
        cumulative += count;
        lut[value] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Interpolation neighbours for a pixel center: (lower tile, upper tile, weight of upper).
fn neighbours(pos: f32, centers: &[f32]) -> (usize, usize, f32) {
    let last = centers.len() - 1;
    if pos <= centers[0] {
        return (0, 0, 0.0);
    }
    if pos >= centers[last] {
        return (last, last, 0.0);
    }
    let i = centers.partition_point(|&c| c <= pos) - 1;
    let span = centers[i + 1] - centers[i];
    let t = if span > 0.0 { (pos - centers[i]) / span } else { 0.0 };
    (i, i + 1, t)
}

/// Apply CLAHE to a single-channel image. Output has the same dimensions.
pub fn equalize(img: &GrayImage, params: &ClaheParams) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }

    let tiles_x = params.tiles_x.clamp(1, w);
    let tiles_y = params.tiles_y.clamp(1, h);
    let xb = tile_bounds(w, tiles_x);
    let yb = tile_bounds(h, tiles_y);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y as usize {
        for tx in 0..tiles_x as usize {
            luts.push(tile_lut(
                img,
                xb[tx],
                xb[tx + 1],
                yb[ty],
                yb[ty + 1],
                params.clip_limit,
            ));
        }
    }

    let x_centers: Vec<f32> = xb.windows(2).map(|b| (b[0] + b[1]) as f32 / 2.0).collect();
    let y_centers: Vec<f32> = yb.windows(2).map(|b| (b[0] + b[1]) as f32 / 2.0).collect();
    let columns: Vec<(usize, usize, f32)> = (0..w)
        .map(|x| neighbours(x as f32 + 0.5, &x_centers))
        .collect();

    let stride = tiles_x as usize;
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let (ty0, ty1, wy) = neighbours(y as f32 + 0.5, &y_centers);
        for x in 0..w {
            let (tx0, tx1, wx) = columns[x as usize];
            let v = img.get_pixel(x, y)[0] as usize;

            let top = luts[ty0 * stride + tx0][v] as f32 * (1.0 - wx)
                + luts[ty0 * stride + tx1][v] as f32 * wx;
            let bottom = luts[ty1 * stride + tx0][v] as f32 * (1.0 - wx)
                + luts[ty1 * stride + tx1][v] as f32 * wx;
            let value = top * (1.0 - wy) + bottom * wy;

            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }

    out
}
