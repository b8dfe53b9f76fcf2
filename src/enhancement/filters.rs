use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{Mask, grayscale_open};

/// Apply Gaussian blur to every channel
pub fn gaussian_blur(img: &RgbImage, sigma: f32) -> RgbImage {
    gaussian_blur_f32(img, sigma)
}

/// Per-pixel `alpha * a + beta * b + gamma`, computed in f32 and clamped to 0..=255
pub fn add_weighted(a: &RgbImage, alpha: f32, b: &RgbImage, beta: f32, gamma: f32) -> RgbImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    let (w, h) = a.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let pa = a.get_pixel(x, y).0;
        let pb = b.get_pixel(x, y).0;
        let mut out = [0u8; 3];
        for c in 0..3 {
            let value = alpha * pa[c] as f32 + beta * pb[c] as f32 + gamma;
            out[c] = value.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    })
}

/// Add a single-channel layer to every channel of a color image
pub fn add_gray_weighted(color: &RgbImage, gray: &GrayImage, weight: f32) -> RgbImage {
    debug_assert_eq!(color.dimensions(), gray.dimensions());
    let (w, h) = color.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let p = color.get_pixel(x, y).0;
        let boost = weight * gray.get_pixel(x, y)[0] as f32;
        Rgb(p.map(|c| (c as f32 + boost).round().clamp(0.0, 255.0) as u8))
    })
}

/// Linearly rescale so the darkest pixel becomes 0 and the brightest 255.
/// A flat image maps to all zeros.
pub fn normalize_min_max(img: &GrayImage) -> GrayImage {
    let (min, max) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || max <= min {
        return GrayImage::new(w, h);
    }

    let scale = 255.0 / (max - min) as f32;
    GrayImage::from_fn(w, h, |x, y| {
        let v = (img.get_pixel(x, y)[0] - min) as f32 * scale;
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// White top-hat: the image minus its morphological opening with a disk of
/// the given radius. Keeps bright features narrower than the disk.
pub fn white_top_hat(img: &GrayImage, radius: u8) -> GrayImage {
    let opened = grayscale_open(img, &Mask::disk(radius));
    let (w, h) = img.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let v = img.get_pixel(x, y)[0].saturating_sub(opened.get_pixel(x, y)[0]);
        Luma([v])
    })
}

/// Luminance of a color image (Rec. 601 weights)
pub fn to_luma(img: &RgbImage) -> GrayImage {
    let (w, h) = img.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        let v = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}
