//! 8-bit RGB <-> CIE L*a*b* conversion (D65 white point).
//!
//! L is scaled to 0..=255 and a/b are offset by 128, the usual packing for
//! 8-bit Lab images. Only L is modified by the contrast stage, so chroma
//! survives the round trip up to rounding.

use image::{GrayImage, Luma, Rgb, RgbImage};

const WHITE_X: f32 = 0.950456;
const WHITE_Z: f32 = 1.088754;
const EPSILON: f32 = 0.008856;
const KAPPA: f32 = 903.3;

/// Lab image stored as three single-channel planes.
#[derive(Debug, Clone)]
pub struct LabPlanes {
    pub l: GrayImage,
    pub a: GrayImage,
    pub b: GrayImage,
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let encoded = if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round().clamp(0.0, 255.0) as u8
}

fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(f: f32) -> f32 {
    let cubed = f * f * f;
    if cubed > EPSILON {
        cubed
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

/// Convert one RGB pixel to packed 8-bit Lab.
pub fn rgb_to_lab(rgb: [u8; 3]) -> [u8; 3] {
    let r = srgb_to_linear(rgb[0]);
    let g = srgb_to_linear(rgb[1]);
    let b = srgb_to_linear(rgb[2]);

    let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / WHITE_X;
    let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
    let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / WHITE_Z;

    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);

    let l = if y > EPSILON { 116.0 * fy - 16.0 } else { KAPPA * y };
    let a = 500.0 * (fx - fy);
    let b = 200.0 * (fy - fz);

    [
        (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8,
        (a + 128.0).round().clamp(0.0, 255.0) as u8,
        (b + 128.0).round().clamp(0.0, 255.0) as u8,
    ]
}

/// Convert one packed 8-bit Lab pixel back to RGB.
pub fn lab_to_rgb(lab: [u8; 3]) -> [u8; 3] {
    let l = lab[0] as f32 * 100.0 / 255.0;
    let a = lab[1] as f32 - 128.0;
    let b = lab[2] as f32 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let y = if l > KAPPA * EPSILON { fy * fy * fy } else { l / KAPPA };
    let x = lab_f_inv(fx) * WHITE_X;
    let z = lab_f_inv(fz) * WHITE_Z;

    let r = 3.240479 * x - 1.537150 * y - 0.498535 * z;
    let g = -0.969256 * x + 1.875991 * y + 0.041556 * z;
    let b = 0.055648 * x - 0.204043 * y + 1.057311 * z;

    [linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b)]
}

/// Split an RGB image into L, a and b planes.
pub fn split_lab(img: &RgbImage) -> LabPlanes {
    let (w, h) = img.dimensions();
    let mut l = GrayImage::new(w, h);
    let mut a = GrayImage::new(w, h);
    let mut b = GrayImage::new(w, h);

    for (x, y, px) in img.enumerate_pixels() {
        let lab = rgb_to_lab(px.0);
        l.put_pixel(x, y, Luma([lab[0]]));
        a.put_pixel(x, y, Luma([lab[1]]));
        b.put_pixel(x, y, Luma([lab[2]]));
    }

    LabPlanes { l, a, b }
}

/// Recombine L, a and b planes into an RGB image.
pub fn merge_lab(planes: &LabPlanes) -> RgbImage {
    let (w, h) = planes.l.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let lab = [
            planes.l.get_pixel(x, y)[0],
            planes.a.get_pixel(x, y)[0],
            planes.b.get_pixel(x, y)[0],
        ];
        Rgb(lab_to_rgb(lab))
    })
}
