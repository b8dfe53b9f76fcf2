use aerodetect::{BoundingBox, Detection, DetectionError, Detector};
use image::{Rgb, RgbImage};
use std::cell::RefCell;

/// Bright, slowly varying "tarmac" with a few small brighter blobs.
/// Returns the image and the blob boxes.
pub fn tarmac_image(width: u32, height: u32) -> (RgbImage, Vec<BoundingBox>) {
    let blobs = vec![
        BoundingBox::new(20.0, 20.0, 30.0, 26.0),
        BoundingBox::new(70.0, 50.0, 82.0, 56.0),
    ];

    let img = RgbImage::from_fn(width, height, |x, y| {
        let inside = blobs.iter().any(|b| {
            (x as f32) >= b.x1 && (x as f32) < b.x2 && (y as f32) >= b.y1 && (y as f32) < b.y2
        });
        if inside {
            Rgb([236, 236, 240])
        } else {
            let base = 170 + (x * 30 / width.max(1)) as u8 + (y * 10 / height.max(1)) as u8;
            Rgb([base, base, base.saturating_sub(4)])
        }
    });

    (img, blobs)
}

/// Mean of all channels inside a box
pub fn region_mean(img: &RgbImage, bbox: &BoundingBox) -> f32 {
    let mut sum = 0u64;
    let mut count = 0u64;
    for y in bbox.y1 as u32..bbox.y2 as u32 {
        for x in bbox.x1 as u32..bbox.x2 as u32 {
            let p = img.get_pixel(x, y);
            sum += p[0] as u64 + p[1] as u64 + p[2] as u64;
            count += 3;
        }
    }
    if count == 0 { 0.0 } else { sum as f32 / count as f32 }
}

pub fn det(class: &str, confidence: f32, bbox: (f32, f32, f32, f32)) -> Detection {
    Detection::new(class, confidence, BoundingBox::new(bbox.0, bbox.1, bbox.2, bbox.3))
}

/// Detector that replays canned outputs keyed by the requested threshold
/// and records every threshold it was called with.
pub struct ScriptedDetector {
    name: String,
    by_threshold: Vec<(f32, Vec<Detection>)>,
    fallback: Vec<Detection>,
    calls: RefCell<Vec<f32>>,
}

impl ScriptedDetector {
    /// Returns the same detections for every threshold
    pub fn always(name: &str, detections: Vec<Detection>) -> Self {
        Self {
            name: name.to_string(),
            by_threshold: Vec::new(),
            fallback: detections,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn empty(name: &str) -> Self {
        Self::always(name, Vec::new())
    }

    /// Returns `detections` when called with exactly `threshold`
    pub fn on(mut self, threshold: f32, detections: Vec<Detection>) -> Self {
        self.by_threshold.push((threshold, detections));
        self
    }

    pub fn calls(&self) -> Vec<f32> {
        self.calls.borrow().clone()
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, _image: &RgbImage, confidence: f32) -> Result<Vec<Detection>, DetectionError> {
        self.calls.borrow_mut().push(confidence);
        let scripted = self
            .by_threshold
            .iter()
            .find(|(t, _)| (t - confidence).abs() < 1e-6)
            .map(|(_, d)| d.clone());
        Ok(scripted.unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Detector whose every call fails
pub struct FailingDetector;

impl Detector for FailingDetector {
    fn name(&self) -> &str {
        "failing"
    }

    fn detect(&self, _image: &RgbImage, _confidence: f32) -> Result<Vec<Detection>, DetectionError> {
        Err(DetectionError::Inference("connection reset".to_string()))
    }
}

pub fn blank_image() -> RgbImage {
    RgbImage::from_pixel(120, 80, Rgb([128, 128, 128]))
}
