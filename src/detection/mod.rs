pub mod hosted;
pub mod local;
pub mod merge;

pub use merge::{MergeConfig, MergeOutcome, VEHICLE_LABELS, merge_detections, suppress_overlaps};

use crate::error::DetectionError;
use crate::models::Detection;
use image::RgbImage;

/// A pretrained object detector, treated as an opaque synchronous call.
///
/// Implementations are built once at start-up and borrowed by every pass;
/// they must not rely on lazily initialised global state.
pub trait Detector {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Return every box the model reports at or above `confidence`.
    fn detect(&self, image: &RgbImage, confidence: f32) -> Result<Vec<Detection>, DetectionError>;
}

impl<D: Detector + ?Sized> Detector for &D {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn detect(&self, image: &RgbImage, confidence: f32) -> Result<Vec<Detection>, DetectionError> {
        (**self).detect(image, confidence)
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn detect(&self, image: &RgbImage, confidence: f32) -> Result<Vec<Detection>, DetectionError> {
        (**self).detect(image, confidence)
    }
}

/// Reject images the detectors cannot be run on.
pub fn validate_image(image: &RgbImage) -> Result<(), DetectionError> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(DetectionError::BadInput(format!(
            "image has zero dimension ({}x{})",
            w, h
        )));
    }
    Ok(())
}
