//! Structured result of one analysis run, in the shape the inference
//! backend returns to its callers (JSON via serde).

use crate::detection::{Detector, MergeConfig, MergeOutcome, merge_detections};
use crate::error::{DetectionError, FailureKind};
use crate::models::{ClassTally, Detection};
use image::RgbImage;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Number of boxes drawn
    pub total_detections: u32,
    /// Count from the stricter text passes
    pub text_total: u32,
    pub visual_counts: ClassTally,
    pub text_counts: ClassTally,
    pub detections: Vec<Detection>,
    pub secondary_checked: bool,
    pub message: String,
}

impl DetectionReport {
    pub fn success(outcome: &MergeOutcome) -> Self {
        let total = outcome.visual_total();
        let text_total = outcome.text_total();
        Self {
            error: None,
            failure: None,
            total_detections: total,
            text_total,
            visual_counts: outcome.visual_tally.clone(),
            text_counts: outcome.text_tally.clone(),
            detections: outcome.retained.clone(),
            secondary_checked: outcome.secondary_ran,
            message: format!(
                "Detection completed. Found {} objects ({} at summary confidence).",
                total, text_total
            ),
        }
    }

    /// Zero counts plus the failure tag and an explanatory message
    pub fn failure(err: &DetectionError) -> Self {
        let message = match err {
            DetectionError::BadInput(_) => "Input image could not be processed",
            DetectionError::ModelUnavailable(_) => "Model not available",
            DetectionError::Inference(_) => "Detection failed",
        };
        Self {
            error: Some(err.to_string()),
            failure: Some(err.kind()),
            total_detections: 0,
            text_total: 0,
            visual_counts: ClassTally::new(),
            text_counts: ClassTally::new(),
            detections: Vec::new(),
            secondary_checked: false,
            message: format!("{}: {}", message, err),
        }
    }

    pub fn from_result(result: &Result<MergeOutcome, DetectionError>) -> Self {
        match result {
            Ok(outcome) => Self::success(outcome),
            Err(err) => Self::failure(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Run the merge and fold any failure into the report instead of returning it
pub fn analyze<A, B>(
    image: &RgbImage,
    primary: &A,
    secondary: &B,
    config: &MergeConfig,
) -> DetectionReport
where
    A: Detector + ?Sized,
    B: Detector + ?Sized,
{
    let result = merge_detections(image, primary, secondary, config);
    if let Err(err) = &result {
        log::warn!("analysis failed: {}", err);
    }
    DetectionReport::from_result(&result)
}
