//! Merging the outputs of a general detector (A) and a specialised one (B).
//!
//! A's boxes are trusted as-is. B is only consulted when a cheap pre-check
//! pass finds at least one confident box, and its boxes are dropped when
//! they overlap something already kept. Two tallies come out: one over the
//! kept boxes and one over the stricter "text" passes of both detectors.

use crate::detection::{Detector, validate_image};
use crate::error::DetectionError;
use crate::models::{ClassTally, Detection};
use image::RgbImage;

/// Vehicle and aircraft classes reported at zero when not detected
pub const VEHICLE_LABELS: &[&str] = &[
    "A1", "A2", "A3", "A4", "A5", "A6", "A7", "A8", "A9", "A10", "A11", "A12", "A13", "A14",
    "A15", "A16", "A17", "A18", "A19", "SMV", "LMV", "AFV", "CV", "MCV",
];

/// Confidence thresholds for every pass plus the overlap limit.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    /// Detector A pass whose boxes are drawn
    pub primary_confidence: f32,
    /// Detector A pass counted in the text tally
    pub primary_text_confidence: f32,
    /// Detector B pre-check pass
    pub precheck_confidence: f32,
    /// A pre-check box must reach this to open the gate
    pub gate_confidence: f32,
    /// Detector B pass whose surviving boxes are drawn
    pub secondary_confidence: f32,
    /// Detector B pass counted in the text tally
    pub secondary_text_confidence: f32,
    /// B candidates overlapping a kept box by more than this are dropped
    pub overlap_threshold: f32,
    /// Labels listed in both tallies even when never detected
    pub known_labels: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            primary_confidence: 0.25,
            primary_text_confidence: 0.50,
            precheck_confidence: 0.10,
            gate_confidence: 0.50,
            secondary_confidence: 0.40,
            secondary_text_confidence: 0.60,
            overlap_threshold: 0.5,
            known_labels: Vec::new(),
        }
    }
}

impl MergeConfig {
    pub fn validate(&self) -> Result<(), DetectionError> {
        let thresholds = [
            ("primary confidence", self.primary_confidence),
            ("primary text confidence", self.primary_text_confidence),
            ("pre-check confidence", self.precheck_confidence),
            ("gate confidence", self.gate_confidence),
            ("secondary confidence", self.secondary_confidence),
            ("secondary text confidence", self.secondary_text_confidence),
            ("overlap threshold", self.overlap_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(DetectionError::BadInput(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Replace the seeded labels, skipping blank entries
    pub fn with_known_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.known_labels = labels
            .into_iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        self
    }

    fn empty_tally(&self) -> ClassTally {
        ClassTally::with_labels(self.known_labels.iter().cloned())
    }
}

/// Result of one merge run
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Boxes to draw: all of A's, then B's survivors, in acceptance order
    pub retained: Vec<Detection>,
    /// Tally over `retained`
    pub visual_tally: ClassTally,
    /// Tally over both detectors' text passes, not deduplicated
    pub text_tally: ClassTally,
    /// Whether B's pre-check opened the gate
    pub secondary_ran: bool,
}

impl MergeOutcome {
    pub fn visual_total(&self) -> u32 {
        self.visual_tally.total()
    }

    pub fn text_total(&self) -> u32 {
        self.text_tally.total()
    }
}

/// Greedily append candidates to `retained`, first accepted wins.
///
/// A candidate is skipped when its confidence is below `min_confidence` or
/// when its IoU with any box already retained exceeds `overlap_threshold`.
/// Returns the number of candidates accepted.
pub fn suppress_overlaps(
    retained: &mut Vec<Detection>,
    candidates: impl IntoIterator<Item = Detection>,
    overlap_threshold: f32,
    min_confidence: f32,
) -> usize {
    let mut accepted = 0;
    for candidate in candidates {
        if candidate.confidence < min_confidence {
            log::debug!("dropping {}: below {:.2}", candidate.label(), min_confidence);
            continue;
        }

        let duplicate = retained
            .iter()
            .find(|kept| kept.bbox.iou(&candidate.bbox) > overlap_threshold);
        if let Some(kept) = duplicate {
            log::debug!(
                "suppressing {}: IoU {:.2} with {}",
                candidate.label(),
                kept.bbox.iou(&candidate.bbox),
                kept.label()
            );
            continue;
        }

        retained.push(candidate);
        accepted += 1;
    }
    accepted
}

fn run_pass<D: Detector + ?Sized>(
    detector: &D,
    image: &RgbImage,
    confidence: f32,
    pass: &str,
) -> Result<Vec<Detection>, DetectionError> {
    let detections = detector.detect(image, confidence)?;
    let kept: Vec<Detection> = detections
        .into_iter()
        .filter(|d| d.confidence >= confidence)
        .collect();
    log::debug!(
        "{} {} pass at {:.2}: {} boxes",
        detector.name(),
        pass,
        confidence,
        kept.len()
    );
    Ok(kept)
}

/// Run both detectors on `image` and merge their outputs.
pub fn merge_detections<A, B>(
    image: &RgbImage,
    primary: &A,
    secondary: &B,
    config: &MergeConfig,
) -> Result<MergeOutcome, DetectionError>
where
    A: Detector + ?Sized,
    B: Detector + ?Sized,
{
    validate_image(image)?;
    config.validate()?;

    let mut retained = run_pass(primary, image, config.primary_confidence, "visual")?;

    let mut text_tally = config.empty_tally();
    let primary_text = run_pass(primary, image, config.primary_text_confidence, "text")?;
    text_tally.record_all(&primary_text);

    let precheck = run_pass(secondary, image, config.precheck_confidence, "pre-check")?;
    let secondary_ran = precheck
        .iter()
        .any(|d| d.confidence >= config.gate_confidence);

    if secondary_ran {
        let working = run_pass(secondary, image, config.secondary_confidence, "working")?;
        let accepted = suppress_overlaps(
            &mut retained,
            working,
            config.overlap_threshold,
            config.secondary_confidence,
        );
        log::debug!("{} accepted {} boxes after overlap check", secondary.name(), accepted);

        let secondary_text =
            run_pass(secondary, image, config.secondary_text_confidence, "text")?;
        text_tally.record_all(&secondary_text);
    } else {
        log::info!(
            "{} skipped: no pre-check box reached {:.2}",
            secondary.name(),
            config.gate_confidence
        );
    }

    let mut visual_tally = config.empty_tally();
    visual_tally.record_all(&retained);

    Ok(MergeOutcome {
        retained,
        visual_tally,
        text_tally,
        secondary_ran,
    })
}
