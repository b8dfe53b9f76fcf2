mod common;

use aerodetect::error::FailureKind;
use aerodetect::detection::VEHICLE_LABELS;
use aerodetect::{ClassTally, analyze};
use common::{
    DetectionError, DetectionReport, FailingDetector, MergeConfig, ScriptedDetector, blank_image,
    det,
};
use image::RgbImage;

#[test]
fn test_unseen_label_counts_once() {
    let mut tally = ClassTally::new();
    assert_eq!(tally.count("Su-27"), None);

    tally.record("Su-27");
    assert_eq!(tally.count("Su-27"), Some(1));
    assert_eq!(tally.total(), 1);

    tally.record("Su-27");
    tally.record("LMV");
    let entries: Vec<(&str, u32)> = tally.iter().collect();
    assert_eq!(entries, vec![("LMV", 1), ("Su-27", 2)]);
}

#[test]
fn test_success_report_json_shape() -> anyhow::Result<()> {
    let primary = ScriptedDetector::always("A", vec![det("LMV", 0.9, (10.0, 10.0, 50.0, 40.0))]);
    let secondary = ScriptedDetector::always("B", vec![det("A3", 0.8, (60.0, 40.0, 100.0, 70.0))]);

    let report = analyze(&blank_image(), &primary, &secondary, &MergeConfig::default());
    assert!(report.is_success());
    assert_eq!(report.total_detections, 2);
    assert_eq!(report.text_total, 2);
    assert!(report.secondary_checked);

    let json = serde_json::to_value(&report)?;
    assert!(json.get("error").is_none());
    assert!(json.get("failure").is_none());
    assert_eq!(json["visual_counts"]["LMV"], 1);
    assert_eq!(json["text_counts"]["A3"], 1);
    assert_eq!(json["detections"][0]["class"], "LMV");
    assert_eq!(json["detections"][0]["bbox"], serde_json::json!([10.0, 10.0, 50.0, 40.0]));
    Ok(())
}

#[test]
fn test_failure_report_has_zero_counts() -> anyhow::Result<()> {
    let err = DetectionError::ModelUnavailable("no API key configured".to_string());
    let report = DetectionReport::failure(&err);

    assert!(!report.is_success());
    assert_eq!(report.total_detections, 0);
    assert_eq!(report.text_total, 0);
    assert!(report.detections.is_empty());
    assert!(report.message.starts_with("Model not available"));

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["failure"], "model_unavailable");
    assert_eq!(json["total_detections"], 0);
    assert_eq!(json["visual_counts"], serde_json::json!({}));
    Ok(())
}

#[test]
fn test_inference_failure_is_reported() {
    let secondary = ScriptedDetector::empty("B");
    let report = analyze(&blank_image(), &FailingDetector, &secondary, &MergeConfig::default());

    assert_eq!(report.failure, Some(FailureKind::InferenceError));
    assert!(report.message.starts_with("Detection failed"));
}

#[test]
fn test_empty_image_is_bad_input_without_detector_calls() {
    let primary = ScriptedDetector::empty("A");
    let secondary = ScriptedDetector::empty("B");

    let report = analyze(&RgbImage::new(0, 0), &primary, &secondary, &MergeConfig::default());

    assert_eq!(report.failure, Some(FailureKind::BadInput));
    assert!(primary.calls().is_empty());
    assert!(secondary.calls().is_empty());
}

#[test]
fn test_typed_error_survives_anyhow() {
    let wrapped: anyhow::Error = DetectionError::BadInput("0x0".to_string()).into();
    assert_eq!(
        DetectionError::from_anyhow(&wrapped),
        DetectionError::BadInput("0x0".to_string())
    );

    let untyped = anyhow::anyhow!("disk full");
    assert_eq!(DetectionError::from_anyhow(&untyped).kind(), FailureKind::InferenceError);
}

#[test]
fn test_seeded_labels_appear_with_zero_counts() -> anyhow::Result<()> {
    let primary = ScriptedDetector::always("A", vec![det("LMV", 0.9, (10.0, 10.0, 50.0, 40.0))]);
    let secondary = ScriptedDetector::empty("B");
    let config = MergeConfig::default().with_known_labels(VEHICLE_LABELS);

    let report = analyze(&blank_image(), &primary, &secondary, &config);
    let json = serde_json::to_value(&report)?;

    assert_eq!(json["visual_counts"]["LMV"], 1);
    assert_eq!(json["visual_counts"]["A19"], 0);
    assert_eq!(json["text_counts"]["MCV"], 0);
    assert_eq!(report.visual_counts.iter().count(), VEHICLE_LABELS.len());
    assert_eq!(report.total_detections, 1);
    Ok(())
}
