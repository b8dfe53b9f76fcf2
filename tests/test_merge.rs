mod common;

use aerodetect::detection::suppress_overlaps;
use aerodetect::merge_detections;
use common::{
    DetectionError, FailingDetector, MergeConfig, ScriptedDetector, blank_image, det,
};

#[test]
fn test_duplicate_secondary_box_is_suppressed() -> anyhow::Result<()> {
    let primary = ScriptedDetector::always("A", vec![det("LMV", 0.9, (10.0, 10.0, 50.0, 40.0))]);
    let secondary = ScriptedDetector::always("B", vec![det("A3", 0.45, (12.0, 11.0, 52.0, 41.0))])
        .on(0.10, vec![det("A3", 0.55, (12.0, 11.0, 52.0, 41.0))]);

    let outcome = merge_detections(&blank_image(), &primary, &secondary, &MergeConfig::default())?;

    assert!(outcome.secondary_ran);
    assert_eq!(outcome.retained.len(), 1);
    assert_eq!(outcome.retained[0].class_name, "LMV");
    assert_eq!(outcome.visual_tally.count("LMV"), Some(1));
    assert_eq!(outcome.visual_tally.count("A3"), None);
    Ok(())
}

#[test]
fn test_closed_gate_skips_secondary_passes() -> anyhow::Result<()> {
    let primary = ScriptedDetector::always("A", vec![det("LMV", 0.9, (10.0, 10.0, 50.0, 40.0))]);
    let secondary = ScriptedDetector::always("B", vec![det("A3", 0.95, (60.0, 10.0, 90.0, 40.0))])
        .on(0.10, Vec::new());

    let outcome = merge_detections(&blank_image(), &primary, &secondary, &MergeConfig::default())?;

    assert!(!outcome.secondary_ran);
    assert_eq!(secondary.calls(), vec![0.10]);
    assert_eq!(primary.calls(), vec![0.25, 0.50]);
    assert_eq!(outcome.visual_tally.count("A3"), None);
    assert_eq!(outcome.text_tally.count("A3"), None);
    Ok(())
}

#[test]
fn test_weak_precheck_keeps_gate_closed() -> anyhow::Result<()> {
    let primary = ScriptedDetector::empty("A");
    let secondary = ScriptedDetector::always("B", vec![det("A3", 0.95, (60.0, 10.0, 90.0, 40.0))])
        .on(0.10, vec![det("A3", 0.30, (60.0, 10.0, 90.0, 40.0))]);

    let outcome = merge_detections(&blank_image(), &primary, &secondary, &MergeConfig::default())?;

    assert!(!outcome.secondary_ran);
    assert!(outcome.retained.is_empty());
    assert_eq!(secondary.calls().len(), 1);
    Ok(())
}

#[test]
fn test_open_gate_calls_passes_in_order() -> anyhow::Result<()> {
    let primary = ScriptedDetector::empty("A");
    let secondary = ScriptedDetector::always("B", vec![det("A3", 0.7, (60.0, 10.0, 90.0, 40.0))]);

    merge_detections(&blank_image(), &primary, &secondary, &MergeConfig::default())?;

    assert_eq!(primary.calls(), vec![0.25, 0.50]);
    assert_eq!(secondary.calls(), vec![0.10, 0.40, 0.60]);
    Ok(())
}

#[test]
fn test_disjoint_boxes_are_both_kept() -> anyhow::Result<()> {
    let primary = ScriptedDetector::always("A", vec![det("LMV", 0.9, (10.0, 10.0, 40.0, 30.0))]);
    let secondary = ScriptedDetector::always("B", vec![det("A3", 0.8, (60.0, 40.0, 100.0, 70.0))]);

    let outcome = merge_detections(&blank_image(), &primary, &secondary, &MergeConfig::default())?;

    assert_eq!(outcome.retained.len(), 2);
    assert_eq!(outcome.retained[0].class_name, "LMV");
    assert_eq!(outcome.retained[1].class_name, "A3");
    for tally in [&outcome.visual_tally, &outcome.text_tally] {
        assert_eq!(tally.count("LMV"), Some(1));
        assert_eq!(tally.count("A3"), Some(1));
    }
    assert_eq!(outcome.visual_total(), 2);
    assert_eq!(outcome.text_total(), 2);
    Ok(())
}

#[test]
fn test_merge_is_deterministic() -> anyhow::Result<()> {
    let primary = ScriptedDetector::always(
        "A",
        vec![
            det("LMV", 0.9, (10.0, 10.0, 40.0, 30.0)),
            det("truck", 0.6, (50.0, 5.0, 70.0, 20.0)),
        ],
    );
    let secondary = ScriptedDetector::always(
        "B",
        vec![
            det("A3", 0.8, (60.0, 40.0, 100.0, 70.0)),
            det("A3", 0.7, (11.0, 10.0, 41.0, 31.0)),
        ],
    );
    let config = MergeConfig::default();

    let first = merge_detections(&blank_image(), &primary, &secondary, &config)?;
    let second = merge_detections(&blank_image(), &primary, &secondary, &config)?;
    assert_eq!(first, second);
    assert_eq!(first.retained.len(), 3);
    Ok(())
}

#[test]
fn test_results_below_pass_threshold_are_ignored() -> anyhow::Result<()> {
    // A detector that ignores the requested threshold still gets filtered
    let primary = ScriptedDetector::always(
        "A",
        vec![
            det("LMV", 0.9, (10.0, 10.0, 40.0, 30.0)),
            det("LMV", 0.3, (50.0, 50.0, 70.0, 70.0)),
            det("LMV", 0.1, (80.0, 10.0, 100.0, 30.0)),
        ],
    );
    let secondary = ScriptedDetector::empty("B");

    let outcome = merge_detections(&blank_image(), &primary, &secondary, &MergeConfig::default())?;

    assert_eq!(outcome.visual_tally.count("LMV"), Some(2));
    assert_eq!(outcome.text_tally.count("LMV"), Some(1));
    Ok(())
}

#[test]
fn test_secondary_boxes_suppress_each_other() -> anyhow::Result<()> {
    let primary = ScriptedDetector::empty("A");
    let secondary = ScriptedDetector::always(
        "B",
        vec![
            det("A3", 0.8, (10.0, 10.0, 50.0, 40.0)),
            det("A3", 0.75, (11.0, 10.0, 51.0, 40.0)),
            det("A3", 0.7, (70.0, 40.0, 100.0, 70.0)),
        ],
    );

    let outcome = merge_detections(&blank_image(), &primary, &secondary, &MergeConfig::default())?;

    assert_eq!(outcome.retained.len(), 2);
    assert_eq!(outcome.visual_tally.count("A3"), Some(2));
    // text passes are counted without deduplication
    assert_eq!(outcome.text_tally.count("A3"), Some(3));
    Ok(())
}

#[test]
fn test_detector_failure_propagates() {
    let secondary = ScriptedDetector::empty("B");
    let result = merge_detections(&blank_image(), &FailingDetector, &secondary, &MergeConfig::default());
    assert!(matches!(result, Err(DetectionError::Inference(_))));
    assert!(secondary.calls().is_empty());

    let primary = ScriptedDetector::empty("A");
    let result = merge_detections(&blank_image(), &primary, &FailingDetector, &MergeConfig::default());
    assert!(matches!(result, Err(DetectionError::Inference(_))));
}

#[test]
fn test_empty_detectors_give_empty_outcome() -> anyhow::Result<()> {
    let primary = ScriptedDetector::empty("A");
    let secondary = ScriptedDetector::empty("B");

    let outcome = merge_detections(&blank_image(), &primary, &secondary, &MergeConfig::default())?;

    assert!(outcome.retained.is_empty());
    assert!(outcome.visual_tally.is_empty());
    assert!(outcome.text_tally.is_empty());
    assert!(!outcome.secondary_ran);
    Ok(())
}

#[test]
fn test_known_labels_start_at_zero() -> anyhow::Result<()> {
    let primary = ScriptedDetector::always("A", vec![det("LMV", 0.9, (10.0, 10.0, 40.0, 30.0))]);
    let secondary = ScriptedDetector::empty("B");
    let config = MergeConfig {
        known_labels: vec!["A3".to_string(), "LMV".to_string()],
        ..MergeConfig::default()
    };

    let outcome = merge_detections(&blank_image(), &primary, &secondary, &config)?;

    assert_eq!(outcome.visual_tally.count("A3"), Some(0));
    assert_eq!(outcome.visual_tally.count("LMV"), Some(1));
    assert_eq!(outcome.text_tally.count("A3"), Some(0));
    Ok(())
}

#[test]
fn test_invalid_threshold_is_bad_input() {
    let primary = ScriptedDetector::empty("A");
    let secondary = ScriptedDetector::empty("B");
    let config = MergeConfig {
        overlap_threshold: 1.5,
        ..MergeConfig::default()
    };

    let result = merge_detections(&blank_image(), &primary, &secondary, &config);
    assert!(matches!(result, Err(DetectionError::BadInput(_))));
    assert!(primary.calls().is_empty());
}

#[test]
fn test_suppress_overlaps_directly() {
    let mut retained = vec![det("LMV", 0.9, (0.0, 0.0, 20.0, 20.0))];
    let accepted = suppress_overlaps(
        &mut retained,
        vec![
            det("A3", 0.8, (1.0, 1.0, 21.0, 21.0)),
            det("A3", 0.2, (40.0, 40.0, 60.0, 60.0)),
            det("A3", 0.6, (40.0, 40.0, 60.0, 60.0)),
            // IoU of exactly 0.5 is not above the threshold
            det("A3", 0.6, (0.0, 0.0, 10.0, 20.0)),
        ],
        0.5,
        0.4,
    );

    assert_eq!(accepted, 2);
    assert_eq!(retained.len(), 3);
    assert_eq!(retained[1].bbox.x1, 40.0);
    assert_eq!(retained[2].bbox.x2, 10.0);
}
