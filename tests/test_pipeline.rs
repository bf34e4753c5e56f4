mod common;

use bottlesight::detect::CapState;
use common::{bottle_only_pipeline, det, default_options, full_pipeline, test_frame, TEST_BRANDS};

#[test]
fn detections_below_threshold_are_dropped() {
    let pipeline = bottle_only_pipeline(vec![
        det(10.0, 10.0, 60.0, 110.0, 0.45, 39),
        det(200.0, 10.0, 260.0, 120.0, 0.75, 39),
    ]);
    let frame = test_frame(640, 480);

    for threshold in [0.1, 0.5, 0.7, 0.9] {
        let mut opts = default_options();
        opts.bottle_conf = threshold;
        let result = pipeline.process_frame(&frame, &opts);
        assert!(
            result
                .bottles
                .iter()
                .all(|b| b.detection.confidence >= threshold),
            "confidence below {threshold} leaked through"
        );
    }

    let mut opts = default_options();
    opts.bottle_conf = 0.5;
    let result = pipeline.process_frame(&frame, &opts);
    assert_eq!(result.bottles.len(), 1);
    assert!((result.bottles[0].detection.confidence - 0.75).abs() < 1e-6);
}

#[test]
fn disabled_stages_produce_empty_lists() {
    let pipeline = full_pipeline(
        vec![det(10.0, 10.0, 100.0, 200.0, 0.9, 39)],
        vec![det(20.0, 10.0, 60.0, 40.0, 0.9, 1)],
        vec![0.9, 0.05, 0.05],
    );
    let frame = test_frame(640, 480);

    let mut opts = default_options();
    opts.enable_bottle = false;
    let result = pipeline.process_frame(&frame, &opts);
    assert!(result.bottles.is_empty());
    assert!(!result.caps.is_empty());

    let mut opts = default_options();
    opts.enable_cap = false;
    let result = pipeline.process_frame(&frame, &opts);
    assert!(result.caps.is_empty());
    assert!(!result.bottles.is_empty());

    let mut opts = default_options();
    opts.enable_brand = false;
    let result = pipeline.process_frame(&frame, &opts);
    assert_eq!(result.bottles.len(), 1);
    assert!(result.bottles[0].brand.is_none());
}

#[test]
fn end_to_end_with_canned_backends() {
    let pipeline = full_pipeline(
        vec![det(50.0, 40.0, 200.0, 400.0, 0.8, 39)],
        vec![
            det(60.0, 40.0, 120.0, 90.0, 0.9, 1),
            det(300.0, 40.0, 360.0, 90.0, 0.7, 2),
        ],
        vec![0.1, 0.8, 0.1],
    );
    let frame = test_frame(640, 480);
    let result = pipeline.process_frame(&frame, &default_options());

    assert_eq!(result.bottles.len(), 1);
    let brand = result.bottles[0].brand.as_ref().expect("brand expected");
    assert_eq!(brand.name, "Beta");
    assert!(TEST_BRANDS.contains(&brand.name.as_str()));
    assert!((brand.confidence - 0.8).abs() < 1e-6);

    assert_eq!(result.caps.len(), 2);
    assert_eq!(result.caps[0].state, CapState::WithCap);
    assert_eq!(result.caps[1].state, CapState::WithoutCap);

    let counts = result.counts();
    assert_eq!(counts.bottles, 1);
    assert_eq!(counts.with_cap, 1);
    assert_eq!(counts.without_cap, 1);
    assert_eq!(counts.total_caps, 2);
    assert_eq!(result.brands(), vec!["Beta"]);
}

#[test]
fn uncertain_brand_scores_attach_no_label() {
    let pipeline = full_pipeline(
        vec![det(50.0, 40.0, 200.0, 400.0, 0.8, 39)],
        Vec::new(),
        vec![0.34, 0.33, 0.33],
    );
    let frame = test_frame(640, 480);
    let result = pipeline.process_frame(&frame, &default_options());

    assert_eq!(result.bottles.len(), 1);
    assert!(result.bottles[0].brand.is_none());
}

#[test]
fn missing_cap_detector_degrades_gracefully() {
    let pipeline = bottle_only_pipeline(vec![det(10.0, 10.0, 100.0, 200.0, 0.9, 39)]);
    assert!(!pipeline.has_cap_detector());
    assert!(!pipeline.has_brand_classifier());

    let frame = test_frame(640, 480);
    let result = pipeline.process_frame(&frame, &default_options());
    assert_eq!(result.bottles.len(), 1);
    assert!(result.caps.is_empty());
    assert!(result.bottles[0].brand.is_none());
}

#[test]
fn empty_detections_give_empty_result() {
    let pipeline = bottle_only_pipeline(Vec::new());
    let frame = test_frame(640, 480);
    let result = pipeline.process_frame(&frame, &default_options());
    assert!(result.is_empty());
    assert_eq!(result.counts(), Default::default());
    assert_eq!(result.width, 640);
    assert_eq!(result.height, 480);
}

#[test]
fn cap_class_ids_map_to_states() {
    assert_eq!(CapState::from_class_id(0), CapState::BrokenCap);
    assert_eq!(CapState::from_class_id(1), CapState::WithCap);
    assert_eq!(CapState::from_class_id(2), CapState::WithoutCap);
    assert_eq!(CapState::from_class_id(3), CapState::WithoutCap);
    assert_eq!(CapState::from_class_id(4), CapState::WithCap);
    assert_eq!(CapState::from_class_id(99), CapState::Unknown);
}

#[test]
fn overlapping_bottles_are_suppressed() {
    let pipeline = bottle_only_pipeline(vec![
        det(10.0, 10.0, 110.0, 210.0, 0.9, 39),
        det(15.0, 15.0, 115.0, 215.0, 0.8, 39),
    ]);
    let frame = test_frame(640, 480);
    let result = pipeline.process_frame(&frame, &default_options());
    assert_eq!(result.bottles.len(), 1);
    assert!((result.bottles[0].detection.confidence - 0.9).abs() < 1e-6);
}
