use std::time::Duration;

use bottlesight::detect::FrameCounts;
use bottlesight::stats::{FpsCounter, SessionStats};

fn counts(bottles: usize, with_cap: usize, without_cap: usize) -> FrameCounts {
    FrameCounts {
        bottles,
        with_cap,
        without_cap,
        total_caps: with_cap + without_cap,
    }
}

#[test]
fn session_totals_accumulate_across_frames() {
    let mut stats = SessionStats::new();
    stats.record(&counts(2, 1, 1), &["Alpha", "Beta"]);
    stats.record(&counts(1, 0, 1), &["Alpha"]);
    stats.record(&counts(0, 0, 0), &[]);

    assert_eq!(stats.total_frames, 3);
    assert_eq!(stats.bottle_count, 3);
    assert_eq!(stats.with_cap_count, 1);
    assert_eq!(stats.without_cap_count, 2);
    assert_eq!(stats.brand_counts.get("Alpha"), Some(&2));
    assert_eq!(stats.brand_counts.get("Beta"), Some(&1));

    let summary = stats.summary();
    assert_eq!(summary.total_frames, 3);
    assert!((summary.avg_bottles_per_frame - 1.0).abs() < 1e-9);
}

#[test]
fn summary_lists_brands_by_frequency() {
    let mut stats = SessionStats::new();
    stats.record(&counts(2, 0, 0), &["Beta", "Alpha"]);
    stats.record(&counts(2, 0, 0), &["Beta", "Gamma"]);
    stats.record(&counts(1, 0, 0), &["Beta"]);

    let summary = stats.summary();
    assert_eq!(
        summary.brands,
        vec![
            ("Beta".to_string(), 3),
            ("Alpha".to_string(), 1),
            ("Gamma".to_string(), 1),
        ]
    );
}

#[test]
fn summary_of_brandless_session_has_no_brands() {
    let mut stats = SessionStats::new();
    stats.record(&counts(2, 1, 1), &[]);
    assert!(stats.summary().brands.is_empty());
}

#[test]
fn reset_clears_all_counters() {
    let mut stats = SessionStats::new();
    stats.record(&counts(5, 3, 2), &["Alpha"]);
    stats.reset();

    assert_eq!(stats.total_frames, 0);
    assert_eq!(stats.bottle_count, 0);
    assert!(stats.brand_counts.is_empty());
}

#[test]
fn summary_of_empty_session_has_no_nan() {
    let summary = SessionStats::new().summary();
    assert_eq!(summary.total_frames, 0);
    assert!(summary.avg_bottles_per_frame.is_finite());
    assert!(summary.avg_fps.is_finite());
}

#[test]
fn fps_counter_tracks_frame_rate() {
    let mut fps = FpsCounter::new();
    assert_eq!(fps.fps(), 0.0);

    for _ in 0..5 {
        std::thread::sleep(Duration::from_millis(5));
        fps.tick();
    }
    let rate = fps.fps();
    assert!(rate > 0.0);
    // 5ms sleeps cannot yield more than 200 fps.
    assert!(rate <= 200.0 + 1e-3);
}

#[test]
fn fps_counter_reset_drops_history() {
    let mut fps = FpsCounter::new();
    fps.tick();
    fps.tick();
    fps.reset();
    assert_eq!(fps.fps(), 0.0);
}
