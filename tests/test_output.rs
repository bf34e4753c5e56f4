mod common;

use bottlesight::output::OutputPaths;
use common::{bottle_only_pipeline, det, default_options, test_frame};

#[test]
fn screenshot_lands_in_screenshots_dir() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let outputs = OutputPaths::new(dir.path());

    let frame = test_frame(64, 48);
    let path = outputs.save_screenshot(&frame)?;

    assert!(path.exists());
    assert!(path.starts_with(dir.path().join("screenshots")));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));

    let reloaded = image::open(&path)?.to_rgb8();
    assert_eq!(reloaded.dimensions(), (64, 48));
    Ok(())
}

#[test]
fn recorder_writes_numbered_frames() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let outputs = OutputPaths::new(dir.path());

    let mut recorder = outputs.start_recording()?;
    let frame = test_frame(64, 48);
    for _ in 0..3 {
        recorder.write_frame(&frame)?;
    }

    assert_eq!(recorder.frames_written(), 3);
    assert!(recorder.dir().starts_with(dir.path().join("videos")));
    for i in 0..3 {
        assert!(recorder.dir().join(format!("frame_{i:06}.jpg")).exists());
    }
    Ok(())
}

#[test]
fn detection_log_is_json_lines() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let outputs = OutputPaths::new(dir.path());

    let pipeline = bottle_only_pipeline(vec![det(10.0, 10.0, 100.0, 200.0, 0.9, 39)]);
    let frame = test_frame(640, 480);
    let result = pipeline.process_frame(&frame, &default_options());

    let mut log = outputs.open_detection_log()?;
    log.record(1, &result)?;
    log.record(2, &result)?;
    log.flush()?;

    let raw = std::fs::read_to_string(log.path())?;
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line)?;
        assert_eq!(value["bottles"], 1);
        assert_eq!(value["with_cap"], 0);
    }
    Ok(())
}
