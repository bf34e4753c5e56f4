use std::io::Write;

use bottlesight::config::{clamp_threshold, load_brand_classes, AppConfig, DEFAULT_BRANDS};

#[test]
fn defaults_match_stock_thresholds() {
    let cfg = AppConfig::default();
    assert!((cfg.detection.bottle_conf - 0.5).abs() < 1e-6);
    assert!((cfg.detection.cap_conf - 0.6).abs() < 1e-6);
    assert!((cfg.detection.brand_conf - 0.4).abs() < 1e-6);
    assert!((cfg.detection.iou_threshold - 0.45).abs() < 1e-6);
    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.camera.height, 480);
    assert_eq!(cfg.models.detector_input, 640);
    assert_eq!(cfg.models.classifier_input, 224);
}

#[test]
fn file_values_override_defaults() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(
        file,
        r#"
[detection]
bottle_conf = 0.7

[camera]
device_id = 2
width = 1280
height = 720

[models]
bottle_detector = "custom/bottles.onnx"
"#
    )?;

    let cfg = AppConfig::load(Some(file.path()))?;
    assert!((cfg.detection.bottle_conf - 0.7).abs() < 1e-6);
    // Untouched fields keep their defaults.
    assert!((cfg.detection.cap_conf - 0.6).abs() < 1e-6);
    assert_eq!(cfg.camera.device_id, 2);
    assert_eq!(cfg.camera.width, 1280);
    assert_eq!(cfg.camera.height, 720);
    assert_eq!(
        cfg.models.bottle_detector,
        std::path::PathBuf::from("custom/bottles.onnx")
    );
    Ok(())
}

#[test]
fn out_of_range_thresholds_are_clamped() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(
        file,
        r#"
[detection]
bottle_conf = 1.5
cap_conf = -0.3
"#
    )?;

    let cfg = AppConfig::load(Some(file.path()))?;
    assert_eq!(cfg.detection.bottle_conf, 1.0);
    assert_eq!(cfg.detection.cap_conf, 0.0);
    Ok(())
}

#[test]
fn clamp_threshold_handles_nan() {
    assert_eq!(clamp_threshold(f32::NAN), 0.5);
    assert_eq!(clamp_threshold(2.0), 1.0);
    assert_eq!(clamp_threshold(-1.0), 0.0);
    assert_eq!(clamp_threshold(0.42), 0.42);
}

#[test]
fn zero_resolution_is_rejected() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(
        file,
        r#"
[camera]
width = 0
"#
    )?;
    assert!(AppConfig::load(Some(file.path())).is_err());
    Ok(())
}

#[test]
fn invalid_toml_is_rejected() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(file, "not valid toml [[[")?;
    assert!(AppConfig::load(Some(file.path())).is_err());
    Ok(())
}

#[test]
fn missing_config_file_is_an_error() {
    assert!(AppConfig::load(Some(std::path::Path::new("no/such/file.toml"))).is_err());
}

#[test]
fn brand_classes_fall_back_when_file_absent() -> anyhow::Result<()> {
    let classes = load_brand_classes(std::path::Path::new("no/such/brands.json"))?;
    assert_eq!(classes.len(), DEFAULT_BRANDS.len());
    assert_eq!(classes[0], DEFAULT_BRANDS[0]);
    Ok(())
}

#[test]
fn brand_classes_load_from_json() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    write!(file, r#"["One", "Two", "Three"]"#)?;
    let classes = load_brand_classes(file.path())?;
    assert_eq!(classes, vec!["One", "Two", "Three"]);
    Ok(())
}

#[test]
fn empty_brand_classes_file_is_rejected() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    write!(file, "[]")?;
    assert!(load_brand_classes(file.path()).is_err());
    Ok(())
}
