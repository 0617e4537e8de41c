use inner_bloom::config::{BloomParams, Configuration};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn empty_config_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert_eq!(cfg.params, BloomParams::default());
    assert_eq!(cfg.tuning.rebuild_debounce, Duration::from_millis(200));
    assert!(cfg.image.is_none());
    assert!(cfg.seed.is_none());
}

#[test]
fn parse_kebab_case_sections() {
    let yaml = r#"
image: "/photos/rose.jpg"
seed: 42
params:
  grid-size: 64
  wave-amplitude: 0.4
  particle-density: 2.5
tuning:
  gap-factor: 0.7
  rebuild-debounce: 350ms
boundary:
  low-frequency: 5
  jitter: 0.0
drift:
  max-speed: 0.3
scene:
  camera-fov-degrees: 60
  background: [0, 0, 0]
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.image, Some(PathBuf::from("/photos/rose.jpg")));
    assert_eq!(cfg.seed, Some(42));
    assert_eq!(cfg.params.grid_size, 64);
    assert!((cfg.params.wave_amplitude - 0.4).abs() < f32::EPSILON);
    assert!((cfg.params.wave_speed - BloomParams::default().wave_speed).abs() < f32::EPSILON);
    assert_eq!(cfg.tuning.rebuild_debounce, Duration::from_millis(350));
    assert!((cfg.tuning.gap_factor - 0.7).abs() < f32::EPSILON);
    assert!((cfg.boundary.low_frequency - 5.0).abs() < f32::EPSILON);
    assert_eq!(cfg.boundary.jitter, 0.0);
    assert!((cfg.drift.max_speed - 0.3).abs() < f32::EPSILON);
    assert_eq!(cfg.scene.background, [0, 0, 0]);
}

#[test]
fn unknown_keys_are_rejected() {
    let yaml = r#"
params:
  grid-sizes: 64
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn invalid_values_fail_validation() {
    let yaml = r#"
tuning:
  emission-probability: 1.5
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(format!("{err:#}").contains("emission-probability"));
}

#[test]
fn relative_image_resolves_against_config_dir() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("bloom.yaml");
    fs::write(&path, "image: photos/rose.png\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.image, Some(tmp.path().join("photos/rose.png")));
}

#[test]
fn missing_file_reports_path() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("missing.yaml");
    let err = Configuration::from_yaml_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("missing.yaml"));
}
