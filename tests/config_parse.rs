use takeoff_kit::config::{Config, PageFormat};

#[test]
fn parse_example_config() {
    let raw = include_str!("../takeoff.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.rasterize.format, PageFormat::Png);
    assert_eq!(cfg.paths.holding_dir, "data_holding");
    assert!(!cfg.detector.modules.is_empty());
}

#[test]
fn defaults_match_cli_table() {
    let cfg = Config::default();
    assert_eq!(cfg.rasterize.dpi, 300);
    assert_eq!(cfg.train.data, "data_labeled/dataset.yaml");
    assert_eq!(cfg.train.epochs, 20);
    assert_eq!(cfg.train.batch, 8);
    assert_eq!(cfg.train.imgsz, 640);
    assert_eq!(cfg.train.device, "cpu");
    assert_eq!(cfg.train.name, "takeoff_mvp");
    assert_eq!(cfg.train.patience, 5);
    assert_eq!(cfg.inference.model, "models/best.pt");
    assert!((cfg.inference.conf - 0.25).abs() < f32::EPSILON);
    assert!((cfg.inference.iou - 0.45).abs() < f32::EPSILON);
    assert!(!cfg.logging.write_to_file);
}

#[test]
fn partial_sections_keep_defaults() {
    let cfg: Config = toml::from_str("[rasterize]\nformat = \"JPEG\"\n").unwrap();
    assert_eq!(cfg.rasterize.format, PageFormat::Jpeg);
    assert_eq!(cfg.rasterize.dpi, 300);
    assert_eq!(cfg.train.epochs, 20);
}
