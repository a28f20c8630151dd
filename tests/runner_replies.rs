use takeoff_kit::engine::{DetectorDiag, ModelInfo, PredictOut, TrainOut};

#[test]
fn info_reply_with_string_class_ids() {
    let raw = r#"{"checkpoint": "models/best.pt", "task": "detect", "names": {"1": "window", "0": "door"}}"#;
    let info: ModelInfo = serde_json::from_str(raw).unwrap();
    assert_eq!(info.names.get(&0).map(String::as_str), Some("door"));
    assert_eq!(info.class_names(), vec!["door", "window"]);
    assert!(info.error.is_none());

    let failed: ModelInfo =
        serde_json::from_str(r#"{"checkpoint": "x.pt", "names": {}, "error": "no such file"}"#)
            .unwrap();
    assert!(failed.class_names().is_empty());
    assert_eq!(failed.error.as_deref(), Some("no such file"));
}

#[test]
fn train_reply() {
    let raw = r#"{"ok": true, "save_dir": "runs/detect/takeoff_mvp", "best_checkpoint": "runs/detect/takeoff_mvp/weights/best.pt", "metrics": {"metrics/mAP50(B)": 0.61}}"#;
    let out: TrainOut = serde_json::from_str(raw).unwrap();
    assert!(out.ok);
    assert_eq!(out.save_dir.as_deref(), Some("runs/detect/takeoff_mvp"));
    assert_eq!(out.metrics["metrics/mAP50(B)"], 0.61);

    let failed: TrainOut = serde_json::from_str(r#"{"ok": false, "error": "CUDA out of memory"}"#)
        .unwrap();
    assert!(!failed.ok);
    assert!(failed.best_checkpoint.is_none());
    assert!(failed.metrics.is_null());
}

#[test]
fn predict_reply_with_per_image_error() {
    let raw = r#"{"results": [
        {"image": "a.png", "boxes": [{"class_id": 1, "confidence": 0.8, "xyxy": [1.0, 2.0, 30.5, 40.0]}]},
        {"image": "b.png", "error": "cannot identify image file"}
    ]}"#;
    let out: PredictOut = serde_json::from_str(raw).unwrap();
    assert!(out.error.is_none());
    assert_eq!(out.results.len(), 2);
    assert_eq!(out.results[0].boxes[0].class_id, 1);
    assert_eq!(out.results[0].boxes[0].xyxy, [1.0, 2.0, 30.5, 40.0]);
    assert!(out.results[1].boxes.is_empty());
    assert_eq!(
        out.results[1].error.as_deref(),
        Some("cannot identify image file")
    );
}

#[test]
fn doctor_reply_with_missing_module() {
    let raw = r#"{"python_exe": "/usr/bin/python3", "python_version": "3.11.4", "device": null,
        "checks": [{"name": "numpy", "ok": true, "version": "1.26.0"},
                   {"name": "ultralytics", "ok": false, "detail": "No module named 'ultralytics'"}]}"#;
    let diag: DetectorDiag = serde_json::from_str(raw).unwrap();
    assert!(diag.device.is_none());
    assert!(diag.checks[0].ok);
    assert!(!diag.checks[1].ok);
    assert!(diag.checks[1].detail.as_deref().unwrap().contains("ultralytics"));
}
