#![cfg(feature = "cli")]

use std::path::Path;

use assert_cmd::Command;
use image::{GrayImage, Luma};
use landoltc::detector::LandoltC;
use predicates::prelude::*;

fn write_reference(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("reference.png");
    LandoltC::standard(42.0, 42.0, 40.0, 0.0)
        .render(85, 85)
        .save(&path)
        .unwrap();
    path
}

fn write_scene(dir: &Path, name: &str, shapes: &[LandoltC]) -> std::path::PathBuf {
    let mut img = GrayImage::from_pixel(200, 150, Luma([255]));
    for s in shapes {
        s.draw_into(&mut img, 0);
    }
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

fn landoltc() -> Command {
    Command::cargo_bin("landoltc").unwrap()
}

#[test]
fn writes_a_report_for_every_image() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write_reference(dir.path());
    let config = dir.path().join("config.json");
    std::fs::write(
        &config,
        format!(
            r#"{{ "referenceImagePath": {:?}, "fusion": {{ "fusionProximity": 4.0 }} }}"#,
            reference.to_string_lossy()
        ),
    )
    .unwrap();
    let one = write_scene(
        dir.path(),
        "one.png",
        &[LandoltC::standard(100.0, 75.0, 20.0, 0.0)],
    );
    let empty = write_scene(dir.path(), "empty.png", &[]);
    let out = dir.path().join("out/report.json");

    landoltc()
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&out)
        .arg(&one)
        .arg(&empty)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["params"]["fusion"]["proximity"], 4.0);
    let images = report["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["timestamp_ms"], 0);
    assert_eq!(images[1]["timestamp_ms"], 1);
    assert_eq!(images[0]["detections"].as_array().unwrap().len(), 1);
    assert!(images[1]["detections"].as_array().unwrap().is_empty());
}

#[test]
fn flags_override_the_config() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write_reference(dir.path());
    let scene = write_scene(
        dir.path(),
        "scene.png",
        &[LandoltC::standard(100.0, 75.0, 20.0, 90.0)],
    );

    let output = landoltc()
        .arg("--reference")
        .arg(&reference)
        .args(["--method", "moments"])
        .arg(&scene)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["params"]["rotation"]["method"], "moments");
    let det = &report["images"][0]["detections"][0];
    assert_eq!(det["rotation_source"], "moments");
}

#[test]
fn unreadable_image_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write_reference(dir.path());
    let missing = dir.path().join("missing.png");

    let output = landoltc()
        .arg("--reference")
        .arg(&reference)
        .arg(&missing)
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(report["images"][0]["error"].is_string());
}

#[test]
fn missing_reference_fails() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path(), "scene.png", &[]);
    landoltc()
        .arg("--reference")
        .arg(dir.path().join("nope.png"))
        .arg(&scene)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load reference image"));
}

#[test]
fn reference_is_required() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path(), "scene.png", &[]);
    landoltc()
        .arg(&scene)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no reference image path configured"));
}

#[test]
fn bad_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, "{ not json").unwrap();
    let scene = write_scene(dir.path(), "scene.png", &[]);
    landoltc()
        .arg("--config")
        .arg(&config)
        .arg(&scene)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}
