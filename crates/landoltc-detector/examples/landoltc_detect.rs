use std::{env, fs, path::PathBuf, time::Duration};

use image::ImageReader;
use landoltc_core::Frame;
use landoltc_detector::{
    LandoltC, LandoltCDetectionResult, LandoltCDetector, LandoltCParams, ReferenceModel,
    VisionProcessor,
};
use serde::{Deserialize, Serialize};

#[cfg(not(feature = "tracing"))]
use std::str::FromStr;

#[cfg(not(feature = "tracing"))]
use log::{info, warn, LevelFilter};

#[cfg(feature = "tracing")]
use tracing::{info, warn};

#[cfg(feature = "tracing")]
use landoltc_core::init_tracing;
#[cfg(not(feature = "tracing"))]
use landoltc_core::init_with_level;

#[derive(Debug, Deserialize)]
struct ExampleConfig {
    image_path: String,
    #[serde(default)]
    output_path: Option<String>,
    landoltc: LandoltCParams,
}

#[derive(Debug, Serialize)]
struct ExampleReport {
    image_path: String,
    num_candidates: usize,
    num_raw: usize,
    result: LandoltCDetectionResult,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(not(feature = "tracing"))]
    let log_level = LevelFilter::from_str("info").unwrap_or(LevelFilter::Info);
    #[cfg(not(feature = "tracing"))]
    init_with_level(log_level)?;

    #[cfg(feature = "tracing")]
    init_tracing(false);

    run()
}

/// With a config path: detect in the configured image. Without one: detect
/// in a rendered scene of three markers using the built-in reference.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "info"))]
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (image_path, output_path, img, mut detector) = match env::args().nth(1).map(PathBuf::from) {
        Some(config_path) => {
            let cfg = load_config(&config_path)?;
            let img = load_image(&PathBuf::from(&cfg.image_path))?;
            let detector = LandoltCDetector::initialize(cfg.landoltc)?;
            (cfg.image_path, cfg.output_path, img, detector)
        }
        None => {
            info!("no config given, using a synthetic scene");
            let detector =
                LandoltCDetector::new(LandoltCParams::default(), ReferenceModel::standard());
            ("<synthetic>".to_string(), None, synthetic_scene(), detector)
        }
    };

    let (w, h) = img.dimensions();
    let frame = Frame::new(w as usize, h as usize, 1, img.into_raw(), Duration::ZERO);
    let result = detector.detect(&frame);
    if result.detections.is_empty() {
        warn!("no Landolt-C markers detected");
    }
    for d in &result.detections {
        info!(
            "marker at ({:.1}, {:.1}) gap {:?} deg, confidence {:.2}",
            d.center.x, d.center.y, d.rotation_deg, d.confidence
        );
    }

    let report = ExampleReport {
        image_path,
        num_candidates: result.candidates.len(),
        num_raw: result.raw.len(),
        result,
    };
    write_report(output_path.as_deref(), report)
}

fn synthetic_scene() -> image::GrayImage {
    let mut img = image::GrayImage::from_pixel(320, 200, image::Luma([230]));
    for (x, y, r, a) in [(70.0, 70.0, 24.0, 0.0), (180.0, 110.0, 30.0, 135.0), (270.0, 60.0, 18.0, 270.0)] {
        LandoltC::standard(x, y, r, a).draw_into(&mut img, 20);
    }
    img
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(path)))]
fn load_config(path: &PathBuf) -> Result<ExampleConfig, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "info", skip(image_path))
)]
fn load_image(image_path: &PathBuf) -> Result<image::GrayImage, Box<dyn std::error::Error>> {
    Ok(ImageReader::open(image_path)?.decode()?.to_luma8())
}

fn write_report(
    path: Option<&str>,
    report: ExampleReport,
) -> Result<(), Box<dyn std::error::Error>> {
    let out_path = path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tmpdata/landoltc_detect_report.json"));
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&out_path, json)?;
    println!("wrote report JSON to {}", out_path.display());
    Ok(())
}
