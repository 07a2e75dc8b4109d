//! High-level facade crate for the `landoltc-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the core types and the detector
//! - (feature-gated) end-to-end helpers that run the detector on an
//!   `image::GrayImage` or a raw gray buffer
//! - (feature `cli`) the `landoltc` command line tool
//!
//! ## Quickstart
//!
//! ```no_run
//! use landoltc::detect;
//! use landoltc::LandoltCParams;
//! use image::ImageReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = ImageReader::open("scene.png")?.decode()?.to_luma8();
//! let params = LandoltCParams::default().with_reference_image("reference.png");
//!
//! let result = detect::detect_landoltc(&img, params)?;
//! for d in &result.detections {
//!     println!("({:.1}, {:.1}) gap {:?}", d.center.x, d.center.y, d.rotation_deg);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `landoltc::core`: frames, gray images, geometry, homography, detection records.
//! - `landoltc::detector`: the detection pipeline and its stages.
//! - `landoltc::detect` (feature `image`): end-to-end helpers from `image::GrayImage`.

pub use landoltc_core as core;
pub use landoltc_detector as detector;

pub use landoltc_core::{Detection, DetectionFrame, Frame, FrameError, PixelRect, RotationSource};
pub use landoltc_detector::{
    run_pipeline, LandoltCDetectionResult, LandoltCDetector, LandoltCParams, ReferenceError,
    ReferenceModel, RotationMethod, RunStats, VisionProcessor,
};

#[cfg(feature = "image")]
pub mod detect;
