//! Core types and utilities for Landolt-C marker detection.
//!
//! This crate is intentionally small. It holds the frame and image types,
//! pixel geometry, the homography used for perspective correction, the
//! detection record shared by every pipeline stage, and logger setup. It
//! does *not* depend on any concrete image-processing library.

mod detection;
mod frame;
mod geometry;
mod homography;
mod image;
mod logger;

pub use detection::{Detection, DetectionFrame, RotationSource};
pub use frame::{Frame, FrameError};
pub use geometry::{angular_distance_deg, image_direction_to_degrees, normalize_degrees, PixelRect};
pub use homography::{homography_from_4pt, square_to_rect_homography, warp_gray, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_env, LOG_ENV_VAR};
