use std::path::Path;
use std::time::Duration;

use crate::{core, detector};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidGrayDimensions { width: u32, height: u32 },

    #[error(transparent)]
    Reference(#[from] detector::ReferenceError),
}

/// Wrap an `image::GrayImage` into a single-channel frame.
pub fn frame_from_image(img: &::image::GrayImage, timestamp: Duration) -> core::Frame {
    core::Frame::new(
        img.width() as usize,
        img.height() as usize,
        1,
        img.as_raw().clone(),
        timestamp,
    )
}

/// Load a reference template image (dark marker on a bright background).
pub fn load_reference(path: impl AsRef<Path>) -> Result<detector::ReferenceModel, DetectError> {
    Ok(detector::ReferenceModel::from_path(path)?)
}

/// Run the detector end-to-end, loading the reference from
/// `params.reference_image_path`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, params), fields(width = img.width(), height = img.height()))
)]
pub fn detect_landoltc(
    img: &::image::GrayImage,
    params: detector::LandoltCParams,
) -> Result<detector::LandoltCDetectionResult, DetectError> {
    let mut det = detector::LandoltCDetector::from_params(params)?;
    Ok(det.detect_gray(img, Duration::ZERO))
}

/// Run the detector end-to-end with an already loaded reference.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(img, reference, params),
        fields(width = img.width(), height = img.height())
    )
)]
pub fn detect_landoltc_with_reference(
    img: &::image::GrayImage,
    reference: &detector::ReferenceModel,
    params: detector::LandoltCParams,
) -> detector::LandoltCDetectionResult {
    let mut det = detector::LandoltCDetector::new(params, reference.clone());
    det.detect_gray(img, Duration::ZERO)
}

/// Convenience overload using default parameters and the built-in reference.
pub fn detect_landoltc_default(img: &::image::GrayImage) -> detector::LandoltCDetectionResult {
    detect_landoltc_with_reference(
        img,
        &detector::ReferenceModel::standard(),
        detector::LandoltCParams::default(),
    )
}

/// Build an `image::GrayImage` from a raw grayscale buffer.
pub fn gray_image_from_slice(
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<::image::GrayImage, DetectError> {
    let w = usize::try_from(width).ok();
    let h = usize::try_from(height).ok();
    let Some((w, h)) = w.zip(h) else {
        return Err(DetectError::InvalidGrayDimensions { width, height });
    };
    let Some(expected) = w.checked_mul(h) else {
        return Err(DetectError::InvalidGrayDimensions { width, height });
    };
    if pixels.len() != expected {
        return Err(DetectError::InvalidGrayBuffer {
            expected,
            got: pixels.len(),
        });
    }
    ::image::GrayImage::from_raw(width, height, pixels.to_vec())
        .ok_or(DetectError::InvalidGrayDimensions { width, height })
}

pub fn detect_landoltc_from_gray_u8(
    width: u32,
    height: u32,
    pixels: &[u8],
    reference: &detector::ReferenceModel,
    params: detector::LandoltCParams,
) -> Result<detector::LandoltCDetectionResult, DetectError> {
    let img = gray_image_from_slice(width, height, pixels)?;
    Ok(detect_landoltc_with_reference(&img, reference, params))
}
