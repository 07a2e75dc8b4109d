//! Global thresholding helpers.

use image::GrayImage;
use imageproc::contrast::otsu_level;

/// Binarize with dark pixels (`<= threshold`) as 255 foreground.
pub(crate) fn binarize_dark(img: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] <= threshold {
            image::Luma([255])
        } else {
            image::Luma([0])
        }
    })
}

/// Foreground mask of the dark class under Otsu's global level.
pub(crate) fn otsu_dark_mask(img: &GrayImage) -> GrayImage {
    binarize_dark(img, otsu_level(img))
}
