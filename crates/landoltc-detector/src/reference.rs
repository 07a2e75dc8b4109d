//! Reference contour set built once from a template image.

use std::path::Path;

use image::GrayImage;
use nalgebra::Point2;

use landoltc_core::PixelRect;

use crate::contour::trace_regions;
use crate::error::ReferenceError;
use crate::moments::{hu_similarity, Moments};
use crate::synthetic::LandoltC;
use crate::threshold::otsu_dark_mask;

const REFERENCE_MIN_POINTS: usize = 12;
const REFERENCE_MIN_AREA: f32 = 30.0;

/// One template contour with its shape descriptor.
#[derive(Clone, Debug)]
pub struct ReferenceContour {
    pub points: Vec<Point2<i32>>,
    pub bbox: PixelRect,
    pub area: f32,
    pub hu: [f64; 7],
}

/// Template contours ordered by area, largest first. Read-only after
/// construction.
#[derive(Clone, Debug)]
pub struct ReferenceModel {
    contours: Vec<ReferenceContour>,
}

impl ReferenceModel {
    /// Load a template image (dark marker on bright background).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| ReferenceError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_image(&img.to_luma8())?;
        log::info!(
            "reference {}: {} contour(s)",
            path.display(),
            model.contours.len()
        );
        Ok(model)
    }

    pub fn from_image(gray: &GrayImage) -> Result<Self, ReferenceError> {
        let samples = gray.as_raw();
        let (lo, hi) = samples
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if samples.is_empty() || lo == hi {
            return Err(ReferenceError::NoContours);
        }
        let binary = otsu_dark_mask(gray);
        let contours: Vec<ReferenceContour> = trace_regions(&binary, REFERENCE_MIN_POINTS, false)
            .into_iter()
            .filter(|r| r.area >= REFERENCE_MIN_AREA)
            .map(|r| ReferenceContour {
                hu: r.moments.hu(),
                points: r.points,
                bbox: r.bbox,
                area: r.area,
            })
            .collect();
        Self::from_contours(contours)
    }

    /// Template of the standard Landolt C (outer radius 40 px, gap at 0°).
    pub fn standard() -> Self {
        Self::from_shape(&LandoltC::standard(42.0, 42.0, 40.0, 0.0), 85, 85)
    }

    /// Template from a synthetic shape rasterized on a `width x height` grid.
    pub fn from_shape(shape: &LandoltC, width: u32, height: u32) -> Self {
        let mask = shape.render_mask(width, height);
        let pixels: Vec<(i32, i32)> = mask
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] != 0)
            .map(|(x, y, _)| (x as i32, y as i32))
            .collect();
        let moments = Moments::from_pixels(pixels.iter().map(|&(x, y)| (x as f64, y as f64)));
        let contour = PixelRect::bounding(pixels.iter().copied()).map(|bbox| ReferenceContour {
            points: boundary_points(&mask),
            bbox,
            area: moments.m00 as f32,
            hu: moments.hu(),
        });
        Self {
            contours: contour.into_iter().collect(),
        }
    }

    pub fn from_contours(mut contours: Vec<ReferenceContour>) -> Result<Self, ReferenceError> {
        if contours.is_empty() {
            return Err(ReferenceError::NoContours);
        }
        contours.sort_by(|a, b| b.area.total_cmp(&a.area));
        Ok(Self { contours })
    }

    pub fn contours(&self) -> &[ReferenceContour] {
        &self.contours
    }

    /// Highest similarity of `hu` against any template contour; 0 when the
    /// model is empty.
    pub fn best_similarity(&self, hu: &[f64; 7]) -> f32 {
        self.contours
            .iter()
            .map(|c| hu_similarity(&c.hu, hu))
            .fold(0.0, f32::max)
    }
}

/// Foreground pixels with a 4-connected background neighbor.
fn boundary_points(mask: &GrayImage) -> Vec<Point2<i32>> {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    let on = |x: i32, y: i32| x >= 0 && y >= 0 && x < w && y < h && mask.get_pixel(x as u32, y as u32)[0] != 0;
    let mut out = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if on(x, y) && !(on(x - 1, y) && on(x + 1, y) && on(x, y - 1) && on(x, y + 1)) {
                out.push(Point2::new(x, y));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_image_and_synthetic_shape_agree() {
        let shape = LandoltC::standard(42.0, 42.0, 40.0, 0.0);
        let traced = ReferenceModel::from_image(&shape.render(85, 85)).unwrap();
        let direct = ReferenceModel::standard();
        assert_eq!(traced.contours().len(), 1);
        let sim = traced.best_similarity(&direct.contours()[0].hu);
        assert!(sim > 0.9, "similarity {sim}");
    }

    #[test]
    fn contours_sorted_by_area() {
        let mut img = LandoltC::standard(30.0, 30.0, 25.0, 0.0).render(120, 60);
        LandoltC::standard(90.0, 30.0, 12.0, 90.0).draw_into(&mut img, 0);
        let model = ReferenceModel::from_image(&img).unwrap();
        assert_eq!(model.contours().len(), 2);
        assert!(model.contours()[0].area > model.contours()[1].area);
    }

    #[test]
    fn blank_template_has_no_contours() {
        let img = GrayImage::from_pixel(20, 20, image::Luma([255]));
        assert!(matches!(
            ReferenceModel::from_image(&img),
            Err(ReferenceError::NoContours)
        ));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.png");
        let err = ReferenceModel::from_path(&path).unwrap_err();
        assert!(matches!(err, ReferenceError::Load { .. }));
        assert!(err.to_string().contains("missing.png"));
    }
}
