//! Gap orientation estimators.
//!
//! Method A uses the second-order moment tensor of the region: the gap lies
//! on the minor principal axis, on the side the bounding-box center is
//! shifted to relative to the centroid. Method B thins the region and points
//! from the centroid to the mean of the skeleton endpoints flanking the gap.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use landoltc_core::{
    image_direction_to_degrees, square_to_rect_homography, warp_gray, GrayImageView, PixelRect,
    RotationSource,
};

use crate::moments::Moments;
use crate::params::{RotationMethod, RotationParams};
use crate::thinning::{endpoints, prune_spurs, zhang_suen};

/// Anisotropy below this fraction of the tensor trace counts as isotropic.
const ISOTROPY_EPS: f64 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotationEstimate {
    /// Gap direction in degrees, `[0, 360)`.
    pub angle_deg: f32,
    pub source: RotationSource,
    /// Skeleton endpoints found (0 for the moment method).
    pub edges: usize,
}

fn foreground_bbox(img: &GrayImage) -> Option<PixelRect> {
    PixelRect::bounding(
        img.enumerate_pixels()
            .filter(|(_, _, p)| p[0] != 0)
            .map(|(x, y, _)| (x as i32, y as i32)),
    )
}

/// Warp the region's foreground bounding box onto a square and re-binarize.
pub fn perspective_correct(img: &GrayImage) -> Option<GrayImage> {
    let bbox = foreground_bbox(img)?;
    let side = bbox.width.max(bbox.height) as usize;
    let h = square_to_rect_homography(&bbox, side)?;
    let view = GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    };
    let warped = warp_gray(&view, &h, side, side);
    let data = warped
        .data
        .iter()
        .map(|&v| if v >= 128 { 255 } else { 0 })
        .collect();
    GrayImage::from_raw(side as u32, side as u32, data)
}

/// Method A: gap direction from the moment tensor.
///
/// `None` for an empty region or when neither the principal axes nor the
/// centroid offset define a direction.
pub fn estimate_moments(region: &GrayImage, perspective_correction: bool) -> Option<f32> {
    let corrected;
    let img = if perspective_correction {
        match perspective_correct(region) {
            Some(c) => {
                corrected = c;
                &corrected
            }
            None => region,
        }
    } else {
        region
    };

    let m = Moments::from_mask(img);
    let centroid = m.centroid()?;
    let center = foreground_bbox(img)?.center();
    let (ox, oy) = (center.x as f64 - centroid.x, center.y as f64 - centroid.y);

    let mu = m.central();
    let anisotropy = (mu.mu20 - mu.mu02).hypot(2.0 * mu.mu11);
    if anisotropy <= ISOTROPY_EPS * (mu.mu20 + mu.mu02) {
        if ox.hypot(oy) < 1e-9 {
            return None;
        }
        return Some(image_direction_to_degrees(ox as f32, oy as f32));
    }

    let minor = 0.5 * (2.0 * mu.mu11).atan2(mu.mu20 - mu.mu02) + std::f64::consts::FRAC_PI_2;
    let (mut ax, mut ay) = (minor.cos(), minor.sin());
    if ax * ox + ay * oy < 0.0 {
        ax = -ax;
        ay = -ay;
    }
    Some(image_direction_to_degrees(ax as f32, ay as f32))
}

/// Method B: gap direction from skeleton endpoints.
///
/// Returns the angle and endpoint count, or `None` with fewer than two
/// endpoints (closed ring or thinning artifact).
pub fn estimate_skeleton(region: &GrayImage, spur_length: usize) -> Option<(f32, usize)> {
    let centroid = Moments::from_mask(region).centroid()?;
    let mut skel = zhang_suen(region);
    let mut ends = endpoints(&skel);
    if ends.len() > 2 {
        let pruned = prune_spurs(&mut skel, spur_length);
        log::trace!("pruned {} spur(s) of {} endpoints", pruned, ends.len());
        ends = endpoints(&skel);
    }
    if ends.len() < 2 {
        return None;
    }
    let n = ends.len() as f64;
    let (sx, sy) = ends
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x as f64, sy + y as f64));
    let (dx, dy) = (sx / n - centroid.x, sy / n - centroid.y);
    if dx.hypot(dy) < 1e-9 {
        return None;
    }
    Some((image_direction_to_degrees(dx as f32, dy as f32), ends.len()))
}

/// Estimate the gap orientation of one isolated region.
///
/// `Auto` picks the skeleton for regions whose larger side reaches
/// `auto_min_size_px`. The skeleton falls back to moments when it finds
/// fewer than two endpoints.
pub fn estimate_rotation(region: &GrayImage, params: &RotationParams) -> Option<RotationEstimate> {
    let use_skeleton = match params.method {
        RotationMethod::Moments => false,
        RotationMethod::Skeleton => true,
        RotationMethod::Auto => foreground_bbox(region)
            .is_some_and(|b| b.width.max(b.height) >= params.auto_min_size_px),
    };

    if use_skeleton {
        if let Some((angle_deg, edges)) = estimate_skeleton(region, params.spur_length) {
            return Some(RotationEstimate {
                angle_deg,
                source: RotationSource::Skeleton,
                edges,
            });
        }
        log::debug!("skeleton has fewer than two endpoints, using moments");
    }

    estimate_moments(region, params.perspective_correction).map(|angle_deg| RotationEstimate {
        angle_deg,
        source: RotationSource::Moments,
        edges: 0,
    })
}
