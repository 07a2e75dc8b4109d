//! Contour extraction around candidate centers and shape matching against
//! the reference model.

use std::collections::HashSet;

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use nalgebra::Point2;

use landoltc_core::PixelRect;

use crate::moments::Moments;
use crate::params::ContourParams;
use crate::reference::ReferenceModel;
use crate::threshold::otsu_dark_mask;
use crate::voting::CandidateCenter;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Accepted marker contour, in frame coordinates.
#[derive(Clone, Debug)]
pub struct MarkerContour {
    /// Color tag, unique within a frame, never 0.
    pub tag: u16,
    /// Outer boundary points.
    pub points: Vec<Point2<i32>>,
    /// Boundaries of holes inside the region.
    pub holes: Vec<Vec<Point2<i32>>>,
    pub bbox: PixelRect,
    /// Rasterized region, `bbox`-sized, 255 inside.
    pub fill: GrayImage,
    /// Pixel count of `fill`.
    pub area: f32,
    /// Best similarity against the reference contours.
    pub similarity: f32,
    pub hu: [f64; 7],
}

/// Outer border traced in a binary image, rasterized with holes removed.
#[derive(Clone, Debug)]
pub(crate) struct TracedRegion {
    pub points: Vec<Point2<i32>>,
    pub holes: Vec<Vec<Point2<i32>>>,
    pub bbox: PixelRect,
    pub fill: GrayImage,
    pub area: f32,
    pub moments: Moments,
}

fn to_points(contour: &Contour<i32>) -> Vec<Point2<i32>> {
    contour.points.iter().map(|p| Point2::new(p.x, p.y)).collect()
}

fn touches_border(points: &[Point2<i32>], width: u32, height: u32) -> bool {
    let (w, h) = (width as i32, height as i32);
    points
        .iter()
        .any(|p| p.x <= 0 || p.y <= 0 || p.x >= w - 1 || p.y >= h - 1)
}

/// Fill a closed boundary given in `canvas` coordinates.
fn fill_polygon(canvas: &mut GrayImage, points: &[Point<i32>], value: u8) {
    let mut poly: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for &p in points {
        if poly.last() != Some(&p) {
            poly.push(p);
        }
    }
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    if poly.len() >= 3 {
        draw_polygon_mut(canvas, &poly, Luma([value]));
    }
    put_points(canvas, &poly, value);
}

fn put_points(canvas: &mut GrayImage, points: &[Point<i32>], value: u8) {
    for p in points {
        if p.x >= 0 && p.y >= 0 && (p.x as u32) < canvas.width() && (p.y as u32) < canvas.height() {
            canvas.put_pixel(p.x as u32, p.y as u32, Luma([value]));
        }
    }
}

/// Rasterize the region enclosed by `outer` minus `holes` into a buffer
/// the size of the outer bounding box.
pub(crate) fn rasterize_region(
    outer: &[Point2<i32>],
    holes: &[Vec<Point2<i32>>],
) -> Option<(PixelRect, GrayImage)> {
    let bbox = PixelRect::bounding(outer.iter().map(|p| (p.x, p.y)))?;
    let local = |pts: &[Point2<i32>]| -> Vec<Point<i32>> {
        pts.iter()
            .map(|p| Point::new(p.x - bbox.x, p.y - bbox.y))
            .collect()
    };

    let mut fill = GrayImage::new(bbox.width, bbox.height);
    fill_polygon(&mut fill, &local(outer), 255);
    let holes_local: Vec<Vec<Point<i32>>> = holes.iter().map(|h| local(h.as_slice())).collect();
    for hole in &holes_local {
        fill_polygon(&mut fill, hole, 0);
    }
    // hole borders are region pixels themselves
    for hole in &holes_local {
        put_points(&mut fill, hole, 255);
    }
    Some((bbox, fill))
}

/// Trace outer borders of the foreground (nonzero) of `binary`.
///
/// Borders with fewer than `min_points` points are dropped, as are borders
/// touching the image edge when `skip_border` is set.
pub(crate) fn trace_regions(
    binary: &GrayImage,
    min_points: usize,
    skip_border: bool,
) -> Vec<TracedRegion> {
    let contours: Vec<Contour<i32>> = find_contours(binary);
    let mut out = Vec::new();

    for (i, c) in contours.iter().enumerate() {
        if c.border_type != BorderType::Outer || c.points.len() < min_points {
            continue;
        }
        let points = to_points(c);
        if skip_border && touches_border(&points, binary.width(), binary.height()) {
            continue;
        }
        let holes: Vec<Vec<Point2<i32>>> = contours
            .iter()
            .filter(|h| h.parent == Some(i) && h.border_type == BorderType::Hole)
            .map(to_points)
            .collect();

        let Some((bbox, fill)) = rasterize_region(&points, &holes) else {
            continue;
        };
        let moments = Moments::from_mask(&fill);
        out.push(TracedRegion {
            points,
            holes,
            bbox,
            area: moments.m00 as f32,
            fill,
            moments,
        });
    }
    out
}

fn window_around(c: &CandidateCenter, radius: u32, width: u32, height: u32) -> Option<PixelRect> {
    let r = radius as i64;
    let x0 = (c.x as i64 - r).max(0);
    let y0 = (c.y as i64 - r).max(0);
    let x1 = (c.x as i64 + r).min(width as i64 - 1);
    let y1 = (c.y as i64 + r).min(height as i64 - 1);
    if x1 < x0 || y1 < y0 {
        return None;
    }
    Some(PixelRect::new(
        x0 as i32,
        y0 as i32,
        (x1 - x0 + 1) as u32,
        (y1 - y0 + 1) as u32,
    ))
}

/// Extract and match contours around every candidate.
///
/// Tags are assigned in acceptance order starting at 1. A region reached
/// from several candidates is accepted once.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(gray, candidates, reference, params), fields(candidates = candidates.len()))
)]
pub fn extract_contours(
    gray: &GrayImage,
    candidates: &[CandidateCenter],
    reference: &ReferenceModel,
    params: &ContourParams,
) -> Vec<MarkerContour> {
    let mut out: Vec<MarkerContour> = Vec::new();
    let mut seen: HashSet<(PixelRect, u64)> = HashSet::new();
    let mut next_tag: u32 = 1;

    'candidates: for cand in candidates {
        let Some(win) = window_around(cand, params.search_radius, gray.width(), gray.height())
        else {
            continue;
        };
        let patch = image::imageops::crop_imm(gray, win.x as u32, win.y as u32, win.width, win.height)
            .to_image();

        let samples = patch.as_raw();
        let (lo, hi) = samples
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if hi.saturating_sub(lo) < params.min_contrast {
            log::trace!("candidate ({}, {}): low contrast {}", cand.x, cand.y, hi.saturating_sub(lo));
            continue;
        }
        let binary = otsu_dark_mask(&patch);

        for region in trace_regions(&binary, params.min_contour_points, true) {
            if region.area < params.min_contour_area {
                continue;
            }
            let hu = region.moments.hu();
            let similarity = reference.best_similarity(&hu);
            if similarity < params.similarity_threshold {
                log::trace!(
                    "candidate ({}, {}): contour rejected, similarity {:.3}",
                    cand.x,
                    cand.y,
                    similarity
                );
                continue;
            }

            let bbox = PixelRect::new(
                region.bbox.x + win.x,
                region.bbox.y + win.y,
                region.bbox.width,
                region.bbox.height,
            );
            if !seen.insert((bbox, region.area as u64)) {
                continue;
            }
            let Ok(tag) = u16::try_from(next_tag) else {
                log::warn!("color tags exhausted, ignoring remaining contours");
                break 'candidates;
            };
            next_tag += 1;

            let shift = |p: &Point2<i32>| Point2::new(p.x + win.x, p.y + win.y);
            out.push(MarkerContour {
                tag,
                points: region.points.iter().map(shift).collect(),
                holes: region
                    .holes
                    .iter()
                    .map(|h| h.iter().map(shift).collect())
                    .collect(),
                bbox,
                fill: region.fill,
                area: region.area,
                similarity,
                hu,
            });
        }
    }

    log::debug!(
        "contours: {} accepted from {} candidates",
        out.len(),
        candidates.len()
    );
    out
}
