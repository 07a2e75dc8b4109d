//! Gradient center voting.
//!
//! Every pixel with a strong Sobel gradient rasterizes two vote segments
//! along its gradient direction, one on each side, covering distances
//! `radius_min..=radius_max`. Dark rings on a bright background vote toward
//! their center from both the outer edge (against the gradient) and the
//! inner edge (along the gradient), so the accumulator peaks at ring centers.
//! Segment cells that leave the frame are clamped onto its border.

use image::GrayImage;
use imageproc::drawing::BresenhamLineIter;
use serde::{Deserialize, Serialize};

use crate::params::VotingParams;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Sobel gradients of one frame, stored as `f32` grids.
#[derive(Clone, Debug, Default)]
pub struct GradientField {
    pub width: usize,
    pub height: usize,
    pub gx: Vec<f32>,
    pub gy: Vec<f32>,
}

impl GradientField {
    pub fn compute(gray: &GrayImage) -> Self {
        let gx = imageproc::gradients::horizontal_sobel(gray);
        let gy = imageproc::gradients::vertical_sobel(gray);
        Self {
            width: gray.width() as usize,
            height: gray.height() as usize,
            gx: gx.as_raw().iter().map(|&v| v as f32).collect(),
            gy: gy.as_raw().iter().map(|&v| v as f32).collect(),
        }
    }

    #[inline]
    pub fn magnitude(&self, idx: usize) -> f32 {
        self.gx[idx].hypot(self.gy[idx])
    }

    pub fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.gx.clear();
        self.gy.clear();
    }
}

/// Per-frame vote counts with the frame's extent.
#[derive(Clone, Debug, Default)]
pub struct VoteAccumulator {
    width: usize,
    height: usize,
    votes: Vec<u32>,
}

impl VoteAccumulator {
    /// Zero every cell and resize to `width x height`.
    pub fn reset(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.votes.clear();
        self.votes.resize(width * height, 0);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn votes(&self) -> &[u32] {
        &self.votes
    }

    /// Vote count at `(x, y)`, zero outside.
    pub fn get(&self, x: i32, y: i32) -> u32 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return 0;
        }
        self.votes[y as usize * self.width + x as usize]
    }

    /// Increment `(x, y)` clamped to the accumulator bounds.
    #[inline]
    fn add(&mut self, x: i32, y: i32) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let x = (x.max(0) as usize).min(self.width - 1);
        let y = (y.max(0) as usize).min(self.height - 1);
        let idx = y * self.width + x;
        self.votes[idx] = self.votes[idx].saturating_add(1);
    }

    pub fn total(&self) -> u64 {
        self.votes.iter().map(|&v| v as u64).sum()
    }
}

/// Accumulator peak proposed as a marker center.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCenter {
    pub x: u32,
    pub y: u32,
    pub votes: u32,
}

/// Cast votes for every strong-gradient pixel into `acc`.
///
/// `acc` must already be reset to the gradient field's extent. Returns the
/// number of voting pixels.
pub fn cast_votes(grad: &GradientField, params: &VotingParams, acc: &mut VoteAccumulator) -> usize {
    let r0 = params.radius_min.max(0.0);
    let r1 = params.radius_max;
    if grad.width == 0 || grad.height == 0 || r1 < r0 {
        return 0;
    }

    let mut voters = 0usize;
    for y in 0..grad.height {
        for x in 0..grad.width {
            let idx = y * grad.width + x;
            let mag = grad.magnitude(idx);
            if mag <= params.min_diff || mag <= f32::EPSILON {
                continue;
            }
            voters += 1;
            let dx = grad.gx[idx] / mag;
            let dy = grad.gy[idx] / mag;
            let (px, py) = (x as f32, y as f32);
            for sign in [1.0f32, -1.0] {
                let start = (px + sign * dx * r0, py + sign * dy * r0);
                let end = (px + sign * dx * r1, py + sign * dy * r1);
                for (vx, vy) in BresenhamLineIter::new(start, end) {
                    acc.add(vx, vy);
                }
            }
        }
    }
    voters
}

/// Local maxima with more than `vote_threshold` votes, strongest first.
///
/// A cell survives non-maximum suppression when no cell in its
/// `(2 * nms_radius + 1)^2` window has more votes; equal counts are resolved
/// toward the lower raster index.
pub fn find_candidates(acc: &VoteAccumulator, params: &VotingParams) -> Vec<CandidateCenter> {
    let (w, h) = (acc.width as i32, acc.height as i32);
    let r = params.nms_radius as i32;
    let mut out = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let v = acc.get(x, y);
            if v <= params.vote_threshold {
                continue;
            }
            let idx = y * w + x;
            let mut is_max = true;
            'window: for ny in (y - r).max(0)..=(y + r).min(h - 1) {
                for nx in (x - r).max(0)..=(x + r).min(w - 1) {
                    let nidx = ny * w + nx;
                    if nidx == idx {
                        continue;
                    }
                    let nv = acc.get(nx, ny);
                    if nv > v || (nv == v && nidx < idx) {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if is_max {
                out.push(CandidateCenter {
                    x: x as u32,
                    y: y as u32,
                    votes: v,
                });
            }
        }
    }

    out.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| (a.y, a.x).cmp(&(b.y, b.x)))
    });
    out
}

/// Compute gradients, vote and extract candidate centers.
///
/// `grad` and `acc` are overwritten; they belong to the caller's per-frame
/// context.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(gray, params, grad, acc), fields(width = gray.width(), height = gray.height()))
)]
pub fn vote_centers(
    gray: &GrayImage,
    params: &VotingParams,
    grad: &mut GradientField,
    acc: &mut VoteAccumulator,
) -> Vec<CandidateCenter> {
    *grad = GradientField::compute(gray);
    acc.reset(grad.width, grad.height);
    let voters = cast_votes(grad, params, acc);
    let candidates = find_candidates(acc, params);
    log::debug!(
        "voting: {} voting pixels, {} votes, {} candidates",
        voters,
        acc.total(),
        candidates.len()
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::LandoltC;

    #[test]
    fn flat_image_casts_no_votes() {
        let gray = GrayImage::from_pixel(40, 30, image::Luma([128]));
        let mut grad = GradientField::default();
        let mut acc = VoteAccumulator::default();
        let c = vote_centers(&gray, &VotingParams::default(), &mut grad, &mut acc);
        assert!(c.is_empty());
        assert_eq!(acc.total(), 0);
        assert_eq!(acc.votes().len(), 40 * 30);
    }

    #[test]
    fn ring_center_collects_the_strongest_peak() {
        let gray = LandoltC::standard(60.0, 50.0, 20.0, 0.0).render(120, 100);
        let mut grad = GradientField::default();
        let mut acc = VoteAccumulator::default();
        let c = vote_centers(&gray, &VotingParams::default(), &mut grad, &mut acc);
        assert!(!c.is_empty());
        let best = c[0];
        let d = (best.x as f32 - 60.0).hypot(best.y as f32 - 50.0);
        assert!(d <= 3.0, "peak at ({}, {})", best.x, best.y);
        assert!(best.votes > 40);
    }

    #[test]
    fn nms_keeps_one_cell_of_a_plateau() {
        let mut acc = VoteAccumulator::default();
        acc.reset(10, 10);
        for (x, y) in [(4, 4), (5, 4), (4, 5)] {
            for _ in 0..50 {
                acc.add(x, y);
            }
        }
        let params = VotingParams {
            vote_threshold: 10,
            nms_radius: 2,
            ..VotingParams::default()
        };
        let c = find_candidates(&acc, &params);
        assert_eq!(
            c,
            vec![CandidateCenter {
                x: 4,
                y: 4,
                votes: 50
            }]
        );
    }

    #[test]
    fn out_of_bounds_votes_clamp_to_border() {
        let mut acc = VoteAccumulator::default();
        acc.reset(3, 3);
        acc.add(-1, 0);
        acc.add(5, 1);
        acc.add(1, -4);
        acc.add(9, 9);
        acc.add(1, 1);
        assert_eq!(acc.get(0, 0), 1);
        assert_eq!(acc.get(2, 1), 1);
        assert_eq!(acc.get(1, 0), 1);
        assert_eq!(acc.get(2, 2), 1);
        assert_eq!(acc.get(1, 1), 1);
        assert_eq!(acc.total(), 5);
        assert_eq!(acc.get(7, 7), 0);
    }

    #[test]
    fn voter_near_the_edge_fills_the_border_column() {
        // dark left half: the edge at x = 2 votes along -x past the frame
        let gray = GrayImage::from_fn(20, 10, |x, _| image::Luma([if x < 3 { 0 } else { 255 }]));
        let params = VotingParams {
            radius_min: 4.0,
            radius_max: 8.0,
            ..VotingParams::default()
        };
        let mut grad = GradientField::default();
        let mut acc = VoteAccumulator::default();
        vote_centers(&gray, &params, &mut grad, &mut acc);
        assert!((1..9).all(|y| acc.get(0, y) > 0));
    }

    #[test]
    fn empty_accumulator_ignores_votes() {
        let mut acc = VoteAccumulator::default();
        acc.reset(0, 4);
        acc.add(0, 0);
        assert_eq!(acc.total(), 0);
    }
}
