//! Fusion of raw per-region detections into one detection per marker.
//!
//! One physical marker often yields several regions (the two arcs on either
//! side of a gap, or nested rings). Detections whose boxes or centers are
//! within `proximity` pixels are grouped transitively.

use std::cmp::Ordering;

use nalgebra::Point2;

use landoltc_core::{Detection, PixelRect};

use crate::params::FusionParams;

#[cfg(feature = "tracing")]
use tracing::instrument;

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // keep the lower index as root so groups order by first member
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

fn near(a: &Detection, b: &Detection, proximity: f32) -> bool {
    if let (Some(ra), Some(rb)) = (&a.bbox, &b.bbox) {
        if ra.gap_to(rb) <= proximity {
            return true;
        }
    }
    (a.center - b.center).norm() <= proximity
}

/// Member order for picking the representative: area, then confidence,
/// then edge count, larger first.
fn rank(a: &Detection, b: &Detection) -> Ordering {
    b.area
        .total_cmp(&a.area)
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| b.edges.cmp(&a.edges))
}

/// Index groups of `raw`, ordered by their first member.
pub fn group_detections(raw: &[Detection], proximity: f32) -> Vec<Vec<usize>> {
    let mut sets = DisjointSet::new(raw.len());
    for i in 0..raw.len() {
        for j in (i + 1)..raw.len() {
            if near(&raw[i], &raw[j], proximity) {
                sets.union(i, j);
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot_of_root = vec![usize::MAX; raw.len()];
    for i in 0..raw.len() {
        let root = sets.find(i);
        if slot_of_root[root] == usize::MAX {
            slot_of_root[root] = groups.len();
            groups.push(Vec::new());
        }
        groups[slot_of_root[root]].push(i);
    }
    groups
}

/// Union of all member boxes, if any member has one.
fn union_bbox<'a>(dets: impl IntoIterator<Item = &'a Detection>) -> Option<PixelRect> {
    dets.into_iter()
        .filter_map(|d| d.bbox)
        .reduce(|acc, r| acc.union(&r))
}

fn merge_group(members: &[&Detection]) -> Detection {
    let mut by_rank: Vec<&Detection> = members.to_vec();
    by_rank.sort_by(|a, b| rank(a, b));

    let bbox = union_bbox(members.iter().copied());
    let center = match bbox {
        Some(r) => r.center(),
        None => {
            let n = members.len() as f32;
            let sum = members
                .iter()
                .fold(nalgebra::Vector2::zeros(), |acc, d| acc + d.center.coords);
            Point2::from(sum / n)
        }
    };

    let representative = by_rank
        .iter()
        .find(|d| d.rotation_deg.is_some())
        .copied()
        .unwrap_or(by_rank[0]);
    let miss = members
        .iter()
        .fold(1.0f32, |acc, d| acc * (1.0 - d.confidence.clamp(0.0, 1.0)));

    Detection {
        center,
        bbox,
        rotation_deg: representative.rotation_deg,
        rotation_source: representative.rotation_source,
        confidence: 1.0 - miss,
        area: members.iter().map(|d| d.area).sum(),
        edges: representative.edges,
        members: members.len(),
        angles: by_rank.iter().filter_map(|d| d.rotation_deg).collect(),
    }
}

/// Merge nearby raw detections. Single-member groups pass through unchanged.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(raw, params), fields(raw = raw.len()))
)]
pub fn fuse_detections(raw: &[Detection], params: &FusionParams) -> Vec<Detection> {
    let groups = group_detections(raw, params.proximity);
    let out: Vec<Detection> = groups
        .iter()
        .map(|g| {
            if g.len() == 1 {
                raw[g[0]].clone()
            } else {
                let members: Vec<&Detection> = g.iter().map(|&i| &raw[i]).collect();
                merge_group(&members)
            }
        })
        .collect();
    log::debug!("fusion: {} raw -> {} detections", raw.len(), out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use landoltc_core::RotationSource;

    fn det(x: i32, y: i32, side: u32, area: f32, conf: f32, rot: Option<f32>) -> Detection {
        let bbox = PixelRect::new(x, y, side, side);
        let d = Detection::raw(bbox.center(), Some(bbox), conf, area);
        match rot {
            Some(r) => d.with_rotation(r, RotationSource::Skeleton).with_edges(2),
            None => d,
        }
    }

    #[test]
    fn near_detections_fuse_far_ones_stay() {
        let raw = vec![
            det(10, 10, 20, 300.0, 0.6, Some(10.0)),
            det(33, 12, 10, 80.0, 0.5, Some(200.0)),
            det(100, 100, 20, 300.0, 0.7, Some(90.0)),
        ];
        let fused = fuse_detections(&raw, &FusionParams::default());
        assert_eq!(fused.len(), 2);

        let merged = &fused[0];
        assert_eq!(merged.members, 2);
        assert_eq!(merged.bbox, Some(PixelRect::new(10, 10, 33, 20)));
        assert_eq!(merged.rotation_deg, Some(10.0));
        assert_eq!(merged.angles, vec![10.0, 200.0]);
        assert_abs_diff_eq!(merged.confidence, 1.0 - 0.4 * 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(merged.area, 380.0);

        assert_eq!(fused[1], raw[2]);
    }

    #[test]
    fn grouping_is_transitive_and_ordered() {
        // a-b and b-c are near, a-c is not
        let raw = vec![
            det(200, 0, 4, 10.0, 0.5, None),
            det(0, 0, 10, 50.0, 0.5, None),
            det(13, 0, 10, 50.0, 0.5, None),
            det(26, 0, 10, 50.0, 0.5, None),
        ];
        let groups = group_detections(&raw, 5.0);
        assert_eq!(groups, vec![vec![0], vec![1, 2, 3]]);
    }

    #[test]
    fn representative_must_have_a_rotation() {
        let raw = vec![
            det(0, 0, 20, 500.0, 0.9, None),
            det(5, 5, 10, 60.0, 0.4, Some(270.0)),
        ];
        let fused = fuse_detections(&raw, &FusionParams::default());
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].rotation_deg, Some(270.0));
        assert_eq!(fused[0].edges, 2);
        assert_eq!(fused[0].angles, vec![270.0]);
    }

    #[test]
    fn centers_alone_can_group() {
        let a = Detection::raw(Point2::new(10.0, 10.0), None, 0.5, 10.0);
        let b = Detection::raw(Point2::new(13.0, 14.0), None, 0.5, 10.0);
        let fused = fuse_detections(&[a, b], &FusionParams::default());
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].center, Point2::new(11.5, 12.0));
        assert_eq!(fused[0].bbox, None);
    }
}
