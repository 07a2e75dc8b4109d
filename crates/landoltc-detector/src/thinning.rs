//! Zhang–Suen thinning and skeleton topology helpers.

use image::{GrayImage, Luma};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Neighbor offsets P2..P9, clockwise from north.
const RING: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

#[inline]
fn on(img: &GrayImage, x: i32, y: i32) -> bool {
    x >= 0
        && y >= 0
        && (x as u32) < img.width()
        && (y as u32) < img.height()
        && img.get_pixel(x as u32, y as u32)[0] != 0
}

fn ring(img: &GrayImage, x: i32, y: i32) -> [bool; 8] {
    RING.map(|(dx, dy)| on(img, x + dx, y + dy))
}

/// Background-to-foreground transitions walking once around the ring.
fn transitions(p: &[bool; 8]) -> usize {
    (0..8).filter(|&i| !p[i] && p[(i + 1) % 8]).count()
}

/// Zhang–Suen deletion test for one pixel in sub-iteration `first` or second.
fn deletable(p: &[bool; 8], first: bool) -> bool {
    let b = p.iter().filter(|&&v| v).count();
    if !(2..=6).contains(&b) {
        return false;
    }
    if transitions(p) != 1 {
        return false;
    }
    let [p2, _, p4, _, p6, _, p8, _] = *p;
    if first {
        !(p2 && p4 && p6) && !(p4 && p6 && p8)
    } else {
        !(p2 && p4 && p8) && !(p2 && p6 && p8)
    }
}

/// Thin a binary image (nonzero = foreground) to a one-pixel-wide 255/0
/// skeleton. Pixels outside the image count as background.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img), fields(width = img.width(), height = img.height()))
)]
pub fn zhang_suen(img: &GrayImage) -> GrayImage {
    let mut out = GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] != 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    let (w, h) = (img.width() as i32, img.height() as i32);
    let mut marked: Vec<(u32, u32)> = Vec::new();

    loop {
        let mut removed = 0usize;
        for first in [true, false] {
            marked.clear();
            for y in 0..h {
                for x in 0..w {
                    if on(&out, x, y) && deletable(&ring(&out, x, y), first) {
                        marked.push((x as u32, y as u32));
                    }
                }
            }
            for &(x, y) in &marked {
                out.put_pixel(x, y, Luma([0]));
            }
            removed += marked.len();
        }
        if removed == 0 {
            break;
        }
    }
    out
}

/// Number of 8-connected foreground neighbors.
pub fn neighbor_count(img: &GrayImage, x: u32, y: u32) -> usize {
    ring(img, x as i32, y as i32).iter().filter(|&&v| v).count()
}

/// Number of separate branches meeting at `(x, y)`; 3 or more marks a
/// junction. Staircase corners of a single line count as 2.
pub fn crossing_number(img: &GrayImage, x: u32, y: u32) -> usize {
    transitions(&ring(img, x as i32, y as i32))
}

/// Skeleton pixels with exactly one neighbor, in raster order.
pub fn endpoints(skel: &GrayImage) -> Vec<(u32, u32)> {
    skel.enumerate_pixels()
        .filter(|(x, y, p)| p[0] != 0 && neighbor_count(skel, *x, *y) == 1)
        .map(|(x, y, _)| (x, y))
        .collect()
}

/// Remove branches that run from an endpoint into a junction within
/// `max_len` pixels. The junction pixel is kept. Returns the number
/// of branches removed.
pub fn prune_spurs(skel: &mut GrayImage, max_len: usize) -> usize {
    let mut pruned = 0;
    for start in endpoints(skel) {
        // an earlier removal may have changed this pixel
        if skel.get_pixel(start.0, start.1)[0] == 0 || neighbor_count(skel, start.0, start.1) != 1 {
            continue;
        }
        if let Some(path) = trace_spur(skel, start, max_len) {
            for (x, y) in path {
                skel.put_pixel(x, y, Luma([0]));
            }
            pruned += 1;
        }
    }
    pruned
}

/// Walk from `start` until a junction. Returns the walked pixels (junction
/// excluded) when it is reached within `max_len` steps.
fn trace_spur(skel: &GrayImage, start: (u32, u32), max_len: usize) -> Option<Vec<(u32, u32)>> {
    let mut path = vec![start];
    let mut cur = start;
    while path.len() <= max_len {
        let next = RING
            .iter()
            .map(|&(dx, dy)| (cur.0 as i32 + dx, cur.1 as i32 + dy))
            .filter(|&(x, y)| on(skel, x, y))
            .map(|(x, y)| (x as u32, y as u32))
            .find(|p| !path.contains(p))?;
        if crossing_number(skel, next.0, next.1) >= 3 {
            return Some(path);
        }
        path.push(next);
        cur = next;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::LandoltC;
    use proptest::prelude::*;

    fn from_rows(rows: &[&str]) -> GrayImage {
        let h = rows.len() as u32;
        let w = rows[0].len() as u32;
        GrayImage::from_fn(w, h, |x, y| {
            if rows[y as usize].as_bytes()[x as usize] == b'#' {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn thick_bar_thins_to_a_line() {
        let bar = from_rows(&[
            "..........",
            ".########.",
            ".########.",
            ".########.",
            "..........",
        ]);
        let skel = zhang_suen(&bar);
        let count = skel.pixels().filter(|p| p[0] != 0).count();
        assert!((4..=8).contains(&count), "skeleton size {count}");
        for (x, y, p) in skel.enumerate_pixels() {
            if p[0] != 0 {
                assert!(neighbor_count(&skel, x, y) <= 2, "branch at ({x}, {y})");
            }
        }
        assert_eq!(endpoints(&skel).len(), 2);
    }

    #[test]
    fn landolt_c_skeleton_is_an_open_arc() {
        let mask = LandoltC::standard(30.0, 30.0, 25.0, 0.0).render_mask(61, 61);
        let mut skel = zhang_suen(&mask);
        prune_spurs(&mut skel, 4);
        let ends = endpoints(&skel);
        assert_eq!(ends.len(), 2, "endpoints {ends:?}");
        // both ends sit next to the gap on the right
        for (x, _) in ends {
            assert!(x > 36, "endpoint x {x}");
        }
    }

    #[test]
    fn short_spur_is_pruned_long_branch_kept() {
        let mut img = from_rows(&[
            "..............",
            "#############.",
            "......#.......",
            "......#.......",
            "..............",
        ]);
        assert_eq!(endpoints(&img).len(), 3);
        assert_eq!(crossing_number(&img, 6, 1), 3);
        assert_eq!(prune_spurs(&mut img, 4), 1);
        assert_eq!(img.get_pixel(6, 3)[0], 0);
        assert_eq!(img.get_pixel(6, 2)[0], 0);
        assert_eq!(img.get_pixel(6, 1)[0], 255);
        assert_eq!(endpoints(&img), vec![(0, 1), (12, 1)]);
    }

    proptest! {
        #[test]
        fn thinning_is_idempotent(
            w in 1u32..14,
            h in 1u32..14,
            bits in proptest::collection::vec(any::<bool>(), 14 * 14),
        ) {
            let img = GrayImage::from_fn(w, h, |x, y| {
                if bits[(y * 14 + x) as usize] { Luma([255]) } else { Luma([0]) }
            });
            let once = zhang_suen(&img);
            let twice = zhang_suen(&once);
            prop_assert_eq!(once.as_raw(), twice.as_raw());
        }
    }
}
