//! Planar homographies and perspective resampling of gray images.
//!
//! Used to undo foreshortening of a marker's bounding box before
//! moment-based orientation estimation.

use crate::{sample_bilinear_u8, GrayImage, GrayImageView, PixelRect};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Translate to the centroid and scale so the mean distance is sqrt(2).
fn hartley_normalize(pts: &[Point2<f32>; 4]) -> ([Point2<f64>; 4], Matrix3<f64>) {
    let (cx, cy) = pts.iter().fold((0.0_f64, 0.0_f64), |(sx, sy), p| {
        (sx + p.x as f64 / 4.0, sy + p.y as f64 / 4.0)
    });
    let mean_dist = pts
        .iter()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum::<f64>()
        / 4.0;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);

    let out = (*pts).map(|p| {
        let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
        Point2::new(v[0], v[1])
    });
    (out, t)
}

/// Compute H such that `dst ~ H * src` from four correspondences.
///
/// Corner order must be consistent between `src` and `dst`.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let (src_n, t_src) = hartley_normalize(src);
    let (dst_n, t_dst) = hartley_normalize(dst);

    // unknowns h11..h32 with h33 = 1
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (k, (s, d)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let (x, y, u, v) = (s.x, s.y, d.x, d.y);
        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = r0 + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::new(x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7], 1.0);

    let h = t_dst.try_inverse()? * hn * t_src;
    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 {
        return None;
    }
    Some(Homography::new(h / scale))
}

/// Homography mapping a `side x side` square (output pixels) onto `rect` in
/// the source image, corners matched TL, TR, BR, BL.
pub fn square_to_rect_homography(rect: &PixelRect, side: usize) -> Option<Homography> {
    let s = side as f32;
    let square = [
        Point2::new(0.0, 0.0),
        Point2::new(s, 0.0),
        Point2::new(s, s),
        Point2::new(0.0, s),
    ];
    let (x0, y0) = (rect.x as f32, rect.y as f32);
    let (x1, y1) = (x0 + rect.width as f32, y0 + rect.height as f32);
    let quad = [
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ];
    homography_from_4pt(&square, &quad)
}

/// For each output pixel, map its center through `h_src_from_dst` and sample
/// the source bilinearly.
pub fn warp_gray(
    src: &GrayImageView<'_>,
    h_src_from_dst: &Homography,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = GrayImage::new(out_w, out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            let p = h_src_from_dst.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            // pixel centers sit at integer coordinates in the source
            out.data[y * out_w + x] = sample_bilinear_u8(src, p.x - 0.5, p.y - 0.5);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected ({:.4},{:.4}) ~ ({:.4},{:.4}) within {tol}",
            a.x,
            a.y,
            b.x,
            b.y,
        );
    }

    #[test]
    fn four_points_recover_projective_map() {
        let truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ));
        let src = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(180.0, 0.0),
            Point2::new(180.0, 130.0),
            Point2::new(0.0, 130.0),
        ];
        let dst = src.map(|p| truth.apply(p));
        let h = homography_from_4pt(&src, &dst).expect("solvable");
        for p in [Point2::new(10.0_f32, 5.0), Point2::new(90.0, 70.0)] {
            assert_close(h.apply(p), truth.apply(p), 1e-2);
        }
        let inv = h.inverse().expect("invertible");
        assert_close(inv.apply(h.apply(src[2])), src[2], 1e-2);
    }

    #[test]
    fn degenerate_quad_has_no_homography() {
        let src = [Point2::new(0.0_f32, 0.0); 4];
        let dst = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        assert!(homography_from_4pt(&src, &dst).is_none());
    }

    #[test]
    fn warp_stretches_rect_onto_square() {
        // 4 x 2 image, left half dark, right half bright
        let src = GrayImage::from_raw(4, 2, vec![0, 0, 255, 255, 0, 0, 255, 255]).unwrap();
        let rect = PixelRect::new(0, 0, 4, 2);
        let h = square_to_rect_homography(&rect, 4).expect("homography");
        let out = warp_gray(&src.view(), &h, 4, 4);
        // outer rows blend with the black outside the source
        for y in 1..3 {
            assert_eq!(out.data[y * 4], 0);
            assert_eq!(out.data[y * 4 + 3], 255);
        }
    }
}
