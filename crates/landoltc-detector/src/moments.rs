//! Pixel moments, Hu invariants and the shape distance built on them.

use image::GrayImage;
use nalgebra::Point2;

/// Hu values below this magnitude are treated as equal.
const HU_EPS: f64 = 1e-4;

/// Raw spatial moments up to third order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m20: f64,
    pub m11: f64,
    pub m02: f64,
    pub m30: f64,
    pub m21: f64,
    pub m12: f64,
    pub m03: f64,
}

/// Central moments (about the centroid).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CentralMoments {
    pub mu20: f64,
    pub mu11: f64,
    pub mu02: f64,
    pub mu30: f64,
    pub mu21: f64,
    pub mu12: f64,
    pub mu03: f64,
}

impl Moments {
    pub fn from_pixels<I>(pixels: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut m = Self::default();
        for (x, y) in pixels {
            let (xx, yy) = (x * x, y * y);
            m.m00 += 1.0;
            m.m10 += x;
            m.m01 += y;
            m.m20 += xx;
            m.m11 += x * y;
            m.m02 += yy;
            m.m30 += xx * x;
            m.m21 += xx * y;
            m.m12 += x * yy;
            m.m03 += yy * y;
        }
        m
    }

    /// Moments of the nonzero pixels of `mask`.
    pub fn from_mask(mask: &GrayImage) -> Self {
        Self::from_pixels(
            mask.enumerate_pixels()
                .filter(|(_, _, p)| p[0] != 0)
                .map(|(x, y, _)| (x as f64, y as f64)),
        )
    }

    pub fn centroid(&self) -> Option<Point2<f64>> {
        (self.m00 > 0.0).then(|| Point2::new(self.m10 / self.m00, self.m01 / self.m00))
    }

    pub fn central(&self) -> CentralMoments {
        let Some(c) = self.centroid() else {
            return CentralMoments::default();
        };
        let (xb, yb) = (c.x, c.y);
        CentralMoments {
            mu20: self.m20 - xb * self.m10,
            mu11: self.m11 - xb * self.m01,
            mu02: self.m02 - yb * self.m01,
            mu30: self.m30 - 3.0 * xb * self.m20 + 2.0 * xb * xb * self.m10,
            mu21: self.m21 - 2.0 * xb * self.m11 - yb * self.m20 + 2.0 * xb * xb * self.m01,
            mu12: self.m12 - 2.0 * yb * self.m11 - xb * self.m02 + 2.0 * yb * yb * self.m10,
            mu03: self.m03 - 3.0 * yb * self.m02 + 2.0 * yb * yb * self.m01,
        }
    }

    /// The seven Hu invariants; all zero for an empty region.
    pub fn hu(&self) -> [f64; 7] {
        if self.m00 <= 0.0 {
            return [0.0; 7];
        }
        let mu = self.central();
        let s2 = self.m00 * self.m00;
        let s3 = s2 * self.m00.sqrt();
        let (n20, n11, n02) = (mu.mu20 / s2, mu.mu11 / s2, mu.mu02 / s2);
        let (n30, n21, n12, n03) = (mu.mu30 / s3, mu.mu21 / s3, mu.mu12 / s3, mu.mu03 / s3);

        let t0 = n30 + n12;
        let t1 = n21 + n03;
        let q0 = n30 - 3.0 * n12;
        let q1 = 3.0 * n21 - n03;

        [
            n20 + n02,
            (n20 - n02).powi(2) + 4.0 * n11 * n11,
            q0 * q0 + q1 * q1,
            t0 * t0 + t1 * t1,
            q0 * t0 * (t0 * t0 - 3.0 * t1 * t1) + q1 * t1 * (3.0 * t0 * t0 - t1 * t1),
            (n20 - n02) * (t0 * t0 - t1 * t1) + 4.0 * n11 * t0 * t1,
            q1 * t0 * (t0 * t0 - 3.0 * t1 * t1) - q0 * t1 * (3.0 * t0 * t0 - t1 * t1),
        ]
    }
}

fn log_magnitude(h: f64) -> f64 {
    h.abs().max(HU_EPS).log10()
}

/// Sum of absolute differences of log-scaled Hu invariants; 0 for identical
/// shapes. Scale, rotation and mirror invariant.
pub fn hu_distance(a: &[f64; 7], b: &[f64; 7]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (log_magnitude(x) - log_magnitude(y)).abs())
        .sum()
}

/// `exp(-hu_distance)`, in `(0, 1]`.
pub fn hu_similarity(a: &[f64; 7], b: &[f64; 7]) -> f32 {
    (-hu_distance(a, b)).exp() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::LandoltC;
    use approx::assert_relative_eq;

    fn disk(r: f64) -> Moments {
        let n = r.ceil() as i32;
        let mut pts = Vec::new();
        for y in -n..=n {
            for x in -n..=n {
                if ((x * x + y * y) as f64) <= r * r {
                    pts.push((x as f64 + 100.0, y as f64 + 50.0));
                }
            }
        }
        Moments::from_pixels(pts)
    }

    #[test]
    fn central_moments_of_rectangle() {
        // 4 x 2 block: mu20 = 2 * (sum of (x - 1.5)^2 over 0..4) = 10
        let pts = (0..4).flat_map(|x| (0..2).map(move |y| (x as f64, y as f64)));
        let m = Moments::from_pixels(pts);
        let mu = m.central();
        assert_relative_eq!(mu.mu20, 10.0, epsilon = 1e-9);
        assert_relative_eq!(mu.mu02, 2.0, epsilon = 1e-9);
        assert_relative_eq!(mu.mu11, 0.0, epsilon = 1e-9);
        assert_relative_eq!(mu.mu30, 0.0, epsilon = 1e-9);
        assert_eq!(m.centroid(), Some(Point2::new(1.5, 0.5)));
    }

    #[test]
    fn disk_has_textbook_first_invariant() {
        let hu = disk(30.0).hu();
        assert_relative_eq!(hu[0], 1.0 / (2.0 * std::f64::consts::PI), epsilon = 2e-3);
        assert!(hu[1] < 1e-6);
    }

    #[test]
    fn similarity_is_scale_and_rotation_tolerant() {
        let reference = Moments::from_mask(&LandoltC::standard(50.0, 50.0, 40.0, 0.0).render_mask(100, 100)).hu();
        let small = Moments::from_mask(&LandoltC::standard(40.0, 40.0, 20.0, 135.0).render_mask(80, 80)).hu();
        assert_eq!(hu_similarity(&reference, &reference), 1.0);
        assert!(hu_similarity(&reference, &small) > 0.5);
    }

    #[test]
    fn closed_ring_is_not_a_landolt_c() {
        let c = Moments::from_mask(&LandoltC::standard(50.0, 50.0, 40.0, 0.0).render_mask(100, 100)).hu();
        let mut ring = LandoltC::standard(50.0, 50.0, 40.0, 0.0);
        ring.gap_width = 0.0;
        let ring = Moments::from_mask(&ring.render_mask(100, 100)).hu();
        assert!(hu_similarity(&c, &ring) < 0.5);
    }
}
