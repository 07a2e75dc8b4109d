//! Synthetic Landolt-C rendering for reference templates, tests and benches.

use image::{GrayImage, Luma};
use nalgebra::Point2;

/// Dark Landolt C on a white background.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandoltC {
    pub center: Point2<f32>,
    pub outer_radius: f32,
    pub inner_radius: f32,
    /// Width of the gap opening (pixels).
    pub gap_width: f32,
    /// Gap direction, counter-clockwise from image +x.
    pub gap_angle_deg: f32,
}

impl LandoltC {
    /// Standard proportions: stroke and gap both `0.4 * outer_radius`.
    pub fn standard(cx: f32, cy: f32, outer_radius: f32, gap_angle_deg: f32) -> Self {
        Self {
            center: Point2::new(cx, cy),
            outer_radius,
            inner_radius: 0.6 * outer_radius,
            gap_width: 0.4 * outer_radius,
            gap_angle_deg,
        }
    }

    /// True when pixel `(x, y)` is part of the dark ring.
    pub fn covers(&self, x: f32, y: f32) -> bool {
        let dx = x - self.center.x;
        // flip y so the gap angle is counter-clockwise on screen
        let dy_up = self.center.y - y;
        let r = dx.hypot(dy_up);
        if r < self.inner_radius || r > self.outer_radius {
            return false;
        }
        let (s, c) = self.gap_angle_deg.to_radians().sin_cos();
        let along = dx * c + dy_up * s;
        let perp = -dx * s + dy_up * c;
        !(along > 0.0 && perp.abs() < 0.5 * self.gap_width)
    }

    /// Paint the ring with `ink` into an existing image.
    pub fn draw_into(&self, img: &mut GrayImage, ink: u8) {
        let pad = self.outer_radius.ceil() as i64 + 1;
        let (cx, cy) = (self.center.x.round() as i64, self.center.y.round() as i64);
        let x0 = (cx - pad).max(0);
        let y0 = (cy - pad).max(0);
        let x1 = (cx + pad).min(img.width() as i64 - 1);
        let y1 = (cy + pad).min(img.height() as i64 - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                if self.covers(x as f32, y as f32) {
                    img.put_pixel(x as u32, y as u32, Luma([ink]));
                }
            }
        }
    }

    /// Render onto a white `width x height` canvas.
    pub fn render(&self, width: u32, height: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([255]));
        self.draw_into(&mut img, 0);
        img
    }

    /// Binary mask of the ring: 255 on the ring, 0 elsewhere.
    pub fn render_mask(&self, width: u32, height: u32) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        self.draw_into(&mut img, 255);
        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_points_along_requested_angle() {
        let c = LandoltC::standard(50.0, 50.0, 20.0, 90.0);
        // ring midline above the center is the gap, below it is ink
        assert!(!c.covers(50.0, 34.0));
        assert!(c.covers(50.0, 66.0));
        assert!(c.covers(34.0, 50.0));
        assert!(c.covers(66.0, 50.0));
        // hole and outside
        assert!(!c.covers(50.0, 50.0));
        assert!(!c.covers(50.0, 75.0));
    }

    #[test]
    fn render_is_dark_on_white() {
        let img = LandoltC::standard(20.0, 20.0, 10.0, 0.0).render(40, 40);
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        assert_eq!(img.get_pixel(12, 20)[0], 0);
        // gap on the right
        assert_eq!(img.get_pixel(28, 20)[0], 255);
    }
}
