use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle; covers columns `x..x + width` and rows
/// `y..y + height`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing every point; `None` for no points.
    pub fn bounding<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut it = points.into_iter();
        let (x0, y0) = it.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for (x, y) in it {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self::new(
            min_x,
            min_y,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        ))
    }

    /// Last column covered.
    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width as i32 - 1
    }

    /// Last row covered.
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32 - 1
    }

    /// Center in pixel-index coordinates.
    pub fn center(&self) -> Point2<f32> {
        Point2::new(
            self.x as f32 + (self.width as f32 - 1.0) * 0.5,
            self.y as f32 + (self.height as f32 - 1.0) * 0.5,
        )
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x <= self.right() && y <= self.bottom()
    }

    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(x, y, (right - x + 1) as u32, (bottom - y + 1) as u32)
    }

    /// Grow on every side by `margin` pixels.
    pub fn padded(&self, margin: u32) -> Self {
        Self::new(
            self.x - margin as i32,
            self.y - margin as i32,
            self.width + 2 * margin,
            self.height + 2 * margin,
        )
    }

    /// Euclidean distance between the closest pixels of two rectangles,
    /// zero when they touch or overlap.
    pub fn gap_to(&self, other: &Self) -> f32 {
        let dx = (other.x - self.right()).max(self.x - other.right()).max(1) - 1;
        let dy = (other.y - self.bottom()).max(self.y - other.bottom()).max(1) - 1;
        (dx as f32).hypot(dy as f32)
    }
}

/// Wrap degrees into `[0, 360)`.
pub fn normalize_degrees(deg: f32) -> f32 {
    let d = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Smallest absolute difference between two angles in degrees, in `[0, 180]`.
pub fn angular_distance_deg(a: f32, b: f32) -> f32 {
    let d = normalize_degrees(a - b);
    d.min(360.0 - d)
}

/// Gap angle of an image-space direction vector (x right, y down), measured
/// counter-clockwise from +x as seen on screen, in `[0, 360)`.
pub fn image_direction_to_degrees(dx: f32, dy: f32) -> f32 {
    normalize_degrees((-dy).atan2(dx).to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn bounding_covers_all_points() {
        let r = PixelRect::bounding([(3, 4), (7, 2), (5, 9)]).unwrap();
        assert_eq!(r, PixelRect::new(3, 2, 5, 8));
        assert_eq!(r.right(), 7);
        assert_eq!(r.bottom(), 9);
        assert!(PixelRect::bounding(std::iter::empty()).is_none());
    }

    #[test]
    fn gap_is_zero_for_touching_rects() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(10, 0, 5, 5);
        assert_eq!(a.gap_to(&b), 0.0);
        let c = PixelRect::new(13, 14, 2, 2);
        // 3 columns and 4 rows apart
        assert_abs_diff_eq!(a.gap_to(&c), 3.0_f32.hypot(4.0), epsilon = 1e-6);
        assert_abs_diff_eq!(c.gap_to(&a), a.gap_to(&c), epsilon = 1e-6);
    }

    #[test]
    fn center_and_union() {
        let a = PixelRect::new(10, 20, 5, 3);
        assert_eq!(a.center(), Point2::new(12.0, 21.0));
        let u = a.union(&PixelRect::new(0, 0, 2, 2));
        assert_eq!(u, PixelRect::new(0, 0, 15, 23));
    }

    #[test]
    fn angles_wrap_and_compare() {
        assert_abs_diff_eq!(normalize_degrees(-90.0), 270.0);
        assert_abs_diff_eq!(normalize_degrees(720.5), 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(angular_distance_deg(359.0, 1.0), 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(image_direction_to_degrees(0.0, -1.0), 90.0, epsilon = 1e-4);
        assert_abs_diff_eq!(image_direction_to_degrees(-1.0, 0.0), 180.0, epsilon = 1e-4);
    }
}
