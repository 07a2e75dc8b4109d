//! Region separation: paint contours into a tag mask and cut one binary
//! sub-image per tag.

use image::{GrayImage, ImageBuffer, Luma};

use landoltc_core::PixelRect;

use crate::contour::MarkerContour;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Per-pixel color tags; 0 means no contour.
pub type TagMask = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Binary crop of one tagged region.
#[derive(Clone, Debug)]
pub struct IsolatedRegion {
    pub tag: u16,
    /// Tight bounding box of the tag's pixels, frame coordinates.
    pub bbox: PixelRect,
    /// Frame position of `image`'s top-left pixel (may be negative).
    pub origin: (i32, i32),
    /// 255 where the mask carries `tag`, 0 elsewhere.
    pub image: GrayImage,
    pub area: u32,
    pub similarity: f32,
}

/// Clear `mask` to `width x height` and paint every contour's fill with its
/// tag. Later contours overwrite earlier ones.
pub fn paint_tag_mask(mask: &mut TagMask, width: u32, height: u32, contours: &[MarkerContour]) {
    if mask.dimensions() == (width, height) {
        mask.fill(0);
    } else {
        *mask = TagMask::new(width, height);
    }
    for c in contours {
        for (lx, ly, p) in c.fill.enumerate_pixels() {
            if p[0] == 0 {
                continue;
            }
            let x = c.bbox.x + lx as i32;
            let y = c.bbox.y + ly as i32;
            if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                mask.put_pixel(x as u32, y as u32, Luma([c.tag]));
            }
        }
    }
}

/// Cut one padded binary sub-image per contour tag.
///
/// Tags whose pixels were entirely overwritten by later contours produce no
/// region.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(mask, contours), fields(contours = contours.len()))
)]
pub fn isolate_regions(mask: &TagMask, contours: &[MarkerContour], padding: u32) -> Vec<IsolatedRegion> {
    let mut out = Vec::with_capacity(contours.len());
    for c in contours {
        let (x0, x1) = (c.bbox.x, c.bbox.right());
        let owned: Vec<(i32, i32)> = (c.bbox.y..=c.bbox.bottom())
            .flat_map(|y| (x0..=x1).map(move |x| (x, y)))
            .filter(|&(x, y)| tag_at(mask, x, y) == c.tag)
            .collect();
        let Some(bbox) = PixelRect::bounding(owned.iter().copied()) else {
            log::debug!("tag {} fully overwritten, no region", c.tag);
            continue;
        };

        let crop = bbox.padded(padding);
        let image = GrayImage::from_fn(crop.width, crop.height, |lx, ly| {
            if tag_at(mask, crop.x + lx as i32, crop.y + ly as i32) == c.tag {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        out.push(IsolatedRegion {
            tag: c.tag,
            bbox,
            origin: (crop.x, crop.y),
            image,
            area: owned.len() as u32,
            similarity: c.similarity,
        });
    }
    out
}

fn tag_at(mask: &TagMask, x: i32, y: i32) -> u16 {
    if x < 0 || y < 0 || x as u32 >= mask.width() || y as u32 >= mask.height() {
        return 0;
    }
    mask.get_pixel(x as u32, y as u32)[0]
}
