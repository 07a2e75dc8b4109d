use std::time::Duration;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::PixelRect;

/// Strategy that produced a detection's rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationSource {
    /// Principal axis of the region's image moments.
    Moments,
    /// Endpoints of the region's skeleton.
    Skeleton,
}

/// A detected Landolt C (or a group of fused ones).
///
/// Raw per-region detections and consolidated per-marker detections share
/// this record; `members` tells how many raw detections were merged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Marker center in frame pixel coordinates.
    pub center: Point2<f32>,
    pub bbox: Option<PixelRect>,
    /// Gap direction in degrees, `[0, 360)`, counter-clockwise from image +x.
    pub rotation_deg: Option<f32>,
    pub rotation_source: Option<RotationSource>,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Region area in pixels.
    pub area: f32,
    /// Number of skeleton endpoints found around the gap.
    pub edges: usize,
    /// Number of raw detections represented by this record.
    pub members: usize,
    /// Rotations of every member, largest member first.
    pub angles: Vec<f32>,
}

impl Detection {
    /// A single-region detection.
    pub fn raw(center: Point2<f32>, bbox: Option<PixelRect>, confidence: f32, area: f32) -> Self {
        Self {
            center,
            bbox,
            rotation_deg: None,
            rotation_source: None,
            confidence,
            area,
            edges: 0,
            members: 1,
            angles: Vec::new(),
        }
    }

    /// Attach a rotation estimate; also records it as the only member angle.
    pub fn with_rotation(mut self, deg: f32, source: RotationSource) -> Self {
        self.rotation_deg = Some(deg);
        self.rotation_source = Some(source);
        self.angles = vec![deg];
        self
    }

    pub fn with_edges(mut self, edges: usize) -> Self {
        self.edges = edges;
        self
    }
}

/// Detections of one frame, stamped with the frame's timestamp.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub timestamp: Duration,
    pub detections: Vec<Detection>,
}

impl DetectionFrame {
    pub fn empty(timestamp: Duration) -> Self {
        Self {
            timestamp,
            detections: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}
