use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Gradient center voting settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingParams {
    /// Minimum Sobel gradient magnitude for a pixel to vote.
    #[serde(alias = "minDiff")]
    pub min_diff: f32,
    /// A center needs strictly more votes than this.
    #[serde(alias = "voteThreshold")]
    pub vote_threshold: u32,
    /// Closest vote distance from the voting pixel (pixels).
    pub radius_min: f32,
    /// Farthest vote distance from the voting pixel (pixels).
    pub radius_max: f32,
    /// Half-size of the non-maximum suppression window.
    pub nms_radius: u32,
}

impl Default for VotingParams {
    fn default() -> Self {
        Self {
            min_diff: 100.0,
            vote_threshold: 30,
            radius_min: 4.0,
            radius_max: 40.0,
            nms_radius: 5,
        }
    }
}

/// Contour extraction and shape matching settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourParams {
    /// Half-size of the square window searched around each candidate.
    pub search_radius: u32,
    /// Minimum Hu-moment similarity against the reference, in `(0, 1]`.
    #[serde(alias = "similarityThreshold")]
    pub similarity_threshold: f32,
    pub min_contour_points: usize,
    /// Regions smaller than this (pixels) are skipped as degenerate.
    pub min_contour_area: f32,
    /// Windows whose max - min intensity is below this are skipped.
    pub min_contrast: u8,
}

impl Default for ContourParams {
    fn default() -> Self {
        Self {
            search_radius: 48,
            similarity_threshold: 0.4,
            min_contour_points: 12,
            min_contour_area: 30.0,
            min_contrast: 40,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationParams {
    /// Margin added around each region's bounding box when cropping.
    pub padding: u32,
}

impl Default for SeparationParams {
    fn default() -> Self {
        Self { padding: 4 }
    }
}

/// Rotation estimation strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMethod {
    /// Principal axis of the region moments (method A).
    Moments,
    /// Skeleton endpoints around the gap (method B).
    Skeleton,
    /// Skeleton for large regions, moments for small ones.
    #[default]
    Auto,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationParams {
    #[serde(alias = "rotationMethod")]
    pub method: RotationMethod,
    /// `Auto` uses the skeleton when the larger bbox side reaches this size.
    pub auto_min_size_px: u32,
    /// Warp each region onto a square before computing moments.
    pub perspective_correction: bool,
    /// Skeleton branches shorter than this (pixels) are pruned as spurs.
    pub spur_length: usize,
}

impl Default for RotationParams {
    fn default() -> Self {
        Self {
            method: RotationMethod::Auto,
            auto_min_size_px: 32,
            perspective_correction: false,
            spur_length: 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionParams {
    /// Detections closer than this (pixels) are merged.
    #[serde(alias = "fusionProximity")]
    pub proximity: f32,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self { proximity: 5.0 }
    }
}

/// Full detector configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandoltCParams {
    /// Reference template image; required by [`crate::VisionProcessor::initialize`].
    #[serde(alias = "referenceImagePath")]
    pub reference_image_path: Option<PathBuf>,
    pub voting: VotingParams,
    pub contour: ContourParams,
    pub separation: SeparationParams,
    pub rotation: RotationParams,
    pub fusion: FusionParams,
}

impl LandoltCParams {
    pub fn with_reference_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference_image_path = Some(path.into());
        self
    }

    pub fn with_rotation_method(mut self, method: RotationMethod) -> Self {
        self.rotation.method = method;
        self
    }
}
