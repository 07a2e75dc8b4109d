//! Landolt-C marker detector built on top of `landoltc-core`.
//!
//! ## Quickstart
//!
//! ```
//! use landoltc_core::Frame;
//! use landoltc_detector::{LandoltC, LandoltCDetector, LandoltCParams, ReferenceModel};
//! use std::time::Duration;
//!
//! let img = LandoltC::standard(80.0, 60.0, 20.0, 90.0).render(160, 120);
//! let frame = Frame::new(160, 120, 1, img.into_raw(), Duration::from_millis(0));
//!
//! let mut detector = LandoltCDetector::new(LandoltCParams::default(), ReferenceModel::standard());
//! let result = detector.detect(&frame);
//! println!("detected: {}", result.detections.len());
//! ```
//!
//! Pipeline, one frame at a time:
//! 1. Sobel gradients vote for ring centers along the gradient direction.
//! 2. Around every candidate, dark regions are traced and matched against the
//!    reference contours by Hu moment similarity.
//! 3. Accepted contours are painted into a tag mask; each tag is cut into its
//!    own binary sub-image.
//! 4. Each sub-image gets a gap orientation from the moment tensor (method A)
//!    or from skeleton endpoints (method B).
//! 5. Nearby raw detections (the arcs on both sides of a gap) are fused.

mod contour;
mod detector;
mod error;
mod fusion;
mod moments;
mod node;
mod params;
mod reference;
mod rotation;
mod separate;
mod synthetic;
mod thinning;
mod threshold;
mod voting;

pub use contour::{extract_contours, MarkerContour};
pub use detector::{FrameContext, LandoltCDetectionResult, LandoltCDetector};
pub use error::ReferenceError;
pub use fusion::{fuse_detections, group_detections};
pub use moments::{hu_distance, hu_similarity, CentralMoments, Moments};
pub use node::{
    run_pipeline, AlwaysOn, DetectionSink, FrameSource, ModeGate, RunStats, VisionProcessor,
};
pub use params::{
    ContourParams, FusionParams, LandoltCParams, RotationMethod, RotationParams, SeparationParams,
    VotingParams,
};
pub use reference::{ReferenceContour, ReferenceModel};
pub use rotation::{
    estimate_moments, estimate_rotation, estimate_skeleton, perspective_correct, RotationEstimate,
};
pub use separate::{isolate_regions, paint_tag_mask, IsolatedRegion, TagMask};
pub use synthetic::LandoltC;
pub use thinning::{crossing_number, endpoints, neighbor_count, prune_spurs, zhang_suen};
pub use voting::{
    cast_votes, find_candidates, vote_centers, CandidateCenter, GradientField, VoteAccumulator,
};
