use std::time::Duration;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use landoltc_core::{Detection, DetectionFrame, Frame};

use crate::contour::{extract_contours, MarkerContour};
use crate::error::ReferenceError;
use crate::fusion::fuse_detections;
use crate::params::LandoltCParams;
use crate::reference::ReferenceModel;
use crate::rotation::estimate_rotation;
use crate::separate::{isolate_regions, paint_tag_mask, IsolatedRegion, TagMask};
use crate::voting::{vote_centers, CandidateCenter, GradientField, VoteAccumulator};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Buffers owned by one detection run. Cleared at the start of every frame.
#[derive(Debug, Default)]
pub struct FrameContext {
    pub gradients: GradientField,
    pub accumulator: VoteAccumulator,
    pub candidates: Vec<CandidateCenter>,
    pub contours: Vec<MarkerContour>,
    pub tag_mask: TagMask,
    pub regions: Vec<IsolatedRegion>,
    pub raw: Vec<Detection>,
    pub detections: Vec<Detection>,
}

impl FrameContext {
    pub fn reset(&mut self) {
        self.gradients.clear();
        self.accumulator.reset(0, 0);
        self.candidates.clear();
        self.contours.clear();
        self.tag_mask = TagMask::default();
        self.regions.clear();
        self.raw.clear();
        self.detections.clear();
    }

    /// True when no buffer carries data from a previous frame.
    pub fn is_clear(&self) -> bool {
        self.gradients.gx.is_empty()
            && self.accumulator.votes().is_empty()
            && self.candidates.is_empty()
            && self.contours.is_empty()
            && self.tag_mask.is_empty()
            && self.regions.is_empty()
            && self.raw.is_empty()
            && self.detections.is_empty()
    }
}

/// Output of one detection run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LandoltCDetectionResult {
    pub timestamp: Duration,
    /// Consolidated detections, one per marker.
    pub detections: Vec<Detection>,
    /// Voting peaks, for inspection.
    pub candidates: Vec<CandidateCenter>,
    /// Per-region detections before fusion.
    pub raw: Vec<Detection>,
}

impl LandoltCDetectionResult {
    pub fn empty(timestamp: Duration) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    pub fn to_frame(&self) -> DetectionFrame {
        DetectionFrame {
            timestamp: self.timestamp,
            detections: self.detections.clone(),
        }
    }
}

/// Landolt-C detector: reference model plus per-frame pipeline state.
pub struct LandoltCDetector {
    params: LandoltCParams,
    reference: ReferenceModel,
    context: FrameContext,
}

impl LandoltCDetector {
    pub fn new(params: LandoltCParams, reference: ReferenceModel) -> Self {
        Self {
            params,
            reference,
            context: FrameContext::default(),
        }
    }

    /// Build the reference model from `params.reference_image_path`.
    pub fn from_params(params: LandoltCParams) -> Result<Self, ReferenceError> {
        let path = params
            .reference_image_path
            .as_ref()
            .ok_or(ReferenceError::MissingPath)?;
        let reference = ReferenceModel::from_path(path)?;
        Ok(Self::new(params, reference))
    }

    pub fn params(&self) -> &LandoltCParams {
        &self.params
    }

    pub fn reference(&self) -> &ReferenceModel {
        &self.reference
    }

    /// State left by the last run.
    pub fn context(&self) -> &FrameContext {
        &self.context
    }

    /// Run the full pipeline on one frame.
    ///
    /// Invalid frames produce an empty result and a warning.
    pub fn detect(&mut self, frame: &Frame) -> LandoltCDetectionResult {
        self.context.reset();
        let gray = frame.to_gray().map(|g| {
            GrayImage::from_raw(g.width as u32, g.height as u32, g.data)
        });
        match gray {
            Ok(Some(gray)) => self.detect_gray(&gray, frame.timestamp),
            Ok(None) => {
                log::warn!("frame at {:?}: gray buffer size mismatch", frame.timestamp);
                LandoltCDetectionResult::empty(frame.timestamp)
            }
            Err(err) => {
                log::warn!("frame at {:?} rejected: {}", frame.timestamp, err);
                LandoltCDetectionResult::empty(frame.timestamp)
            }
        }
    }

    /// Run the full pipeline on an already converted gray image.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, gray), fields(width = gray.width(), height = gray.height()))
    )]
    pub fn detect_gray(&mut self, gray: &GrayImage, timestamp: Duration) -> LandoltCDetectionResult {
        let ctx = &mut self.context;
        ctx.reset();
        if gray.width() == 0 || gray.height() == 0 {
            log::warn!("empty image at {:?}", timestamp);
            return LandoltCDetectionResult::empty(timestamp);
        }

        ctx.candidates = vote_centers(
            gray,
            &self.params.voting,
            &mut ctx.gradients,
            &mut ctx.accumulator,
        );
        ctx.contours = extract_contours(gray, &ctx.candidates, &self.reference, &self.params.contour);
        paint_tag_mask(&mut ctx.tag_mask, gray.width(), gray.height(), &ctx.contours);
        ctx.regions = isolate_regions(&ctx.tag_mask, &ctx.contours, self.params.separation.padding);

        ctx.raw = ctx
            .regions
            .iter()
            .map(|region| {
                let det = Detection::raw(
                    region.bbox.center(),
                    Some(region.bbox),
                    region.similarity,
                    region.area as f32,
                );
                match estimate_rotation(&region.image, &self.params.rotation) {
                    Some(est) => det
                        .with_rotation(est.angle_deg, est.source)
                        .with_edges(est.edges),
                    None => {
                        log::debug!("tag {}: no rotation estimate", region.tag);
                        det
                    }
                }
            })
            .collect();
        ctx.detections = fuse_detections(&ctx.raw, &self.params.fusion);

        log::info!(
            "frame {:?}: {} candidates, {} contours, {} raw, {} detections",
            timestamp,
            ctx.candidates.len(),
            ctx.contours.len(),
            ctx.raw.len(),
            ctx.detections.len()
        );

        LandoltCDetectionResult {
            timestamp,
            detections: ctx.detections.clone(),
            candidates: ctx.candidates.clone(),
            raw: ctx.raw.clone(),
        }
    }
}
