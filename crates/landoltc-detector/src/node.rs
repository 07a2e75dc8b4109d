//! Processor capability and the collaborators around it.
//!
//! A processing node pulls frames from a [`FrameSource`], asks a [`ModeGate`]
//! whether detection is currently enabled, runs a [`VisionProcessor`] and
//! hands each result to a [`DetectionSink`]. [`run_pipeline`] is that loop.

use serde::{Deserialize, Serialize};

use landoltc_core::{DetectionFrame, Frame};

use crate::detector::LandoltCDetector;
use crate::error::ReferenceError;
use crate::params::LandoltCParams;

/// A frame-in, detections-out processor.
pub trait VisionProcessor: Sized {
    type Params;
    type Error: std::error::Error;

    /// Build the processor. Failure here is fatal for the node.
    fn initialize(params: Self::Params) -> Result<Self, Self::Error>;

    /// Process one frame. Never fails; bad frames yield empty results.
    fn process(&mut self, frame: &Frame) -> DetectionFrame;
}

impl VisionProcessor for LandoltCDetector {
    type Params = LandoltCParams;
    type Error = ReferenceError;

    fn initialize(params: LandoltCParams) -> Result<Self, ReferenceError> {
        LandoltCDetector::from_params(params)
    }

    fn process(&mut self, frame: &Frame) -> DetectionFrame {
        self.detect(frame).to_frame()
    }
}

/// Ordered stream of input frames.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Frame>;
}

impl<I: Iterator<Item = Frame>> FrameSource for I {
    fn next_frame(&mut self) -> Option<Frame> {
        self.next()
    }
}

/// Lifecycle switch; frames arriving while disabled are dropped unprocessed.
pub trait ModeGate {
    fn is_enabled(&mut self) -> bool;
}

/// Gate that is always on.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysOn;

impl ModeGate for AlwaysOn {
    fn is_enabled(&mut self) -> bool {
        true
    }
}

impl<F: FnMut() -> bool> ModeGate for F {
    fn is_enabled(&mut self) -> bool {
        self()
    }
}

/// Consumer of per-frame results.
pub trait DetectionSink {
    type Error: std::fmt::Display;

    fn publish(&mut self, frame: &DetectionFrame) -> Result<(), Self::Error>;
}

impl DetectionSink for Vec<DetectionFrame> {
    type Error = std::convert::Infallible;

    fn publish(&mut self, frame: &DetectionFrame) -> Result<(), Self::Error> {
        self.push(frame.clone());
        Ok(())
    }
}

/// Counters reported by [`run_pipeline`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub received: usize,
    pub processed: usize,
    pub skipped: usize,
    pub published: usize,
    pub publish_failures: usize,
}

/// Drain `source` in order. Every frame seen while `gate` is enabled is
/// processed and published; publish errors are logged and counted.
pub fn run_pipeline<P, S, G, K>(processor: &mut P, source: &mut S, gate: &mut G, sink: &mut K) -> RunStats
where
    P: VisionProcessor,
    S: FrameSource + ?Sized,
    G: ModeGate + ?Sized,
    K: DetectionSink + ?Sized,
{
    let mut stats = RunStats::default();
    while let Some(frame) = source.next_frame() {
        stats.received += 1;
        if !gate.is_enabled() {
            log::trace!("gate disabled, skipping frame at {:?}", frame.timestamp);
            stats.skipped += 1;
            continue;
        }
        let out = processor.process(&frame);
        stats.processed += 1;
        match sink.publish(&out) {
            Ok(()) => stats.published += 1,
            Err(err) => {
                log::warn!("failed to publish detections for {:?}: {}", out.timestamp, err);
                stats.publish_failures += 1;
            }
        }
    }
    log::info!(
        "pipeline done: {} received, {} processed, {} skipped, {} published",
        stats.received,
        stats.processed,
        stats.skipped,
        stats.published
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Counts frames and reports one detection-free frame per input.
    struct Counter {
        seen: Vec<Duration>,
    }

    impl VisionProcessor for Counter {
        type Params = ();
        type Error = std::convert::Infallible;

        fn initialize(_: ()) -> Result<Self, Self::Error> {
            Ok(Self { seen: Vec::new() })
        }

        fn process(&mut self, frame: &Frame) -> DetectionFrame {
            self.seen.push(frame.timestamp);
            DetectionFrame::empty(frame.timestamp)
        }
    }

    struct FailEvery2nd(usize);

    impl DetectionSink for FailEvery2nd {
        type Error = String;

        fn publish(&mut self, _: &DetectionFrame) -> Result<(), String> {
            self.0 += 1;
            if self.0 % 2 == 0 {
                Err("link down".to_string())
            } else {
                Ok(())
            }
        }
    }

    fn frames(n: u64) -> impl Iterator<Item = Frame> {
        (0..n).map(|i| Frame::new(2, 2, 1, vec![0; 4], Duration::from_millis(i)))
    }

    #[test]
    fn frames_are_processed_in_order() {
        let mut p = Counter::initialize(()).unwrap();
        let mut out: Vec<DetectionFrame> = Vec::new();
        let stats = run_pipeline(&mut p, &mut frames(4), &mut AlwaysOn, &mut out);
        assert_eq!(stats.processed, 4);
        assert_eq!(stats.published, 4);
        let ts: Vec<u64> = out.iter().map(|f| f.timestamp.as_millis() as u64).collect();
        assert_eq!(ts, vec![0, 1, 2, 3]);
    }

    #[test]
    fn disabled_gate_skips_frames() {
        let mut p = Counter::initialize(()).unwrap();
        let mut out: Vec<DetectionFrame> = Vec::new();
        let mut tick = 0;
        let mut gate = || {
            tick += 1;
            tick > 2
        };
        let stats = run_pipeline(&mut p, &mut frames(5), &mut gate, &mut out);
        assert_eq!(
            stats,
            RunStats {
                received: 5,
                processed: 3,
                skipped: 2,
                published: 3,
                publish_failures: 0,
            }
        );
        assert_eq!(p.seen, vec![2, 3, 4].into_iter().map(Duration::from_millis).collect::<Vec<_>>());
    }

    #[test]
    fn publish_failures_do_not_stop_the_loop() {
        let mut p = Counter::initialize(()).unwrap();
        let stats = run_pipeline(&mut p, &mut frames(5), &mut AlwaysOn, &mut FailEvery2nd(0));
        assert_eq!(stats.processed, 5);
        assert_eq!(stats.published, 3);
        assert_eq!(stats.publish_failures, 2);
    }

    #[test]
    fn initialize_without_reference_fails() {
        let err = <LandoltCDetector as VisionProcessor>::initialize(LandoltCParams::default());
        assert!(matches!(err, Err(ReferenceError::MissingPath)));
    }
}
