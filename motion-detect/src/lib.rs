//! Per-frame motion classification.
//!
//! A [`Detector`] consumes one raw gray frame at a time and reports whether
//! motion is currently active. [`MotionDetector`] is the frame-difference
//! implementation with start/stop hysteresis used by the recorder.

mod detector;

pub use detector::{mean_abs_delta, MotionDetector};

/// Verdict for one analyzed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Motion is active
    Motion,
    /// Motion is not active (or has just ended)
    NoMotion,
    /// The frame stream ended or failed; no more verdicts follow
    Terminated,
}

/// Classifies successive frames of one analysis stream.
///
/// Implementations return `Motion` or `NoMotion`; `Terminated` is reserved for
/// the frame source, which produces it when the stream itself ends.
pub trait Detector: Send {
    fn classify(&mut self, frame: &[u8]) -> Classification;

    /// Latest smoothed score, for diagnostics
    fn score(&self) -> Option<f64> {
        None
    }
}
