use std::collections::VecDeque;
use std::time::Instant;

use config_manager::{MotionConfig, MAX_FRAME_HISTORY};

use crate::{Classification, Detector};

/// Mean absolute difference of two equally sized frames, scaled to 0.0-1.0.
pub fn mean_abs_delta(a: &[u8], b: &[u8]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    if a.is_empty() {
        return 0.0;
    }
    let sum: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();
    sum as f64 / (a.len() as f64 * 255.0)
}

/// Frame-difference detector with hysteresis.
///
/// Idle until the averaged delta stays above the threshold for
/// `start_frames` frames. While active, `prestop_low_frames` quiet frames
/// start a pre-stop period; `cancel_prestop_frames` busy frames cancel it,
/// otherwise motion ends once `full_stop_delay` has passed.
#[derive(Debug)]
pub struct MotionDetector {
    config: MotionConfig,
    frame_len: usize,
    prev: Option<Vec<u8>>,
    history: VecDeque<f64>,
    active: bool,
    hi_run: u32,
    lo_run: u32,
    prestop_since: Option<Instant>,
}

impl MotionDetector {
    pub fn new(config: MotionConfig, frame_len: usize) -> Self {
        let history = VecDeque::with_capacity(config.frame_history.clamp(1, MAX_FRAME_HISTORY));
        Self {
            config,
            frame_len,
            prev: None,
            history,
            active: false,
            hi_run: 0,
            lo_run: 0,
            prestop_since: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn in_prestop(&self) -> bool {
        self.prestop_since.is_some()
    }

    /// Average of the recent deltas
    pub fn last_average(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    /// Classify a frame observed at `now`.
    pub fn classify_at(&mut self, frame: &[u8], now: Instant) -> Classification {
        if frame.len() != self.frame_len {
            tracing::warn!(
                "Ignoring frame of {} bytes, expected {}",
                frame.len(),
                self.frame_len
            );
            return self.verdict();
        }

        let delta = match self.prev.as_mut() {
            Some(prev) => {
                let delta = mean_abs_delta(frame, prev);
                prev.copy_from_slice(frame);
                delta
            }
            None => {
                self.prev = Some(frame.to_vec());
                0.0
            }
        };

        if self.history.len() == self.config.frame_history.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(delta);

        let busy = self.last_average() > self.config.active_threshold;
        self.step(busy, now);
        self.verdict()
    }

    fn step(&mut self, busy: bool, now: Instant) {
        if !self.active {
            self.hi_run = if busy { self.hi_run + 1 } else { 0 };
            if self.hi_run >= self.config.start_frames {
                self.active = true;
                self.hi_run = 0;
                self.lo_run = 0;
                self.prestop_since = None;
                tracing::debug!("Motion started (avg {:.5})", self.last_average());
            }
            return;
        }

        let Some(since) = self.prestop_since else {
            if busy {
                self.lo_run = 0;
            } else {
                self.lo_run += 1;
                if self.lo_run >= self.config.prestop_low_frames {
                    self.prestop_since = Some(now);
                }
            }
            return;
        };

        if busy {
            // Busy frames during pre-stop are counted, not required to be consecutive
            self.hi_run += 1;
            if self.hi_run >= self.config.cancel_prestop_frames {
                self.prestop_since = None;
                self.hi_run = 0;
                self.lo_run = 0;
            }
            return;
        }

        if now.saturating_duration_since(since) >= self.config.full_stop_delay() {
            self.active = false;
            self.prestop_since = None;
            self.hi_run = 0;
            self.lo_run = 0;
            tracing::debug!("Motion ended");
        }
    }

    fn verdict(&self) -> Classification {
        if self.active {
            Classification::Motion
        } else {
            Classification::NoMotion
        }
    }
}

impl Detector for MotionDetector {
    fn classify(&mut self, frame: &[u8]) -> Classification {
        self.classify_at(frame, Instant::now())
    }

    fn score(&self) -> Option<f64> {
        Some(self.last_average())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const LEN: usize = 16;

    fn config() -> MotionConfig {
        MotionConfig {
            frame_history: 1,
            active_threshold: 0.1,
            start_frames: 3,
            prestop_low_frames: 2,
            cancel_prestop_frames: 2,
            full_stop_delay_secs: 1.0,
        }
    }

    /// Alternating frames differ completely, giving a delta of 1.0
    fn busy(i: usize) -> Vec<u8> {
        vec![if i % 2 == 0 { 0 } else { 255 }; LEN]
    }

    fn still() -> Vec<u8> {
        vec![0; LEN]
    }

    fn feed(det: &mut MotionDetector, frames: &[Vec<u8>], now: Instant) -> Vec<Classification> {
        frames.iter().map(|f| det.classify_at(f, now)).collect()
    }

    #[test]
    fn test_mean_abs_delta() {
        assert_eq!(mean_abs_delta(&[0, 0], &[0, 0]), 0.0);
        assert_eq!(mean_abs_delta(&[0, 255], &[255, 0]), 1.0);
        assert!((mean_abs_delta(&[10, 20], &[20, 10]) - 10.0 / 255.0).abs() < 1e-12);
        assert_eq!(mean_abs_delta(&[], &[]), 0.0);
    }

    #[test]
    fn test_still_scene_never_triggers() {
        let mut det = MotionDetector::new(config(), LEN);
        let now = Instant::now();
        let verdicts = feed(&mut det, &vec![still(); 50], now);
        assert!(verdicts.iter().all(|v| *v == Classification::NoMotion));
        assert_eq!(det.last_average(), 0.0);
    }

    #[test]
    fn test_starts_after_start_frames() {
        let mut det = MotionDetector::new(config(), LEN);
        let now = Instant::now();
        // First frame has no predecessor, the next three differ
        let frames: Vec<_> = (0..4).map(busy).collect();
        let verdicts = feed(&mut det, &frames, now);
        assert_eq!(
            verdicts,
            [
                Classification::NoMotion,
                Classification::NoMotion,
                Classification::NoMotion,
                Classification::Motion
            ]
        );
        assert!(det.is_active());
    }

    #[test]
    fn test_interrupted_start_resets() {
        let mut det = MotionDetector::new(config(), LEN);
        let now = Instant::now();
        let frames = vec![busy(0), busy(1), busy(2), busy(2), busy(3), busy(4)];
        let verdicts = feed(&mut det, &frames, now);
        assert!(verdicts.iter().all(|v| *v == Classification::NoMotion));
        assert!(!det.is_active());
    }

    fn active_detector(now: Instant) -> MotionDetector {
        let mut det = MotionDetector::new(config(), LEN);
        // Ends on an all-zero frame so `still()` frames have no delta
        let frames: Vec<_> = (0..5).map(busy).collect();
        feed(&mut det, &frames, now);
        assert!(det.is_active());
        det
    }

    #[test]
    fn test_stops_after_prestop_delay() {
        let start = Instant::now();
        let mut det = active_detector(start);

        // Two quiet frames enter pre-stop; motion is still reported
        det.classify_at(&still(), start);
        assert_eq!(det.classify_at(&still(), start), Classification::Motion);
        assert!(det.in_prestop());

        // Quiet but before the delay
        let early = start + Duration::from_millis(500);
        assert_eq!(det.classify_at(&still(), early), Classification::Motion);

        let late = start + Duration::from_millis(1000);
        assert_eq!(det.classify_at(&still(), late), Classification::NoMotion);
        assert!(!det.is_active());
        assert!(!det.in_prestop());
    }

    #[test]
    fn test_busy_frames_cancel_prestop() {
        let start = Instant::now();
        let mut det = active_detector(start);
        det.classify_at(&still(), start);
        det.classify_at(&still(), start);
        assert!(det.in_prestop());

        det.classify_at(&busy(1), start);
        det.classify_at(&busy(2), start);
        assert!(!det.in_prestop());

        // Past the delay, but pre-stop was cancelled so motion continues
        let late = start + Duration::from_secs(5);
        assert_eq!(det.classify_at(&busy(3), late), Classification::Motion);
    }

    #[test]
    fn test_wrong_frame_size_is_ignored() {
        let mut det = MotionDetector::new(config(), LEN);
        assert_eq!(det.classify(&[0u8; 3]), Classification::NoMotion);
        assert_eq!(det.last_average(), 0.0);
        assert_eq!(det.score(), Some(0.0));
    }

    #[test]
    fn test_history_averages_deltas() {
        let cfg = MotionConfig {
            frame_history: 4,
            ..config()
        };
        let mut det = MotionDetector::new(cfg, LEN);
        let now = Instant::now();
        det.classify_at(&busy(0), now);
        det.classify_at(&busy(1), now);
        // Deltas so far: 0.0, 1.0
        assert!((det.last_average() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_huge_full_stop_delay_keeps_motion() {
        let cfg = MotionConfig {
            start_frames: 1,
            prestop_low_frames: 1,
            full_stop_delay_secs: 1e30,
            ..config()
        };
        let mut det = MotionDetector::new(cfg, LEN);
        let start = Instant::now();

        let frames = [still(), busy(1), busy(1), busy(1)];
        let verdicts = feed(&mut det, &frames, start);
        assert_eq!(
            verdicts,
            [
                Classification::NoMotion,
                Classification::Motion,
                Classification::Motion,
                Classification::Motion
            ]
        );
        assert!(det.in_prestop());

        let much_later = start + Duration::from_secs(3600);
        assert_eq!(det.classify_at(&busy(1), much_later), Classification::Motion);
    }

    #[test]
    fn test_oversized_history_does_not_preallocate() {
        let cfg = MotionConfig {
            frame_history: usize::MAX,
            ..config()
        };
        let mut det = MotionDetector::new(cfg, LEN);
        assert!(det.history.capacity() <= 2 * MAX_FRAME_HISTORY);
        assert_eq!(det.classify_at(&still(), Instant::now()), Classification::NoMotion);
    }
}
