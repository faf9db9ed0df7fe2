use std::time::{Duration, Instant};

use crate::pipeline::frame_scheduler::FrameCounters;

/// Pipeline health figures published once per stats interval.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PipelineStats {
    /// Frames offered by the capture side per second, dropped ones included.
    pub capture_fps: f64,
    /// Frames that completed a detection pass per second.
    pub detection_fps: f64,
    /// Wall-clock duration of the most recent detection pass.
    pub last_inference_ms: f64,
    /// Number of boxes produced by the most recent detection pass.
    pub detection_count: usize,
}

/// Rate of `count` events over `elapsed`, or zero for an empty window.
pub fn window_fps(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    count as f64 / secs
}

/// Drains scheduler counters on demand and turns the deltas into rates.
pub struct StatsSampler {
    counters: FrameCounters,
    last_sampled: Instant,
}

impl StatsSampler {
    pub fn new(counters: FrameCounters) -> Self {
        Self {
            counters,
            last_sampled: Instant::now(),
        }
    }

    /// Computes rates over the window since the previous call.
    pub fn sample(&mut self, last_inference_ms: f64, detection_count: usize) -> PipelineStats {
        let now = Instant::now();
        let elapsed = now - self.last_sampled;
        self.last_sampled = now;

        let sample = self.counters.take_sample();
        PipelineStats {
            capture_fps: window_fps(sample.offered, elapsed),
            detection_fps: window_fps(sample.processed, elapsed),
            last_inference_ms,
            detection_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use std::thread;

    #[rstest]
    #[case(0, Duration::from_secs(1), 0.0)]
    #[case(30, Duration::from_secs(1), 30.0)]
    #[case(15, Duration::from_millis(500), 30.0)]
    #[case(1, Duration::from_secs(4), 0.25)]
    fn test_window_fps(#[case] count: u64, #[case] elapsed: Duration, #[case] expected: f64) {
        assert_relative_eq!(window_fps(count, elapsed), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_window_fps_is_zero_for_an_instant_window() {
        assert_eq!(window_fps(10, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_sampler_derives_rates_from_counters() {
        let counters = FrameCounters::default();
        let mut sampler = StatsSampler::new(counters.clone());

        for _ in 0..4 {
            counters.record_offered();
        }
        for _ in 0..2 {
            counters.record_processed();
        }
        thread::sleep(Duration::from_millis(20));

        let stats = sampler.sample(12.5, 3);
        assert!(stats.capture_fps > 0.0);
        assert_relative_eq!(stats.capture_fps / stats.detection_fps, 2.0, epsilon = 1e-9);
        assert_relative_eq!(stats.last_inference_ms, 12.5, epsilon = 1e-9);
        assert_eq!(stats.detection_count, 3);
    }

    #[test]
    fn test_sampler_window_resets_after_each_sample() {
        let counters = FrameCounters::default();
        let mut sampler = StatsSampler::new(counters.clone());

        counters.record_offered();
        counters.record_processed();
        thread::sleep(Duration::from_millis(10));
        let first = sampler.sample(0.0, 0);
        assert!(first.capture_fps > 0.0);

        thread::sleep(Duration::from_millis(10));
        let second = sampler.sample(0.0, 0);
        assert_eq!(second.capture_fps, 0.0);
        assert_eq!(second.detection_fps, 0.0);
    }
}
