use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crate::shared::frame::Frame;

/// Outcome of offering a frame to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The frame was handed to the worker.
    Accepted,
    /// A frame was already in flight; this one was discarded.
    Dropped,
}

/// Counter values accumulated since the previous sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerSample {
    pub offered: u64,
    pub processed: u64,
}

/// Shared offered/processed counters.
///
/// Clones observe the same underlying counters, so a handle stays usable
/// after the scheduler that created it is gone.
#[derive(Clone, Default)]
pub struct FrameCounters {
    offered: Arc<AtomicU64>,
    processed: Arc<AtomicU64>,
}

impl FrameCounters {
    pub(crate) fn record_offered(&self) {
        self.offered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns counts accumulated since the last call and resets both to zero.
    pub fn take_sample(&self) -> SchedulerSample {
        SchedulerSample {
            offered: self.offered.swap(0, Ordering::Relaxed),
            processed: self.processed.swap(0, Ordering::Relaxed),
        }
    }
}

/// Admits at most one frame at a time into a job running on a dedicated
/// worker thread.
///
/// `offer` never blocks: while the worker is occupied, further frames are
/// discarded on the caller's thread. A live capture loop therefore keeps
/// running at its native rate however slow the job is, skipping frames
/// instead of queueing them up.
pub struct FrameScheduler {
    busy: Arc<AtomicBool>,
    counters: FrameCounters,
    tx: Option<crossbeam_channel::Sender<Frame>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl FrameScheduler {
    pub fn new<J>(mut job: J) -> Self
    where
        J: FnMut(Frame) + Send + 'static,
    {
        // Capacity 1 is enough: `busy` guarantees the previous frame left
        // the channel before the next send.
        let (tx, rx) = crossbeam_channel::bounded::<Frame>(1);
        let busy = Arc::new(AtomicBool::new(false));
        let counters = FrameCounters::default();

        let worker_busy = busy.clone();
        let worker_counters = counters.clone();
        let worker = thread::spawn(move || {
            for frame in rx {
                job(frame);
                worker_counters.record_processed();
                worker_busy.store(false, Ordering::Release);
            }
        });

        Self {
            busy,
            counters,
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Offers a frame for processing. The frame counts as offered whether or
    /// not it is admitted.
    pub fn offer(&self, frame: Frame) -> Admission {
        self.counters.record_offered();

        if self.busy.swap(true, Ordering::AcqRel) {
            return Admission::Dropped;
        }

        let Some(tx) = &self.tx else {
            self.busy.store(false, Ordering::Release);
            return Admission::Dropped;
        };
        match tx.try_send(frame) {
            Ok(()) => Admission::Accepted,
            Err(_) => {
                self.busy.store(false, Ordering::Release);
                Admission::Dropped
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Handle for sampling throughput counters from another thread.
    pub fn counters(&self) -> FrameCounters {
        self.counters.clone()
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{Receiver, Sender};
    use std::time::{Duration, Instant};

    fn frame(index: u64) -> Frame {
        Frame::new(vec![0u8; 2 * 2 * 3], 2, 2, 3, index)
    }

    fn wait_until(predicate: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !predicate() {
            assert!(Instant::now() < deadline, "timed out waiting for condition");
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Job that reports each frame index it sees and blocks until released.
    fn gated_job() -> (impl FnMut(Frame) + Send + 'static, Receiver<u64>, Sender<()>) {
        let (started_tx, started_rx) = crossbeam_channel::unbounded::<u64>();
        let (release_tx, release_rx) = crossbeam_channel::unbounded::<()>();
        let job = move |frame: Frame| {
            let _ = started_tx.send(frame.index());
            let _ = release_rx.recv();
        };
        (job, started_rx, release_tx)
    }

    // ── admission ──

    #[test]
    fn test_offer_when_idle_is_accepted() {
        let (job, started_rx, release_tx) = gated_job();
        let scheduler = FrameScheduler::new(job);

        assert_eq!(scheduler.offer(frame(0)), Admission::Accepted);
        assert_eq!(started_rx.recv_timeout(Duration::from_secs(5)), Ok(0));
        release_tx.send(()).unwrap();
    }

    #[test]
    fn test_offer_while_busy_is_dropped() {
        let (job, started_rx, release_tx) = gated_job();
        let scheduler = FrameScheduler::new(job);

        assert_eq!(scheduler.offer(frame(0)), Admission::Accepted);
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(scheduler.offer(frame(1)), Admission::Dropped);
        assert_eq!(scheduler.offer(frame(2)), Admission::Dropped);

        release_tx.send(()).unwrap();
        wait_until(|| !scheduler.is_busy());

        assert_eq!(scheduler.offer(frame(3)), Admission::Accepted);
        release_tx.send(()).unwrap();
    }

    #[test]
    fn test_dropped_frame_never_reaches_the_worker() {
        let (job, started_rx, release_tx) = gated_job();
        let scheduler = FrameScheduler::new(job);

        scheduler.offer(frame(0));
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        scheduler.offer(frame(1));
        release_tx.send(()).unwrap();
        wait_until(|| !scheduler.is_busy());

        assert!(started_rx.try_recv().is_err());
    }

    // ── counters ──

    #[test]
    fn test_counters_track_offered_and_processed() {
        let scheduler = FrameScheduler::new(|_frame| {});
        let counters = scheduler.counters();

        for i in 0..3 {
            assert_eq!(scheduler.offer(frame(i)), Admission::Accepted);
            wait_until(|| !scheduler.is_busy());
        }

        assert_eq!(
            counters.take_sample(),
            SchedulerSample {
                offered: 3,
                processed: 3
            }
        );
    }

    #[test]
    fn test_drops_count_as_offered_only() {
        let (job, started_rx, release_tx) = gated_job();
        let scheduler = FrameScheduler::new(job);
        let counters = scheduler.counters();

        scheduler.offer(frame(0));
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        scheduler.offer(frame(1));
        scheduler.offer(frame(2));
        release_tx.send(()).unwrap();
        wait_until(|| !scheduler.is_busy());

        assert_eq!(
            counters.take_sample(),
            SchedulerSample {
                offered: 3,
                processed: 1
            }
        );
    }

    #[test]
    fn test_take_sample_resets_counters() {
        let scheduler = FrameScheduler::new(|_frame| {});
        let counters = scheduler.counters();

        scheduler.offer(frame(0));
        wait_until(|| !scheduler.is_busy());

        assert_eq!(
            counters.take_sample(),
            SchedulerSample {
                offered: 1,
                processed: 1
            }
        );
        assert_eq!(counters.take_sample(), SchedulerSample::default());
    }

    #[test]
    fn test_at_most_one_job_runs_at_a_time_under_stress() {
        let active = Arc::new(AtomicU64::new(0));
        let peak = Arc::new(AtomicU64::new(0));
        let job_active = active.clone();
        let job_peak = peak.clone();
        let scheduler = Arc::new(FrameScheduler::new(move |_frame: Frame| {
            let now = job_active.fetch_add(1, Ordering::SeqCst) + 1;
            job_peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_micros(500));
            job_active.fetch_sub(1, Ordering::SeqCst);
        }));
        let counters = scheduler.counters();

        let offerers: Vec<_> = (0..4u64)
            .map(|t| {
                let scheduler = scheduler.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        scheduler.offer(frame(t * 50 + i));
                        thread::sleep(Duration::from_micros(100));
                    }
                })
            })
            .collect();
        for offerer in offerers {
            offerer.join().unwrap();
        }
        wait_until(|| !scheduler.is_busy());

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        let sample = counters.take_sample();
        assert_eq!(sample.offered, 200);
        assert!(sample.processed >= 1);
        assert!(sample.processed <= sample.offered);
    }

    // ── shutdown ──

    #[test]
    fn test_drop_finishes_the_in_flight_frame() {
        let (seen_tx, seen_rx) = crossbeam_channel::unbounded::<u64>();
        let scheduler = FrameScheduler::new(move |f: Frame| {
            thread::sleep(Duration::from_millis(20));
            let _ = seen_tx.send(f.index());
        });
        let counters = scheduler.counters();

        assert_eq!(scheduler.offer(frame(7)), Admission::Accepted);
        drop(scheduler);

        assert_eq!(seen_rx.try_recv(), Ok(7));
        assert_eq!(counters.take_sample().processed, 1);
    }
}
