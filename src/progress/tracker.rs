use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crate::audio::SessionProgress;
use crate::error::Result;
use crate::worker;

use super::animator::ProgressAnimator;
use super::sink::DisplaySink;

/// Polls one session's elapsed time and pushes it to the display.
///
/// Created paused; one tracker exists per session and is killed when the
/// session is replaced. Pausing the tracker only freezes what is shown, the
/// poll thread keeps running until [`PositionTracker::kill`].
pub struct PositionTracker {
    shared: Arc<Shared>,
}

struct Shared {
    progress: Arc<SessionProgress>,
    sink: Arc<dyn DisplaySink>,
    animator: Option<Arc<ProgressAnimator>>,
    interacting: Arc<AtomicBool>,
    killed: AtomicBool,
    paused: AtomicBool,
    millis_in: AtomicU64,
    last_shown: AtomicU64,
}

impl PositionTracker {
    /// Start polling `progress` every `interval`.
    ///
    /// While `interacting` is set (a user is dragging a seek control) polled
    /// values are not pushed.
    pub fn start(
        progress: Arc<SessionProgress>,
        sink: Arc<dyn DisplaySink>,
        animator: Option<Arc<ProgressAnimator>>,
        interacting: Arc<AtomicBool>,
        interval: Duration,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            millis_in: AtomicU64::new(progress.sample().millis_in),
            progress,
            sink,
            animator,
            interacting,
            killed: AtomicBool::new(false),
            paused: AtomicBool::new(true),
            last_shown: AtomicU64::new(0),
        });

        let polled = shared.clone();
        worker::spawn("position-tracker", move || {
            while !polled.killed.load(Ordering::SeqCst) {
                thread::sleep(interval);
                if polled.killed.load(Ordering::SeqCst) {
                    break;
                }
                polled.poll();
            }
            Ok(())
        })?;

        Ok(Self { shared })
    }

    /// Stop the poll thread. Idempotent.
    pub fn kill(&self) {
        self.shared.killed.store(true, Ordering::SeqCst);
    }

    pub fn is_killed(&self) -> bool {
        self.shared.killed.load(Ordering::SeqCst)
    }

    /// Keep polling but stop pushing to the display.
    pub fn pause_timer(&self) {
        self.shared.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume_timer(&self) {
        self.shared.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    /// Latest elapsed value the tracker holds, polled or seeded.
    pub fn millis_in(&self) -> u64 {
        self.shared.millis_in.load(Ordering::SeqCst)
    }

    /// Push the held value now.
    ///
    /// Unless `forced`, a value lower than the one last shown is dropped so a
    /// freshly created session reading from the top of its file never drags
    /// the display backwards. Seeks pass `forced = true`.
    pub fn update(&self, forced: bool) {
        self.shared.show(forced);
    }

    /// Seed the held value so the next push reflects a seek target before
    /// the new session has produced its first sample.
    /// A no-op while the duration is still unknown.
    pub fn set_percent_in(&self, percent: f32) {
        let Some(total) = self.shared.progress.duration() else {
            return;
        };
        let millis = (total.as_millis() as f64 * percent.clamp(0.0, 1.0) as f64) as u64;
        self.shared.millis_in.store(millis, Ordering::SeqCst);
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        self.kill();
    }
}

impl Shared {
    fn poll(&self) {
        let sample = self.progress.sample();
        // An unknown duration reads as zero; keep whatever was seeded.
        if sample.millis_in > 0 || self.progress.duration().is_some() {
            self.millis_in.store(sample.millis_in, Ordering::SeqCst);
        }

        if self.paused.load(Ordering::SeqCst) || self.interacting.load(Ordering::SeqCst) {
            return;
        }
        self.show(false);
    }

    fn show(&self, forced: bool) {
        if self.killed.load(Ordering::SeqCst) {
            return;
        }

        let millis = self.millis_in.load(Ordering::SeqCst);
        let total = self.progress.duration();

        if let Some(total) = total {
            if millis > total.as_millis() as u64 {
                return;
            }
        }
        if !forced && millis < self.last_shown.load(Ordering::SeqCst) {
            return;
        }

        self.last_shown.store(millis, Ordering::SeqCst);
        self.sink.position(millis, total);
        if let Some(animator) = &self.animator {
            animator.sync(millis, total);
        }
    }
}
