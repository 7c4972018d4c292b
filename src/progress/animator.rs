use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::worker;

use super::sink::DisplaySink;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AnimatorState {
    #[default]
    Stopped,
    Running,
    Paused,
}

/// Visual-only interpolation between tracker samples.
///
/// While `Running`, a tick loop advances the shown position with wall-clock
/// time and pushes it as a percentage. Every fresh tracker sample re-anchors
/// the interpolation, so drift never outlives one poll interval.
pub struct ProgressAnimator {
    inner: Arc<Inner>,
}

struct Inner {
    sink: Arc<dyn DisplaySink>,
    tick: Duration,
    anim: Mutex<Anim>,
}

struct Anim {
    state: AnimatorState,
    /// Bumped on every state change; a tick loop exits once it no longer matches.
    epoch: u64,
    true_millis: u64,
    total: Option<Duration>,
    anchor_millis: u64,
    anchor_at: Instant,
    shown_millis: u64,
}

impl ProgressAnimator {
    pub fn new(sink: Arc<dyn DisplaySink>, tick: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                tick,
                anim: Mutex::new(Anim {
                    state: AnimatorState::Stopped,
                    epoch: 0,
                    true_millis: 0,
                    total: None,
                    anchor_millis: 0,
                    anchor_at: Instant::now(),
                    shown_millis: 0,
                }),
            }),
        }
    }

    pub fn state(&self) -> AnimatorState {
        self.inner.lock().state
    }

    /// Position currently shown, in milliseconds.
    pub fn shown_millis(&self) -> u64 {
        self.inner.lock().shown_millis
    }

    pub fn set_state(&self, next: AnimatorState) {
        let mut anim = self.inner.lock();
        if anim.state == next {
            return;
        }
        debug!(from = ?anim.state, to = ?next, "progress animator");

        anim.epoch += 1;
        let previous = anim.state;
        anim.state = next;

        match next {
            AnimatorState::Stopped => {
                anim.shown_millis = anim.true_millis;
                if let Some(p) = anim.percent() {
                    self.inner.sink.progress(p);
                }
            }
            AnimatorState::Paused => {
                if previous == AnimatorState::Running {
                    anim.shown_millis = anim.interpolated();
                }
            }
            AnimatorState::Running => {
                anim.anchor_millis = anim.shown_millis;
                anim.anchor_at = Instant::now();
                let epoch = anim.epoch;
                drop(anim);
                self.spawn_ticker(epoch);
            }
        }
    }

    /// Re-anchor on a fresh true sample from the tracker.
    pub fn sync(&self, true_millis: u64, total: Option<Duration>) {
        let mut anim = self.inner.lock();
        anim.true_millis = true_millis;
        anim.total = total;
        match anim.state {
            AnimatorState::Running => {
                anim.anchor_millis = true_millis;
                anim.anchor_at = Instant::now();
                anim.shown_millis = true_millis;
            }
            AnimatorState::Stopped => anim.shown_millis = true_millis,
            AnimatorState::Paused => {}
        }
    }

    /// Resync to the true value and stop ticking.
    pub fn reset(&self, true_millis: u64, total: Option<Duration>) {
        {
            let mut anim = self.inner.lock();
            anim.true_millis = true_millis;
            anim.total = total;
        }
        if self.state() == AnimatorState::Stopped {
            let mut anim = self.inner.lock();
            anim.shown_millis = true_millis;
        } else {
            self.set_state(AnimatorState::Stopped);
        }
    }

    fn spawn_ticker(&self, epoch: u64) {
        let inner = self.inner.clone();
        let spawned = worker::spawn("progress-animator", move || {
            loop {
                {
                    // Pushed under the lock so a stale tick never lands after a state change.
                    let mut anim = inner.lock();
                    if anim.epoch != epoch {
                        break;
                    }
                    let next = anim.interpolated();
                    // Monotonic between resyncs.
                    if next > anim.shown_millis {
                        anim.shown_millis = next;
                    }
                    if let Some(p) = anim.percent() {
                        inner.sink.progress(p);
                    }
                }
                thread::sleep(inner.tick);
            }
            Ok(())
        });
        if let Err(e) = spawned {
            worker::report("progress-animator", &e);
        }
    }
}

impl Drop for ProgressAnimator {
    fn drop(&mut self) {
        // Ends any tick loop still holding a clone of `inner`.
        self.inner.lock().epoch += 1;
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Anim> {
        self.anim.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Anim {
    fn interpolated(&self) -> u64 {
        let value = self.anchor_millis + self.anchor_at.elapsed().as_millis() as u64;
        match self.total {
            Some(total) => value.min(total.as_millis() as u64),
            None => value,
        }
    }

    fn percent(&self) -> Option<f32> {
        let total = self.total?.as_millis() as u64;
        if total == 0 {
            return None;
        }
        Some((self.shown_millis.min(total) as f64 / total as f64) as f32)
    }
}
