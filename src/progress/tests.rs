use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::*;
use crate::audio::SessionProgress;

const LENGTH: Duration = Duration::from_secs(100);

#[derive(Default)]
struct Recorder {
    positions: Mutex<Vec<u64>>,
    percents: Mutex<Vec<f32>>,
}

impl DisplaySink for Recorder {
    fn position(&self, millis_in: u64, _total: Option<Duration>) {
        self.positions.lock().unwrap().push(millis_in);
    }

    fn progress(&self, percent: f32) {
        self.percents.lock().unwrap().push(percent);
    }
}

impl Recorder {
    fn last_position(&self) -> Option<u64> {
        self.positions.lock().unwrap().last().copied()
    }
}

fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(2));
    }
}

fn tracker_at(
    position: u64,
    duration: Option<Duration>,
    interval: Duration,
) -> (PositionTracker, Arc<Recorder>, Arc<AtomicBool>) {
    let progress = Arc::new(SessionProgress::fixed(position, 100_000, duration));
    let sink = Arc::new(Recorder::default());
    let interacting = Arc::new(AtomicBool::new(false));
    let tracker =
        PositionTracker::start(progress, sink.clone(), None, interacting.clone(), interval).unwrap();
    (tracker, sink, interacting)
}

const NEVER: Duration = Duration::from_secs(3600);

#[test]
fn tracker_starts_paused_and_pushes_once_resumed() {
    let (tracker, sink, _) = tracker_at(10_000, Some(LENGTH), Duration::from_millis(5));
    assert!(tracker.is_paused());
    thread::sleep(Duration::from_millis(40));
    assert!(sink.positions.lock().unwrap().is_empty());

    tracker.resume_timer();
    wait_until(|| sink.last_position().is_some());
    assert_eq!(sink.last_position(), Some(10_000));
}

#[test]
fn tracker_drops_backward_values_unless_forced() {
    let (tracker, sink, _) = tracker_at(50_000, Some(LENGTH), NEVER);
    tracker.update(false);
    assert_eq!(sink.last_position(), Some(50_000));

    tracker.set_percent_in(0.1);
    assert_eq!(tracker.millis_in(), 10_000);
    tracker.update(false);
    assert_eq!(sink.last_position(), Some(50_000));

    tracker.update(true);
    assert_eq!(sink.last_position(), Some(10_000));
}

#[test]
fn tracker_holds_back_while_user_is_scrubbing() {
    let (tracker, sink, interacting) = tracker_at(20_000, Some(LENGTH), Duration::from_millis(5));
    interacting.store(true, Ordering::SeqCst);
    tracker.resume_timer();
    thread::sleep(Duration::from_millis(40));
    assert!(sink.positions.lock().unwrap().is_empty());

    interacting.store(false, Ordering::SeqCst);
    wait_until(|| sink.last_position() == Some(20_000));
}

#[test]
fn killed_tracker_pushes_nothing() {
    let (tracker, sink, _) = tracker_at(20_000, Some(LENGTH), NEVER);
    tracker.kill();
    tracker.kill();
    assert!(tracker.is_killed());
    tracker.update(true);
    assert!(sink.positions.lock().unwrap().is_empty());
}

#[test]
fn set_percent_in_waits_for_a_known_duration() {
    let (tracker, _, _) = tracker_at(0, None, NEVER);
    tracker.set_percent_in(0.5);
    assert_eq!(tracker.millis_in(), 0);
}

#[test]
fn tracker_resyncs_the_animator() {
    let progress = Arc::new(SessionProgress::fixed(30_000, 100_000, Some(LENGTH)));
    let sink = Arc::new(Recorder::default());
    let animator = Arc::new(ProgressAnimator::new(sink.clone(), Duration::from_millis(1)));
    let tracker = PositionTracker::start(
        progress,
        sink.clone(),
        Some(animator.clone()),
        Arc::new(AtomicBool::new(false)),
        NEVER,
    )
    .unwrap();

    tracker.update(true);
    assert_eq!(animator.shown_millis(), 30_000);
}

fn animator() -> (ProgressAnimator, Arc<Recorder>) {
    let sink = Arc::new(Recorder::default());
    (ProgressAnimator::new(sink.clone(), Duration::from_millis(1)), sink)
}

#[test]
fn animator_interpolates_monotonically_while_running() {
    let (animator, sink) = animator();
    assert_eq!(animator.state(), AnimatorState::Stopped);
    animator.sync(10_000, Some(LENGTH));
    animator.set_state(AnimatorState::Running);

    wait_until(|| animator.shown_millis() > 10_020);
    animator.set_state(AnimatorState::Paused);

    let percents = sink.percents.lock().unwrap().clone();
    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert!(percents.iter().all(|p| (0.1..=1.0).contains(p)));
}

#[test]
fn animator_pause_freezes_the_shown_value() {
    let (animator, _) = animator();
    animator.sync(0, Some(LENGTH));
    animator.set_state(AnimatorState::Running);
    wait_until(|| animator.shown_millis() > 10);

    animator.set_state(AnimatorState::Paused);
    let frozen = animator.shown_millis();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(animator.shown_millis(), frozen);

    // Resuming continues from the frozen value.
    animator.set_state(AnimatorState::Running);
    wait_until(|| animator.shown_millis() > frozen);
}

#[test]
fn animator_stop_snaps_back_to_the_true_value() {
    let (animator, sink) = animator();
    animator.sync(10_000, Some(LENGTH));
    animator.set_state(AnimatorState::Running);
    wait_until(|| animator.shown_millis() > 10_010);

    animator.set_state(AnimatorState::Stopped);
    assert_eq!(animator.shown_millis(), 10_000);
    let last = *sink.percents.lock().unwrap().last().unwrap();
    assert!((last - 0.1).abs() < 1e-6);
}

#[test]
fn animator_reset_stops_and_resyncs() {
    let (animator, _) = animator();
    animator.sync(40_000, Some(LENGTH));
    animator.set_state(AnimatorState::Running);

    animator.reset(0, Some(LENGTH));
    assert_eq!(animator.state(), AnimatorState::Stopped);
    assert_eq!(animator.shown_millis(), 0);
}

#[test]
fn animator_never_runs_past_the_end() {
    let (animator, sink) = animator();
    animator.sync(99_995, Some(LENGTH));
    animator.set_state(AnimatorState::Running);
    wait_until(|| animator.shown_millis() == 100_000);
    thread::sleep(Duration::from_millis(20));

    assert_eq!(animator.shown_millis(), 100_000);
    assert!(sink.percents.lock().unwrap().iter().all(|p| *p <= 1.0));
}
