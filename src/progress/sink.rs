use std::time::Duration;

use crate::audio::PlaybackState;
use crate::library::Track;

/// Receiver of the numbers a front-end shows.
///
/// Called from background threads; implementations must be cheap and must
/// not call back into the engine.
pub trait DisplaySink: Send + Sync {
    /// True elapsed time of the current track.
    fn position(&self, millis_in: u64, total: Option<Duration>);

    /// Smoothed progress through the current track, 0.0 to 1.0.
    fn progress(&self, percent: f32);

    fn volume(&self, _percent: u8) {}

    fn track_changed(&self, _track: Option<&Track>) {}

    fn state_changed(&self, _state: PlaybackState) {}
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn position(&self, _millis_in: u64, _total: Option<Duration>) {}

    fn progress(&self, _percent: f32) {}
}
