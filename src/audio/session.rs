//! One playback attempt of one file.
//!
//! A [`PlaybackSession`] is bound to a single [`Track`]. `play` opens the file
//! and hands it to a worker thread that performs the blocking play call;
//! `kill` closes the output from the caller's thread and reports where a
//! follow-up session should resume. Sessions are never reused after `kill`.
//!
//! ```text
//! Created -> Playing -> Completed
//!               |  \-> Killed
//!               |   \-> Failed (retry budget exhausted; not killed)
//!               \-- decode error -> Playing (retry)
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{PlaybackError, Result};
use crate::library::Track;
use crate::worker;

use super::backend::{AudioBackend, AudioOutput};
use super::probe::DurationProbe;
use super::stream::TrackStream;
use super::types::{ControlMsg, ProgressSample, SessionEvent};

/// Counters a session publishes for pollers on other threads.
#[derive(Debug, Default)]
pub struct SessionProgress {
    position: Arc<AtomicU64>,
    total_bytes: AtomicU64,
    duration: OnceLock<Duration>,
    playing: AtomicBool,
    killed: AtomicBool,
}

impl SessionProgress {
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::SeqCst)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::SeqCst)
    }

    /// Probed length of the file; `None` until the probe finishes or if it failed.
    pub fn duration(&self) -> Option<Duration> {
        self.duration.get().copied()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// Fraction of the file consumed, 0.0 when the length is unknown.
    pub fn percent_in(&self) -> f32 {
        let total = self.total_bytes();
        if total == 0 {
            return 0.0;
        }
        (self.position().min(total) as f64 / total as f64) as f32
    }

    /// Elapsed time estimated as `duration * percent_in`.
    pub fn sample(&self) -> ProgressSample {
        let percent_in = self.percent_in();
        let millis_in = self
            .duration()
            .map(|d| (d.as_millis() as f64 * percent_in as f64) as u64)
            .unwrap_or(0);
        ProgressSample {
            percent_in,
            millis_in,
        }
    }

    fn seed_duration(&self, duration: Duration) {
        let _ = self.duration.set(duration);
    }

    #[cfg(test)]
    pub(crate) fn fixed(position: u64, total_bytes: u64, duration: Option<Duration>) -> Self {
        let progress = Self::default();
        progress.position.store(position, Ordering::SeqCst);
        progress.total_bytes.store(total_bytes, Ordering::SeqCst);
        if let Some(d) = duration {
            progress.seed_duration(d);
        }
        progress
    }

    #[cfg(test)]
    pub(crate) fn advance_to(&self, position: u64) {
        self.position.store(position, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub max_retries: u32,
    pub reaction_offset_bytes: u64,
}

/// Collaborators shared by every session a controller creates.
#[derive(Clone)]
pub struct SessionDeps {
    pub backend: Arc<dyn AudioBackend>,
    pub probe: Arc<dyn DurationProbe>,
    pub events: Sender<ControlMsg>,
}

type OutputSlot = Arc<Mutex<Option<Arc<dyn AudioOutput>>>>;

pub struct PlaybackSession {
    track: Track,
    generation: u64,
    deps: SessionDeps,
    settings: SessionSettings,
    progress: Arc<SessionProgress>,
    output: OutputSlot,
    location: u64,
    retries: Arc<AtomicU32>,
    volume: Arc<AtomicU32>,
    resume_offset: OnceLock<u64>,
}

impl PlaybackSession {
    /// Create a session for `track`. Nothing plays until [`PlaybackSession::play`].
    ///
    /// The file's duration is probed in the background; until it arrives the
    /// session reports zero elapsed milliseconds.
    pub fn new(track: Track, generation: u64, deps: SessionDeps, settings: SessionSettings) -> Self {
        let progress = Arc::new(SessionProgress::default());
        let total = fs::metadata(&track.path).map(|m| m.len()).unwrap_or(0);
        progress.total_bytes.store(total, Ordering::SeqCst);

        let probe = deps.probe.clone();
        let path = track.path.clone();
        let probed = progress.clone();
        let spawned = worker::spawn(format!("probe [{}]", track.display), move || {
            if let Some(d) = probe.probe(&path) {
                probed.seed_duration(d);
            }
            Ok(())
        });
        if let Err(e) = spawned {
            worker::report("probe", &e);
        }

        Self {
            track,
            generation,
            deps,
            settings,
            progress,
            output: Arc::new(Mutex::new(None)),
            location: 0,
            retries: Arc::new(AtomicU32::new(0)),
            volume: Arc::new(AtomicU32::new(1.0f32.to_bits())),
            resume_offset: OnceLock::new(),
        }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn progress(&self) -> Arc<SessionProgress> {
        self.progress.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.progress.is_playing()
    }

    pub fn is_killed(&self) -> bool {
        self.progress.is_killed()
    }

    pub fn total_length(&self) -> u64 {
        self.progress.total_bytes()
    }

    pub fn millis_in(&self) -> u64 {
        self.progress.sample().millis_in
    }

    /// Use an already known duration instead of waiting for the probe.
    pub fn seed_duration(&self, duration: Duration) {
        self.progress.seed_duration(duration);
    }

    /// Decode failures seen by the current `play` call.
    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    /// Byte offset the next [`PlaybackSession::play`] starts from.
    pub fn set_location(&mut self, byte_offset: u64) {
        let total = self.progress.total_bytes();
        let offset = if total == 0 { byte_offset } else { byte_offset.min(total) };
        self.location = offset;
        self.progress.position.store(offset, Ordering::SeqCst);
    }

    pub fn set_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.volume.store(volume.to_bits(), Ordering::SeqCst);
        if let Ok(slot) = self.output.lock() {
            if let Some(out) = slot.as_ref() {
                out.set_volume(volume);
            }
        }
    }

    /// Open the file and start the playback worker.
    ///
    /// A no-op while already playing. Decode failures inside the worker are
    /// retried from the last known offset up to `max_retries` times; after
    /// that a [`SessionEvent::Failed`] is posted and the session is left
    /// stopped but not killed.
    pub fn play(&mut self) -> Result<()> {
        if self.is_killed() {
            return Err(PlaybackError::Closed);
        }
        if self.is_playing() {
            return Ok(());
        }

        let first = TrackStream::open(&self.track.path, self.location, self.progress.position.clone())?;
        self.progress
            .total_bytes
            .store(first.total_bytes(), Ordering::SeqCst);
        self.progress.playing.store(true, Ordering::SeqCst);
        self.retries.store(0, Ordering::SeqCst);

        let job = PlayJob {
            path: self.track.path.clone(),
            generation: self.generation,
            location: self.location,
            max_retries: self.settings.max_retries,
            backend: self.deps.backend.clone(),
            events: self.deps.events.clone(),
            progress: self.progress.clone(),
            output: self.output.clone(),
            retries: self.retries.clone(),
            volume: self.volume.clone(),
        };

        debug!(track = %self.track.display, generation = self.generation, from = self.location, "session play");
        let spawned = worker::spawn(format!("play [{}]", self.track.display), move || {
            job.run(first);
            Ok(())
        });

        if let Err(e) = spawned {
            self.progress.playing.store(false, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }

    /// Close the output and return the byte offset a follow-up session should
    /// start from to sound continuous.
    ///
    /// The offset is the number of bytes consumed minus the reaction margin,
    /// floored at zero. Calling `kill` again returns the same value.
    pub fn kill(&self) -> u64 {
        *self.resume_offset.get_or_init(|| {
            let total = self.progress.total_bytes();
            let consumed = self.progress.position().min(total);
            let offset = consumed.saturating_sub(self.settings.reaction_offset_bytes);

            self.progress.killed.store(true, Ordering::SeqCst);
            if let Ok(mut slot) = self.output.lock() {
                if let Some(out) = slot.take() {
                    out.close();
                }
            }
            self.progress.playing.store(false, Ordering::SeqCst);

            debug!(track = %self.track.display, generation = self.generation, offset, "session killed");
            offset
        })
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.kill();
    }
}

/// State moved onto the playback worker.
struct PlayJob {
    path: PathBuf,
    generation: u64,
    location: u64,
    max_retries: u32,
    backend: Arc<dyn AudioBackend>,
    events: Sender<ControlMsg>,
    progress: Arc<SessionProgress>,
    output: OutputSlot,
    retries: Arc<AtomicU32>,
    volume: Arc<AtomicU32>,
}

impl PlayJob {
    fn run(self, first: TrackStream) {
        let mut next_stream = Some(first);

        let event = loop {
            let stream = match next_stream.take() {
                Some(s) => Ok(s),
                None => {
                    let from = self.progress.position().max(self.location);
                    TrackStream::open(&self.path, from, self.progress.position.clone())
                        .map_err(PlaybackError::from)
                }
            };

            match stream.and_then(|s| self.play_once(s)) {
                Ok(()) if self.progress.is_killed() => break None,
                Ok(()) => {
                    break Some(SessionEvent::Completed {
                        generation: self.generation,
                    });
                }
                Err(_) if self.progress.is_killed() => break None,
                Err(e) => {
                    let attempts = self.retries.fetch_add(1, Ordering::SeqCst) + 1;
                    if attempts > self.max_retries {
                        error!(path = %self.path.display(), attempts, "playback failed: {e}");
                        break Some(SessionEvent::Failed {
                            generation: self.generation,
                            error: PlaybackError::RetriesExhausted {
                                path: self.path.clone(),
                                attempts,
                            },
                        });
                    }
                    warn!(path = %self.path.display(), attempt = attempts, "playback error, restarting: {e}");
                }
            }
        };

        if let Ok(mut slot) = self.output.lock() {
            slot.take();
        }
        self.progress.playing.store(false, Ordering::SeqCst);

        if let Some(event) = event {
            // The controller may already be gone during shutdown.
            let _ = self.events.send(ControlMsg::Session(event));
        }
    }

    fn play_once(&self, stream: TrackStream) -> Result<()> {
        let output = self.backend.open(stream, self.progress.duration())?;
        {
            let mut slot = self.output.lock().map_err(|_| PlaybackError::Closed)?;
            if self.progress.is_killed() {
                output.close();
                return Err(PlaybackError::Closed);
            }
            *slot = Some(output.clone());
        }
        output.set_volume(f32::from_bits(self.volume.load(Ordering::SeqCst)));
        output.play()
    }
}
