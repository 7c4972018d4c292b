//! The playlist state machine.
//!
//! [`PlaylistController`] owns the current track, the single live
//! [`PlaybackSession`], its [`PositionTracker`], the play-next queue and the
//! shuffle/repeat flags. All mutation goes through `&mut self`, so whoever
//! owns the controller is the single writer; in the engine that is the
//! control thread in `thread.rs`.
//!
//! A session's natural end arrives as a [`SessionEvent`] on the same channel
//! as user commands. It is acted on only when it comes from the current
//! session generation *and* the last user action is still `Play`; anything
//! else is a completion that lost a race with a pause, skip or seek.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::Settings;
use crate::error::{PlaybackError, Result};
use crate::library::{self, Track};
use crate::progress::{AnimatorState, DisplaySink, PositionTracker, ProgressAnimator};

use super::backend::AudioBackend;
use super::probe::DurationProbe;
use super::queue::{TrackQueue, next_index, previous_index, random_index_excluding};
use super::session::{PlaybackSession, SessionDeps, SessionSettings};
use super::types::{ControlMsg, LastAction, PlaybackInfo, PlaybackState, SessionEvent};

/// External collaborators of the controller.
#[derive(Clone)]
pub struct ControllerDeps {
    pub backend: Arc<dyn AudioBackend>,
    pub probe: Arc<dyn DurationProbe>,
    pub sink: Arc<dyn DisplaySink>,
}

/// Where a paused track should pick up again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint {
    pub offset: u64,
    pub millis: u64,
}

pub struct PlaylistController {
    settings: Settings,
    session_deps: SessionDeps,
    sink: Arc<dyn DisplaySink>,
    animator: Arc<ProgressAnimator>,
    interacting: Arc<AtomicBool>,

    current: Option<Track>,
    session: Option<PlaybackSession>,
    tracker: Option<PositionTracker>,
    queue: TrackQueue,

    shuffle: bool,
    repeat: bool,
    last_action: LastAction,
    resume: Option<ResumePoint>,
    state: PlaybackState,
    volume: u8,

    generation: u64,
    known_duration: Option<(PathBuf, Duration)>,
}

impl PlaylistController {
    /// Build a controller. Sessions it creates report back through `events`.
    pub fn new(settings: &Settings, deps: ControllerDeps, events: Sender<ControlMsg>) -> Self {
        let animator = Arc::new(ProgressAnimator::new(
            deps.sink.clone(),
            settings.progress.animation_tick(),
        ));

        Self {
            session_deps: SessionDeps {
                backend: deps.backend,
                probe: deps.probe,
                events,
            },
            sink: deps.sink,
            animator,
            interacting: Arc::new(AtomicBool::new(false)),

            current: None,
            session: None,
            tracker: None,
            queue: TrackQueue::new(),

            shuffle: settings.playback.shuffle,
            repeat: settings.playback.repeat,
            last_action: LastAction::Unknown,
            resume: None,
            state: PlaybackState::Stopped,
            volume: settings.audio.volume.min(100),

            generation: 0,
            known_duration: None,
            settings: settings.clone(),
        }
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_playing())
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn last_action(&self) -> LastAction {
        self.last_action
    }

    pub fn queue(&self) -> &TrackQueue {
        &self.queue
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn resume_point(&self) -> Option<ResumePoint> {
        self.resume
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn tracker(&self) -> Option<&PositionTracker> {
        self.tracker.as_ref()
    }

    pub fn animator(&self) -> Arc<ProgressAnimator> {
        self.animator.clone()
    }

    /// Flag a front-end sets while the user drags a seek control.
    pub fn interaction_flag(&self) -> Arc<AtomicBool> {
        self.interacting.clone()
    }

    /// Elapsed time of the current track: live while a session exists,
    /// otherwise the value captured at the last pause.
    pub fn elapsed_millis(&self) -> u64 {
        match &self.session {
            Some(s) => s.millis_in(),
            None => self.resume.map(|r| r.millis).unwrap_or(0),
        }
    }

    pub fn snapshot(&self) -> PlaybackInfo {
        PlaybackInfo {
            track: self.current.clone(),
            state: self.state,
            shuffle: self.shuffle,
            repeat: self.repeat,
            queued: self.queue.len(),
            volume: self.volume,
            last_action: self.last_action,
            progress: self.session.as_ref().map(|s| s.progress()),
            generation: self.session.as_ref().map(|s| s.generation()),
            paused_at_millis: self.resume.map(|r| r.millis).unwrap_or(0),
        }
    }

    /// Make `path` the current track, starting at its beginning.
    ///
    /// Keeps playing if something was playing. Re-showing the track that is
    /// already current picks up at its last pause point.
    pub fn show_track(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let track = Track::open(path, &self.settings.library)?;
        self.show(track, None)
    }

    /// Like [`PlaylistController::show_track`] but starting at `byte_offset`.
    pub fn show_track_at(&mut self, path: impl AsRef<Path>, byte_offset: u64) -> Result<()> {
        let track = Track::open(path, &self.settings.library)?;
        self.show(track, Some(byte_offset))
    }

    pub fn play(&mut self) -> Result<()> {
        if self.is_playing() {
            return Ok(());
        }
        self.start_playback()
    }

    pub fn pause(&mut self) -> Result<()> {
        if !self.is_playing() {
            return Ok(());
        }
        self.halt();
        self.last_action = LastAction::Pause;
        self.set_state(PlaybackState::Paused);
        Ok(())
    }

    pub fn play_pause(&mut self) -> Result<()> {
        if self.is_playing() { self.pause() } else { self.play() }
    }

    /// Move on: the queue head if any, else a shuffled or the following sibling.
    pub fn skip_next(&mut self) -> Result<()> {
        let current = self.current.clone().ok_or(PlaybackError::NoTrack)?;
        self.last_action = LastAction::Skip;

        let was_playing = self.is_playing();
        self.halt();
        self.resume = None;

        let next = self.select_following(&current).unwrap_or(current);
        self.load(next, 0)?;
        self.after_skip(was_playing)
    }

    /// Restart the current track when at most `restart_tolerance_ms` in,
    /// otherwise go to the preceding sibling.
    pub fn skip_previous(&mut self) -> Result<()> {
        let current = self.current.clone().ok_or(PlaybackError::NoTrack)?;
        self.last_action = LastAction::Skip;

        let elapsed = self.elapsed_millis();
        let was_playing = self.is_playing();
        self.halt();
        self.resume = None;

        let restart = Duration::from_millis(elapsed) <= self.settings.playback.restart_tolerance();
        let target = if restart {
            debug!(elapsed, "previous within tolerance, restarting");
            current
        } else {
            self.select_preceding(&current).unwrap_or(current)
        };

        self.load(target, 0)?;
        if let Some(tracker) = &self.tracker {
            tracker.set_percent_in(0.0);
            tracker.update(false);
        }
        self.after_skip(was_playing)
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        debug!(shuffle = self.shuffle, "toggled shuffle");
        self.shuffle
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.repeat = !self.repeat;
        debug!(repeat = self.repeat, "toggled repeat");
        self.repeat
    }

    /// Queue `path` ahead of everything already queued. With no current
    /// track it is shown immediately instead.
    pub fn enqueue_next(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let track = Track::open(path, &self.settings.library)?;
        if self.current.is_none() {
            return self.show(track, None);
        }
        debug!(track = %track.display, "queued next");
        self.queue.push_front(track);
        Ok(())
    }

    /// Queue `path` behind everything already queued. With no current
    /// track it is shown immediately instead.
    pub fn enqueue_last(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let track = Track::open(path, &self.settings.library)?;
        if self.current.is_none() {
            return self.show(track, None);
        }
        debug!(track = %track.display, "queued last");
        self.queue.push_back(track);
        Ok(())
    }

    /// Jump to `percent` (0.0..=1.0) of the current track.
    pub fn seek(&mut self, percent: f32) -> Result<()> {
        let current = self.current.clone().ok_or(PlaybackError::NoTrack)?;
        let percent = percent.clamp(0.0, 1.0);
        self.last_action = LastAction::Scrub;

        let total = self
            .session
            .as_ref()
            .map(|s| s.total_length())
            .filter(|t| *t > 0)
            .or_else(|| fs::metadata(&current.path).ok().map(|m| m.len()))
            .unwrap_or(0);
        let offset = (total as f64 * percent as f64) as u64;

        let was_playing = self.is_playing();
        self.halt();
        self.resume = None;
        self.load(current, offset)?;

        if let Some(tracker) = &self.tracker {
            tracker.set_percent_in(percent);
            tracker.update(true);
            self.animator.reset(tracker.millis_in(), self.known_duration.as_ref().map(|(_, d)| *d));
        }

        if was_playing {
            self.start_playback()
        } else {
            if self.state == PlaybackState::Playing {
                self.set_state(PlaybackState::Paused);
            }
            Ok(())
        }
    }

    pub fn set_volume(&mut self, percent: u8) {
        self.volume = percent.min(100);
        if let Some(session) = &self.session {
            session.set_volume(self.volume as f32 / 100.0);
        }
        self.sink.volume(self.volume);
    }

    /// Kill playback, forget the current track and empty the queue.
    pub fn stop(&mut self) {
        self.halt();
        self.resume = None;
        self.session = None;
        if let Some(tracker) = self.tracker.take() {
            tracker.kill();
        }
        self.queue.clear();
        self.animator.reset(0, None);
        if self.current.take().is_some() {
            self.sink.track_changed(None);
        }
        self.last_action = LastAction::Unknown;
        self.set_state(PlaybackState::Stopped);
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::Completed { generation } => self.handle_completion(generation),
            SessionEvent::Failed { generation, error } => {
                self.handle_failure(generation, error);
                Ok(())
            }
        }
    }

    /// Natural end of session `generation`: queue head, else repeat, else
    /// shuffle, else the following sibling.
    pub fn handle_completion(&mut self, generation: u64) -> Result<()> {
        if !self.is_current_generation(generation) {
            debug!(generation, current = self.generation, "ignoring completion of a replaced session");
            return Ok(());
        }
        if self.last_action != LastAction::Play {
            debug!(last_action = ?self.last_action, "ignoring completion after a user action");
            return Ok(());
        }
        let Some(current) = self.current.clone() else {
            return Ok(());
        };

        self.halt();
        self.resume = None;

        let next = match self.queue.pop_playable() {
            Some(queued) => queued,
            None if self.repeat => current,
            None => match self.select_sibling(&current) {
                Some(t) => t,
                None => {
                    info!(track = %current.display, "nothing left to play");
                    self.set_state(PlaybackState::Stopped);
                    return Ok(());
                }
            },
        };

        self.load(next, 0)?;
        if let Some(tracker) = &self.tracker {
            tracker.set_percent_in(0.0);
            tracker.update(false);
        }
        self.animator.reset(0, self.current_duration());
        self.start_playback()
    }

    fn handle_failure(&mut self, generation: u64, err: PlaybackError) {
        if !self.is_current_generation(generation) {
            return;
        }
        error!(generation, "{err}");
        if let Some(tracker) = &self.tracker {
            tracker.pause_timer();
        }
        self.animator.set_state(AnimatorState::Stopped);
        self.set_state(PlaybackState::Stopped);
    }

    fn is_current_generation(&self, generation: u64) -> bool {
        self.session.as_ref().map(|s| s.generation()) == Some(generation)
    }

    fn show(&mut self, track: Track, byte_offset: Option<u64>) -> Result<()> {
        self.last_action = LastAction::FileChosen;

        let was_playing = self.is_playing();
        let same_track = self.current.as_ref().is_some_and(|c| c.path == track.path);
        if was_playing {
            self.halt();
        }

        let carried = if same_track { self.resume.take() } else { None };
        self.resume = None;
        let offset = byte_offset.or(carried.map(|r| r.offset)).unwrap_or(0);

        self.load(track, offset)?;

        if was_playing {
            self.start_playback()
        } else {
            let state = if carried.is_some() { PlaybackState::Paused } else { PlaybackState::Stopped };
            self.set_state(state);
            Ok(())
        }
    }

    fn after_skip(&mut self, was_playing: bool) -> Result<()> {
        self.animator.reset(0, self.current_duration());
        if was_playing {
            self.start_playback()
        } else {
            self.set_state(PlaybackState::Stopped);
            Ok(())
        }
    }

    /// Start (or restart) the current track: reuse a live session, else
    /// resume from the captured pause point, else begin at zero.
    fn start_playback(&mut self) -> Result<()> {
        let track = self.current.clone().ok_or(PlaybackError::NoTrack)?;

        let reusable = self.session.as_ref().is_some_and(|s| !s.is_killed());
        if !reusable {
            let offset = self.resume.map(|r| r.offset).unwrap_or(0);
            self.load(track, offset)?;
        }

        self.last_action = LastAction::Play;
        let started = match self.session.as_mut() {
            Some(session) => session.play(),
            None => Err(PlaybackError::NoTrack),
        };
        if let Err(e) = started {
            self.animator.set_state(AnimatorState::Stopped);
            self.set_state(PlaybackState::Stopped);
            return Err(e);
        }

        self.resume = None;
        if let Some(tracker) = &self.tracker {
            tracker.resume_timer();
        }
        self.animator.set_state(AnimatorState::Running);
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    /// Kill the live session, keeping where it stopped as the resume point.
    fn halt(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.remember_duration(&session);

        let millis = session.millis_in();
        self.animator.set_state(AnimatorState::Paused);
        let offset = session.kill();
        self.resume = Some(ResumePoint { offset, millis });

        if let Some(tracker) = &self.tracker {
            tracker.pause_timer();
        }
    }

    /// Replace the session (and its tracker) with a fresh one for `track`
    /// starting at `offset`. The old session is killed before the new one
    /// is built.
    fn load(&mut self, track: Track, offset: u64) -> Result<()> {
        if let Some(old) = self.session.take() {
            self.remember_duration(&old);
            old.kill();
        }
        if let Some(old) = self.tracker.take() {
            old.kill();
        }

        self.generation += 1;
        let mut session = PlaybackSession::new(
            track.clone(),
            self.generation,
            self.session_deps.clone(),
            SessionSettings {
                max_retries: self.settings.playback.max_retries,
                reaction_offset_bytes: self.settings.playback.reaction_offset_bytes,
            },
        );
        if let Some((path, duration)) = &self.known_duration {
            if *path == track.path {
                session.seed_duration(*duration);
            }
        }
        session.set_location(offset);
        session.set_volume(self.volume as f32 / 100.0);

        let tracker = PositionTracker::start(
            session.progress(),
            self.sink.clone(),
            Some(self.animator.clone()),
            self.interacting.clone(),
            self.settings.progress.poll_interval(),
        )?;
        let total = session.total_length();
        if offset > 0 && total > 0 {
            tracker.set_percent_in((offset as f64 / total as f64) as f32);
        }

        let changed = self.current.as_ref() != Some(&track);
        self.current = Some(track);
        if changed {
            if let Some(t) = &self.current {
                info!(track = %t.display, path = %t.path.display(), "current track");
            }
            self.sink.track_changed(self.current.as_ref());
        }

        self.session = Some(session);
        self.tracker = Some(tracker);
        Ok(())
    }

    fn remember_duration(&mut self, session: &PlaybackSession) {
        if let Some(d) = session.progress().duration() {
            self.known_duration = Some((session.track().path.clone(), d));
        }
    }

    fn current_duration(&self) -> Option<Duration> {
        self.session.as_ref().and_then(|s| s.progress().duration())
    }

    fn siblings(&self, track: &Track) -> Vec<PathBuf> {
        track
            .directory()
            .map(|dir| library::candidates(dir, &self.settings.library))
            .unwrap_or_default()
    }

    /// Queue head, else a sibling.
    fn select_following(&mut self, current: &Track) -> Option<Track> {
        self.queue
            .pop_playable()
            .or_else(|| self.select_sibling(current))
    }

    /// A random sibling other than `current` (shuffle), else the following one.
    fn select_sibling(&self, current: &Track) -> Option<Track> {
        let candidates = self.siblings(current);
        if candidates.is_empty() {
            return None;
        }
        let position = candidates.iter().position(|p| *p == current.path);

        let index = if self.shuffle {
            let exclude = position.unwrap_or(candidates.len());
            random_index_excluding(&mut rand::thread_rng(), candidates.len(), exclude)
        } else {
            position.map(|i| next_index(i, candidates.len())).unwrap_or(0)
        };
        self.open_candidate(&candidates[index])
    }

    fn select_preceding(&self, current: &Track) -> Option<Track> {
        let candidates = self.siblings(current);
        if candidates.is_empty() {
            return None;
        }
        let index = match candidates.iter().position(|p| *p == current.path) {
            Some(i) => previous_index(i, candidates.len()),
            None => candidates.len() - 1,
        };
        self.open_candidate(&candidates[index])
    }

    fn open_candidate(&self, path: &Path) -> Option<Track> {
        match Track::open(path, &self.settings.library) {
            Ok(t) => Some(t),
            Err(e) => {
                error!(path = %path.display(), "cannot select track: {e}");
                None
            }
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "playback state");
            self.state = state;
            self.sink.state_changed(state);
        }
    }
}

impl Drop for PlaylistController {
    fn drop(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.kill();
        }
        self.animator.set_state(AnimatorState::Stopped);
    }
}
