//! Audio-related small types and handles.
//!
//! This module defines the enums shared between the control thread, the
//! playback sessions and callers: playback state, the last-user-action
//! marker, commands, session events and the published playback snapshot.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::error::{PlaybackError, Result};
use crate::library::Track;

use super::session::SessionProgress;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// The most recent user intent.
///
/// Only used to tell whether a session's completion event still matters: a
/// completion is acted on only while the marker reads `Play`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LastAction {
    Play,
    Skip,
    Pause,
    Scrub,
    FileChosen,
    #[default]
    Unknown,
}

#[derive(Debug)]
pub enum AudioCmd {
    /// Load a file as the current track, keeping the play/pause state.
    ShowTrack(PathBuf),
    Play,
    Pause,
    /// Pause when playing, play otherwise.
    PlayPause,
    Next,
    Prev,
    ToggleShuffle,
    ToggleRepeat,
    /// Put a file at the head of the play-next queue.
    EnqueueNext(PathBuf),
    /// Put a file at the tail of the play-next queue.
    EnqueueLast(PathBuf),
    /// Jump to a fraction (0.0..=1.0) of the current track.
    Seek(f32),
    /// Output volume in percent.
    SetVolume(u8),
    /// Kill playback and forget the current track.
    Stop,
    /// Stop and exit the control thread.
    Quit,
}

/// What a session's worker reports when it is done.
#[derive(Debug)]
pub enum SessionEvent {
    /// Played to the end without being killed.
    Completed { generation: u64 },
    /// Gave up after exhausting its retry budget.
    Failed {
        generation: u64,
        error: PlaybackError,
    },
}

impl SessionEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Completed { generation } | Self::Failed { generation, .. } => *generation,
        }
    }
}

pub type Reply = Sender<Result<()>>;

/// Everything the control thread consumes, on a single channel.
///
/// Commands optionally carry a reply sender; sessions post their events here
/// so completion is handled on the same thread as user commands.
#[derive(Debug)]
pub enum ControlMsg {
    Cmd(AudioCmd, Option<Reply>),
    Session(SessionEvent),
}

/// Position derived from a session's byte counters.
///
/// Approximate for variable-bitrate audio: bytes consumed stand in for time.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ProgressSample {
    pub percent_in: f32,
    pub millis_in: u64,
}

#[derive(Debug, Clone, Default)]
/// Runtime playback information shared with callers.
pub struct PlaybackInfo {
    pub track: Option<Track>,
    pub state: PlaybackState,
    pub shuffle: bool,
    pub repeat: bool,
    pub queued: usize,
    pub volume: u8,
    pub last_action: LastAction,
    /// Live counters of the current session, if one exists.
    pub progress: Option<Arc<SessionProgress>>,
    /// Generation id of the current session, if one exists.
    pub generation: Option<u64>,
    /// Elapsed time captured at the last pause.
    pub paused_at_millis: u64,
}

impl PlaybackInfo {
    pub fn elapsed_millis(&self) -> u64 {
        self.progress
            .as_ref()
            .map(|p| p.sample().millis_in)
            .unwrap_or(self.paused_at_millis)
    }
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
