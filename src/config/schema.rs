use std::time::Duration;

use serde::Deserialize;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/encore/config.toml` or `~/.config/encore/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `ENCORE__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub playback: PlaybackSettings,
    pub progress: ProgressSettings,
    pub audio: AudioSettings,
    pub library: LibrarySettings,
    pub controls: ControlsSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Whether shuffle starts enabled.
    pub shuffle: bool,
    /// Whether repeat-current starts enabled.
    pub repeat: bool,
    /// Elapsed time (ms) under which "previous" restarts the current track.
    pub restart_tolerance_ms: u64,
    /// Bytes subtracted from a pause point so the resumed audio overlaps
    /// what the listener last heard.
    pub reaction_offset_bytes: u64,
    /// How many times a session restarts itself after a decode failure.
    pub max_retries: u32,
    /// Minimum gap (ms) between play/pause/skip key presses the terminal accepts.
    /// Set to 0 to accept every action.
    pub action_throttle_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            shuffle: false,
            repeat: false,
            restart_tolerance_ms: 5000,
            reaction_offset_bytes: 10_000,
            max_retries: 10,
            action_throttle_ms: 50,
        }
    }
}

impl PlaybackSettings {
    pub fn restart_tolerance(&self) -> Duration {
        Duration::from_millis(self.restart_tolerance_ms)
    }

    pub fn action_throttle(&self) -> Duration {
        Duration::from_millis(self.action_throttle_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressSettings {
    /// Interval between position polls (milliseconds).
    pub poll_interval_ms: u64,
    /// Delay between interpolation steps of the progress animator (milliseconds).
    pub animation_tick_ms: u64,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            animation_tick_ms: 2,
        }
    }
}

impl ProgressSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn animation_tick(&self) -> Duration {
        Duration::from_millis(self.animation_tick_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Initial output volume in percent (0..=100).
    pub volume: u8,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self { volume: 50 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether hidden files (dotfiles) are eligible for next/previous/shuffle.
    pub include_hidden: bool,
    /// File-stem suffix marking the processed variant of a track.
    pub variant_suffix: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "wav".into()],
            include_hidden: false,
            variant_suffix: "_Dreamy".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Percent of the track to seek when pressing `H` / `L`.
    pub scrub_percent: u8,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self { scrub_percent: 5 }
    }
}
