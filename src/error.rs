//! Error type shared by the engine.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The path does not carry one of the configured audio extensions.
    #[error("unsupported audio file: {}", .0.display())]
    UnsupportedFile(PathBuf),

    #[error("audio file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// A control operation needs a loaded track and there is none.
    #[error("no track loaded")]
    NoTrack,

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audio decode error: {0}")]
    Decode(String),

    #[error("audio output error: {0}")]
    Output(String),

    /// The output was closed underneath a blocking play call.
    #[error("audio output closed")]
    Closed,

    #[error("giving up on {} after {attempts} attempts", .path.display())]
    RetriesExhausted { path: PathBuf, attempts: u32 },

    /// The control thread has exited and can no longer take requests.
    #[error("playback engine is no longer running")]
    EngineGone,
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
