//! A small audio playback engine.
//!
//! One track is current at a time and is played by a single live session.
//! When it ends the engine moves on to the head of the play-next queue, a
//! random sibling (shuffle) or the following sibling in the track's
//! directory, or restarts it (repeat).

pub mod audio;
pub mod config;
pub mod error;
pub mod library;
pub mod progress;
pub mod runtime;
pub mod worker;

pub use audio::{AudioPlayer, ControllerDeps, PlaybackState, PlaylistController};
pub use config::Settings;
pub use error::{PlaybackError, Result};
pub use library::Track;
