//! The playback engine.
//!
//! [`AudioPlayer`] runs a [`PlaylistController`] on a control thread. The
//! controller creates one [`PlaybackSession`] at a time; each session plays a
//! [`TrackStream`] through an [`AudioBackend`] on its own worker and reports
//! completion back over the control channel.

mod backend;
mod controller;
mod player;
mod probe;
mod queue;
mod session;
mod stream;
mod thread;
mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{AudioBackend, AudioOutput, RodioBackend};
pub use controller::{ControllerDeps, PlaylistController, ResumePoint};
pub use player::AudioPlayer;
pub use probe::{DurationProbe, LoftyProbe};
pub use queue::TrackQueue;
pub use session::{PlaybackSession, SessionDeps, SessionProgress, SessionSettings};
pub use stream::TrackStream;
pub use types::{
    AudioCmd, ControlMsg, LastAction, PlaybackHandle, PlaybackInfo, PlaybackState, ProgressSample,
    Reply, SessionEvent,
};
