//! Display-side companions of the engine.
//!
//! The [`PositionTracker`] polls the live session for its true elapsed time
//! and pushes it to a [`DisplaySink`]; the [`ProgressAnimator`] interpolates
//! between those samples so a progress indicator moves smoothly.

mod animator;
mod sink;
mod tracker;

pub use animator::{AnimatorState, ProgressAnimator};
pub use sink::{DisplaySink, NullSink};
pub use tracker::PositionTracker;

#[cfg(test)]
mod tests;
