//! Track model and the directory listing that feeds next/previous/shuffle.

mod display;
mod model;
mod scan;

pub use display::display_name;
pub use model::Track;
pub use scan::{candidates, is_audio_file};

#[cfg(test)]
mod tests;
