use std::path::{Path, PathBuf};

use crate::config::LibrarySettings;
use crate::error::{PlaybackError, Result};

use super::display::display_name;
use super::scan::is_audio_file;

/// A validated reference to an audio file.
///
/// Immutable once constructed; the duration is not stored here because it is
/// probed lazily by the session that plays the track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    /// Human readable name, variant marker already resolved.
    pub display: String,
    /// Whether the file stem carries the configured variant suffix.
    pub variant: bool,
}

impl Track {
    /// Validate `path` and build a track for it.
    ///
    /// The path must name an existing regular file with a supported
    /// extension. It is canonicalized so that tracks compare equal to the
    /// entries produced by [`super::candidates`].
    pub fn open(path: impl AsRef<Path>, settings: &LibrarySettings) -> Result<Self> {
        let path = path.as_ref();
        if !is_audio_file(path, settings) {
            return Err(PlaybackError::UnsupportedFile(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(PlaybackError::MissingFile(path.to_path_buf()));
        }

        let path = path.canonicalize()?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN");
        let suffix = settings.variant_suffix.as_str();
        let variant = !suffix.is_empty() && stem.ends_with(suffix) && stem.len() > suffix.len();
        let display = display_name(stem, variant.then_some(suffix));

        Ok(Self {
            path,
            display,
            variant,
        })
    }

    /// Directory holding this track, used to list its siblings.
    pub fn directory(&self) -> Option<&Path> {
        self.path.parent()
    }
}
