//! Duration probing.
//!
//! Reading a file's length can be slow, so sessions probe on a background
//! thread and treat a failed probe as "unknown" rather than an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use lofty::file::AudioFile;
use tracing::warn;

pub trait DurationProbe: Send + Sync {
    /// Length of the audio in `path`, or `None` when it cannot be determined.
    fn probe(&self, path: &Path) -> Option<Duration>;
}

/// Probe backed by lofty's property reader, memoized per path.
#[derive(Default)]
pub struct LoftyProbe {
    cache: Mutex<HashMap<PathBuf, Duration>>,
}

impl LoftyProbe {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurationProbe for LoftyProbe {
    fn probe(&self, path: &Path) -> Option<Duration> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(d) = cache.get(path) {
                return Some(*d);
            }
        }

        let duration = match lofty::read_from_path(path) {
            Ok(tagged) => tagged.properties().duration(),
            Err(e) => {
                warn!(path = %path.display(), "duration probe failed: {e}");
                return None;
            }
        };

        // lofty reports zero for streams it could not measure.
        if duration.is_zero() {
            return None;
        }

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(path.to_path_buf(), duration);
        }
        Some(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn unreadable_files_probe_as_unknown() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.mp3");
        fs::write(&path, b"definitely not mpeg audio").unwrap();

        let probe = LoftyProbe::new();
        assert_eq!(probe.probe(&path), None);
        assert_eq!(probe.probe(&dir.path().join("missing.mp3")), None);
    }
}
