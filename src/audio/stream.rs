//! Byte-position bookkeeping for the file a session plays.
//!
//! The decoder reads through a [`TrackStream`]; every read and seek updates a
//! shared atomic so the session (and the tracker polling it) can tell how far
//! into the file playback has got without touching the decoder thread.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A file reader that publishes its current byte position.
pub struct TrackStream {
    inner: File,
    path: PathBuf,
    position: Arc<AtomicU64>,
    total_bytes: u64,
    start_byte: u64,
}

impl TrackStream {
    /// Open `path` and position the reader at `start_byte` (clamped to the file length).
    pub fn open(path: &Path, start_byte: u64, position: Arc<AtomicU64>) -> io::Result<Self> {
        let mut inner = File::open(path)?;
        let total_bytes = inner.metadata()?.len();
        let start_byte = start_byte.min(total_bytes);
        inner.seek(SeekFrom::Start(start_byte))?;
        position.store(start_byte, Ordering::SeqCst);

        Ok(Self {
            inner,
            path: path.to_path_buf(),
            position,
            total_bytes,
            start_byte,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Byte offset playback was asked to begin at.
    pub fn start_byte(&self) -> u64 {
        self.start_byte
    }

    /// `start_byte` as a fraction of the file, 0.0 for empty files.
    pub fn start_fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.start_byte as f64 / self.total_bytes as f64
        }
    }
}

impl Read for TrackStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position.fetch_add(n as u64, Ordering::SeqCst);
        Ok(n)
    }
}

impl Seek for TrackStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let at = self.inner.seek(pos)?;
        self.position.store(at, Ordering::SeqCst);
        Ok(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reads_and_seeks_publish_position() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        fs::write(&path, vec![0u8; 1000]).unwrap();

        let position = Arc::new(AtomicU64::new(0));
        let mut stream = TrackStream::open(&path, 400, position.clone()).unwrap();
        assert_eq!(stream.total_bytes(), 1000);
        assert_eq!(position.load(Ordering::SeqCst), 400);
        assert!((stream.start_fraction() - 0.4).abs() < f64::EPSILON);

        let mut buf = [0u8; 100];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(position.load(Ordering::SeqCst), 500);

        stream.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(position.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn start_byte_is_clamped_to_file_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        fs::write(&path, vec![0u8; 10]).unwrap();

        let position = Arc::new(AtomicU64::new(0));
        let stream = TrackStream::open(&path, 99, position.clone()).unwrap();
        assert_eq!(stream.start_byte(), 10);
        assert_eq!(position.load(Ordering::SeqCst), 10);
    }
}
