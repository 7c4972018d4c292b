//! Scripted backend for tests.
//!
//! Every `open` yields a [`ScriptedOutput`] whose `play` blocks until the
//! test finishes it, fails it or the session closes it. Tests drive the
//! byte counter with [`ScriptedOutput::consume`].

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::{PlaybackError, Result};

use super::backend::{AudioBackend, AudioOutput};
use super::probe::DurationProbe;
use super::stream::TrackStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Finished,
    Closed,
    Failed,
}

pub struct ScriptedOutput {
    stream: Mutex<TrackStream>,
    start_byte: u64,
    path: PathBuf,
    outcome: Mutex<Option<Outcome>>,
    changed: Condvar,
    volume: Mutex<f32>,
}

impl ScriptedOutput {
    fn new(stream: TrackStream) -> Self {
        Self {
            start_byte: stream.start_byte(),
            path: stream.path().to_path_buf(),
            stream: Mutex::new(stream),
            outcome: Mutex::new(None),
            changed: Condvar::new(),
            volume: Mutex::new(1.0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn start_byte(&self) -> u64 {
        self.start_byte
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock().unwrap()
    }

    /// Read `bytes` through the stream, advancing the session's position.
    pub fn consume(&self, bytes: usize) {
        let mut buf = vec![0u8; bytes];
        let mut stream = self.stream.lock().unwrap();
        let mut read = 0;
        while read < bytes {
            match stream.read(&mut buf[read..]) {
                Ok(0) | Err(_) => break,
                Ok(n) => read += n,
            }
        }
    }

    /// Let the blocked `play` return successfully.
    pub fn finish(&self) {
        self.settle(Outcome::Finished);
    }

    /// Let the blocked `play` return a decode error.
    pub fn fail(&self) {
        self.settle(Outcome::Failed);
    }

    pub fn is_closed(&self) -> bool {
        *self.outcome.lock().unwrap() == Some(Outcome::Closed)
    }

    fn settle(&self, outcome: Outcome) {
        let mut slot = self.outcome.lock().unwrap();
        if slot.is_none() {
            *slot = Some(outcome);
        }
        self.changed.notify_all();
    }
}

impl AudioOutput for ScriptedOutput {
    fn play(&self) -> Result<()> {
        let mut slot = self.outcome.lock().unwrap();
        while slot.is_none() {
            slot = self.changed.wait(slot).unwrap();
        }
        match *slot {
            Some(Outcome::Finished) => Ok(()),
            Some(Outcome::Failed) => Err(PlaybackError::Decode("scripted failure".into())),
            _ => Err(PlaybackError::Closed),
        }
    }

    fn close(&self) {
        self.settle(Outcome::Closed);
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock().unwrap() = volume;
    }
}

#[derive(Default)]
pub struct ScriptedBackend {
    outputs: Mutex<Vec<Arc<ScriptedOutput>>>,
    opened: Condvar,
    failing_opens: AtomicU32,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `n` calls to `open` fail.
    pub fn fail_next_opens(&self, n: u32) {
        self.failing_opens.store(n, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.outputs.lock().unwrap().len()
    }

    /// Wait until at least `n` outputs have been opened and return the `n`th.
    pub fn wait_for_output(&self, n: usize) -> Arc<ScriptedOutput> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut outputs = self.outputs.lock().unwrap();
        while outputs.len() < n {
            let left = deadline
                .checked_duration_since(Instant::now())
                .unwrap_or_else(|| panic!("only {} of {n} outputs opened", outputs.len()));
            outputs = self.opened.wait_timeout(outputs, left).unwrap().0;
        }
        outputs[n - 1].clone()
    }
}

impl AudioBackend for ScriptedBackend {
    fn open(&self, stream: TrackStream, _duration: Option<Duration>) -> Result<Arc<dyn AudioOutput>> {
        let failing = self.failing_opens.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_opens.store(failing - 1, Ordering::SeqCst);
            return Err(PlaybackError::Decode("scripted open failure".into()));
        }

        let output = Arc::new(ScriptedOutput::new(stream));
        self.outputs.lock().unwrap().push(output.clone());
        self.opened.notify_all();
        Ok(output)
    }
}

/// Probe reporting the same duration for every file.
pub struct FixedProbe(pub Option<Duration>);

impl DurationProbe for FixedProbe {
    fn probe(&self, _path: &Path) -> Option<Duration> {
        self.0
    }
}
