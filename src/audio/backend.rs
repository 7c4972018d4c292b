//! The decode-and-play backend a session drives.
//!
//! A backend turns a [`TrackStream`] into an [`AudioOutput`] whose `play`
//! blocks until the audio has finished or the output was closed. The engine
//! only ever talks to these traits; [`RodioBackend`] is the real device and
//! tests substitute a scripted one.

use std::io::BufReader;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use rodio::mixer::Mixer;
use rodio::{Decoder, OutputStreamBuilder, Sink, Source};
use tracing::debug;

use crate::error::{PlaybackError, Result};

use super::stream::TrackStream;

pub trait AudioBackend: Send + Sync {
    /// Prepare `stream` for playback.
    ///
    /// `duration` is the probed length of the file, when known; backends use
    /// it to translate the stream's start offset into a time position.
    fn open(&self, stream: TrackStream, duration: Option<Duration>) -> Result<Arc<dyn AudioOutput>>;
}

pub trait AudioOutput: Send + Sync {
    /// Play to the end. Blocks the calling thread.
    ///
    /// Returns `Err(PlaybackError::Closed)` when [`AudioOutput::close`] ended
    /// playback early.
    fn play(&self) -> Result<()>;

    /// Stop playback and release the device. Safe to call more than once.
    fn close(&self);

    /// Linear volume, 0.0 to 1.0.
    fn set_volume(&self, volume: f32);
}

/// Backend playing through the default output device.
///
/// The rodio `OutputStream` lives on its own thread for as long as the
/// backend exists; sessions only share its mixer.
pub struct RodioBackend {
    mixer: Mixer,
    _keepalive: mpsc::Sender<()>,
}

impl RodioBackend {
    pub fn open_default() -> Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<Mixer, String>>();
        let (keepalive_tx, keepalive_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || match OutputStreamBuilder::open_default_stream() {
                Ok(mut stream) => {
                    // rodio logs to stderr when the stream is dropped; noisy in a terminal.
                    stream.log_on_drop(false);
                    let _ = ready_tx.send(Ok(stream.mixer().clone()));
                    // Returns once the backend (and its sender) is dropped.
                    let _ = keepalive_rx.recv();
                    debug!("closing audio output stream");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })?;

        let mixer = ready_rx
            .recv()
            .map_err(|_| PlaybackError::Output("audio output thread exited".into()))?
            .map_err(PlaybackError::Output)?;

        Ok(Self {
            mixer,
            _keepalive: keepalive_tx,
        })
    }
}

impl AudioBackend for RodioBackend {
    fn open(&self, stream: TrackStream, duration: Option<Duration>) -> Result<Arc<dyn AudioOutput>> {
        let fraction = stream.start_fraction();
        let path = stream.path().to_path_buf();
        let mut stream = stream;

        // Container headers live at the top of the file, so decode from byte 0
        // and skip forward in time instead of starting mid-stream.
        std::io::Seek::rewind(&mut stream)?;
        let decoder = Decoder::new(BufReader::new(stream))
            .map_err(|e| PlaybackError::Decode(format!("{}: {e}", path.display())))?;

        let skip = duration
            .or_else(|| decoder.total_duration())
            .map(|d| d.mul_f64(fraction))
            .unwrap_or(Duration::ZERO);

        let sink = Sink::connect_new(&self.mixer);
        sink.pause();
        sink.append(decoder.skip_duration(skip));

        Ok(Arc::new(RodioOutput {
            sink,
            closed: AtomicBool::new(false),
        }))
    }
}

struct RodioOutput {
    sink: Sink,
    closed: AtomicBool,
}

impl AudioOutput for RodioOutput {
    fn play(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PlaybackError::Closed);
        }
        self.sink.play();
        self.sink.sleep_until_end();

        if self.closed.load(Ordering::SeqCst) {
            Err(PlaybackError::Closed)
        } else {
            Ok(())
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.sink.stop();
        }
    }

    fn set_volume(&self, volume: f32) {
        self.sink.set_volume(volume.clamp(0.0, 1.0));
    }
}
