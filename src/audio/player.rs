use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::config::Settings;
use crate::error::{PlaybackError, Result};
use crate::library::Track;
use crate::progress::ProgressAnimator;

use super::controller::{ControllerDeps, PlaylistController};
use super::thread::spawn_control_thread;
use super::types::{AudioCmd, ControlMsg, PlaybackHandle, PlaybackInfo};

/// Handle to the playback engine.
///
/// Owns the control thread. Request methods block until the command has been
/// applied; [`AudioPlayer::send`] fires and forgets.
pub struct AudioPlayer {
    tx: Sender<ControlMsg>,
    playback: PlaybackHandle,
    interacting: Arc<AtomicBool>,
    animator: Arc<ProgressAnimator>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    pub fn new(settings: &Settings, deps: ControllerDeps) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<ControlMsg>();
        let controller = PlaylistController::new(settings, deps, tx.clone());

        let interacting = controller.interaction_flag();
        let animator = controller.animator();
        let playback: PlaybackHandle = Arc::new(Mutex::new(controller.snapshot()));
        let join = spawn_control_thread(controller, rx, playback.clone())?;

        Ok(Self {
            tx,
            playback,
            interacting,
            animator,
            join: Mutex::new(Some(join)),
        })
    }

    pub fn playback_handle(&self) -> PlaybackHandle {
        self.playback.clone()
    }

    /// Set while the user drags a seek control; suppresses tracker pushes.
    pub fn interaction_flag(&self) -> Arc<AtomicBool> {
        self.interacting.clone()
    }

    pub fn animator(&self) -> Arc<ProgressAnimator> {
        self.animator.clone()
    }

    /// Queue `cmd` without waiting for it to be applied.
    pub fn send(&self, cmd: AudioCmd) -> Result<()> {
        self.tx
            .send(ControlMsg::Cmd(cmd, None))
            .map_err(|_| PlaybackError::EngineGone)
    }

    /// Send `cmd` and wait for the control thread's answer.
    pub fn request(&self, cmd: AudioCmd) -> Result<()> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(ControlMsg::Cmd(cmd, Some(reply_tx)))
            .map_err(|_| PlaybackError::EngineGone)?;
        reply_rx.recv().map_err(|_| PlaybackError::EngineGone)?
    }

    /// Deliver a session event as if a session worker had posted it.
    #[cfg(test)]
    pub(crate) fn post_session_event(&self, event: super::types::SessionEvent) -> Result<()> {
        self.tx
            .send(ControlMsg::Session(event))
            .map_err(|_| PlaybackError::EngineGone)
    }

    pub fn show_track(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.request(AudioCmd::ShowTrack(path.into()))
    }

    pub fn play(&self) -> Result<()> {
        self.request(AudioCmd::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.request(AudioCmd::Pause)
    }

    pub fn play_pause(&self) -> Result<()> {
        self.request(AudioCmd::PlayPause)
    }

    pub fn skip_next(&self) -> Result<()> {
        self.request(AudioCmd::Next)
    }

    pub fn skip_previous(&self) -> Result<()> {
        self.request(AudioCmd::Prev)
    }

    /// Returns the new shuffle flag.
    pub fn toggle_shuffle(&self) -> Result<bool> {
        self.request(AudioCmd::ToggleShuffle)?;
        Ok(self.info().shuffle)
    }

    /// Returns the new repeat flag.
    pub fn toggle_repeat(&self) -> Result<bool> {
        self.request(AudioCmd::ToggleRepeat)?;
        Ok(self.info().repeat)
    }

    pub fn enqueue_next(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.request(AudioCmd::EnqueueNext(path.into()))
    }

    pub fn enqueue_last(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.request(AudioCmd::EnqueueLast(path.into()))
    }

    pub fn seek(&self, percent: f32) -> Result<()> {
        self.request(AudioCmd::Seek(percent))
    }

    pub fn set_volume(&self, percent: u8) -> Result<()> {
        self.request(AudioCmd::SetVolume(percent))
    }

    pub fn stop(&self) -> Result<()> {
        self.request(AudioCmd::Stop)
    }

    /// Latest snapshot published by the control thread.
    pub fn info(&self) -> PlaybackInfo {
        self.playback
            .lock()
            .map(|info| info.clone())
            .unwrap_or_default()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.info().track
    }

    /// Read from the live session counters, not the last snapshot.
    pub fn is_playing(&self) -> bool {
        self.info().progress.is_some_and(|p| p.is_playing())
    }

    pub fn elapsed_millis(&self) -> u64 {
        self.info().elapsed_millis()
    }

    /// Stop playback and wait for the control thread to exit. Idempotent.
    pub fn quit(&self) {
        let _ = self.tx.send(ControlMsg::Cmd(AudioCmd::Quit, None));

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.quit();
    }
}
