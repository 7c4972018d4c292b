use std::sync::mpsc::Receiver;
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::error::Result;
use crate::worker;

use super::controller::PlaylistController;
use super::types::{AudioCmd, ControlMsg, PlaybackHandle};

/// Run `controller` on its own thread, consuming `rx` until `Quit`.
///
/// The thread is the controller's only writer. After every message it
/// publishes a fresh snapshot to `playback`, then answers the caller.
pub(super) fn spawn_control_thread(
    mut controller: PlaylistController,
    rx: Receiver<ControlMsg>,
    playback: PlaybackHandle,
) -> Result<JoinHandle<()>> {
    worker::spawn("audio-control", move || {
        publish(&controller, &playback);

        // The controller holds a sender for its sessions, so `recv` only
        // fails if every player handle vanished without sending `Quit`.
        while let Ok(msg) = rx.recv() {
            match msg {
                ControlMsg::Cmd(AudioCmd::Quit, reply) => {
                    debug!("control thread quitting");
                    controller.stop();
                    publish(&controller, &playback);
                    if let Some(reply) = reply {
                        let _ = reply.send(Ok(()));
                    }
                    break;
                }
                ControlMsg::Cmd(cmd, reply) => {
                    let result = dispatch(&mut controller, cmd);
                    publish(&controller, &playback);
                    match reply {
                        Some(reply) => {
                            let _ = reply.send(result);
                        }
                        None => {
                            if let Err(e) = result {
                                warn!("command failed: {e}");
                            }
                        }
                    }
                }
                ControlMsg::Session(event) => {
                    if let Err(e) = controller.handle_session_event(event) {
                        worker::report("audio-control", &e);
                    }
                    publish(&controller, &playback);
                }
            }
        }
        Ok(())
    })
}

fn dispatch(controller: &mut PlaylistController, cmd: AudioCmd) -> Result<()> {
    match cmd {
        AudioCmd::ShowTrack(path) => controller.show_track(path),
        AudioCmd::Play => controller.play(),
        AudioCmd::Pause => controller.pause(),
        AudioCmd::PlayPause => controller.play_pause(),
        AudioCmd::Next => controller.skip_next(),
        AudioCmd::Prev => controller.skip_previous(),
        AudioCmd::ToggleShuffle => {
            controller.toggle_shuffle();
            Ok(())
        }
        AudioCmd::ToggleRepeat => {
            controller.toggle_repeat();
            Ok(())
        }
        AudioCmd::EnqueueNext(path) => controller.enqueue_next(path),
        AudioCmd::EnqueueLast(path) => controller.enqueue_last(path),
        AudioCmd::Seek(percent) => controller.seek(percent),
        AudioCmd::SetVolume(percent) => {
            controller.set_volume(percent);
            Ok(())
        }
        AudioCmd::Stop => {
            controller.stop();
            Ok(())
        }
        AudioCmd::Quit => Ok(()),
    }
}

fn publish(controller: &PlaylistController, playback: &PlaybackHandle) {
    if let Ok(mut info) = playback.lock() {
        *info = controller.snapshot();
    }
}
