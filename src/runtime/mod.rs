//! The `encore` command-line front-end.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::warn;

use crate::audio::{AudioPlayer, ControllerDeps, LoftyProbe, RodioBackend};

mod event_loop;
mod logging;
mod settings;
mod terminal;

pub use terminal::{TerminalSink, format_millis};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    let settings = settings::load_settings();

    let files: Vec<PathBuf> = env::args_os().skip(1).map(PathBuf::from).collect();
    let Some((first, rest)) = files.split_first() else {
        return Err("usage: encore <file> [more files...]".into());
    };

    let sink = Arc::new(TerminalSink::new(settings.audio.volume));
    let player = AudioPlayer::new(
        &settings,
        ControllerDeps {
            backend: Arc::new(RodioBackend::open_default()?),
            probe: Arc::new(LoftyProbe::new()),
            sink: sink.clone(),
        },
    )?;

    player.show_track(first)?;
    for path in rest {
        if let Err(e) = player.enqueue_last(path) {
            warn!(path = %path.display(), "not queued: {e}");
        }
    }
    player.play()?;

    enable_raw_mode()?;
    let run_result = event_loop::run(&player, &settings, &sink);
    disable_raw_mode()?;
    println!();

    player.quit();
    run_result
}
