//! Named background threads.
//!
//! Every long-running worker in the engine (session playback, tracker
//! polling, animator ticking) is started through [`spawn`]. The body runs
//! inside `catch_unwind`; a returned error or a panic is reported to the
//! central error sink instead of vanishing with the thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use tracing::error;

use crate::error::{PlaybackError, Result};

/// Spawn `body` on a thread called `name`.
pub fn spawn<F>(name: impl Into<String>, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    let name = name.into();
    let thread_name = name.clone();

    let handle = thread::Builder::new().name(thread_name).spawn(move || {
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => report(&name, &e),
            Err(payload) => report_panic(&name, payload),
        }
    })?;

    Ok(handle)
}

/// Central sink for failures that escape a worker.
pub fn report(worker: &str, err: &PlaybackError) {
    error!(target: "encore::worker", worker, "{err}");
}

fn report_panic(worker: &str, payload: Box<dyn Any + Send>) {
    let msg = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    error!(target: "encore::worker", worker, "worker panicked: {msg}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn spawn_runs_body_on_named_thread() {
        let (tx, rx) = mpsc::channel();
        let h = spawn("named-worker", move || {
            let _ = tx.send(thread::current().name().map(str::to_string));
            Ok(())
        })
        .unwrap();
        h.join().unwrap();
        assert_eq!(rx.recv().unwrap().as_deref(), Some("named-worker"));
    }

    #[test]
    fn spawn_contains_errors_and_panics() {
        let h = spawn("failing-worker", || Err(PlaybackError::NoTrack)).unwrap();
        assert!(h.join().is_ok());

        let h = spawn("panicking-worker", || panic!("boom")).unwrap();
        assert!(h.join().is_ok());
    }
}
