//! Esc or Ctrl-C while a submission is awaited abandons it.

use std::{
    io::{self, IsTerminal},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

use crate::cli::core::CliMode;
use crate::cli::ui::{prompts::RawModeGuard, test_mode};
use crate::submission::{AbortHandle, SubmissionSink};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Clone, Copy)]
enum KeySource {
    /// Scripted keys were read up front; `true` when they asked to abort.
    Scripted(bool),
    Terminal,
}

/// Background watcher; stopped and joined on drop.
pub struct AbortWatcher {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl AbortWatcher {
    /// Starts watching for the abort keys. Scripts without scripted keys
    /// have nothing to watch.
    pub fn start(sink: &SubmissionSink, mode: CliMode) -> io::Result<Option<Self>> {
        let source = if test_mode::is_enabled() {
            let keys = test_mode::next_key_sequence("submit")
                .ok()
                .flatten()
                .unwrap_or_default();
            KeySource::Scripted(keys.into_iter().any(is_abort_key))
        } else if mode == CliMode::Interactive && io::stdin().is_terminal() {
            KeySource::Terminal
        } else {
            return Ok(None);
        };

        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let sink = sink.clone();
        let handle = sink.abort_handle();
        let worker = thread::Builder::new()
            .name("submit-abort".into())
            .spawn(move || watch(source, &sink, &handle, &flag))?;
        Ok(Some(Self {
            stop,
            worker: Some(worker),
        }))
    }

    pub fn finish(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                debug!("abort watcher panicked");
            }
        }
    }
}

impl Drop for AbortWatcher {
    fn drop(&mut self) {
        self.halt();
    }
}

fn watch(source: KeySource, sink: &SubmissionSink, handle: &AbortHandle, stop: &AtomicBool) {
    let mut requested = matches!(source, KeySource::Scripted(true));
    let _raw = match source {
        KeySource::Terminal => match RawModeGuard::activate() {
            Ok(guard) => Some(guard),
            Err(err) => {
                debug!(error = %err, "raw mode unavailable; submission cannot be aborted");
                return;
            }
        },
        KeySource::Scripted(_) => None,
    };

    while !stop.load(Ordering::SeqCst) {
        // The request must be outstanding before the flag is raised.
        if requested && sink.is_in_flight() {
            debug!("submission abort requested from the keyboard");
            handle.abort();
            return;
        }
        match source {
            KeySource::Terminal => match poll_abort_key(POLL_INTERVAL) {
                Ok(pressed) => requested |= pressed,
                Err(err) => {
                    debug!(error = %err, "stopped reading keys");
                    return;
                }
            },
            KeySource::Scripted(_) => thread::sleep(POLL_INTERVAL),
        }
    }
}

fn poll_abort_key(timeout: Duration) -> io::Result<bool> {
    if !event::poll(timeout)? {
        return Ok(false);
    }
    Ok(matches!(
        event::read()?,
        Event::Key(key) if key.kind == KeyEventKind::Press && is_abort_key(key)
    ))
}

fn is_abort_key(key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => true,
        KeyCode::Char('c') | KeyCode::Char('C') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
