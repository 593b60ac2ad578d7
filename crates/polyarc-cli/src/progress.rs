//! Runs core operations on a worker thread and renders their events.
//!
//! The operation gets a [`Session`] bound to a channel sink; the calling
//! thread drains the channel, drives the progress bar and keeps every error
//! event for the command to report. Draining ends when the worker drops its
//! sink, which happens right after the operation's `Completed` event.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use polyarc_core::events::{self, ArchiveEvent, ErrorEvent, Phase, ProgressEvent};
use polyarc_core::{Session, SessionId};
use std::fmt::Write;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

/// Result of one operation plus the error events it emitted.
pub struct Outcome<T> {
    pub value: T,
    pub errors: Vec<ErrorEvent>,
}

/// Hands out session ids and runs operations.
pub struct Runner {
    show_progress: bool,
    next_session: AtomicU64,
}

impl Runner {
    pub const fn new(show_progress: bool) -> Self {
        Self {
            show_progress,
            next_session: AtomicU64::new(1),
        }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }

    /// Runs `operation` on a worker thread, rendering its events here.
    pub fn run<T, F>(&self, label: &str, operation: F) -> Outcome<T>
    where
        T: Send,
        F: FnOnce(&Session<'_>) -> T + Send,
    {
        let id = SessionId::new(self.next_session.fetch_add(1, Ordering::Relaxed));
        let (sink, receiver) = events::channel();
        let mut progress = CliProgress::new(label, self.show_progress);

        thread::scope(|scope| {
            let worker = scope.spawn(move || {
                let session = Session::new(id, &sink);
                operation(&session)
            });

            let mut errors = Vec::new();
            for event in receiver.iter() {
                match event {
                    ArchiveEvent::Progress(event) => progress.on_event(&event),
                    ArchiveEvent::Error(error) => errors.push(error),
                }
            }

            match worker.join() {
                Ok(value) => Outcome { value, errors },
                Err(panic) => std::panic::resume_unwind(panic),
            }
        })
    }
}

/// Progress bar driven by progress events. Hidden when not on a TTY.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(label: &str, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };

        // Template: "⠙ Adding [██████░░░░] 42/100 (12s) assets/app.js"
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner} {prefix} [{bar:30.cyan/blue}] {pos}/{len} ({eta}) {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{}", humanize_duration(state.eta())).unwrap_or(());
                })
                .progress_chars("█▓░"),
        );
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));

        Self { bar }
    }

    fn on_event(&mut self, event: &ProgressEvent) {
        match event.phase {
            Phase::Started => self.bar.set_message(event.message.clone()),
            Phase::Running => {
                if event.is_indeterminate() || event.denominator <= 0 {
                    self.bar.tick();
                } else {
                    self.bar.set_length(event.denominator.unsigned_abs());
                    self.bar.set_position(event.numerator.max(0).unsigned_abs());
                }
                self.bar.set_message(event.message.clone());
            }
            Phase::Completed => self.bar.finish_and_clear(),
        }
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Converts duration to human-readable format.
fn humanize_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyarc_core::ArchiveDescriptor;
    use polyarc_core::ArchiveError;
    use polyarc_core::events::ErrorKind;

    #[test]
    fn test_humanize_duration() {
        assert_eq!(humanize_duration(Duration::from_secs(0)), "0s");
        assert_eq!(humanize_duration(Duration::from_secs(30)), "30s");
        assert_eq!(humanize_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(humanize_duration(Duration::from_secs(3661)), "1h1m");
    }

    #[test]
    fn test_run_collects_errors_and_value() {
        let runner = Runner::new(false);
        let descriptor = ArchiveDescriptor::new("x.zip");

        let outcome = runner.run("Testing", |session| {
            let _scope = session.begin("test", Some(&descriptor));
            session.progress("a", 1, 2);
            session.error(
                ErrorKind::Integrity,
                "Archive test failed",
                &ArchiveError::InvalidArchive("bad".into()),
                Some(&descriptor),
            );
            7
        });

        assert_eq!(outcome.value, 7);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, ErrorKind::Integrity);
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        let runner = Runner::new(false);
        let first = runner.run("a", |session| session.id());
        let second = runner.run("b", |session| session.id());
        assert_ne!(first.value, second.value);
    }
}
