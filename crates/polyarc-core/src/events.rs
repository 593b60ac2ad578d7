//! Progress and error events for long-running archive operations.
//!
//! Every provider operation runs inside an [`OperationScope`]: it emits a
//! `Started` event when the operation begins and a `Completed` event when the
//! scope is dropped. Because the completion is emitted from `Drop`, it fires
//! on early returns, on error paths, and while unwinding from a panic, so a
//! listener blocking on completion is always released.
//!
//! Events are delivered through an [`EventSink`]. [`ChannelSink`] forwards
//! them over a `crossbeam-channel`, which keeps emission order and lets the
//! listener live on another thread.
//!
//! # Examples
//!
//! ```
//! use polyarc_core::events::{self, ArchiveEvent, Session, SessionId};
//!
//! let (sink, receiver) = events::channel();
//! let session = Session::new(SessionId::new(7), &sink);
//! {
//!     let _scope = session.begin("Listing", None);
//!     session.progress("entry 1 of 2", 1, 2);
//! }
//! let received: Vec<ArchiveEvent> = receiver.try_iter().collect();
//! assert_eq!(received.len(), 3);
//! assert!(received.last().is_some_and(ArchiveEvent::is_completed));
//! ```

use std::fmt;
use std::io::Read;
use std::path::PathBuf;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;

use crate::ArchiveError;
use crate::descriptor::ArchiveDescriptor;

/// Denominator value meaning "progress is indeterminate".
pub const INDETERMINATE: i64 = -1;

/// Caller-chosen identifier correlating events with the call that caused them.
///
/// It carries no locking semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(u64);

impl SessionId {
    /// Wraps a raw session number.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw session number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle phase of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The operation has begun.
    Started,
    /// Intermediate progress.
    Running,
    /// Terminal event; always the last event of an operation.
    Completed,
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Session that emitted the event.
    pub session_id: SessionId,
    /// Lifecycle phase.
    pub phase: Phase,
    /// Short human-readable status.
    pub message: String,
    /// Work done so far.
    pub numerator: i64,
    /// Total work, or [`INDETERMINATE`].
    pub denominator: i64,
}

impl ProgressEvent {
    /// Returns `true` when the total amount of work is unknown.
    #[must_use]
    pub const fn is_indeterminate(&self) -> bool {
        self.denominator == INDETERMINATE
    }
}

/// Error taxonomy carried by [`ErrorEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Filesystem or stream failure.
    Io,
    /// A stored checksum did not match.
    Integrity,
    /// The format or platform cannot do what was asked; needs a human decision.
    Unsupported,
    /// A rewrite-and-swap mutation was aborted; the original is intact.
    Mutation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Io => "I/O failure",
            Self::Integrity => "integrity failure",
            Self::Unsupported => "unsupported operation",
            Self::Mutation => "mutation failure",
        };
        f.write_str(name)
    }
}

/// Redacted view of the descriptor an error refers to.
///
/// Only identity fields are copied; option values and the password are not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSummary {
    /// Archive path.
    pub path: PathBuf,
    /// Format tag.
    pub format: String,
}

impl From<&ArchiveDescriptor> for DescriptorSummary {
    fn from(descriptor: &ArchiveDescriptor) -> Self {
        Self {
            path: descriptor.path().to_path_buf(),
            format: descriptor.format().to_string(),
        }
    }
}

/// A failure meant for human-facing surfacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Progress fields (phase is always `Running`).
    pub progress: ProgressEvent,
    /// Which class of failure this is.
    pub kind: ErrorKind,
    /// Dialog-style title, e.g. "Cannot list archive".
    pub title: String,
    /// One-line header, usually the archive path.
    pub header: String,
    /// Full description.
    pub body: String,
    /// Underlying cause as reported by the failing component.
    pub cause: String,
    /// The archive involved, if any.
    pub descriptor: Option<DescriptorSummary>,
}

/// Anything delivered on the progress channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveEvent {
    /// Progress notification.
    Progress(ProgressEvent),
    /// Error notification.
    Error(ErrorEvent),
}

impl ArchiveEvent {
    /// Session the event belongs to.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        match self {
            Self::Progress(p) => p.session_id,
            Self::Error(e) => e.progress.session_id,
        }
    }

    /// Returns `true` for the terminal `Completed` event.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Progress(p) if p.phase == Phase::Completed)
    }

    /// Returns the error payload, if this is an error event.
    #[must_use]
    pub const fn as_error(&self) -> Option<&ErrorEvent> {
        match self {
            Self::Error(e) => Some(e),
            Self::Progress(_) => None,
        }
    }
}

/// Destination for archive events.
///
/// Implementations must be cheap and must not block for long: they are
/// called from the thread doing the I/O.
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    fn emit(&self, event: ArchiveEvent);
}

impl<F> EventSink for F
where
    F: Fn(ArchiveEvent) + Send + Sync,
{
    fn emit(&self, event: ArchiveEvent) {
        self(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: ArchiveEvent) {}
}

/// Sink forwarding events over a crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<ArchiveEvent>,
}

impl ChannelSink {
    /// Wraps an existing sender.
    #[must_use]
    pub const fn new(sender: Sender<ArchiveEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ArchiveEvent) {
        // A listener that went away is not an operation failure.
        let _ = self.sender.send(event);
    }
}

/// Creates an unbounded event channel.
#[must_use]
pub fn channel() -> (ChannelSink, Receiver<ArchiveEvent>) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (ChannelSink::new(sender), receiver)
}

/// A session id bound to the sink its events go to.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    id: SessionId,
    events: &'a dyn EventSink,
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<'a> Session<'a> {
    /// Binds `id` to `events`.
    #[must_use]
    pub fn new(id: SessionId, events: &'a dyn EventSink) -> Self {
        Self { id, events }
    }

    /// Session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Emits `Started` and returns the guard that emits `Completed`.
    #[must_use = "dropping the scope immediately emits the completion event"]
    pub fn begin(
        &self,
        operation: &'static str,
        descriptor: Option<&ArchiveDescriptor>,
    ) -> OperationScope<'a> {
        let message = descriptor.map_or_else(
            || operation.to_string(),
            |d| format!("{operation} {}", d.path().display()),
        );
        self.emit_progress(Phase::Started, message, 0, INDETERMINATE);
        OperationScope {
            session: *self,
            operation,
        }
    }

    /// Emits a `Running` event.
    pub fn progress(&self, message: impl Into<String>, numerator: i64, denominator: i64) {
        self.emit_progress(Phase::Running, message.into(), numerator, denominator);
    }

    /// Emits an error event derived from `err`.
    pub fn error(
        &self,
        kind: ErrorKind,
        title: impl Into<String>,
        err: &ArchiveError,
        descriptor: Option<&ArchiveDescriptor>,
    ) {
        let title = title.into();
        let header = descriptor.map_or_else(
            || title.clone(),
            |d| d.path().display().to_string(),
        );
        let cause = std::error::Error::source(err)
            .map_or_else(|| format!("{err:?}"), ToString::to_string);
        self.events.emit(ArchiveEvent::Error(ErrorEvent {
            progress: ProgressEvent {
                session_id: self.id,
                phase: Phase::Running,
                message: title.clone(),
                numerator: 0,
                denominator: INDETERMINATE,
            },
            kind,
            title,
            header,
            body: err.to_string(),
            cause,
            descriptor: descriptor.map(DescriptorSummary::from),
        }));
    }

    fn emit_progress(&self, phase: Phase, message: String, numerator: i64, denominator: i64) {
        self.events.emit(ArchiveEvent::Progress(ProgressEvent {
            session_id: self.id,
            phase,
            message,
            numerator,
            denominator,
        }));
    }
}

/// Guard that emits the terminal `Completed` event when dropped.
pub struct OperationScope<'a> {
    session: Session<'a>,
    operation: &'static str,
}

impl fmt::Debug for OperationScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationScope")
            .field("session", &self.session.id)
            .field("operation", &self.operation)
            .finish()
    }
}

impl Drop for OperationScope<'_> {
    fn drop(&mut self) {
        self.session.emit_progress(
            Phase::Completed,
            format!("{} finished", self.operation),
            0,
            INDETERMINATE,
        );
    }
}

/// Reader that reports bytes read as `Running` events.
///
/// Reports are batched: an event goes out each time `batch_threshold` bytes
/// accumulate, and once more when the reader is dropped.
pub struct ProgressReader<'a, R> {
    inner: R,
    session: Session<'a>,
    message: String,
    total: i64,
    read_so_far: u64,
    bytes_since_last_update: u64,
    batch_threshold: u64,
}

impl<'a, R> ProgressReader<'a, R> {
    /// Wraps `inner`; `total` is the expected byte count, if known.
    #[must_use]
    pub fn new(inner: R, session: Session<'a>, message: impl Into<String>, total: Option<u64>) -> Self {
        Self {
            inner,
            session,
            message: message.into(),
            total: total.map_or(INDETERMINATE, saturating_i64),
            read_so_far: 0,
            bytes_since_last_update: 0,
            batch_threshold: 1024 * 1024,
        }
    }

    /// Overrides the 1 MB default batch size.
    #[must_use]
    pub const fn with_batch_threshold(mut self, batch_threshold: u64) -> Self {
        self.batch_threshold = batch_threshold;
        self
    }

    /// Emits any bytes not yet reported.
    pub fn flush_progress(&mut self) {
        if self.bytes_since_last_update > 0 {
            self.session.progress(
                self.message.clone(),
                saturating_i64(self.read_so_far),
                self.total,
            );
            self.bytes_since_last_update = 0;
        }
    }
}

impl<R: Read> Read for ProgressReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let bytes_read = self.inner.read(buf)?;
        if bytes_read > 0 {
            self.read_so_far += bytes_read as u64;
            self.bytes_since_last_update += bytes_read as u64;
            if self.bytes_since_last_update >= self.batch_threshold {
                self.flush_progress();
            }
        }
        Ok(bytes_read)
    }
}

impl<R> Drop for ProgressReader<'_, R> {
    fn drop(&mut self) {
        self.flush_progress();
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unused_io_amount)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(receiver: &Receiver<ArchiveEvent>) -> Vec<ArchiveEvent> {
        receiver.try_iter().collect()
    }

    #[test]
    fn test_scope_emits_started_then_completed() {
        let (sink, receiver) = channel();
        let session = Session::new(SessionId::new(1), &sink);
        drop(session.begin("Testing", None));

        let events = collect(&receiver);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            ArchiveEvent::Progress(p) if p.phase == Phase::Started
        ));
        assert!(events[1].is_completed());
    }

    #[test]
    fn test_scope_completes_on_panic() {
        let (sink, receiver) = channel();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let session = Session::new(SessionId::new(2), &sink);
            let _scope = session.begin("Exploding", None);
            panic!("provider blew up");
        }));
        assert!(result.is_err());

        let events = collect(&receiver);
        assert!(events.last().unwrap().is_completed());
    }

    #[test]
    fn test_error_event_carries_kind_and_summary() {
        let (sink, receiver) = channel();
        let session = Session::new(SessionId::new(3), &sink);
        let mut descriptor = ArchiveDescriptor::new("/tmp/data.zip");
        descriptor.properties_mut().set_password("hunter2");
        let err = ArchiveError::EntryNotFound {
            path: "missing.txt".into(),
        };

        session.error(ErrorKind::Io, "Cannot extract", &err, Some(&descriptor));

        let events = collect(&receiver);
        let error = events[0].as_error().unwrap();
        assert_eq!(error.kind, ErrorKind::Io);
        assert_eq!(error.title, "Cannot extract");
        assert!(error.body.contains("missing.txt"));
        assert_eq!(error.descriptor.as_ref().unwrap().format, "zip");
        assert!(!format!("{error:?}").contains("hunter2"));
    }

    #[test]
    fn test_events_cross_threads_in_order() {
        let (sink, receiver) = channel();
        let worker = std::thread::spawn(move || {
            let session = Session::new(SessionId::new(4), &sink);
            let _scope = session.begin("Counting", None);
            for i in 1..=5 {
                session.progress("tick", i, 5);
            }
        });
        worker.join().unwrap();

        let numerators: Vec<i64> = receiver
            .iter()
            .filter_map(|e| match e {
                ArchiveEvent::Progress(p) if p.phase == Phase::Running => Some(p.numerator),
                _ => None,
            })
            .collect();
        assert_eq!(numerators, vec![1, 2, 3, 4, 5]);
    }

    fn read_in_chunks(len: usize, receiver: &Receiver<ArchiveEvent>, sink: &ChannelSink) -> Vec<i64> {
        let session = Session::new(SessionId::new(5), sink);
        let total = u64::try_from(len).unwrap();
        let mut reader = ProgressReader::new(Cursor::new(vec![0u8; len]), session, "copying", Some(total))
            .with_batch_threshold(4_096);

        let mut buffer = vec![0u8; 1_000];
        while reader.read(&mut buffer).unwrap() > 0 {}
        drop(reader);

        collect(receiver)
            .iter()
            .filter_map(|event| match event {
                ArchiveEvent::Progress(p) => Some(p.numerator),
                ArchiveEvent::Error(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_progress_reader_batches() {
        let (sink, receiver) = channel();
        // 1 000-byte reads cross the 4 096 threshold at 5 000 and 10 000;
        // nothing is left for the drop-time flush.
        assert_eq!(read_in_chunks(10_000, &receiver, &sink), vec![5_000, 10_000]);
    }

    #[test]
    fn test_progress_reader_flushes_tail_on_drop() {
        let (sink, receiver) = channel();
        assert_eq!(read_in_chunks(9_000, &receiver, &sink), vec![5_000, 9_000]);
    }

    #[test]
    fn test_closure_sink() {
        let counter = std::sync::atomic::AtomicUsize::new(0);
        let sink = |_event: ArchiveEvent| {
            counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        };
        let session = Session::new(SessionId::new(6), &sink);
        session.progress("one", 1, INDETERMINATE);
        assert_eq!(counter.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId::from(42).to_string(), "#42");
        assert_eq!(SessionId::new(9).get(), 9);
    }
}
