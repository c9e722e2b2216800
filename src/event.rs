//! Structured logging of the points the engine itself can observe, via `tracing`.
//!
//! A trimmed version of the teacher's `Event`/`EventKind`/`salsa_event` hook: the
//! teacher's enum also covers interning, tracked-struct discarding and cancellation,
//! none of which this kernel has (no interner, no tracked structs, no revision-scoped
//! cancellation token). What's left are the three events below. Unlike the teacher, there is no overridable `salsa_event` callback: these always go
//! straight to `tracing`; a host that wants its own hook uses
//! [`crate::transformers::trace_fetch`] instead, which composes with this rather than
//! replacing it.

use std::fmt;

use crate::key::Key;

/// One notable thing the engine observed while resolving a fetch.
#[derive(Debug)]
pub struct Event {
    pub thread_id: std::thread::ThreadId,
    pub kind: EventKind,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Event {
            thread_id: std::thread::current().id(),
            kind,
        }
    }
}

#[derive(Debug)]
pub enum EventKind {
    /// A memoised value was reused without re-executing its rule, either because
    /// `memoise` already had it or because `verify_traces` confirmed every recorded
    /// dependency fingerprint still matches.
    DidReuseMemoizedValue { key: Key },
    /// This thread is about to block waiting for another thread's in-flight fetch of
    /// `key` to finish.
    WillBlockOn { key: Key },
    /// The rule for `key` is about to run (either for the first time, or because a
    /// dependency fingerprint mismatched).
    WillExecute { key: Key },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EventKind::DidReuseMemoizedValue { key } => {
                write!(f, "reused memoized value for {key:?}")
            }
            EventKind::WillBlockOn { key } => {
                write!(f, "blocking on in-flight fetch of {key:?}")
            }
            EventKind::WillExecute { key } => write!(f, "executing rule for {key:?}"),
        }
    }
}

/// Emits `event` at a verbosity matching how often it fires: `debug` for cache-reuse and
/// blocking, `trace` for rule execution (the highest-volume event, firing once per fetch
/// that actually runs a rule).
pub fn log(event: Event) {
    match &event.kind {
        EventKind::DidReuseMemoizedValue { .. } | EventKind::WillBlockOn { .. } => {
            tracing::debug!(thread_id = ?event.thread_id, "{event}");
        }
        EventKind::WillExecute { .. } => {
            tracing::trace!(thread_id = ?event.thread_id, "{event}");
        }
    }
}
