//! The engine's minimal error taxonomy.
//!
//! The core stays policy-neutral about rule failures in general, but the memoiser has
//! to resolve one question concretely: what does a blocked waiter see when the task
//! filling its slot panics? The safer of the two options is to fill the slot with a
//! reified failure and re-raise it on every read, and this is that reified failure,
//! grounded in the teacher's own
//! `Cancelled::PropagatedPanic` ("the query was blocked on another thread, and that
//! thread panicked", see `result.rs`).

use std::any::Any;
use std::fmt;

/// A host-visible failure.
///
/// Internally, a failure is propagated by panicking with `Error` as the payload (via
/// [`std::panic::panic_any`]) rather than by threading `Result` through every `Task`
/// combinator; [`Error::catch`] is the boundary that turns such a panic back into a
/// `Result` for a host-facing entry point, mirroring how `std::thread::JoinHandle`
/// surfaces a panicked thread's payload to its joiner.
#[derive(Debug, Clone)]
pub enum Error {
    /// A rule panicked (or a task it transitively depended on did); the message is the
    /// panic payload rendered to a string.
    Failed(String),
    /// The opt-in same-thread cycle detector observed a key being refetched by the
    /// thread currently executing its own rule.
    Cycle(String),
}

impl Error {
    pub(crate) fn propagated_panic() -> Self {
        Error::Failed("propagated panic from a dependent task".to_string())
    }

    pub(crate) fn cycle(key_debug: impl fmt::Debug) -> Self {
        Error::Cycle(format!("{key_debug:?}"))
    }

    fn from_panic_payload(payload: &(dyn Any + Send)) -> Self {
        if let Some(err) = payload.downcast_ref::<Error>() {
            return err.clone();
        }
        if let Some(s) = payload.downcast_ref::<&str>() {
            return Error::Failed((*s).to_string());
        }
        if let Some(s) = payload.downcast_ref::<String>() {
            return Error::Failed(s.clone());
        }
        Error::Failed("rule panicked with a non-string payload".to_string())
    }

    /// Runs `f`, converting a panic that unwinds out of it into an `Error` rather than
    /// letting it continue to unwind.
    ///
    /// This is the boundary a host calls at (e.g. [`crate::engine::Engine::fetch`]);
    /// everything below it (the `Task`/`Rules` stack) is free to propagate failures as
    /// ordinary Rust panics, which is simpler to get right inside a trampoline than
    /// threading `Result` through every combinator.
    pub fn catch<T>(f: impl FnOnce() -> T + std::panic::UnwindSafe) -> Result<T, Error> {
        std::panic::catch_unwind(f).map_err(|payload| Error::from_panic_payload(&*payload))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Failed(msg) => write!(f, "task failed: {msg}"),
            Error::Cycle(key) => write!(f, "cycle detected while fetching {key}"),
        }
    }
}

impl std::error::Error for Error {}
