//! At-most-once memoisation: the first fetch for a key runs the wrapped rule; every
//! other fetch for the same key, whether concurrent or later, observes the same result
//! without re-running it.
//!
//! Adapted from the teacher's `blocking_future.rs` `BlockingFuture`/`Promise` pair. The
//! differences follow from needing many readers instead of one: a [`Slot`] here is read
//! many times rather than consumed once (so it stays keyed in a shared map instead of
//! being handed out singly), its `Condvar` wakes every waiter rather than one, and its
//! "dead without being fulfilled" case carries a reified [`Error`] instead of `None` so a
//! waiter can re-raise the failure instead of silently getting nothing.

use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::{Condvar, Mutex};

use crate::error::Error;
use crate::hash::FxHashMap;
use crate::key::Key;
use crate::rules::Rules;
use crate::task::{Erased, Task};

enum State {
    Empty,
    Full(Erased),
    Failed(Error),
}

struct Slot {
    lock: Mutex<State>,
    cvar: Condvar,
    /// The thread that installed this slot and is responsible for filling it. Used only
    /// by the opt-in cycle check below; it never gates correctness of the blocking wait.
    claimed_by: ThreadId,
}

impl Slot {
    fn new() -> Self {
        Slot {
            lock: Mutex::new(State::Empty),
            cvar: Condvar::new(),
            claimed_by: std::thread::current().id(),
        }
    }

    /// Blocks the calling thread until the slot is no longer empty, then returns its
    /// result. Every waiter sees the same `Ok`/`Err` value; `Erased` is cheap to clone
    /// because it is `Arc`-backed.
    fn wait(&self) -> Result<Erased, Error> {
        let mut guard = self.lock.lock();
        loop {
            match &*guard {
                State::Empty => self.cvar.wait(&mut guard),
                State::Full(value) => return Ok(value.clone()),
                State::Failed(err) => return Err(err.clone()),
            }
        }
    }

    fn transition(&self, state: State) {
        let mut guard = self.lock.lock();
        *guard = state;
        self.cvar.notify_all();
    }
}

/// The fulfilment handle for a freshly claimed [`Slot`].
///
/// Carries the same "fill it exactly once, or it dies on drop" discipline as the
/// teacher's `Promise`: if the rule execution that owns this promise panics (or is
/// otherwise abandoned) before calling [`Promise::fulfil`], dropping the promise marks
/// the slot failed automatically, so no waiter blocks forever on a task that will never
/// produce a value. No `catch_unwind` is needed to make that work, it falls out of
/// ordinary Rust unwind-drop semantics.
struct Promise {
    fulfilled: bool,
    slot: Arc<Slot>,
}

impl Promise {
    fn fulfil(mut self, value: Erased) {
        self.fulfilled = true;
        self.slot.transition(State::Full(value));
    }
}

impl Drop for Promise {
    fn drop(&mut self) {
        if !self.fulfilled {
            self.slot.transition(State::Failed(Error::propagated_panic()));
        }
    }
}

/// The storage handle backing [`memoise`]: one slot per key that has ever been fetched
/// through it.
///
/// Caller-allocated state passed into the transformer, kept alive for as long as
/// memoisation should apply, typically the lifetime of one revision in a host that
/// invalidates and re-runs [`memoise`] with a fresh `Slots` per revision, or indefinitely
/// in a host with no invalidation at all.
#[derive(Default)]
pub struct Slots {
    map: Mutex<FxHashMap<Key, Arc<Slot>>>,
}

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }
}

struct Memoise<R> {
    slots: Arc<Slots>,
    next: R,
}

impl<R: Rules> Rules for Memoise<R> {
    fn fetch(&self, key: Key) -> Task<Erased> {
        let mut map = self.slots.map.lock();
        if let Some(slot) = map.get(&key) {
            let slot = Arc::clone(slot);
            drop(map);
            if slot.claimed_by == std::thread::current().id() {
                // This thread is already inside the rule that is supposed to fill this
                // very slot; waiting would deadlock forever. It can only get here by
                // transitively refetching a key it is still computing.
                let err = Error::cycle(&key);
                std::panic::panic_any(err);
            }
            crate::event::log(crate::event::Event::new(
                crate::event::EventKind::WillBlockOn { key: key.clone() },
            ));
            return match slot.wait() {
                Ok(value) => Task::done(value),
                Err(err) => std::panic::panic_any(err),
            };
        }

        let slot = Arc::new(Slot::new());
        map.insert(key.clone(), Arc::clone(&slot));
        drop(map);

        let promise = Promise {
            fulfilled: false,
            slot,
        };
        self.next.fetch(key).bind(move |value: Erased| {
            promise.fulfil(value.clone());
            Task::done(value)
        })
    }
}

/// Wraps `next` so that each key is fetched through it at most once; concurrent or later
/// fetches of an already-seen key observe the first run's result (or, if that run failed,
/// re-raise the same failure) instead of invoking `next` again.
pub fn memoise<R: Rules + 'static>(slots: Arc<Slots>, next: R) -> impl Rules {
    Memoise { slots, next }
}
