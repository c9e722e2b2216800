//! Small, independent transformers: a side-channel writer, a version stamper, an
//! observational before/after hook, and a wrapper pinning applicative composition to
//! sequential order.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::hash::FxHashMap;
use crate::key::Key;
use crate::rules::{Rules, Writer};
use crate::task::{Erased, Task};

/// Wraps a [`crate::rules::RulesWithWriter`] so the side-channel value each rule writes
/// is consumed by `write` and stripped from the result, leaving an ordinary [`Rules`].
///
/// This is how [`TaskKind`](crate::traces::TaskKind) tagging reaches [`Traces`] without
/// widening the public query type: `rules.rs`'s `Writer` carries the side-channel tag
/// alongside the real answer, and `writer` is the transformer that peels it back off.
pub fn writer<W: Send + 'static>(
    write: impl Fn(&Key, &W) + Send + Sync + 'static,
    rules: impl crate::rules::RulesWithWriter<W> + 'static,
) -> impl Rules {
    move |key: Key| -> Task<Erased> {
        let key_for_write = key.clone();
        rules.fetch(key).map(move |Writer { value, written }| {
            write(&key_for_write, &written);
            value
        })
    }
}

/// The storage handle backing [`versioned`]: the version each key was last computed at.
pub struct Versions<V> {
    map: Mutex<FxHashMap<Key, V>>,
}

impl<V> Versions<V> {
    pub fn new() -> Self {
        Versions {
            map: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn get(&self, key: &Key) -> Option<V>
    where
        V: Clone,
    {
        self.map.lock().get(key).cloned()
    }
}

impl<V> Default for Versions<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps `rules` so that after each fetch of `key`, `versions[key]` is set to whatever
/// `current_version` returns at that moment.
///
/// A deliberately small stand-in for the teacher's `Revision`/`Durability` machinery:
/// there is no global revision counter threaded through this kernel, so a host that
/// wants one runs its own clock and passes it in as `current_version`; callers
/// compare the recorded version against their own clock to decide staleness on their own
/// terms.
pub fn versioned<R: Rules + 'static, V: Clone + Send + Sync + 'static>(
    versions: Arc<Versions<V>>,
    current_version: impl Fn() -> V + Send + Sync + 'static,
    rules: R,
) -> impl Rules {
    move |key: Key| -> Task<Erased> {
        let versions = Arc::clone(&versions);
        let key_for_version = key.clone();
        let version = current_version();
        rules.fetch(key).map(move |value| {
            versions.map.lock().insert(key_for_version, version);
            value
        })
    }
}

/// Wraps `rules` with observational hooks invoked immediately before and immediately
/// after every fetch.
///
/// Purely for side effects (logging, metrics, test assertions), neither closure can
/// change the result. Grounded in the teacher's `Event`/`EventKind`/`salsa_event` hook
/// (`event.rs`), generalised from a closed event enum to two caller-supplied closures
/// since this kernel has no fixed event set of its own; the built-in `tracing`
/// instrumentation (see `event.rs`) covers the events the teacher hard-codes, and this
/// transformer is for whatever a specific host additionally wants to observe.
pub fn trace_fetch<R: Rules + 'static>(
    before: impl Fn(&Key) + Send + Sync + 'static,
    after: impl Fn(&Key, &Erased) + Send + Sync + 'static,
    rules: R,
) -> impl Rules {
    move |key: Key| -> Task<Erased> {
        before(&key);
        let key_for_after = key.clone();
        rules.fetch(key).map(move |value| {
            after(&key_for_after, &value);
            value
        })
    }
}

/// Pins a scope's fetches to sequential (left-to-right) evaluation, suppressing the
/// parallel applicative specialisation [`crate::task::lift_base`] would otherwise be free
/// to use.
///
/// The applicative instance is sequential by default; the parallel strategy
/// (`rayon::join` under the `rayon` feature) is an optimisation some hosts must be able
/// to opt out of, e.g. when two sub-tasks are not actually independent despite
/// sharing no `Task`-visible data. `Sequential` wraps a pair of tasks so that the second
/// only begins once the first's continuation has run, by composing them with `bind`
/// instead of handing them to a parallel `LiftBase`.
pub struct Sequential<A, B> {
    first: Task<A>,
    second: Box<dyn FnOnce() -> Task<B> + Send>,
}

impl<A: Send + 'static, B: Send + 'static> Sequential<A, B> {
    pub fn new(first: Task<A>, second: impl FnOnce() -> Task<B> + Send + 'static) -> Self {
        Sequential {
            first,
            second: Box::new(second),
        }
    }

    pub fn run(self) -> Task<(A, B)> {
        let second = self.second;
        self.first
            .bind(move |a| second().map(move |b| (a, b)))
    }
}
