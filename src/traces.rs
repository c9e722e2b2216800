//! Trace-based memo verification.
//!
//! A [`Traces`] map remembers, for every derived key that has ever been computed, the
//! value it produced and the dependencies (with fingerprints) it read to produce it.
//! Re-fetching the key replays those dependencies; if every fingerprint still matches,
//! the stored value is reused without re-running the rule. This is a cut-down version of
//! the teacher's `function/maybe_changed_after.rs`, which additionally tracks revisions,
//! cycle heads and durability to avoid even the shallow replay in the common case, this
//! kernel always does the replay, trading some of that constant-factor speed for a much
//! smaller implementation.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::hash::FxHashMap;
use crate::key::Key;
use crate::rules::{Rules, Writer};
use crate::task::{Erased, Task};
use crate::track::{track, Deps, Fingerprint};

/// Distinguishes a key whose value is allowed to be cached by dependency fingerprints
/// from one that reads external state directly and must always be re-executed.
///
/// Traces are never recorded for `Input` keys: they read external state directly, so no
/// recorded fingerprint could ever make them safe to skip re-running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Input,
    Derived,
}

struct Trace<Fp> {
    value: Erased,
    deps: Deps<Fp>,
}

/// The storage handle backing [`verify_traces`]: one recorded trace per derived key that
/// has ever been computed through it.
pub struct Traces<Fp> {
    map: Mutex<FxHashMap<Key, Trace<Fp>>>,
}

impl<Fp> Traces<Fp> {
    pub fn new() -> Self {
        Traces {
            map: Mutex::new(FxHashMap::default()),
        }
    }

    /// Drops every recorded trace, forcing full re-verification on the next fetch of any
    /// key. Coarse-grained invalidation for hosts that don't track reverse dependencies.
    pub fn clear(&self) {
        self.map.lock().clear();
    }
}

impl<Fp> Default for Traces<Fp> {
    fn default() -> Self {
        Self::new()
    }
}

/// Rules whose rule bodies additionally report whether each key is an [`Input`] or a
/// [`Derived`](TaskKind) computation: the shape [`verify_traces`] wraps.
pub trait RulesWithTaskKind: Send + Sync {
    fn fetch(&self, key: Key) -> Task<Writer<Erased, TaskKind>>;
}

impl<F> RulesWithTaskKind for F
where
    F: Fn(Key) -> Task<Writer<Erased, TaskKind>> + Send + Sync,
{
    fn fetch(&self, key: Key) -> Task<Writer<Erased, TaskKind>> {
        self(key)
    }
}

/// Replays `deps` (already in recorded order) against `rules`, stopping at the first
/// fingerprint mismatch rather than checking every dependency unconditionally, which is
/// why [`Deps`] is backed by `indexmap::IndexMap`: a later mismatch never needs to be
/// reached at all once an earlier one is found.
fn verify_deps<Fp: Fingerprint>(
    rules: Arc<dyn Rules>,
    mk_fingerprint: Arc<dyn Fn(&Key, &Erased) -> Fp + Send + Sync>,
    mut remaining: std::vec::IntoIter<(Key, Fp)>,
) -> Task<bool> {
    match remaining.next() {
        None => Task::done(true),
        Some((dep_key, old_fp)) => {
            let dep_key_for_fp = dep_key.clone();
            rules.clone().fetch(dep_key).bind(move |value| {
                let new_fp = mk_fingerprint(&dep_key_for_fp, &value);
                if new_fp != old_fp {
                    Task::done(false)
                } else {
                    verify_deps(rules, mk_fingerprint, remaining)
                }
            })
        }
    }
}

/// Wraps `next` (a rule set annotated with [`TaskKind`]) so that each key's value is
/// reused from `traces` whenever all of its recorded dependencies still fingerprint the
/// same, and is otherwise recomputed and re-recorded.
///
/// Dependency replay and re-recording route through `rules` (the full composed stack
/// this transformer is installed in) rather than through `next` alone, so live fetches
/// performed during verification flow back through whatever sits above this transformer
/// (e.g. `memoise`) and benefit from it too.
///
/// `Input`-tagged keys are never recorded and are therefore always recomputed, matching
/// the non-goal that extrinsic state is not cacheable by dependency fingerprint.
pub fn verify_traces<R, Fp, MkFp>(
    traces: Arc<Traces<Fp>>,
    rules: Arc<dyn Rules>,
    mk_fingerprint: MkFp,
    next: R,
) -> impl Rules
where
    R: RulesWithTaskKind + 'static,
    Fp: Fingerprint,
    MkFp: Fn(&Key, &Erased) -> Fp + Send + Sync + 'static,
{
    let mk_fingerprint: Arc<dyn Fn(&Key, &Erased) -> Fp + Send + Sync> = Arc::new(mk_fingerprint);
    let next = Arc::new(next);
    move |key: Key| -> Task<Erased> {
        let existing = {
            let map = traces.map.lock();
            map.get(&key)
                .map(|trace| (trace.value.clone(), trace.deps.clone()))
        };

        match existing {
            None => execute(Arc::clone(&traces), Arc::clone(&rules), Arc::clone(&mk_fingerprint), Arc::clone(&next), key),
            Some((old_value, deps)) => {
                let deps_vec: Vec<(Key, Fp)> = deps.into_iter().collect();
                let traces = Arc::clone(&traces);
                let rules_for_verify = Arc::clone(&rules);
                let rules_for_execute = Arc::clone(&rules);
                let mk_fingerprint_for_verify = Arc::clone(&mk_fingerprint);
                let mk_fingerprint_for_execute = Arc::clone(&mk_fingerprint);
                let next = Arc::clone(&next);
                let key_for_execute = key.clone();
                verify_deps(rules_for_verify, mk_fingerprint_for_verify, deps_vec.into_iter()).bind(
                    move |ok| {
                        if ok {
                            crate::event::log(crate::event::Event::new(
                                crate::event::EventKind::DidReuseMemoizedValue {
                                    key: key_for_execute,
                                },
                            ));
                            Task::done(old_value)
                        } else {
                            execute(traces, rules_for_execute, mk_fingerprint_for_execute, next, key_for_execute)
                        }
                    },
                )
            }
        }
    }
}

fn execute<R, Fp, MkFp>(
    traces: Arc<Traces<Fp>>,
    rules: Arc<dyn Rules>,
    mk_fingerprint: Arc<MkFp>,
    next: Arc<R>,
    key: Key,
) -> Task<Erased>
where
    R: RulesWithTaskKind + ?Sized,
    Fp: Fingerprint,
    MkFp: Fn(&Key, &Erased) -> Fp + Send + Sync + ?Sized + 'static,
{
    crate::event::log(crate::event::Event::new(crate::event::EventKind::WillExecute {
        key: key.clone(),
    }));
    let task = next.fetch(key.clone());
    let mk_fingerprint_for_track = Arc::clone(&mk_fingerprint);
    let tracked = track(rules, move |k, v| mk_fingerprint_for_track(k, v), task);
    tracked.map(move |(writer, deps)| {
        let Writer { value, written } = writer;
        if written == TaskKind::Derived {
            traces.map.lock().insert(key, Trace { value: value.clone(), deps });
        }
        value
    })
}
