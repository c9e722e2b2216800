//! Reverse-dependency tracking and invalidation.
//!
//! `rev` maps a key to the set of keys known to depend on it. It is built incrementally
//! by wrapping a rule set with [`track_reverse_dependencies`], and consumed by
//! [`reachable_reverse_dependencies`] to compute, given a changed input, the full set of
//! keys whose cached results can no longer be trusted.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::ReverseDepsCap;
use crate::hash::{FxHashMap, FxHashSet, FxIndexSet};
use crate::key::Key;
use crate::rules::Rules;
use crate::task::{Erased, Task};
use crate::track::track;

/// The storage handle backing [`track_reverse_dependencies`]: `rev[d]` is the set of keys
/// observed to have fetched `d`.
pub struct ReverseDeps {
    rev: Mutex<FxHashMap<Key, FxHashSet<Key>>>,
    cap: Option<ReverseDepsCap>,
}

impl ReverseDeps {
    pub fn new() -> Self {
        ReverseDeps {
            rev: Mutex::new(FxHashMap::default()),
            cap: None,
        }
    }

    /// Caps the number of distinct keys `rev` is allowed to hold entries for. Once the
    /// cap is reached, recording a brand new key's edges evicts some other key's edges
    /// first (picked arbitrarily, there is no revision ordering available to do better).
    pub fn with_cap(cap: Option<ReverseDepsCap>) -> Self {
        ReverseDeps {
            rev: Mutex::new(FxHashMap::default()),
            cap,
        }
    }
}

impl Default for ReverseDeps {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps `next` so that every fetch of `key` records, for each dependency `d` it reads,
/// that `key` depends on `d`, i.e. folds `key` into `rev[d]`.
///
/// Stale edges from a key's previous execution are never removed here, only ever added
/// to; that staleness is tolerated because [`reachable_reverse_dependencies`] is used
/// conservatively (over-invalidating is safe, under-invalidating is not).
pub fn track_reverse_dependencies<R: Rules + 'static>(
    rev: Arc<ReverseDeps>,
    rules: Arc<dyn Rules>,
    next: R,
) -> impl Rules {
    move |key: Key| -> Task<Erased> {
        let rules = Arc::clone(&rules);
        let rev = Arc::clone(&rev);
        let key_for_edges = key.clone();
        let task = next.fetch(key);
        track(rules, |_, _| (), task).map(move |(value, deps)| {
            let mut guard = rev.rev.lock();
            for (dep, ()) in deps {
                let is_new = !guard.contains_key(&dep);
                if is_new {
                    if let Some(ReverseDepsCap(cap)) = rev.cap {
                        if guard.len() >= cap {
                            if let Some(victim) = guard.keys().next().cloned() {
                                guard.remove(&victim);
                            }
                        }
                    }
                }
                guard.entry(dep).or_default().insert(key_for_edges.clone());
            }
            value
        })
    }
}

/// Performs a depth-first reachability closure from `root` through `rev`'s edges,
/// returning the visited keys and the remaining edges with every visited key's outgoing
/// edges removed.
///
/// Removing edges as they're traversed serves two purposes at once: it is the visited
/// set (a key is visited iff its edges have been removed) and it leaves `rev` holding
/// exactly the edges that survive invalidating the reachable set. Callers use the
/// returned visited set to purge the memo table and traces for every key that
/// transitively depended on `root`.
pub fn reachable_reverse_dependencies(root: Key, rev: &ReverseDeps) -> FxIndexSet<Key> {
    let mut visited = FxIndexSet::default();
    let mut stack = vec![root];
    while let Some(key) = stack.pop() {
        if !visited.insert(key.clone()) {
            continue;
        }
        let dependents = {
            let mut rev = rev.rev.lock();
            rev.remove(&key)
        };
        if let Some(dependents) = dependents {
            stack.extend(dependents);
        }
    }
    visited
}
