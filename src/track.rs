//! Dependency recording: run a task while noting the fingerprint of every key it
//! fetches, in the order it fetched them.
//!
//! Grounded in the teacher's dependency bookkeeping (`dependency.rs`, `active_query.rs`)
//! but simplified: the teacher accumulates dependencies in a thread-local "active query"
//! stack maintained by ambient attachment; this kernel has no such ambient context, so
//! the accumulator here is an explicit value threaded through [`trans_fetch`], shared
//! across concurrent branches through a `Mutex`-guarded [`crate::hash::FxIndexMap`]
//! (insertion order matters to the verifier in `traces.rs`, which replays dependencies in
//! the order they were first read and stops at the first mismatch).
//!
//! A pure task and one already running inside a monadic wrapper (the `Writer`-carrying
//! rule invocation `traces.rs` builds on) could in principle need two tracking entry
//! points, one over `Task<A>` and one over `Task<Writer<A, W>>`. Since every task here
//! already lives inside `Task`, the single function below plays both roles by tracking
//! whatever shape its caller hands it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::hash::FxIndexMap;
use crate::key::Key;
use crate::rules::Rules;
use crate::task::{trans_fetch, Erased, Task};

/// A value-derived summary of a dependency's result, whose equality implies equality of
/// that result. Usually a hash.
pub trait Fingerprint: Eq + Clone + Send + Sync + 'static {}
impl<T: Eq + Clone + Send + Sync + 'static> Fingerprint for T {}

/// The ordered dependency map `track` accumulates: key fetched, in the order first
/// fetched, to the fingerprint of its result.
pub type Deps<Fp> = FxIndexMap<Key, Fp>;

/// Runs `task` against `rules`, returning its result paired with the ordered dependency
/// map accumulated along the way.
///
/// Every `Fetch(k, _)` encountered while evaluating `task` is resolved by fetching `k`
/// through `rules` (so transitive dependencies are tracked too, by whichever
/// transformer sits below this one), fingerprinting the result with `mk_fingerprint`, and
/// merging `(k, fingerprint)` into the accumulator. A later fetch of an already-seen key
/// overwrites its fingerprint in place rather than duplicating the entry or moving it to
/// the back, this matters because the verifier in `traces.rs` replays deps in insertion
/// order.
pub fn track<A: Send + 'static, Fp: Fingerprint>(
    rules: Arc<dyn Rules>,
    mk_fingerprint: impl Fn(&Key, &Erased) -> Fp + Send + Sync + 'static,
    task: Task<A>,
) -> Task<(A, Deps<Fp>)> {
    let deps: Arc<Mutex<Deps<Fp>>> = Arc::new(Mutex::new(FxIndexMap::default()));
    let deps_for_phi = Arc::clone(&deps);
    let phi = move |key: Key| -> Task<Erased> {
        let deps = Arc::clone(&deps_for_phi);
        let mk_fingerprint_key = key.clone();
        rules.fetch(key).map(move |value: Erased| {
            let fp = mk_fingerprint(&mk_fingerprint_key, &value);
            // `IndexMap::insert` on an already-present key updates its value in place
            // without disturbing its position, which is exactly the merge semantics
            // the verifier in `traces.rs` relies on.
            deps.lock().insert(mk_fingerprint_key, fp);
            value
        })
    };
    let tracked = trans_fetch(task, phi);
    tracked.map(move |a| {
        let deps = Mutex::into_inner(
            Arc::try_unwrap(deps).unwrap_or_else(|shared| Mutex::new(shared.lock().clone())),
        );
        (a, deps)
    })
}
