//! `Engine`: bundles the storage handles a full transformer stack needs, plus the
//! wiring to assemble that stack, for hosts that don't need to own the pieces
//! individually.
//!
//! `verify_traces` and `track_reverse_dependencies` both need a handle to the *complete*
//! composed stack (so their internal dependency re-fetches benefit from whatever sits
//! above them, e.g. `memoise`) before that stack has finished being built: a standard
//! tie-the-knot problem. [`Engine::build`] resolves it with a `OnceLock`-backed
//! placeholder (`LazyRules`) rather than `Arc::new_cyclic`, because the transformers
//! are assembled from `impl Rules`-returning free functions rather than one named type
//! `new_cyclic` could construct in place.

use std::sync::{Arc, OnceLock};

use crate::config::EngineConfig;
use crate::error::Error;
use crate::key::Key;
use crate::memo::{memoise, Slots};
use crate::reverse_deps::{track_reverse_dependencies, ReverseDeps};
use crate::rules::Rules;
use crate::task::{Erased, Task};
use crate::traces::{verify_traces, RulesWithTaskKind, Traces};
use crate::track::Fingerprint;

struct LazyRules(Arc<OnceLock<Arc<dyn Rules>>>);

impl Rules for LazyRules {
    fn fetch(&self, key: Key) -> Task<Erased> {
        self.0
            .get()
            .expect("LazyRules used before Engine::build finished wiring the stack")
            .fetch(key)
    }
}

/// Bundles the four storage handles a full memoising, trace-verifying, reverse-dependency
/// tracking `Rules` stack needs, plus engine-wide configuration.
///
/// Each field is independently `Arc`-shared state a host may also reach for directly
/// (e.g. to call [`crate::reverse_deps::reachable_reverse_dependencies`] for
/// invalidation); `Engine` just saves the bookkeeping of passing all four around
/// separately.
pub struct Engine<Fp> {
    pub slots: Arc<Slots>,
    pub traces: Arc<Traces<Fp>>,
    pub reverse_deps: Arc<ReverseDeps>,
    pub config: EngineConfig,
}

impl<Fp: Fingerprint> Engine<Fp> {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            slots: Arc::new(Slots::new()),
            traces: Arc::new(Traces::new()),
            reverse_deps: Arc::new(ReverseDeps::with_cap(config.reverse_deps_cap())),
            config,
        }
    }

    /// Wraps `base` (a rule set annotated with [`crate::traces::TaskKind`]) in the full
    /// stack: reverse-dependency tracking, then trace verification, then memoisation,
    /// outermost first. Returns the composed `Rules` a host then drives with
    /// [`crate::driver::run_task`].
    pub fn build<R>(
        &self,
        mk_fingerprint: impl Fn(&Key, &Erased) -> Fp + Send + Sync + 'static,
        base: R,
    ) -> Arc<dyn Rules>
    where
        R: RulesWithTaskKind + 'static,
    {
        let cell: Arc<OnceLock<Arc<dyn Rules>>> = Arc::new(OnceLock::new());
        let full_for_verify: Arc<dyn Rules> = Arc::new(LazyRules(Arc::clone(&cell)));
        let full_for_reverse_deps: Arc<dyn Rules> = Arc::new(LazyRules(Arc::clone(&cell)));

        // `base` answers `Writer<Erased, TaskKind>`-shaped tasks; `verify_traces` is the
        // layer that peels the `TaskKind` tag off and becomes a plain `Rules`, so it has
        // to sit directly on top of `base`, `track_reverse_dependencies` and `memoise`,
        // which both only know about plain `Rules`, stack above that.
        let verified = verify_traces(Arc::clone(&self.traces), full_for_verify, mk_fingerprint, base);
        let with_reverse_deps = track_reverse_dependencies(
            Arc::clone(&self.reverse_deps),
            full_for_reverse_deps,
            verified,
        );
        let memoised: Arc<dyn Rules> = Arc::new(memoise(Arc::clone(&self.slots), with_reverse_deps));

        cell.set(Arc::clone(&memoised))
            .unwrap_or_else(|_| unreachable!("cell is only set once, here"));
        memoised
    }

    /// Composes `ta` and `tb` applicatively under this engine's configured default
    /// [`crate::config::Parallelism`], so callers don't have to pass a strategy at every
    /// call site.
    pub fn zip_with<A: Send + 'static, B: Send + 'static, C: Send + 'static>(
        &self,
        ta: Task<A>,
        tb: Task<B>,
        f: impl FnOnce(A, B) -> C + Send + 'static,
    ) -> Task<C> {
        crate::task::zip_with(ta, tb, self.config.parallelism(), f)
    }
}

/// Runs `task` to completion against the stack in `rules`, converting a panic carrying
/// (or wrapping) an [`Error`] into a `Result` instead of letting it unwind past this call.
///
/// The host-facing entry point: everything below this is free to propagate failures as
/// ordinary Rust panics (see `error.rs`), which this function is the boundary for.
pub fn fetch<A: Send + 'static>(rules: &Arc<dyn Rules>, task: Task<A>) -> Result<A, Error> {
    let rules = Arc::clone(rules);
    Error::catch(std::panic::AssertUnwindSafe(move || {
        crate::driver::run_task(&*rules, task)
    }))
}
