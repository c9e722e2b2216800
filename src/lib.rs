//! A demand-driven incremental computation kernel.
//!
//! A host defines its units of work as [`key::Query`] types and registers rules that
//! compute them as [`task::Task`]s, suspendable computations that pause on [`task::fetch`]
//! (demanding a sub-query) or [`task::lift_base`] (borrowing a capability to run sub-tasks
//! concurrently). [`driver::run_task`] drives a root task to completion against a
//! [`rules::Rules`] stack built from the transformers in this crate: [`memo`] memoises
//! each key's result, [`traces`] verifies and reuses a cached result by replaying its
//! recorded dependencies' fingerprints, [`reverse_deps`] records enough to compute an
//! invalidation set when an input changes, and [`transformers`] offers the smaller,
//! independent pieces (a side-channel writer, a version stamper, an observational hook,
//! and a wrapper pinning applicative composition to sequential order). [`engine::Engine`]
//! bundles the storage these transformers need and wires them into one composed stack.
//!
//! None of this requires `async`: a `Task` that has paused already carries everything
//! needed to resume it, so driving one is a matter of matching on an enum in a loop
//! rather than polling a state machine the compiler generated.

pub mod config;
pub mod dmap;
pub mod driver;
pub mod engine;
pub mod error;
pub mod event;
pub(crate) mod hash;
pub mod key;
pub mod memo;
pub mod reverse_deps;
pub mod rules;
pub mod task;
pub mod traces;
pub mod track;
pub mod transformers;

pub use config::{EngineConfig, Parallelism, ReverseDepsCap};
pub use dmap::DMap;
pub use driver::run_task;
pub use engine::Engine;
pub use error::Error;
pub use event::{Event, EventKind};
pub use key::{Key, Query};
pub use memo::{memoise, Slots};
pub use reverse_deps::{reachable_reverse_dependencies, track_reverse_dependencies, ReverseDeps};
pub use rules::{Rules, RuleSet, RulesWithWriter, Writer};
pub use task::{fetch, lift_base, trans_fetch, zip, zip_with, Erased, MonadFetch, Task};
pub use traces::{verify_traces, RulesWithTaskKind, TaskKind, Traces};
pub use track::{track, Deps, Fingerprint};
pub use transformers::{trace_fetch, versioned, Sequential, Versions};
