//! `EngineConfig`: a small builder controlling eviction, parallelism strategy and
//! logging verbosity.
//!
//! The teacher configures a database through `StorageHandle::new`/builder methods on
//! `Storage` rather than a single config struct; this kernel has no jars or jar-specific
//! setup to thread through, so the equivalent surface collapses to one plain builder.

/// Whether `Task`'s applicative composition is allowed to use the parallel strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parallelism {
    /// Sub-tasks composed applicatively may run concurrently via `rayon::join` (only
    /// meaningful with the `rayon` feature enabled; otherwise behaves as `Sequential`).
    Parallel,
    /// Sub-tasks always run left-to-right, matching `crate::transformers::Sequential`.
    Sequential,
}

/// Caps how many entries `reachable_reverse_dependencies`'s backing map is allowed to
/// grow to before a host should consider it for eviction.
///
/// A deliberately simplified stand-in for the teacher's `lru.rs` / `Durability`-driven
/// eviction, which weighs entries by how often their revision changes. This kernel has
/// no revision counter, so the only policy available is an unconditional cap; a host
/// that needs weighted eviction layers it on top by tracking its own version numbers
/// (see `transformers::versioned`) and keying policy off those.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReverseDepsCap(pub usize);

/// Engine-wide configuration, built once at startup and shared read-only thereafter.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    parallelism: Parallelism,
    reverse_deps_cap: Option<ReverseDepsCap>,
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig {
            parallelism: Parallelism::Parallel,
            reverse_deps_cap: None,
        }
    }

    /// Sets the applicative composition strategy. Default is [`Parallelism::Parallel`].
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Caps the reverse-dependency set at `cap` entries. Default is uncapped.
    pub fn with_reverse_deps_cap(mut self, cap: ReverseDepsCap) -> Self {
        self.reverse_deps_cap = Some(cap);
        self
    }

    pub fn parallelism(&self) -> Parallelism {
        self.parallelism
    }

    pub fn reverse_deps_cap(&self) -> Option<ReverseDepsCap> {
        self.reverse_deps_cap
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
