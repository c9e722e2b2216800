//! Fast-hash collection aliases, matching the teacher's `hash.rs`.
//!
//! `FxIndexMap` is promoted to `pub` (rather than `pub(crate)`, as the teacher keeps it)
//! because `track::Deps`, part of this crate's public surface, is built on it; the
//! others stay crate-private since nothing public names them.

pub(crate) type FxHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;
pub(crate) type FxHashMap<K, V> = std::collections::HashMap<K, V, FxHasher>;
pub(crate) type FxHashSet<K> = std::collections::HashSet<K, FxHasher>;
pub type FxIndexMap<K, V> = indexmap::IndexMap<K, V, FxHasher>;
pub(crate) type FxIndexSet<K> = indexmap::IndexSet<K, FxHasher>;
