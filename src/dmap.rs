//! A heterogeneous key/value map over an open, type-indexed query family.
//!
//! `DMap` stores `Q::Value` for each inserted `Q: Query`, regardless of which concrete
//! `Q` was used, by erasing the key through [`Key`] and erasing the value through `Any`.
//! Lookup downcasts the stored value back to `Q::Value`, this is always correct because
//! a `Key` can only compare equal to another `Key` built from the same `Q` (see
//! `key.rs`), so whichever value is stored under it must also have been inserted as a
//! `Q::Value`.

use std::any::Any;

use crate::hash::FxHashMap;
use crate::key::{Key, Query};

/// A heterogeneous map from erased queries to their (equally erased) answers.
///
/// This is the teacher crate's erased-table idea (`table.rs`, `key.rs`) cut down to a
/// single flat map: there is no per-ingredient page allocator here because the kernel
/// doesn't need one at this scale, just a safe place to put values of different types.
pub struct DMap {
    map: FxHashMap<Key, Box<dyn Any + Send + Sync>>,
}

impl DMap {
    pub fn new() -> Self {
        DMap {
            map: FxHashMap::default(),
        }
    }

    /// Inserts `value` for `query`, returning the previous value if `query` was already
    /// present.
    pub fn insert<Q: Query>(&mut self, query: Q, value: Q::Value) -> Option<Q::Value> {
        let key = Key::new(query);
        self.map
            .insert(key, Box::new(value))
            .map(|old| *old.downcast::<Q::Value>().expect("type witness upheld by Key"))
    }

    pub fn lookup<Q: Query>(&self, query: &Q) -> Option<Q::Value> {
        let key = Key::new(query.clone());
        self.map
            .get(&key)
            .map(|v| v.downcast_ref::<Q::Value>().expect("type witness upheld by Key").clone())
    }

    pub fn remove<Q: Query>(&mut self, query: &Q) -> Option<Q::Value> {
        let key = Key::new(query.clone());
        self.map
            .remove(&key)
            .map(|old| *old.downcast::<Q::Value>().expect("type witness upheld by Key"))
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns the keys currently stored, in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.map.keys()
    }

    /// Returns every stored entry as `(key, value)` pairs, in unspecified order.
    ///
    /// The value stays erased; recover its real type by downcasting against the
    /// concrete `Q` the caller knows `key` was built from.
    pub fn to_list(&self) -> Vec<(&Key, &(dyn Any + Send + Sync))> {
        self.map.iter().map(|(k, v)| (k, v.as_ref())).collect()
    }

    /// Reads the current value for `query` (if any) and atomically replaces it with
    /// whatever `f` returns, returning the value `f` observed.
    ///
    /// `f` receiving `None` means `query` was absent; returning `None` from `f` removes
    /// the entry. Letting `f` see the old value and decide the new one in one step
    /// avoids a separate lookup-then-insert race under concurrent access.
    pub fn alter_lookup<Q: Query>(
        &mut self,
        query: &Q,
        f: impl FnOnce(Option<Q::Value>) -> Option<Q::Value>,
    ) -> Option<Q::Value> {
        let key = Key::new(query.clone());
        let old = self
            .map
            .get(&key)
            .map(|v| v.downcast_ref::<Q::Value>().expect("type witness upheld by Key").clone());
        match f(old.clone()) {
            Some(new_value) => {
                self.map.insert(key, Box::new(new_value));
            }
            None => {
                self.map.remove(&key);
            }
        }
        old
    }
}

impl Default for DMap {
    fn default() -> Self {
        Self::new()
    }
}
