//! `Rules`: a function from an erased query to the `Task` that computes its value, and
//! the small amount of machinery hosts use to build one type-safely.
//!
//! A rule set is conceptually "for every query type `Q`, a function from `Q` to the task
//! that computes its value"; a transformer that rewrites the query family would normally
//! need its own generalised trait to carry that rewritten shape. Because this kernel
//! already erases every query behind [`Key`] (see `key.rs`), a single trait dispatching
//! on `Key` plays both roles: there is no type-level distinction left between "the rules
//! for the original family" and "the rules for a rewritten family" once both are just
//! `Fn(Key) -> Task<Erased>`.

use std::any::TypeId;

use crate::hash::FxHashMap;
use crate::key::{Key, Query};
use crate::task::{Erased, Task};

/// A function from an erased query to the task that computes its value.
///
/// Transformers (`memoise`, `verify_traces`, `track_reverse_dependencies`, ...) each wrap
/// one `Rules` to produce another, which is how the whole stack composes: each layer only
/// needs to know about the `Rules` directly beneath it.
pub trait Rules: Send + Sync {
    fn fetch(&self, key: Key) -> Task<Erased>;
}

impl<F: Fn(Key) -> Task<Erased> + Send + Sync> Rules for F {
    fn fetch(&self, key: Key) -> Task<Erased> {
        self(key)
    }
}

/// A type-safe way to assemble a [`Rules`] implementation: register one rule per
/// concrete query type, and dispatch by `TypeId` at fetch time.
///
/// This is the ergonomic front door hosts are expected to use; `Rules` itself stays a
/// minimal, erased trait so transformers don't need to know about `RuleSet` at all.
#[derive(Default)]
pub struct RuleSet {
    rules: FxHashMap<TypeId, Box<dyn Fn(Key) -> Task<Erased> + Send + Sync>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `rule` as the implementation for queries of type `Q`.
    ///
    /// Defining a second rule for the same `Q` replaces the first; the engine doesn't
    /// care, but hosts usually only do this once per query type at start-up.
    pub fn define<Q: Query>(
        &mut self,
        rule: impl Fn(Q) -> Task<Q::Value> + Send + Sync + 'static,
    ) -> &mut Self {
        self.rules.insert(
            typeid::of::<Q>(),
            Box::new(move |key: Key| {
                let query = key
                    .downcast::<Q>()
                    .expect("RuleSet dispatches by the type it was registered for")
                    .clone();
                rule(query).map(|value| std::sync::Arc::new(value) as Erased)
            }),
        );
        self
    }
}

impl Rules for RuleSet {
    fn fetch(&self, key: Key) -> Task<Erased> {
        match self.rules.get(&key.type_id()) {
            Some(rule) => rule(key),
            None => panic!("no rule registered for query {key:?}"),
        }
    }
}

/// The paired result of a rule run under [`crate::transformers::writer`]: the query's
/// real answer plus a side-channel value the rule wrote along the way.
///
/// Since queries here are already erased by `Key` rather than reified as a typed query
/// family, the side channel is carried as a value pair on the result instead of widening
/// the query shape itself.
pub struct Writer<A, W> {
    pub value: A,
    pub written: W,
}

/// Rules that additionally emit a side-channel value of type `W` alongside each query's
/// answer: the shape [`crate::transformers::writer`] expects to wrap.
pub trait RulesWithWriter<W>: Send + Sync {
    fn fetch(&self, key: Key) -> Task<Writer<Erased, W>>;
}

impl<W, F: Fn(Key) -> Task<Writer<Erased, W>> + Send + Sync> RulesWithWriter<W> for F {
    fn fetch(&self, key: Key) -> Task<Writer<Erased, W>> {
        self(key)
    }
}
