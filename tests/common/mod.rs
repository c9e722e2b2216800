//! Shared query types and rule bodies for the end-to-end scenarios.
//!
//! All three queries answer with `i64`, so fingerprints here are just the value itself
//! rather than a hash: `i64` already satisfies `Fingerprint`'s bounds.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use fetchbase::rules::Writer;
use fetchbase::task::{fetch, Erased, Task};
use fetchbase::traces::TaskKind;
use fetchbase::{Key, Query, Rules};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct A(pub i64);
impl Query for A {
    type Value = i64;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct B(pub i64);
impl Query for B {
    type Value = i64;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchExternal(pub i64);
impl Query for FetchExternal {
    type Value = i64;
}

pub fn fingerprint_i64(_key: &Key, value: &Erased) -> i64 {
    *value
        .downcast_ref::<i64>()
        .expect("every query in these tests answers with i64")
}

fn b_task(n: i64) -> Task<i64> {
    fetch(A(n)).bind(move |a_val| fetch(FetchExternal(n)).map(move |ext| a_val * 10 + ext))
}

/// A plain `Rules` for `A`/`B`/`FetchExternal`, with a shared counter for how many times
/// `A`'s rule body actually runs.
pub fn plain_rules(
    a_invocations: Arc<AtomicUsize>,
    external: Arc<AtomicI64>,
) -> impl Rules {
    move |key: Key| -> Task<Erased> {
        if let Some(A(n)) = key.downcast::<A>() {
            let n = *n;
            a_invocations.fetch_add(1, Ordering::SeqCst);
            return Task::done(Arc::new(n + 1) as Erased);
        }
        if let Some(B(n)) = key.downcast::<B>() {
            return b_task(*n).map(|v| Arc::new(v) as Erased);
        }
        if let Some(FetchExternal(_)) = key.downcast::<FetchExternal>() {
            let value = external.load(Ordering::SeqCst);
            return Task::done(Arc::new(value) as Erased);
        }
        panic!("no rule registered for {key:?}")
    }
}

/// The same rule bodies, but tagged with [`TaskKind`] the way [`fetchbase::engine::Engine`]
/// expects: `A` and `B` are `Derived`, `FetchExternal` is `Input` and therefore never
/// traced. `b_invocations` counts how many times `B`'s own rule body actually runs, as
/// opposed to being served from a verified trace.
pub fn task_kind_rules(
    a_invocations: Arc<AtomicUsize>,
    b_invocations: Arc<AtomicUsize>,
    external: Arc<AtomicI64>,
) -> impl Fn(Key) -> Task<Writer<Erased, TaskKind>> + Send + Sync + 'static {
    move |key: Key| -> Task<Writer<Erased, TaskKind>> {
        if let Some(A(n)) = key.downcast::<A>() {
            let n = *n;
            a_invocations.fetch_add(1, Ordering::SeqCst);
            return Task::done(Writer {
                value: Arc::new(n + 1) as Erased,
                written: TaskKind::Derived,
            });
        }
        if let Some(B(n)) = key.downcast::<B>() {
            b_invocations.fetch_add(1, Ordering::SeqCst);
            return b_task(*n).map(|v| Writer {
                value: Arc::new(v) as Erased,
                written: TaskKind::Derived,
            });
        }
        if let Some(FetchExternal(_)) = key.downcast::<FetchExternal>() {
            let value = external.load(Ordering::SeqCst);
            return Task::done(Writer {
                value: Arc::new(value) as Erased,
                written: TaskKind::Input,
            });
        }
        panic!("no rule registered for {key:?}")
    }
}
