//! `track` records a fetched key's fingerprint, in fetch order, while evaluating a task
//! directly (no memoisation or trace verification involved).

mod common;

use std::sync::atomic::{AtomicI64, AtomicUsize};
use std::sync::Arc;

use fetchbase::driver::run_task;
use fetchbase::track::track;
use fetchbase::{Key, Rules};

use common::{fingerprint_i64, plain_rules, FetchExternal, A, B};

#[test]
fn track_records_every_fetched_dependency_in_order() {
    let a_invocations = Arc::new(AtomicUsize::new(0));
    let external = Arc::new(AtomicI64::new(0));
    let rules: Arc<dyn Rules> = Arc::new(plain_rules(Arc::clone(&a_invocations), external));

    // Tracking `B`'s own rule body, the way `traces::execute` does, rather than a fresh
    // `fetch(B(2))` suspension: the latter would only record "B(2)" itself as a
    // dependency of the surrounding computation, not the sub-queries B's rule reads.
    let tracked = track(Arc::clone(&rules), fingerprint_i64, rules.fetch(Key::new(B(2))));
    let (value, deps) = run_task(&*rules, tracked);

    assert_eq!(value, 30);
    let deps: Vec<_> = deps.into_iter().collect();
    assert_eq!(
        deps,
        vec![(Key::new(A(2)), 3), (Key::new(FetchExternal(2)), 0)],
    );
}
