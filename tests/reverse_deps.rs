//! Computing a derived key records its dependencies' reverse edges, and the reachability
//! closure from a changed input returns every key that transitively read it while
//! removing those edges from the map.

mod common;

use std::sync::atomic::{AtomicI64, AtomicUsize};
use std::sync::Arc;

use fetchbase::reverse_deps::{reachable_reverse_dependencies, track_reverse_dependencies, ReverseDeps};
use fetchbase::task::fetch;
use fetchbase::{Key, Rules};

use common::{plain_rules, FetchExternal, B};

#[test]
fn computing_a_derived_key_records_reverse_edges_for_every_dependency_read() {
    let a_invocations = Arc::new(AtomicUsize::new(0));
    let external = Arc::new(AtomicI64::new(0));
    let rev = Arc::new(ReverseDeps::new());

    let rules_for_track: Arc<dyn Rules> = Arc::new(plain_rules(
        Arc::clone(&a_invocations),
        Arc::clone(&external),
    ));
    let with_reverse = track_reverse_dependencies(
        Arc::clone(&rev),
        rules_for_track,
        plain_rules(Arc::clone(&a_invocations), Arc::clone(&external)),
    );

    let value: i64 = fetchbase::run_task(&with_reverse, fetch(B(2)));
    assert_eq!(value, 30);

    let visited = reachable_reverse_dependencies(Key::new(FetchExternal(2)), &rev);
    assert_eq!(visited.len(), 2);
    assert!(visited.contains(&Key::new(FetchExternal(2))));
    assert!(visited.contains(&Key::new(B(2))));

    // Reachability removes every visited key's outgoing edges: a second closure from the
    // same root finds nothing left to invalidate.
    let visited_again = reachable_reverse_dependencies(Key::new(FetchExternal(2)), &rev);
    assert_eq!(visited_again.len(), 1);
    assert!(visited_again.contains(&Key::new(FetchExternal(2))));
}
