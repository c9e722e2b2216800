//! A key whose rule refetches itself on the same thread is reported as `Error::Cycle`
//! instead of deadlocking.

use std::sync::Arc;

use fetchbase::memo::{memoise, Slots};
use fetchbase::task::{fetch, Erased, Task};
use fetchbase::{Error, Key, Query, Rules};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct D;
impl Query for D {
    type Value = i64;
}

fn self_fetching_rules() -> impl Rules {
    move |key: Key| -> Task<Erased> {
        if key.downcast::<D>().is_some() {
            return fetch(D).map(|v: i64| Arc::new(v) as Erased);
        }
        panic!("no rule registered for {key:?}")
    }
}

#[test]
fn a_same_thread_self_fetch_is_reported_as_a_cycle_rather_than_deadlocking() {
    let slots = Arc::new(Slots::new());
    let rules: Arc<dyn Rules> = Arc::new(memoise(slots, self_fetching_rules()));

    let result = fetchbase::engine::fetch::<i64>(&rules, fetch(D));

    assert!(matches!(result, Err(Error::Cycle(_))));
}
