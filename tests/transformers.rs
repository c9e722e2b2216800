//! The small independent transformers: `writer`, `versioned`, `trace_fetch` and
//! `Sequential`, each exercised in isolation from the memoisation/trace/reverse-deps
//! stack.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use fetchbase::{
    fetch, run_task, trace_fetch, versioned, Erased, Key, Query, Rules, Sequential, Task,
    Versions, Writer,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Tagged(i64);
impl Query for Tagged {
    type Value = i64;
}

fn tagged_rules() -> impl Fn(Key) -> Task<Writer<Erased, &'static str>> + Send + Sync + 'static {
    move |key: Key| -> Task<Writer<Erased, &'static str>> {
        if let Some(Tagged(n)) = key.downcast::<Tagged>() {
            let n = *n;
            return Task::done(Writer {
                value: Arc::new(n + 1) as Erased,
                written: "computed",
            });
        }
        panic!("no rule registered for {key:?}")
    }
}

#[test]
fn writer_strips_the_side_channel_and_forwards_it_to_the_callback() {
    let written: Arc<Mutex<Vec<(Key, &'static str)>>> = Arc::new(Mutex::new(Vec::new()));
    let written_for_write = Arc::clone(&written);

    let rules = fetchbase::transformers::writer(
        move |key: &Key, tag: &&'static str| {
            written_for_write.lock().unwrap().push((key.clone(), *tag));
        },
        tagged_rules(),
    );

    let result: i64 = run_task(&rules, fetch(Tagged(4)));
    assert_eq!(result, 5);

    let written = written.lock().unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].1, "computed");
}

fn plain_rules() -> impl Rules {
    move |key: Key| -> Task<Erased> {
        if let Some(Tagged(n)) = key.downcast::<Tagged>() {
            return Task::done(Arc::new(*n + 1) as Erased);
        }
        panic!("no rule registered for {key:?}")
    }
}

#[test]
fn versioned_records_the_version_observed_at_each_fetch() {
    let versions: Arc<Versions<i64>> = Arc::new(Versions::new());
    let clock = Arc::new(AtomicI64::new(0));
    let clock_for_rules = Arc::clone(&clock);

    let rules = versioned(
        Arc::clone(&versions),
        move || clock_for_rules.load(Ordering::SeqCst),
        plain_rules(),
    );

    let key = Key::new(Tagged(1));
    assert_eq!(versions.get(&key), None);

    let _: i64 = run_task(&rules, fetch(Tagged(1)));
    assert_eq!(versions.get(&key), Some(0));

    clock.store(7, Ordering::SeqCst);
    let _: i64 = run_task(&rules, fetch(Tagged(1)));
    assert_eq!(versions.get(&key), Some(7));
}

#[test]
fn trace_fetch_invokes_before_then_after_around_each_fetch() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let events_for_before = Arc::clone(&events);
    let events_for_after = Arc::clone(&events);

    let rules = trace_fetch(
        move |key: &Key| events_for_before.lock().unwrap().push(format!("before {key:?}")),
        move |key: &Key, value: &Erased| {
            let n = *value.downcast_ref::<i64>().expect("Tagged answers with i64");
            events_for_after
                .lock()
                .unwrap()
                .push(format!("after {key:?} = {n}"));
        },
        plain_rules(),
    );

    let result: i64 = run_task(&rules, fetch(Tagged(9)));
    assert_eq!(result, 10);

    let events = events.lock().unwrap();
    assert_eq!(*events, vec!["before Tagged(9)".to_string(), "after Tagged(9) = 10".to_string()]);
}

#[test]
fn sequential_runs_the_second_task_only_after_the_first_completes() {
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let order_for_first = Arc::clone(&order);
    let order_for_second = Arc::clone(&order);

    let first = Task::done(1i64).map(move |a| {
        order_for_first.lock().unwrap().push("first");
        a
    });
    let pair = Sequential::new(first, move || {
        order_for_second.lock().unwrap().push("second");
        Task::done(2i64)
    });

    let rules = plain_rules();
    let (a, b): (i64, i64) = run_task(&rules, pair.run());

    assert_eq!((a, b), (1, 2));
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
}
