//! `zip_with`'s parallel strategy actually overlaps its two sub-tasks in wall-clock
//! time, while the sequential strategy runs them strictly back-to-back; both produce the
//! same result for independent tasks either way.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fetchbase::{fetch, zip_with, Erased, Key, Parallelism, Query, Rules, Task};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Slow(i64);
impl Query for Slow {
    type Value = i64;
}

fn slow_rules() -> impl Rules {
    move |key: Key| -> Task<Erased> {
        if let Some(Slow(n)) = key.downcast::<Slow>() {
            let n = *n;
            std::thread::sleep(Duration::from_millis(80));
            return Task::done(Arc::new(n + 1) as Erased);
        }
        panic!("no rule registered for {key:?}")
    }
}

#[test]
fn parallel_applicative_composition_overlaps_its_sub_tasks() {
    let rules = slow_rules();

    let started = Instant::now();
    let (a, b): (i64, i64) = fetchbase::run_task(
        &rules,
        zip_with(fetch(Slow(1)), fetch(Slow(2)), Parallelism::Parallel, |a, b| {
            (a, b)
        }),
    );
    let elapsed = started.elapsed();

    assert_eq!((a, b), (2, 3));
    // Two 80ms sub-tasks run back-to-back would take at least ~160ms; run concurrently
    // they take roughly one sleep's worth. 120ms leaves generous scheduling slack while
    // still failing a genuinely sequential implementation.
    assert!(
        elapsed < Duration::from_millis(120),
        "took {elapsed:?}, composition does not appear to run in parallel"
    );
}

#[test]
fn sequential_applicative_composition_runs_sub_tasks_back_to_back() {
    let rules = slow_rules();

    let started = Instant::now();
    let (a, b): (i64, i64) = fetchbase::run_task(
        &rules,
        zip_with(
            fetch(Slow(1)),
            fetch(Slow(2)),
            Parallelism::Sequential,
            |a, b| (a, b),
        ),
    );
    let elapsed = started.elapsed();

    assert_eq!((a, b), (2, 3));
    assert!(elapsed >= Duration::from_millis(160));
}
