//! The trampoline that drives a [`Task`] to completion.

use crate::rules::Rules;
use crate::task::{FetchStep, LiftStep, Task};

/// Runs `task` to completion against `rules`.
///
/// On `Done`, returns immediately. On `Fetch(k, kappa)`, resolves `k` by invoking
/// `rules.fetch(k)` (itself driven by a recursive call to `run_task`), then continues
/// with `kappa`. On `LiftBase(g, kappa)`, hands `g` the `rules` reference so it can call
/// `run_task` itself on sub-tasks (this is how host concurrency primitives, e.g.
/// `rayon::join`, integrate: `g` spawns two sub-tasks and runs each one with `run_task`).
///
/// The driver does not introduce parallelism on its own; it is purely a loop that drives
/// a suspension enum by inspection rather than by `async`/await, leaving any actual
/// concurrency to whatever a `LiftBase`'s `run` closure chooses to do.
pub fn run_task<A: Send + 'static>(rules: &dyn Rules, task: Task<A>) -> A {
    let mut task = task;
    loop {
        match task {
            Task::Done(a) => return a,
            Task::Fetch(FetchStep { key, cont }) => {
                let value = run_task(rules, rules.fetch(key));
                task = cont(value);
            }
            Task::LiftBase(LiftStep { run, cont }) => {
                let value = run(rules);
                task = cont(value);
            }
        }
    }
}
