//! The suspension core: [`Task`], the monadic computation that may pause on a [`Fetch`]
//! or a [`LiftBase`], plus the combinators ([`fetch`], bind, `trans_fetch`) used to build
//! and rewrite tasks.
//!
//! The teacher crate resolves queries by direct method call under a thread-local
//! "attached" database (`attach.rs`); this kernel instead reifies *why* a computation
//! paused as an explicit enum so a driver can inspect and route the suspension through a
//! transformer stack. There is no separate "one-step result" type: since Rust has no
//! implicit laziness, a `Task` value that has settled into `Fetch` or `LiftBase` already
//! *is* its own one-step result, the base-effect work a stepped result would carry has
//! already run (eagerly, as ordinary Rust code) by the time the variant exists. Driving a
//! `Task` is therefore just matching on it.

use crate::key::{Key, Query};
use std::any::Any;

/// A value of any `'static` type, once its concrete type has been forgotten.
///
/// Used at every boundary where the engine must carry a value whose type depends on
/// which query produced it, see `key.rs` for the matching erased key. Backed by `Arc`
/// rather than `Box` because the memoiser (`memo.rs`) hands the same computed value to
/// however many callers were waiting on it concurrently; cloning an `Arc` is how they
/// each get their own handle to it without requiring a fresh downcast-and-reclone through
/// `Box`.
pub type Erased = std::sync::Arc<dyn Any + Send + Sync>;

/// A suspendable computation yielding a value of type `A`.
///
/// `Task` is a monad: [`Task::done`] is `pure`, and [`Task::bind`] is the obvious
/// continuation splice. Its applicative instance ([`zip`]/[`zip_with`]) is sequential by
/// default; see [`crate::transformers::Sequential`] for the wrapper that pins this down
/// explicitly when a caller must forbid the parallel specialisation.
pub enum Task<A> {
    /// Completed with a value.
    Done(A),
    /// Paused pending the value of `key`; `cont` resumes once it is supplied.
    Fetch(FetchStep<A>),
    /// Requests that the driver loan back a capability to run sub-tasks, so the host can
    /// integrate its own concurrency primitives (e.g. `rayon::join`) without the driver
    /// needing to know about them.
    LiftBase(LiftStep<A>),
}

/// The pending half of a [`Task::Fetch`]: the key being awaited and the continuation to
/// resume once the driver supplies its value.
pub struct FetchStep<A> {
    pub key: Key,
    pub cont: Box<dyn FnOnce(Erased) -> Task<A> + Send>,
}

/// The pending half of a [`Task::LiftBase`].
pub struct LiftStep<A> {
    /// Runs against a rule set capability; see [`crate::rules::Rules`] and
    /// [`crate::driver::run_task`], which is what callers typically invoke from inside
    /// `run`.
    pub run: Box<dyn FnOnce(&dyn crate::rules::Rules) -> Erased + Send>,
    pub cont: Box<dyn FnOnce(Erased) -> Task<A> + Send>,
}

impl<A: Send + 'static> Task<A> {
    /// `pure`: a task that is already done.
    pub fn done(a: A) -> Self {
        Task::Done(a)
    }

    /// Sequences `self` with a continuation, splicing it onto whichever suspension
    /// `self` is currently sitting on (or running it immediately if `self` is `Done`).
    pub fn bind<B: Send + 'static>(
        self,
        k: impl FnOnce(A) -> Task<B> + Send + 'static,
    ) -> Task<B> {
        match self {
            Task::Done(a) => k(a),
            Task::Fetch(FetchStep { key, cont }) => Task::Fetch(FetchStep {
                key,
                cont: Box::new(move |erased| cont(erased).bind(k)),
            }),
            Task::LiftBase(LiftStep { run, cont }) => Task::LiftBase(LiftStep {
                run,
                cont: Box::new(move |erased| cont(erased).bind(k)),
            }),
        }
    }

    /// Functorial map, derived from `bind`.
    pub fn map<B: Send + 'static>(self, f: impl FnOnce(A) -> B + Send + 'static) -> Task<B> {
        self.bind(move |a| Task::done(f(a)))
    }
}

/// Issues a query and suspends until the driver supplies its value.
///
/// `fetch` never resolves the query itself, it only reifies the request; resolving it is
/// entirely the driver's job, once it decides which `Rules` to route the key through.
pub fn fetch<Q: Query>(query: Q) -> Task<Q::Value> {
    let key = Key::new(query);
    Task::Fetch(FetchStep {
        key,
        cont: Box::new(|erased: Erased| {
            let value = (*erased
                .downcast::<Q::Value>()
                .expect("driver returned a value of the wrong type for this query"))
            .clone();
            Task::done(value)
        }),
    })
}

/// Lifts a host routine `g` into a `Task`, giving it a rule-set capability it can use to
/// run sub-tasks (e.g. via [`crate::driver::run_task`]): the integration point for host
/// concurrency primitives.
pub fn lift_base<R: Send + Sync + 'static>(
    g: impl FnOnce(&dyn crate::rules::Rules) -> R + Send + 'static,
) -> Task<R> {
    Task::LiftBase(LiftStep {
        run: Box::new(move |rules| std::sync::Arc::new(g(rules)) as Erased),
        cont: Box::new(|erased: Erased| {
            let arc = erased
                .downcast::<R>()
                .expect("lift_base result was boxed and unboxed as the same type");
            let value = std::sync::Arc::try_unwrap(arc)
                .unwrap_or_else(|_| panic!("lift_base result was shared before its continuation ran"));
            Task::done(value)
        }),
    })
}

/// Rewrites every `Fetch(k, kappa)` encountered while evaluating `task` to
/// `phi(k).bind(kappa)`, threading `LiftBase` through unchanged.
///
/// This is the mechanism [`crate::track::track`] uses to interpose on fetches without
/// `task` itself needing to cooperate.
pub fn trans_fetch<A: Send + 'static>(
    task: Task<A>,
    phi: impl Fn(Key) -> Task<Erased> + Send + Sync + 'static,
) -> Task<A> {
    let phi = std::sync::Arc::new(phi);
    trans_fetch_rec(task, phi)
}

fn trans_fetch_rec<A: Send + 'static>(
    task: Task<A>,
    phi: std::sync::Arc<dyn Fn(Key) -> Task<Erased> + Send + Sync>,
) -> Task<A> {
    match task {
        Task::Done(a) => Task::Done(a),
        Task::Fetch(FetchStep { key, cont }) => {
            let phi2 = phi.clone();
            phi.as_ref()(key).bind(move |erased| {
                let resumed = cont(erased);
                trans_fetch_rec(resumed, phi2)
            })
        }
        Task::LiftBase(LiftStep { run, cont }) => {
            let phi2 = phi.clone();
            Task::LiftBase(LiftStep {
                run,
                cont: Box::new(move |erased| trans_fetch_rec(cont(erased), phi2)),
            })
        }
    }
}

/// A carrier that supports monadic sequencing of fetch-style computations.
///
/// Implemented by [`Task`] itself; exists so generic rule code can be written against
/// "something I can `bind` on" rather than the concrete `Task<A>` type.
pub trait MonadFetch<A> {
    fn bind<B: Send + 'static>(self, k: impl FnOnce(A) -> Task<B> + Send + 'static) -> Task<B>;
}

impl<A: Send + 'static> MonadFetch<A> for Task<A> {
    fn bind<B: Send + 'static>(self, k: impl FnOnce(A) -> Task<B> + Send + 'static) -> Task<B> {
        Task::bind(self, k)
    }
}

/// Applicative composition of two independent tasks, returning both results paired.
///
/// Derived from `bind`, this is always available and always sequential; see [`zip_with`]
/// for the variant that can additionally run both sub-tasks concurrently.
pub fn zip<A: Send + 'static, B: Send + 'static>(ta: Task<A>, tb: Task<B>) -> Task<(A, B)> {
    ta.bind(move |a| tb.map(move |b| (a, b)))
}

/// Applicative composition of two independent tasks under a chosen evaluation strategy:
/// [`crate::config::Parallelism::Sequential`] runs `tb` only after `ta`'s continuation
/// has produced its value, exactly like [`zip`]; `Parallelism::Parallel`
/// drives both sub-tasks to completion concurrently via `rayon::join` (when the `rayon`
/// feature is enabled) from inside a [`lift_base`] capability, falling back to the
/// sequential strategy otherwise.
///
/// Both strategies produce the same result value for independent tasks; only their
/// side-effect interleaving and the dependency accumulator's insertion order can differ.
pub fn zip_with<A: Send + 'static, B: Send + 'static, C: Send + 'static>(
    ta: Task<A>,
    tb: Task<B>,
    parallelism: crate::config::Parallelism,
    f: impl FnOnce(A, B) -> C + Send + 'static,
) -> Task<C> {
    match parallelism {
        crate::config::Parallelism::Sequential => ta.bind(move |a| tb.map(move |b| f(a, b))),
        crate::config::Parallelism::Parallel => zip_with_parallel(ta, tb, f),
    }
}

#[cfg(feature = "rayon")]
fn zip_with_parallel<A: Send + 'static, B: Send + 'static, C: Send + 'static>(
    ta: Task<A>,
    tb: Task<B>,
    f: impl FnOnce(A, B) -> C + Send + 'static,
) -> Task<C> {
    lift_base(move |rules| {
        let (a, b) = rayon::join(
            || crate::driver::run_task(rules, ta),
            || crate::driver::run_task(rules, tb),
        );
        f(a, b)
    })
}

#[cfg(not(feature = "rayon"))]
fn zip_with_parallel<A: Send + 'static, B: Send + 'static, C: Send + 'static>(
    ta: Task<A>,
    tb: Task<B>,
    f: impl FnOnce(A, B) -> C + Send + 'static,
) -> Task<C> {
    ta.bind(move |a| tb.map(move |b| f(a, b)))
}
