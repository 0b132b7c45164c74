//! Caller-facing execution engine.
//!
//! [`Engine`] is the public API the orchestrator calls: [`Engine::run`]
//! executes one invocation and [`Engine::run_all`] fans a batch out across
//! a bounded worker pool. Both are infallible at the API boundary; every
//! failure mode, from an unlaunchable executable to malformed output, is
//! classified into the report's [`Outcome`](crate::classify::Outcome).
//!
//! The invoker abstraction enables test doubles that return canned output
//! without spawning real processes.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::classify::classify;
use crate::invoke::{InvocationRequest, Invoker, ProcessInvoker};
use crate::record::ResultRecord;
use crate::report::ExecutionReport;

/// Tracing target for engine events.
const ENGINE_TARGET: &str = "reeve_plugins::engine";

/// Executes plugin invocations and classifies their results.
///
/// # Example
///
/// ```rust,no_run
/// use reeve_plugins::{Engine, InvocationRequest, ParameterSet};
///
/// let mut params = ParameterSet::new();
/// params.insert("dest", "/tmp/x").expect("valid parameter");
/// params.insert("state", "present").expect("valid parameter");
///
/// let engine = Engine::new();
/// let report = engine.run(InvocationRequest::new("/usr/lib/reeve/file", params));
/// if report.outcome().is_success() {
///     // state is now as requested
/// }
/// ```
#[derive(Debug, Default)]
pub struct Engine<I = ProcessInvoker> {
    invoker: I,
}

impl Engine<ProcessInvoker> {
    /// Creates an engine that spawns real plugin processes.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            invoker: ProcessInvoker,
        }
    }
}

impl<I> Engine<I> {
    /// Creates an engine with a custom invoker, for tests or
    /// instrumentation.
    #[must_use]
    pub const fn with_invoker(invoker: I) -> Self {
        Self { invoker }
    }
}

impl<I: Invoker> Engine<I> {
    /// Runs one invocation to completion and classifies the result.
    ///
    /// Never fails: launch problems, timeouts, and contract breaches all
    /// surface as outcomes in the returned report.
    #[must_use]
    pub fn run(&self, request: InvocationRequest) -> ExecutionReport {
        let raw = self.invoker.invoke(&request);
        let parsed = ResultRecord::from_stdout(raw.stdout());
        let outcome = classify(raw.termination(), parsed.as_ref().map_err(|failure| *failure));

        debug!(
            target: ENGINE_TARGET,
            executable = %request.executable().display(),
            ?outcome,
            "invocation classified"
        );

        ExecutionReport::new(request, raw, parsed.ok(), outcome)
    }
}

impl<I: Invoker + Sync> Engine<I> {
    /// Runs a batch of invocations with at most `limit` in flight.
    ///
    /// Each invocation proceeds on its own worker thread; no invocation's
    /// failure affects any other, and the only cross-invocation join point
    /// is the barrier at the end of the batch. Returns one report per
    /// request, in input order.
    #[must_use]
    pub fn run_all(
        &self,
        requests: Vec<InvocationRequest>,
        limit: NonZeroUsize,
    ) -> Vec<ExecutionReport> {
        let total = requests.len();
        if total == 0 {
            return Vec::new();
        }

        let workers = limit.get().min(total);
        debug!(
            target: ENGINE_TARGET,
            total,
            workers,
            "running invocation batch"
        );

        let queue: Mutex<VecDeque<(usize, InvocationRequest)>> =
            Mutex::new(requests.into_iter().enumerate().collect());
        let slots: Mutex<Vec<Option<ExecutionReport>>> =
            Mutex::new((0..total).map(|_| None).collect());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let Some((index, request)) = lock(&queue).pop_front() else {
                            break;
                        };
                        let report = self.run(request);
                        if let Some(slot) = lock(&slots).get_mut(index) {
                            *slot = Some(report);
                        }
                    }
                });
            }
        });

        // The scope re-raises worker panics, so every slot is filled here.
        lock_into_inner(slots).into_iter().flatten().collect()
    }
}

/// Locks a mutex, recovering the guard from a poisoned lock.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Unwraps a mutex, recovering the value from a poisoned lock.
fn lock_into_inner<T>(mutex: Mutex<T>) -> T {
    mutex.into_inner().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests;
