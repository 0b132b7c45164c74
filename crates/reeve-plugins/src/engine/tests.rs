//! Unit tests for the execution engine, using stub invokers.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;
use crate::args::ParameterSet;
use crate::classify::{Outcome, Violation};
use crate::invoke::{RawOutput, Termination};
use crate::record::ParseFailure;
use crate::tests::{CannedInvoker, LaunchFailedInvoker, TimedOutInvoker};

#[fixture]
fn request() -> InvocationRequest {
    let mut params = ParameterSet::new();
    params.insert("dest", "/tmp/x").expect("valid parameter");
    InvocationRequest::new("/usr/lib/reeve/file", params)
}

fn limit(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).expect("non-zero limit")
}

#[rstest]
fn run_classifies_a_changed_success(request: InvocationRequest) {
    let engine = Engine::with_invoker(CannedInvoker {
        stdout: r#"{"changed": true, "msg": "file created"}"#,
        exit_code: 0,
    });
    let report = engine.run(request);
    assert_eq!(
        report.outcome(),
        &Outcome::Success {
            msg: "file created".into()
        }
    );
    assert!(report.record().is_some());
    assert_eq!(report.exit_code(), Some(0));
}

#[rstest]
fn run_flags_an_exit_code_mismatch(request: InvocationRequest) {
    let engine = Engine::with_invoker(CannedInvoker {
        stdout: r"{}",
        exit_code: 2,
    });
    let report = engine.run(request);
    assert_eq!(
        report.outcome(),
        &Outcome::ContractViolation {
            violation: Violation::ExitCodeMismatch { status: 2 }
        }
    );
}

#[rstest]
fn run_retains_raw_bytes_on_malformed_output(request: InvocationRequest) {
    let engine = Engine::with_invoker(CannedInvoker {
        stdout: "not json",
        exit_code: 0,
    });
    let report = engine.run(request);
    assert_eq!(
        report.outcome(),
        &Outcome::ContractViolation {
            violation: Violation::Output(ParseFailure::NotJson)
        }
    );
    assert!(report.record().is_none());
    assert_eq!(report.raw_output().stdout(), b"not json");
}

#[rstest]
fn run_reports_timeouts_as_violations(request: InvocationRequest) {
    let engine = Engine::with_invoker(TimedOutInvoker);
    let report = engine.run(request);
    assert_eq!(
        report.outcome(),
        &Outcome::ContractViolation {
            violation: Violation::Timeout
        }
    );
    assert_eq!(report.exit_code(), None);
}

#[rstest]
fn run_reports_launch_failures_as_violations(request: InvocationRequest) {
    let engine = Engine::with_invoker(LaunchFailedInvoker);
    let report = engine.run(request);
    assert!(matches!(
        report.outcome(),
        Outcome::ContractViolation {
            violation: Violation::LaunchFailed { .. }
        }
    ));
}

/// Reflects the request's `id` parameter back as the plugin message.
struct EchoInvoker;

impl Invoker for EchoInvoker {
    fn invoke(&self, request: &InvocationRequest) -> RawOutput {
        let id = request.params().get("id").unwrap_or("?");
        RawOutput::new(
            format!(r#"{{"changed": true, "msg": "{id}"}}"#).into_bytes(),
            Vec::new(),
            Termination::Exited(0),
        )
    }
}

#[test]
fn run_all_preserves_input_order() {
    let engine = Engine::with_invoker(EchoInvoker);
    let requests: Vec<InvocationRequest> = (0..16)
        .map(|index| {
            let mut params = ParameterSet::new();
            params
                .insert("id", index.to_string())
                .expect("valid parameter");
            InvocationRequest::new("/usr/lib/reeve/echo", params)
        })
        .collect();

    let reports = engine.run_all(requests, limit(4));
    assert_eq!(reports.len(), 16);
    for (index, report) in reports.iter().enumerate() {
        assert_eq!(report.outcome().msg(), Some(index.to_string().as_str()));
        assert_eq!(report.request().params().get("id"), Some(index.to_string().as_str()));
    }
}

#[test]
fn run_all_on_an_empty_batch_is_empty() {
    let engine = Engine::with_invoker(EchoInvoker);
    assert!(engine.run_all(Vec::new(), limit(4)).is_empty());
}

/// Tracks how many invocations are in flight at once.
#[derive(Default)]
struct ConcurrencyProbe {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Invoker for ConcurrencyProbe {
    fn invoke(&self, _request: &InvocationRequest) -> RawOutput {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(25));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        RawOutput::new(b"{}".to_vec(), Vec::new(), Termination::Exited(0))
    }
}

#[test]
fn run_all_honours_the_concurrency_limit() {
    let engine = Engine::with_invoker(ConcurrencyProbe::default());
    let requests: Vec<InvocationRequest> = (0..8)
        .map(|_| InvocationRequest::new("/usr/lib/reeve/probe", ParameterSet::new()))
        .collect();

    let reports = engine.run_all(requests, limit(2));
    assert_eq!(reports.len(), 8);
    assert!(reports.iter().all(|report| report.outcome().is_success()));

    let peak = engine.invoker.peak.load(Ordering::SeqCst);
    assert!(peak <= 2, "observed {peak} concurrent invocations");
}

#[test]
fn one_bad_invocation_does_not_affect_the_batch() {
    // Half the requests point at a plugin that emits garbage; the other
    // half succeed. Every request still gets its own report.
    struct MixedInvoker;
    impl Invoker for MixedInvoker {
        fn invoke(&self, request: &InvocationRequest) -> RawOutput {
            if request.params().get("poison").is_some() {
                RawOutput::new(b"not json".to_vec(), Vec::new(), Termination::Exited(0))
            } else {
                RawOutput::new(b"{}".to_vec(), Vec::new(), Termination::Exited(0))
            }
        }
    }

    let requests: Vec<InvocationRequest> = (0..6)
        .map(|index| {
            let mut params = ParameterSet::new();
            if index & 1 == 0 {
                params.insert("poison", "yes").expect("valid parameter");
            }
            InvocationRequest::new("/usr/lib/reeve/mixed", params)
        })
        .collect();

    let engine = Engine::with_invoker(MixedInvoker);
    let reports = engine.run_all(requests, limit(3));
    assert_eq!(reports.len(), 6);
    for (index, report) in reports.iter().enumerate() {
        if index & 1 == 0 {
            assert!(!report.outcome().is_success());
        } else {
            assert!(report.outcome().is_success());
        }
    }
}
