//! Crate-level integration tests and shared stub invokers.

use crate::invoke::{InvocationRequest, Invoker, RawOutput, Termination};


/// Returns fixed stdout bytes with the given exit code.
pub(crate) struct CannedInvoker {
    pub stdout: &'static str,
    pub exit_code: i32,
}

impl Invoker for CannedInvoker {
    fn invoke(&self, _request: &InvocationRequest) -> RawOutput {
        RawOutput::new(
            self.stdout.as_bytes().to_vec(),
            Vec::new(),
            Termination::Exited(self.exit_code),
        )
    }
}

/// Simulates a plugin that outlived its timeout and was killed.
pub(crate) struct TimedOutInvoker;

impl Invoker for TimedOutInvoker {
    fn invoke(&self, _request: &InvocationRequest) -> RawOutput {
        RawOutput::new(Vec::new(), Vec::new(), Termination::TimedOut)
    }
}

/// Simulates an executable that could not be spawned.
pub(crate) struct LaunchFailedInvoker;

impl Invoker for LaunchFailedInvoker {
    fn invoke(&self, _request: &InvocationRequest) -> RawOutput {
        RawOutput::launch_failed("No such file or directory")
    }
}

#[test]
fn end_to_end_with_a_stub_invoker() {
    use crate::args::ParameterSet;
    use crate::classify::Outcome;
    use crate::engine::Engine;

    let mut params = ParameterSet::new();
    params.insert("dest", "/tmp/x").expect("valid parameter");
    params.insert("state", "present").expect("valid parameter");

    let engine = Engine::with_invoker(CannedInvoker {
        stdout: r#"{"changed": false, "msg": "file already exists", "dest": "/tmp/x"}"#,
        exit_code: 0,
    });
    let report = engine.run(InvocationRequest::new("/usr/lib/reeve/file", params));

    assert_eq!(
        report.outcome(),
        &Outcome::SuccessNoChange {
            msg: "file already exists".into()
        }
    );
    let record = report.record().expect("record");
    assert_eq!(record.extra()["dest"], "/tmp/x");
}
