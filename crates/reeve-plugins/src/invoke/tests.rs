//! Unit tests for invocation requests and environment policies.

use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;

#[fixture]
fn params() -> ParameterSet {
    let mut set = ParameterSet::new();
    set.insert("state", "present").expect("valid parameter");
    set
}

#[rstest]
fn request_defaults_are_clean_and_unbounded(params: ParameterSet) {
    let request = InvocationRequest::new("/usr/lib/reeve/file", params);
    assert_eq!(request.timeout(), None);
    assert_eq!(request.env_policy(), &EnvPolicy::Clean);
    assert_eq!(request.params().get("state"), Some("present"));
}

#[rstest]
fn builder_overrides_apply(params: ParameterSet) {
    let names: BTreeSet<String> = ["PATH".to_owned()].into();
    let request = InvocationRequest::new("/usr/lib/reeve/file", params)
        .with_timeout(Duration::from_millis(250))
        .with_env_policy(EnvPolicy::AllowList(names));
    assert_eq!(request.timeout(), Some(Duration::from_millis(250)));
    assert!(matches!(request.env_policy(), EnvPolicy::AllowList(_)));
}

#[test]
fn clean_policy_resolves_to_nothing() {
    assert!(EnvPolicy::Clean.resolve().is_empty());
}

#[test]
fn allow_list_copies_only_named_variables() {
    // PATH is present in any test environment; the other name is not.
    let names: BTreeSet<String> =
        ["PATH".to_owned(), "REEVE_SURELY_UNSET_VARIABLE".to_owned()].into();
    let resolved = EnvPolicy::AllowList(names).resolve();
    assert_eq!(resolved.len(), 1);
    assert_eq!(
        resolved.first().map(|(name, _)| name.as_str()),
        Some("PATH")
    );
}

#[test]
fn termination_exposes_exit_code_only_when_exited() {
    assert_eq!(Termination::Exited(3).exit_code(), Some(3));
    assert_eq!(Termination::TimedOut.exit_code(), None);
    let launch = Termination::LaunchFailed {
        message: "missing".into(),
    };
    assert_eq!(launch.exit_code(), None);
}

#[test]
fn launch_failed_output_is_empty() {
    let raw = RawOutput::launch_failed("no such file");
    assert!(raw.stdout().is_empty());
    assert!(raw.stderr().is_empty());
    assert!(matches!(
        raw.termination(),
        Termination::LaunchFailed { message } if message == "no such file"
    ));
}
