//! Outcome classification for completed invocations.
//!
//! The plugin contract is declarative: the JSON fields are authoritative
//! for success and failure, while the exit code remains a sanity
//! cross-check. When the two signals disagree the divergence is itself a
//! reportable defect rather than being silently trusted either way.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::invoke::Termination;
use crate::record::{ParseFailure, ResultRecord};

/// Terminal classification of one plugin invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The plugin succeeded and changed state.
    Success {
        /// Free-text message from the plugin.
        msg: String,
    },
    /// The plugin succeeded and found nothing to change.
    SuccessNoChange {
        /// Free-text message from the plugin.
        msg: String,
    },
    /// The plugin ran and self-reported a business-level failure.
    Failed {
        /// Free-text message from the plugin.
        msg: String,
    },
    /// The plugin violated the invocation contract.
    ContractViolation {
        /// The specific contract rule that was broken.
        violation: Violation,
    },
}

impl Outcome {
    /// Returns whether the invocation succeeded, with or without change.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::SuccessNoChange { .. })
    }

    /// Returns whether the plugin reported a state change.
    #[must_use]
    pub const fn changed(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the plugin's message, when one classification carries it.
    #[must_use]
    pub const fn msg(&self) -> Option<&str> {
        match self {
            Self::Success { msg } | Self::SuccessNoChange { msg } | Self::Failed { msg } => {
                Some(msg.as_str())
            }
            Self::ContractViolation { .. } => None,
        }
    }
}

/// A breach of the plugin invocation contract.
///
/// Violations are first-class outcomes, not errors: a misbehaving plugin
/// is an expected occurrence and must never abort sibling invocations.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Violation {
    /// The plugin did not terminate within the configured timeout.
    #[error("plugin did not terminate within the configured timeout")]
    Timeout,

    /// The plugin executable could not be started.
    #[error("plugin failed to start: {message}")]
    LaunchFailed {
        /// Description of the spawn failure.
        message: String,
    },

    /// The plugin's stdout did not conform to the result contract.
    #[error("plugin output violates the result contract: {0}")]
    Output(#[from] ParseFailure),

    /// The exit code and the reported result disagree: a non-zero exit
    /// with `failed` absent or false is ambiguous status signalling.
    #[error("exit status {status} disagrees with the reported result")]
    ExitCodeMismatch {
        /// The non-zero exit status.
        status: i32,
    },
}

/// Derives the outcome from how the process ended and what it reported.
///
/// Decision table, first match wins:
/// 1. timeout kill → [`Violation::Timeout`]
/// 2. spawn failure → [`Violation::LaunchFailed`]
/// 3. undecodable stdout → [`Violation::Output`], regardless of exit code
/// 4. `failed: true` → [`Outcome::Failed`] (the exit code does not
///    independently force failure)
/// 5. non-zero exit with `failed` absent or false →
///    [`Violation::ExitCodeMismatch`]
/// 6. `changed: true` → [`Outcome::Success`]
/// 7. otherwise → [`Outcome::SuccessNoChange`]
#[must_use]
pub fn classify(
    termination: &Termination,
    parsed: Result<&ResultRecord, ParseFailure>,
) -> Outcome {
    let exit_code = match termination {
        Termination::TimedOut => {
            return Outcome::ContractViolation {
                violation: Violation::Timeout,
            };
        }
        Termination::LaunchFailed { message } => {
            return Outcome::ContractViolation {
                violation: Violation::LaunchFailed {
                    message: message.clone(),
                },
            };
        }
        Termination::Exited(code) => *code,
    };

    let record = match parsed {
        Ok(record) => record,
        Err(failure) => {
            return Outcome::ContractViolation {
                violation: Violation::Output(failure),
            };
        }
    };

    if record.failed() {
        return Outcome::Failed {
            msg: record.msg().to_owned(),
        };
    }
    if exit_code != 0 {
        return Outcome::ContractViolation {
            violation: Violation::ExitCodeMismatch { status: exit_code },
        };
    }
    if record.changed() {
        return Outcome::Success {
            msg: record.msg().to_owned(),
        };
    }
    Outcome::SuccessNoChange {
        msg: record.msg().to_owned(),
    }
}
