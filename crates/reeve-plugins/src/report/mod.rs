//! Aggregated result of one plugin invocation.
//!
//! [`ExecutionReport`] is the unit handed back to the orchestrator: the
//! terminal [`Outcome`], the decoded [`ResultRecord`] when stdout was
//! parseable, the raw captured streams for diagnostics, and the
//! originating request for correlation in batch results. Reports are
//! immutable aggregates with no behaviour beyond construction.

use crate::classify::Outcome;
use crate::invoke::{InvocationRequest, RawOutput};
use crate::record::ResultRecord;

/// Everything known about one completed invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    request: InvocationRequest,
    raw: RawOutput,
    record: Option<ResultRecord>,
    outcome: Outcome,
}

impl ExecutionReport {
    /// Assembles a report. Called once per invocation by the engine.
    #[must_use]
    pub const fn new(
        request: InvocationRequest,
        raw: RawOutput,
        record: Option<ResultRecord>,
        outcome: Outcome,
    ) -> Self {
        Self {
            request,
            raw,
            record,
            outcome,
        }
    }

    /// Returns the terminal classification.
    #[must_use]
    pub const fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Returns the decoded result record, if stdout was parseable.
    #[must_use]
    pub const fn record(&self) -> Option<&ResultRecord> {
        self.record.as_ref()
    }

    /// Returns the raw captured streams for diagnostics.
    #[must_use]
    pub const fn raw_output(&self) -> &RawOutput {
        &self.raw
    }

    /// Returns the process exit code, when the plugin terminated on its
    /// own.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        self.raw.termination().exit_code()
    }

    /// Returns the request this report answers.
    #[must_use]
    pub const fn request(&self) -> &InvocationRequest {
        &self.request
    }
}
