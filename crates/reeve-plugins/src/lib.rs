//! Plugin execution and result-contract engine for Reeve.
//!
//! Reeve applies configuration state to hosts by delegating each state
//! operation to an external plugin executable. This crate implements the
//! contract side of that arrangement: it marshals parameters into an
//! argument file, invokes the plugin with the file path as its single
//! argument, decodes the JSON object the plugin must write to stdout, and
//! classifies the invocation into a terminal [`Outcome`].
//!
//! The contract is one-shot and synchronous: one process per invocation,
//! no stdin, no streaming. Plugins report through three recognized fields,
//! `changed`, `failed`, and `msg`; anything else they print is preserved
//! verbatim for pass-through reporting. The exit code is a sanity
//! cross-check against the `failed` field, and disagreement between the
//! two is flagged as a contract violation rather than silently trusted.
//!
//! Playbook parsing, host transport, and concrete state-operation logic
//! are the caller's business; this crate only ever sees one request at a
//! time, or a batch of independent requests fanned out over a bounded
//! worker pool.
//!
//! # Example
//!
//! ```rust,no_run
//! use reeve_plugins::{Engine, InvocationRequest, ParameterSet};
//!
//! let mut params = ParameterSet::new();
//! params.insert("dest", "/tmp/x").expect("valid parameter");
//! params.insert("state", "present").expect("valid parameter");
//!
//! let engine = Engine::new();
//! let report = engine.run(InvocationRequest::new("/usr/lib/reeve/file", params));
//! match report.outcome() {
//!     outcome if outcome.changed() => { /* state was brought into line */ }
//!     outcome if outcome.is_success() => { /* already as requested */ }
//!     _ => { /* failure or contract violation; raw streams retained */ }
//! }
//! ```

pub mod args;
pub mod classify;
pub mod engine;
pub mod error;
pub mod invoke;
pub mod record;
pub mod report;

#[cfg(test)]
mod tests;

pub use self::args::{ArgumentFile, ParameterSet};
pub use self::classify::{Outcome, Violation, classify};
pub use self::engine::Engine;
pub use self::error::EncodeError;
pub use self::invoke::{
    EnvPolicy, InvocationRequest, Invoker, ProcessInvoker, RawOutput, Termination,
};
pub use self::record::{ParseFailure, ResultRecord};
pub use self::report::ExecutionReport;
