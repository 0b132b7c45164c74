//! Errors raised while marshalling plugin arguments.
//!
//! Encoding errors are the only failures this crate surfaces as `Result`
//! errors: they occur before any plugin process is spawned and are fully
//! recoverable by fixing the offending parameter. Everything that can go
//! wrong after a process exists is reported as an
//! [`Outcome`](crate::classify::Outcome) instead, because a misbehaving
//! plugin is an expected occurrence, not an exceptional one.
//!
//! I/O errors are wrapped in `Arc` to satisfy the `result_large_err` Clippy
//! lint and keep the enum cloneable.

use std::sync::Arc;

use thiserror::Error;

/// Errors arising while validating or materialising a parameter set.
#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    /// A parameter name was empty.
    #[error("parameter name must not be empty")]
    EmptyName,

    /// A parameter name contained the `=` separator.
    #[error("parameter name '{name}' must not contain '='")]
    EqualsInName {
        /// The offending name.
        name: String,
    },

    /// A parameter name or value contained a line terminator.
    ///
    /// The argument file format is line-oriented, so an embedded newline
    /// would make the file ambiguous to re-parse.
    #[error("parameter '{name}' contains a line terminator")]
    LineBreak {
        /// Name of the parameter whose name or value broke the line format.
        name: String,
    },

    /// An argument-file line had no `=` separator.
    #[error("argument line '{line}' has no '=' separator")]
    MissingSeparator {
        /// The offending line.
        line: String,
    },

    /// The argument file could not be created or written.
    #[error("failed to write argument file: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl From<std::io::Error> for EncodeError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source: Arc::new(source),
        }
    }
}
