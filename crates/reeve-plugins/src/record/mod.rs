//! Decoding of the plugin stdout contract.
//!
//! A well-behaved plugin writes exactly one JSON object to stdout and
//! nothing else. The recognized fields are `changed`, `failed`, and `msg`,
//! all optional with conservative defaults; any other field is preserved
//! verbatim for pass-through reporting. Stderr is never parsed for
//! structure.
//!
//! Decoding is strict: surrounding whitespace is tolerated, but any other
//! stray bytes, a missing object, or multiple top-level values are parse
//! failures rather than partial successes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason the stdout stream could not be decoded into a [`ResultRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailure {
    /// Stdout contained nothing but whitespace.
    #[error("plugin wrote nothing to stdout")]
    EmptyOutput,

    /// Stdout could not be decoded as JSON (including invalid UTF-8).
    #[error("plugin stdout is not valid JSON")]
    NotJson,

    /// The top-level JSON value was not an object of the required shape.
    ///
    /// This also covers a recognized field carrying the wrong JSON type,
    /// such as `"changed": "yes"`.
    #[error("plugin stdout is not a JSON object of the required shape")]
    NotAnObject,

    /// Non-whitespace bytes, including a second JSON value, followed the
    /// first top-level value.
    #[error("plugin stdout contains data after the JSON object")]
    TrailingData,
}

/// The decoded result object reported by a plugin.
///
/// # Example
///
/// ```
/// use reeve_plugins::ResultRecord;
///
/// let record = ResultRecord::from_stdout(
///     br#" {"changed": true, "msg": "file created", "path": "/tmp/x"} "#,
/// )
/// .expect("valid record");
/// assert!(record.changed());
/// assert!(!record.failed());
/// assert_eq!(record.msg(), "file created");
/// assert_eq!(record.extra()["path"], "/tmp/x");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(default)]
    changed: bool,
    #[serde(default)]
    failed: bool,
    #[serde(default)]
    msg: String,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl ResultRecord {
    /// Decodes a captured stdout buffer into a record.
    ///
    /// Exactly one top-level JSON value is accepted and it must be an
    /// object; leading and trailing whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseFailure`] naming the first contract rule the
    /// output broke.
    pub fn from_stdout(stdout: &[u8]) -> Result<Self, ParseFailure> {
        let text = std::str::from_utf8(stdout).map_err(|_| ParseFailure::NotJson)?;
        if text.trim().is_empty() {
            return Err(ParseFailure::EmptyOutput);
        }

        let mut values = serde_json::Deserializer::from_str(text).into_iter::<serde_json::Value>();
        let first = match values.next() {
            Some(Ok(value)) => value,
            Some(Err(_)) | None => return Err(ParseFailure::NotJson),
        };
        let consumed = values.byte_offset();
        let rest = text.get(consumed..).unwrap_or("");
        if !rest.trim().is_empty() {
            return Err(ParseFailure::TrailingData);
        }

        if !first.is_object() {
            return Err(ParseFailure::NotAnObject);
        }
        serde_json::from_value(first).map_err(|_| ParseFailure::NotAnObject)
    }

    /// Returns whether the plugin reported a state change.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.changed
    }

    /// Returns whether the plugin self-reported failure.
    #[must_use]
    pub const fn failed(&self) -> bool {
        self.failed
    }

    /// Returns the free-text message, empty if the plugin sent none.
    #[must_use]
    pub const fn msg(&self) -> &str {
        self.msg.as_str()
    }

    /// Returns the unrecognized fields, preserved verbatim.
    #[must_use]
    pub const fn extra(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.extra
    }
}
