//! Argument marshalling for plugin invocations.
//!
//! Plugins receive their parameters through a file of `name=value` lines,
//! one parameter per line, with no quoting or escaping. Values are passed
//! through literally; interpreting them is the plugin's responsibility. The
//! engine never evaluates the file as code.
//!
//! [`ParameterSet`] validates parameters at insertion so that a constructed
//! set is always encodable, and [`ArgumentFile`] materialises the encoded
//! lines into an exclusively owned temporary file that is deleted again on
//! every exit path.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

use crate::error::EncodeError;

/// Prefix for argument file names; a random suffix keeps concurrent
/// invocations collision-free.
const ARGFILE_PREFIX: &str = "reeve-args-";

/// A validated mapping of parameter names to values.
///
/// Keys are unique and insertion order is irrelevant; encoding is
/// deterministic (lexicographic by name). Names must be non-empty and free
/// of `=`; neither names nor values may contain a line terminator, since
/// the serialisation format is line-oriented.
///
/// # Example
///
/// ```
/// use reeve_plugins::ParameterSet;
///
/// let mut params = ParameterSet::new();
/// params.insert("dest", "/tmp/x").expect("valid parameter");
/// params.insert("state", "present").expect("valid parameter");
/// assert_eq!(params.encode(), "dest=/tmp/x\nstate=present\n");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: BTreeMap<String, String>,
}

impl ParameterSet {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter, replacing any existing value for the same name.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if the name is empty, contains `=`, or if
    /// the name or value contains a line terminator.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), EncodeError> {
        let owned_name = name.into();
        let owned_value = value.into();
        validate(&owned_name, &owned_value)?;
        self.entries.insert(owned_name, owned_value);
        Ok(())
    }

    /// Looks up a parameter value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the set holds no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in encoding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Encodes the set as `name=value` lines, one parameter per line.
    ///
    /// No quoting or escaping is applied; validation at insertion
    /// guarantees the result re-parses unambiguously.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut text = String::new();
        for (name, value) in &self.entries {
            text.push_str(name);
            text.push('=');
            text.push_str(value);
            text.push('\n');
        }
        text
    }

    /// Parses `name=value` lines back into a parameter set.
    ///
    /// The first `=` on each line separates name from value; later `=`
    /// characters belong to the value. This is the inverse of
    /// [`ParameterSet::encode`] and is provided for plugin authors who
    /// consume argument files from Rust.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if a line has no separator or a name
    /// fails validation.
    pub fn parse(text: &str) -> Result<Self, EncodeError> {
        let mut params = Self::new();
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            let (name, value) =
                line.split_once('=')
                    .ok_or_else(|| EncodeError::MissingSeparator {
                        line: line.to_owned(),
                    })?;
            params.insert(name, value)?;
        }
        Ok(params)
    }
}

/// Checks a parameter against the line-format rules.
fn validate(name: &str, value: &str) -> Result<(), EncodeError> {
    if name.is_empty() {
        return Err(EncodeError::EmptyName);
    }
    if name.contains('=') {
        return Err(EncodeError::EqualsInName {
            name: name.to_owned(),
        });
    }
    let breaks_line = |text: &str| text.contains('\n') || text.contains('\r');
    if breaks_line(name) || breaks_line(value) {
        return Err(EncodeError::LineBreak {
            name: name.to_owned(),
        });
    }
    Ok(())
}

/// An encoded argument file on disk, deleted when dropped.
///
/// The file is created fresh for each invocation with a random name suffix
/// and, on unix, owner read/write permissions only, since parameter values
/// may be secrets. Deletion happens on drop regardless of how the
/// invocation ends, including panics in the invoker.
#[derive(Debug)]
pub struct ArgumentFile {
    file: NamedTempFile,
}

impl ArgumentFile {
    /// Writes the encoded parameter set to a fresh temporary file.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Io`] if the file cannot be created or
    /// written.
    pub fn materialise(params: &ParameterSet) -> Result<Self, EncodeError> {
        let mut builder = Builder::new();
        builder.prefix(ARGFILE_PREFIX);
        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(Permissions::from_mode(0o600));
        }
        let mut file = builder.tempfile()?;
        file.write_all(params.encode().as_bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    /// Returns the path handed to the plugin as its single argument.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
