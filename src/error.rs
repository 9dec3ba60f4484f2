use std::fmt::{self, Debug, Display};

/// Provides `TvCoreError` and maps other errors to
/// convert to a `TvCoreError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum TvCoreError {
    /// The supplied identifier string is not 32 hex characters.
    InvalidUuid(String),
    /// The supplied identifier is already in use by a live object.
    DuplicateUuid(String),
    /// No property with this id exists anywhere on the class chain.
    UnknownProperty(String),
    /// The property exists but its declared type does not match the
    /// requested accessor. Values are never coerced.
    TypeMismatch(String),
    /// The identifier does not refer to a registered object.
    NotRegistered(String),
    /// A permission hook rejected the operation.
    PermissionDenied,
    JsonError(serde_json::Error),
    RegexError(regex::Error),
    TvCoreError(String),
}

impl From<serde_json::Error> for TvCoreError {
    fn from(error: serde_json::Error) -> Self {
        TvCoreError::JsonError(error)
    }
}

impl From<regex::Error> for TvCoreError {
    fn from(error: regex::Error) -> Self {
        TvCoreError::RegexError(error)
    }
}

impl From<String> for TvCoreError {
    fn from(error: String) -> Self {
        TvCoreError::TvCoreError(error)
    }
}

impl From<&str> for TvCoreError {
    fn from(error: &str) -> Self {
        TvCoreError::TvCoreError(error.to_string())
    }
}

impl std::error::Error for TvCoreError {}

impl Display for TvCoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {self:?}")?;
        Ok(())
    }
}
