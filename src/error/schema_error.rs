//! Validation failures.
//!
//! A rejected value yields one [`SchemaError`] per problem found. Checks never
//! stop at the first problem, so failures travel as [`SchemaErrors`], a
//! collection that cannot be empty.

use std::fmt;

use stillwater::prelude::*;

use crate::path::DocPath;

/// One problem found while checking a value.
///
/// The message already names the offending path, so it can be shown to a
/// user as is:
///
/// ```rust
/// use livedoc::{DocPath, SchemaError};
///
/// let error = SchemaError::new(
///     DocPath::parse("value"),
///     "'value' expected string, type was '<boolean>'",
/// )
/// .with_code("invalid_type")
/// .with_expected("string")
/// .with_got("boolean");
///
/// assert_eq!(error.to_string(), "'value' expected string, type was '<boolean>'");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    /// Where the problem is.
    pub path: DocPath,
    pub message: String,
    /// JSON type of the rejected value, when known.
    pub got: Option<String>,
    /// What the signature asked for, when it can be named.
    pub expected: Option<String>,
    /// Stable identifier such as `invalid_type`, `required` or `invalid_element`.
    pub code: String,
}

impl SchemaError {
    /// Creates an error with the generic `validation_error` code.
    pub fn new(path: DocPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            got: None,
            expected: None,
            code: "validation_error".to_string(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_got(mut self, got: impl Into<String>) -> Self {
        self.got = Some(got.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Error for a key that no signature declares.
    pub(crate) fn invalid_element(path: &DocPath) -> Self {
        SchemaError::new(
            path.clone(),
            format!("element '{}' is not a valid element", path),
        )
        .with_code("invalid_element")
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Every problem found by one check, in the order they were found.
///
/// Collections merge through stillwater's [`Semigroup`], which is how
/// whole-object checks accumulate field failures:
///
/// ```rust
/// use livedoc::{DocPath, SchemaError, SchemaErrors};
/// use stillwater::prelude::*;
///
/// let missing = SchemaErrors::single(
///     SchemaError::new(DocPath::parse("name"), "'name' is required"),
/// );
/// let unknown = SchemaErrors::single(
///     SchemaError::new(DocPath::parse("nick"), "element 'nick' is not a valid element"),
/// );
///
/// let all = missing.combine(unknown);
/// assert_eq!(all.summary(), "'name' is required\nelement 'nick' is not a valid element");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaErrors(NonEmptyVec<SchemaError>);

impl SchemaErrors {
    pub fn single(error: SchemaError) -> Self {
        Self(NonEmptyVec::singleton(error))
    }

    /// Builds a collection from a vec, or `None` when the vec is empty.
    pub fn from_vec(errors: Vec<SchemaError>) -> Option<Self> {
        NonEmptyVec::from_vec(errors).map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaError> {
        self.0.iter()
    }

    /// The first problem found.
    pub fn first(&self) -> &SchemaError {
        self.0.head()
    }

    /// Errors reported exactly at `path`.
    pub fn at_path(&self, path: &DocPath) -> Vec<&SchemaError> {
        self.iter().filter(|e| &e.path == path).collect()
    }

    /// Errors carrying `code`.
    pub fn with_code(&self, code: &str) -> Vec<&SchemaError> {
        self.iter().filter(|e| e.code == code).collect()
    }

    pub fn into_vec(self) -> Vec<SchemaError> {
        self.0.into_vec()
    }

    /// The messages joined by newlines.
    ///
    /// This is the string observers and callers receive; a single failure is
    /// reported verbatim.
    pub fn summary(&self) -> String {
        self.iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Semigroup for SchemaErrors {
    fn combine(self, other: Self) -> Self {
        SchemaErrors(self.0.combine(other.0))
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::error::Error for SchemaErrors {}

impl IntoIterator for SchemaErrors {
    type Item = SchemaError;
    type IntoIter = std::vec::IntoIter<SchemaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_vec().into_iter()
    }
}

impl From<SchemaError> for SchemaErrors {
    fn from(error: SchemaError) -> Self {
        SchemaErrors::single(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_generic_code() {
        let error = SchemaError::new(DocPath::parse("name"), "'name' is required");
        assert_eq!(error.code, "validation_error");
        assert!(error.got.is_none());
        assert!(error.expected.is_none());
    }

    #[test]
    fn test_invalid_element_message() {
        let error = SchemaError::invalid_element(&DocPath::parse("a.b"));
        assert_eq!(error.message, "element 'a.b' is not a valid element");
        assert_eq!(error.code, "invalid_element");
    }

    #[test]
    fn test_summary_single_is_verbatim() {
        let errors = SchemaErrors::single(SchemaError::new(DocPath::root(), "only one"));
        assert_eq!(errors.summary(), "only one");
        assert_eq!(errors.to_string(), "only one");
    }

    #[test]
    fn test_into_iter_preserves_order() {
        let errors = SchemaErrors::from(SchemaError::new(DocPath::parse("a"), "first"))
            .combine(SchemaErrors::single(SchemaError::new(DocPath::parse("b"), "second")));
        let paths: Vec<String> = errors.into_iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["a", "b"]);
    }

    #[test]
    fn test_errors_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaError>();
        assert_send_sync::<SchemaErrors>();
    }
}
