//! Leaf checks.
//!
//! This module provides [`LeafSchema`], the check behind every scalar path
//! validator: a type test against the declared type names and an optional
//! `restrict` pattern for string values.

use regex::Regex;
use serde_json::Value;
use stillwater::Validation;

use crate::error::{SchemaError, SchemaErrors};
use crate::path::DocPath;
use crate::signature::{Signature, TypeName};

use super::traits::SchemaLike;
use super::type_mismatch;

/// A check for a single value.
///
/// # Example
///
/// ```rust
/// use livedoc::{DocPath, LeafSchema, SchemaLike, Signature};
/// use serde_json::json;
///
/// let sig = Signature::parse(json!({"type": "String", "restrict": "^[a-z]+$"})).unwrap();
/// let leaf = LeafSchema::from_signature(&sig);
///
/// assert!(leaf.validate(&json!("abc"), &DocPath::parse("tag")).is_success());
/// assert!(leaf.validate(&json!("ABC"), &DocPath::parse("tag")).is_failure());
/// ```
#[derive(Debug, Clone)]
pub struct LeafSchema {
    types: Vec<TypeName>,
    restrict: Option<Regex>,
}

impl LeafSchema {
    /// A leaf that accepts any value.
    pub fn any() -> Self {
        Self {
            types: Vec::new(),
            restrict: None,
        }
    }

    /// Compiles the leaf check of a fragment.
    ///
    /// Signatures are checked when parsed, so a `restrict` pattern always compiles here.
    pub fn from_signature(signature: &Signature) -> Self {
        Self {
            types: signature.types(),
            restrict: signature.restrict().and_then(|p| Regex::new(p).ok()),
        }
    }

    fn accepts_type(&self, value: &Value) -> bool {
        self.types.is_empty() || self.types.iter().any(|t| t.matches(value))
    }

    fn expected(&self) -> String {
        self.types
            .iter()
            .map(TypeName::as_str)
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl SchemaLike for LeafSchema {
    fn validate(&self, value: &Value, path: &DocPath) -> Validation<(), SchemaErrors> {
        if !self.accepts_type(value) {
            return Validation::Failure(SchemaErrors::single(type_mismatch(
                path,
                &self.expected(),
                value,
            )));
        }

        if let (Some(regex), Some(s)) = (&self.restrict, value.as_str()) {
            if !regex.is_match(s) {
                return Validation::Failure(SchemaErrors::single(
                    SchemaError::new(
                        path.clone(),
                        format!("'{}' value does not match '{}'", path, regex.as_str()),
                    )
                    .with_code("pattern")
                    .with_expected(format!("string matching '{}'", regex.as_str()))
                    .with_got(s.to_string()),
                ));
            }
        }

        Validation::Success(())
    }
}
