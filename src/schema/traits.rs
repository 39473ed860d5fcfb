//! Traits for compiled checks.
//!
//! This module provides the [`SchemaLike`] trait that lets leaf, object and
//! array checks be composed into one tree mirroring a signature.

use serde_json::Value;
use stillwater::Validation;

use crate::error::SchemaErrors;
use crate::path::DocPath;

/// A compiled check that validates a JSON value found at a document path.
///
/// Checks accumulate every failure they find rather than stopping at the
/// first one. The `Send + Sync` bounds allow compiled checks to be shared as
/// `Arc<dyn SchemaLike>` between nodes and the validator registry.
///
/// # Example
///
/// ```rust
/// use livedoc::{DocPath, Schema, SchemaLike, Signature};
/// use serde_json::json;
///
/// let sig = Signature::parse(json!({"type": "String"})).unwrap();
/// let check = Schema::field(&sig, false);
///
/// assert!(check.validate(&json!("ok"), &DocPath::parse("name")).is_success());
/// assert!(check.validate(&json!(1), &DocPath::parse("name")).is_failure());
/// ```
pub trait SchemaLike: Send + Sync {
    /// Validates a value located at `path`.
    fn validate(&self, value: &Value, path: &DocPath) -> Validation<(), SchemaErrors>;
}
