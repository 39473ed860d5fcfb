//! Compiled checks derived from signatures.
//!
//! A [`Signature`] is declarative; before it can judge a value it is compiled
//! into a tree of [`SchemaLike`] checks. Leaf fragments become a
//! [`LeafSchema`], keyed fragments an [`ObjectSchema`] and list fragments an
//! [`ArraySchema`]. Every check accumulates all failures it finds.
//!
//! # Example
//!
//! ```rust
//! use livedoc::{DocPath, Schema, SchemaLike, Signature};
//! use serde_json::json;
//!
//! let sig = Signature::parse(json!({
//!     "properties": {
//!         "name": {"type": "String", "required": true},
//!         "age": {"type": "Integer"}
//!     }
//! })).unwrap();
//!
//! let check = Schema::object(&sig, false);
//! let result = check.validate(&json!({"age": "old"}), &DocPath::root());
//!
//! // Both the missing name and the wrong age type are reported.
//! assert_eq!(result.into_result().unwrap_err().len(), 2);
//! ```

mod array;
mod leaf;
mod object;
mod traits;

use std::sync::Arc;

use serde_json::Value;

use crate::error::SchemaError;
use crate::path::DocPath;
use crate::signature::Signature;

pub use array::ArraySchema;
pub use leaf::LeafSchema;
pub use object::ObjectSchema;
pub use traits::SchemaLike;

/// Entry point for compiling signatures into checks.
pub struct Schema;

impl Schema {
    /// Compiles the check for a value stored under `signature`.
    ///
    /// `inherited_extensible` is the extensibility of the enclosing node; the
    /// fragment's own `extensible` entry overrides it.
    pub fn field(signature: &Signature, inherited_extensible: bool) -> Arc<dyn SchemaLike> {
        if signature.is_list() {
            Arc::new(ArraySchema::from_signature(signature, inherited_extensible))
        } else if signature.is_object() {
            Arc::new(ObjectSchema::from_signature(signature, inherited_extensible))
        } else {
            Arc::new(LeafSchema::from_signature(signature))
        }
    }

    /// Compiles the whole-object check of a keyed node bound to `signature`.
    pub fn object(signature: &Signature, inherited_extensible: bool) -> ObjectSchema {
        ObjectSchema::from_signature(signature, inherited_extensible)
    }

    /// Compiles the whole-list check of an ordered node bound to `signature`.
    pub fn array(signature: &Signature, inherited_extensible: bool) -> ArraySchema {
        ArraySchema::from_signature(signature, inherited_extensible)
    }
}

/// Returns the JSON type name for a value.
pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `'<path>' expected <type>, type was '<actual>'`
pub(crate) fn type_mismatch(path: &DocPath, expected: &str, value: &Value) -> SchemaError {
    let got = value_type_name(value);
    SchemaError::new(
        path.clone(),
        format!("'{}' expected {}, type was '<{}>'", path, expected, got),
    )
    .with_code("invalid_type")
    .with_expected(expected)
    .with_got(got)
}
