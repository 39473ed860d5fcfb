//! Whole-list checks.
//!
//! This module provides [`ArraySchema`] for ordered nodes. Items share the
//! signature found under `elements`; when that signature carries a
//! `polymorphic` list, items bind to alternatives strictly by position.

use std::sync::Arc;

use serde_json::Value;
use stillwater::Validation;

use crate::error::{SchemaError, SchemaErrors};
use crate::path::DocPath;
use crate::signature::Signature;

use super::object::PolymorphicCheck;
use super::traits::SchemaLike;
use super::{type_mismatch, Schema};

/// How items are checked.
enum Items {
    /// No item signature: any item is accepted.
    Any,
    /// Every item is checked against one schema.
    Shared(Arc<dyn SchemaLike>),
    /// Items are checked against positional alternatives.
    Positional(PolymorphicCheck),
}

/// A check for ordered collections compiled from a signature.
///
/// # Example
///
/// ```rust
/// use livedoc::{ArraySchema, DocPath, SchemaLike, Signature};
/// use serde_json::json;
///
/// let sig = Signature::parse(json!({
///     "type": "Array",
///     "elements": {"type": "Number"}
/// })).unwrap();
/// let schema = ArraySchema::from_signature(&sig, false);
///
/// assert!(schema.validate(&json!([1, 2, 3]), &DocPath::parse("xs")).is_success());
/// assert!(schema.validate(&json!([1, "two"]), &DocPath::parse("xs")).is_failure());
/// ```
pub struct ArraySchema {
    items: Items,
    extensible: bool,
}

impl ArraySchema {
    /// Compiles the check for an ordered node bound to `signature`.
    pub fn from_signature(signature: &Signature, inherited_extensible: bool) -> Self {
        let extensible = signature.is_extensible(inherited_extensible);
        let items = match signature.elements() {
            None => Items::Any,
            Some(item) => match item.polymorphic() {
                Some(poly) => Items::Positional(PolymorphicCheck::compile(&poly, extensible)),
                None => Items::Shared(Schema::field(&item, extensible)),
            },
        };
        Self { items, extensible }
    }
}

impl SchemaLike for ArraySchema {
    fn validate(&self, value: &Value, path: &DocPath) -> Validation<(), SchemaErrors> {
        let arr = match value.as_array() {
            Some(a) => a,
            None => {
                return Validation::Failure(SchemaErrors::single(type_mismatch(
                    path, "array", value,
                )))
            }
        };

        let mut errors: Vec<SchemaError> = Vec::new();

        for (idx, item) in arr.iter().enumerate() {
            let item_path = path.push_index(idx);
            let schema = match &self.items {
                Items::Any => continue,
                Items::Shared(schema) => schema,
                Items::Positional(poly) => match poly.at(Some(idx)) {
                    Some(schema) => schema,
                    None if self.extensible => continue,
                    None => {
                        errors.push(SchemaError::invalid_element(&item_path));
                        continue;
                    }
                },
            };
            if let Validation::Failure(e) = schema.validate(item, &item_path) {
                errors.extend(e);
            }
        }

        match SchemaErrors::from_vec(errors) {
            Some(errors) => Validation::Failure(errors),
            None => Validation::Success(()),
        }
    }
}
