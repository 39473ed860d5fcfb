//! Whole-object checks.
//!
//! This module provides [`ObjectSchema`], the check a keyed node runs over its
//! entire prospective state before committing any mutation. Declared fields,
//! wildcard children, polymorphic fallbacks and extensibility are all resolved
//! here the same way the schema walker resolves a single key.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use stillwater::Validation;

use crate::error::{SchemaError, SchemaErrors};
use crate::path::{final_segment, DocPath};
use crate::signature::{Polymorphic, Signature};

use super::traits::SchemaLike;
use super::{type_mismatch, Schema};

/// Definition of a declared field.
struct FieldDef {
    schema: Arc<dyn SchemaLike>,
    required: bool,
    has_default: bool,
}

/// Compiled polymorphic fallback of a child map.
pub(crate) enum PolymorphicCheck {
    Single(Arc<dyn SchemaLike>),
    Ordered(Vec<Arc<dyn SchemaLike>>),
}

impl PolymorphicCheck {
    pub(crate) fn compile(poly: &Polymorphic, extensible: bool) -> Self {
        match poly {
            Polymorphic::Single(sig) => PolymorphicCheck::Single(Schema::field(sig, extensible)),
            Polymorphic::Ordered(alts) => PolymorphicCheck::Ordered(
                alts.iter().map(|sig| Schema::field(sig, extensible)).collect(),
            ),
        }
    }

    pub(crate) fn at(&self, index: Option<usize>) -> Option<&Arc<dyn SchemaLike>> {
        match self {
            PolymorphicCheck::Single(schema) => Some(schema),
            PolymorphicCheck::Ordered(alts) => index.and_then(|i| alts.get(i)),
        }
    }
}

/// A check for keyed objects compiled from a signature.
///
/// Keys are resolved in order: literal field, wildcard `*`, polymorphic
/// fallback. A compound key such as `x.value` is looked up by its last
/// segment. Anything else is an invalid element unless the signature is
/// extensible. A missing required field without a default is reported too,
/// and all failures are accumulated.
///
/// # Example
///
/// ```rust
/// use livedoc::{DocPath, ObjectSchema, SchemaLike, Signature};
/// use serde_json::json;
///
/// let sig = Signature::parse(json!({
///     "properties": {"name": {"type": "String"}}
/// })).unwrap();
/// let schema = ObjectSchema::from_signature(&sig, false);
///
/// assert!(schema.validate(&json!({"name": "Alice"}), &DocPath::root()).is_success());
/// assert!(schema.validate(&json!({"other": 1}), &DocPath::root()).is_failure());
/// ```
pub struct ObjectSchema {
    fields: IndexMap<String, FieldDef>,
    wildcard: Option<Arc<dyn SchemaLike>>,
    polymorphic: Option<PolymorphicCheck>,
    extensible: bool,
}

impl ObjectSchema {
    /// Compiles the check for a keyed node bound to `signature`.
    pub fn from_signature(signature: &Signature, inherited_extensible: bool) -> Self {
        let extensible = signature.is_extensible(inherited_extensible);
        let children = signature.children();

        let fields = children
            .fields()
            .map(|(name, sig)| {
                (
                    name.to_string(),
                    FieldDef {
                        schema: Schema::field(&sig, extensible),
                        required: sig.is_required(),
                        has_default: sig.default_value().is_some(),
                    },
                )
            })
            .collect();

        Self {
            fields,
            wildcard: children.wildcard().map(|sig| Schema::field(&sig, extensible)),
            polymorphic: children
                .polymorphic()
                .map(|poly| PolymorphicCheck::compile(&poly, extensible)),
            extensible,
        }
    }

    /// Returns true if undeclared keys are accepted.
    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    fn undeclared(&self, key: &str) -> Option<&Arc<dyn SchemaLike>> {
        self.wildcard.as_ref().or_else(|| {
            self.polymorphic
                .as_ref()
                .and_then(|poly| poly.at(key.parse::<usize>().ok()))
        })
    }
}

impl SchemaLike for ObjectSchema {
    fn validate(&self, value: &Value, path: &DocPath) -> Validation<(), SchemaErrors> {
        let obj = match value.as_object() {
            Some(o) => o,
            None => {
                return Validation::Failure(SchemaErrors::single(type_mismatch(
                    path, "object", value,
                )))
            }
        };

        let mut errors = Vec::new();

        for (name, field_def) in &self.fields {
            let field_path = path.push_field(name);
            match obj.get(name) {
                Some(field_value) => {
                    if let Validation::Failure(e) = field_def.schema.validate(field_value, &field_path) {
                        errors.extend(e);
                    }
                }
                None if field_def.required && !field_def.has_default => {
                    errors.push(
                        SchemaError::new(field_path.clone(), format!("'{}' is required", field_path))
                            .with_code("required")
                            .with_expected("value"),
                    );
                }
                None => {}
            }
        }

        for (key, field_value) in obj {
            if self.fields.contains_key(key) {
                continue;
            }
            let field_path = path.join(key);
            let declared = if key.contains('.') {
                self.fields.get(final_segment(key)).map(|f| &f.schema)
            } else {
                None
            };
            match declared.or_else(|| self.undeclared(key)) {
                Some(schema) => {
                    if let Validation::Failure(e) = schema.validate(field_value, &field_path) {
                        errors.extend(e);
                    }
                }
                None if self.extensible => {}
                None => errors.push(SchemaError::invalid_element(&field_path)),
            }
        }

        match SchemaErrors::from_vec(errors) {
            Some(errors) => Validation::Failure(errors),
            None => Validation::Success(()),
        }
    }
}
