//! Path-addressed validator registry.
//!
//! This module provides the [`ValidatorRegistry`] that stores exactly one
//! compiled validator per fully qualified document path. The schema walker
//! fills it eagerly for declared paths and lazily for wildcard, polymorphic,
//! collection and extensible paths.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

use indexmap::IndexMap;

use crate::error::{SchemaError, SchemaErrors};
use crate::path::DocPath;
use crate::schema::{Schema, SchemaLike};
use crate::signature::Signature;
use stillwater::Validation;

/// How a validator came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Derived from a declared path while walking the static schema tree.
    Declared,
    /// Created on demand for a wildcard, polymorphic, item or extensible path.
    Lazy,
}

/// A compiled check bound to one document path.
pub struct Validator {
    path: DocPath,
    owner: DocPath,
    signature: Signature,
    schema: Arc<dyn SchemaLike>,
    origin: Origin,
}

impl Validator {
    /// The path this validator is registered under.
    pub fn path(&self) -> &DocPath {
        &self.path
    }

    /// The path of the node that requested this validator.
    pub fn owner(&self) -> &DocPath {
        &self.owner
    }

    /// The schema fragment the validator was compiled from.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Whether the validator was declared or created on demand.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Runs the compiled check against a value.
    pub fn validate(&self, value: &Value) -> Validation<(), SchemaErrors> {
        self.schema.validate(value, &self.path)
    }
}

/// Type alias for the validator storage map.
type ValidatorMap = Arc<RwLock<IndexMap<String, Arc<Validator>>>>;

/// Registry of validators keyed by dotted path.
///
/// Replacement is atomic: a lookup observes either the previous or the new
/// validator, never a partially built one.
///
/// # Example
///
/// ```rust
/// use livedoc::{DocPath, Origin, Signature, ValidatorRegistry};
/// use serde_json::json;
///
/// let registry = ValidatorRegistry::new();
/// let sig = Signature::parse(json!({"type": "String"})).unwrap();
///
/// registry.create(&sig, &DocPath::parse("name"), &DocPath::root(), false, Origin::Declared);
///
/// assert!(registry.exec("name", &json!("Alice")).is_ok());
/// assert_eq!(
///     registry.exec("name", &json!(1)).unwrap_err().summary(),
///     "'name' expected string, type was '<number>'"
/// );
/// ```
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: ValidatorMap,
}

impl ValidatorRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `fragment` and registers it under `path`, replacing any
    /// existing validator at that path.
    pub fn create(
        &self,
        fragment: &Signature,
        path: &DocPath,
        owner: &DocPath,
        extensible: bool,
        origin: Origin,
    ) -> Arc<Validator> {
        let validator = Arc::new(Validator {
            path: path.clone(),
            owner: owner.clone(),
            signature: fragment.clone(),
            schema: Schema::field(fragment, extensible),
            origin,
        });
        trace!(path = %path, owner = %owner, ?origin, "validator created");
        self.set(path, Arc::clone(&validator));
        validator
    }

    /// Registers `fragment` under `path` unless a validator already exists there.
    pub fn ensure(
        &self,
        fragment: &Signature,
        path: &DocPath,
        owner: &DocPath,
        extensible: bool,
        origin: Origin,
    ) -> Arc<Validator> {
        match self.get(&path.to_string()) {
            Some(existing) => existing,
            None => self.create(fragment, path, owner, extensible, origin),
        }
    }

    /// Retrieves the validator registered under a dotted path.
    pub fn get(&self, path: &str) -> Option<Arc<Validator>> {
        self.validators.read().get(path).cloned()
    }

    /// Stores a validator under `path`.
    pub fn set(&self, path: &DocPath, validator: Arc<Validator>) {
        self.validators.write().insert(path.to_string(), validator);
    }

    /// Returns true if a validator is registered under `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.validators.read().contains_key(path)
    }

    /// All known paths, in registration order.
    pub fn list(&self) -> Vec<String> {
        self.validators.read().keys().cloned().collect()
    }

    /// Number of registered validators.
    pub fn len(&self) -> usize {
        self.validators.read().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.validators.read().is_empty()
    }

    /// Runs the validator registered under `path` against `value`.
    ///
    /// # Errors
    ///
    /// Fails with `invalid_property` when no validator exists at `path`, or
    /// with the validator's own errors when the value does not conform.
    pub fn exec(&self, path: &str, value: &Value) -> Result<(), SchemaErrors> {
        let validator = self.get(path).ok_or_else(|| {
            SchemaErrors::single(
                SchemaError::new(
                    DocPath::parse(path),
                    format!("'{}' is not a valid schema property", path),
                )
                .with_code("invalid_property"),
            )
        })?;
        validator.validate(value).into_result()
    }

    /// Removes lazily created validators at or below `prefix`.
    ///
    /// Declared validators stay; they belong to the static schema tree.
    /// Returns the number of validators removed.
    pub fn prune_lazy(&self, prefix: &DocPath) -> usize {
        let mut validators = self.validators.write();
        let before = validators.len();
        validators.retain(|_, v| !(v.origin == Origin::Lazy && v.path.starts_with(prefix)));
        let removed = before - validators.len();
        if removed > 0 {
            trace!(prefix = %prefix, removed, "stale validators pruned");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sig(v: Value) -> Signature {
        Signature::parse(v).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let registry = ValidatorRegistry::new();
        registry.create(&sig(json!({"type": "Number"})), &DocPath::parse("a.b"), &DocPath::parse("a"), false, Origin::Declared);

        let v = registry.get("a.b").unwrap();
        assert_eq!(v.path().to_string(), "a.b");
        assert_eq!(v.owner().to_string(), "a");
        assert_eq!(v.origin(), Origin::Declared);
        assert!(registry.get("a").is_none());
    }

    #[test]
    fn test_create_replaces() {
        let registry = ValidatorRegistry::new();
        let path = DocPath::parse("x");
        registry.create(&sig(json!({"type": "Number"})), &path, &DocPath::root(), false, Origin::Declared);
        registry.create(&sig(json!({"type": "String"})), &path, &DocPath::root(), false, Origin::Lazy);

        assert_eq!(registry.len(), 1);
        assert!(registry.exec("x", &json!("s")).is_ok());
        assert!(registry.exec("x", &json!(1)).is_err());
    }

    #[test]
    fn test_ensure_keeps_existing() {
        let registry = ValidatorRegistry::new();
        let path = DocPath::parse("x");
        registry.create(&sig(json!({"type": "Number"})), &path, &DocPath::root(), false, Origin::Declared);
        let v = registry.ensure(&sig(json!({"type": "String"})), &path, &DocPath::root(), false, Origin::Lazy);
        assert_eq!(v.origin(), Origin::Declared);
        assert!(registry.exec("x", &json!(1)).is_ok());
    }

    #[test]
    fn test_exec_unknown_path() {
        let registry = ValidatorRegistry::new();
        let errors = registry.exec("nope", &json!(1)).unwrap_err();
        assert_eq!(errors.first().code, "invalid_property");
        assert_eq!(errors.summary(), "'nope' is not a valid schema property");
    }

    #[test]
    fn test_list_preserves_order() {
        let registry = ValidatorRegistry::new();
        for p in ["z", "a", "m"] {
            registry.create(&Signature::default_signature(), &DocPath::parse(p), &DocPath::root(), true, Origin::Declared);
        }
        assert_eq!(registry.list(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_prune_lazy_keeps_declared() {
        let registry = ValidatorRegistry::new();
        let any = Signature::default_signature();
        registry.create(&any, &DocPath::parse("a"), &DocPath::root(), true, Origin::Declared);
        registry.create(&any, &DocPath::parse("a.b"), &DocPath::parse("a"), true, Origin::Lazy);
        registry.create(&any, &DocPath::parse("a.c"), &DocPath::parse("a"), true, Origin::Declared);
        registry.create(&any, &DocPath::parse("ab"), &DocPath::root(), true, Origin::Lazy);

        assert_eq!(registry.prune_lazy(&DocPath::parse("a")), 1);
        assert_eq!(registry.list(), vec!["a", "a.c", "ab"]);
    }
}
