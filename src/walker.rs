//! Path resolution and validator construction.
//!
//! The [`SchemaWalker`] flattens a signature tree into path-addressed
//! validators and decides, for a single key or position, which signature is
//! authoritative and whether the value is checked in place or materialized
//! into a child node.
//!
//! Validators for declared paths are built eagerly when the document is
//! created. Wildcard, polymorphic, collection item and extensible paths get
//! theirs on demand, since enumerating them up front is unbounded work.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::context::{DocumentContext, PathOutcome};
use crate::error::{SchemaError, SchemaErrors};
use crate::model::{CollectionNode, DocumentNode, Node, Slot};
use crate::path::{final_segment, DocPath};
use crate::registry::Origin;
use crate::signature::{Polymorphic, Signature};

/// The keyed node a child key is resolved against.
pub(crate) struct Owner<'a> {
    pub(crate) path: &'a DocPath,
    pub(crate) children: &'a Signature,
    pub(crate) extensible: bool,
}

/// The ordered node an item position is resolved against.
pub(crate) struct ItemOwner<'a> {
    pub(crate) path: &'a DocPath,
    pub(crate) elements: Option<&'a Signature>,
    pub(crate) extensible: bool,
}

pub(crate) struct SchemaWalker<'a> {
    context: &'a Arc<DocumentContext>,
}

impl<'a> SchemaWalker<'a> {
    pub(crate) fn new(context: &'a Arc<DocumentContext>) -> Self {
        Self { context }
    }

    /// Registers validators for every declared path below `base`.
    ///
    /// `map` is a child map: its literal keys name children, `elements` and
    /// `properties` are transparent, `*` is skipped and `polymorphic` binds
    /// alternatives by position.
    pub(crate) fn build_validators(
        &self,
        map: &Signature,
        base: &DocPath,
        extensible: bool,
        origin: Origin,
    ) {
        for key in map.walk_keys() {
            match key {
                "elements" | "properties" => {
                    if let Some(elements) = map.elements() {
                        self.build_validators(&elements, base, extensible, origin);
                    }
                }
                "*" => {}
                "polymorphic" => match map.polymorphic() {
                    Some(Polymorphic::Single(alt)) => {
                        if !base.is_root() {
                            let owner = base.parent().unwrap_or_default();
                            self.context
                                .validators()
                                .ensure(&alt, base, &owner, extensible, origin);
                        }
                        self.register_branch(&alt, &base.push_index(0), base, extensible, origin);
                    }
                    Some(Polymorphic::Ordered(alts)) => {
                        for (i, alt) in alts.iter().enumerate() {
                            self.register_branch(alt, &base.push_index(i), base, extensible, origin);
                        }
                    }
                    None => {}
                },
                _ => {
                    if let Some(child) = map.entry(key) {
                        self.register_branch(&child, &base.push_field(key), base, extensible, origin);
                    }
                }
            }
        }
    }

    /// Registers validators for an ordered collection's positional alternatives.
    ///
    /// Items sharing one signature are not enumerated; their validators are
    /// created when an item is first written.
    pub(crate) fn build_list_validators(
        &self,
        list: &Signature,
        path: &DocPath,
        extensible: bool,
        origin: Origin,
    ) {
        if let Some(item) = list.elements() {
            if item.polymorphic().is_some() {
                self.build_validators(&item, path, list.is_extensible(extensible), origin);
            }
        }
    }

    fn register_branch(
        &self,
        sig: &Signature,
        path: &DocPath,
        owner: &DocPath,
        extensible: bool,
        origin: Origin,
    ) {
        self.register(sig, path, owner, extensible, origin);
        let nested = sig.is_extensible(extensible);
        if sig.is_list() {
            self.build_list_validators(sig, path, extensible, origin);
        } else if sig.is_object() {
            self.build_validators(&sig.children(), path, nested, origin);
        }
    }

    fn register(
        &self,
        sig: &Signature,
        path: &DocPath,
        owner: &DocPath,
        extensible: bool,
        origin: Origin,
    ) {
        let validators = self.context.validators();
        match origin {
            Origin::Declared => {
                validators.create(sig, path, owner, extensible, origin);
            }
            Origin::Lazy => {
                validators.ensure(sig, path, owner, extensible, origin);
            }
        }
    }

    /// Resolves one key of a keyed node and produces the slot to commit.
    ///
    /// Resolution order is literal key, wildcard, polymorphic alternative, and
    /// finally the accept-anything signature when the owner is extensible.
    /// Dotted keys are looked up by their final segment but validated under
    /// the full path.
    pub(crate) fn resolve_child(
        &self,
        owner: &Owner<'_>,
        key: &str,
        value: Value,
    ) -> Result<Slot, SchemaErrors> {
        let full = owner.path.join(key);
        let lookup = final_segment(key);
        let validators = self.context.validators();

        let signature = if let Some(sig) = owner.children.entry(lookup) {
            validators.ensure(&sig, &full, owner.path, owner.extensible, Origin::Lazy);
            sig
        } else if let Some(sig) = owner.children.wildcard() {
            validators.create(&sig, &full, owner.path, owner.extensible, Origin::Lazy);
            sig
        } else if let Some(sig) = owner
            .children
            .polymorphic()
            .and_then(|poly| poly.alternative(lookup))
        {
            validators.ensure(&sig, &full, owner.path, owner.extensible, Origin::Lazy);
            sig
        } else if owner.extensible {
            let sig = Signature::default_signature();
            validators.ensure(&sig, &full, owner.path, true, Origin::Lazy);
            sig
        } else {
            let error = SchemaError::invalid_element(&full);
            self.context
                .record(full.to_string(), PathOutcome::Invalid(error.message.clone()));
            return Err(SchemaErrors::single(error));
        };

        self.settle(&signature, &full, owner.extensible, value)
    }

    /// Resolves one position of an ordered node and produces the slot to commit.
    pub(crate) fn resolve_item(
        &self,
        owner: &ItemOwner<'_>,
        index: usize,
        value: Value,
    ) -> Result<Slot, SchemaErrors> {
        let full = owner.path.push_index(index);
        let validators = self.context.validators();

        let signature = match owner.elements {
            Some(item) => match item.polymorphic() {
                Some(poly) => poly.at(index),
                None => Some(item.clone()),
            },
            None => Some(Signature::default_signature()),
        };

        let signature = match signature {
            Some(sig) => sig,
            None if owner.extensible => Signature::default_signature(),
            None => {
                let error = SchemaError::invalid_element(&full);
                self.context
                    .record(full.to_string(), PathOutcome::Invalid(error.message.clone()));
                return Err(SchemaErrors::single(error));
            }
        };
        validators.ensure(&signature, &full, owner.path, owner.extensible, Origin::Lazy);

        self.settle(&signature, &full, owner.extensible, value)
    }

    /// Checks a scalar in place or materializes a composite, recording the outcome.
    fn settle(
        &self,
        signature: &Signature,
        full: &DocPath,
        extensible: bool,
        value: Value,
    ) -> Result<Slot, SchemaErrors> {
        let result = if value.is_object() || value.is_array() {
            self.materialize(signature, full, extensible, value).map(Slot::Node)
        } else {
            self.validate(full, &value, extensible).map(|_| Slot::Value(value))
        };

        let outcome = match &result {
            Ok(_) => PathOutcome::Valid,
            Err(errors) => PathOutcome::Invalid(errors.summary()),
        };
        self.context.record(full.to_string(), outcome);
        result
    }

    /// Runs the validator registered for `path`.
    ///
    /// When no validator exists, an extensible owner gets an accept-anything
    /// validator created on the spot; otherwise the path is not part of the schema.
    pub(crate) fn validate(
        &self,
        path: &DocPath,
        value: &Value,
        extensible: bool,
    ) -> Result<(), SchemaErrors> {
        self.context.count_path_validation();
        if path.is_root() {
            return Err(SchemaErrors::single(
                SchemaError::new(path.clone(), "invalid path \"\"").with_code("invalid_path"),
            ));
        }

        let key = path.to_string();
        let validators = self.context.validators();
        if !validators.contains(&key) {
            if !extensible {
                return Err(SchemaErrors::single(
                    SchemaError::new(
                        path.clone(),
                        format!("'{}' is not a valid schema property", key),
                    )
                    .with_code("invalid_property"),
                ));
            }
            let owner = path.parent().unwrap_or_default();
            validators.create(
                &Signature::default_signature(),
                path,
                &owner,
                true,
                Origin::Lazy,
            );
        }

        trace!(path = %path, "executing validator");
        validators.exec(&key, value)
    }

    /// Builds a child node for a composite value.
    ///
    /// List values become a [`CollectionNode`], keyed values a
    /// [`DocumentNode`]. The child is populated under its own dirty flag
    /// without notifications; the enclosing mutation announces the result.
    pub(crate) fn materialize(
        &self,
        signature: &Signature,
        path: &DocPath,
        extensible: bool,
        value: Value,
    ) -> Result<Node, SchemaErrors> {
        let max_depth = self.context.options().max_depth;
        if path.len() > max_depth {
            return Err(SchemaErrors::single(
                SchemaError::new(
                    path.clone(),
                    format!("maximum nesting depth {} exceeded at '{}'", max_depth, path),
                )
                .with_code("max_depth_exceeded"),
            ));
        }
        self.context.count_materialization();

        let node = match value {
            Value::Array(items) => {
                let node = CollectionNode::new(
                    Arc::clone(self.context),
                    signature.clone(),
                    path.clone(),
                    extensible,
                );
                self.build_list_validators(signature, path, extensible, Origin::Lazy);
                node.load(items)?;
                Node::Collection(node)
            }
            Value::Object(map) => {
                let node = DocumentNode::new(
                    Arc::clone(self.context),
                    signature.clone(),
                    path.clone(),
                    extensible,
                );
                self.build_validators(
                    &signature.children(),
                    path,
                    signature.is_extensible(extensible),
                    Origin::Lazy,
                );
                node.load(map)?;
                Node::Document(node)
            }
            other => {
                return Err(SchemaErrors::single(
                    SchemaError::new(
                        path.clone(),
                        format!("'{}' was invalid", path),
                    )
                    .with_code("invalid_type")
                    .with_got(crate::schema::value_type_name(&other)),
                ))
            }
        };

        debug!(path = %path, "child node materialized");
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentOptions;
    use serde_json::json;

    fn context() -> Arc<DocumentContext> {
        DocumentContext::new(DocumentOptions::default())
    }

    fn sig(v: Value) -> Signature {
        Signature::parse(v).unwrap()
    }

    #[test]
    fn test_build_declared_paths() {
        let ctx = context();
        let schema = sig(json!({
            "properties": {
                "name": {"type": "String"},
                "address": {
                    "type": "Object",
                    "elements": {
                        "city": {"type": "String"},
                        "*": {"type": "String"}
                    }
                }
            }
        }));
        SchemaWalker::new(&ctx).build_validators(&schema.children(), &DocPath::root(), false, Origin::Declared);

        assert_eq!(ctx.validators().list(), vec!["name", "address", "address.city"]);
    }

    #[test]
    fn test_build_ordered_polymorphic() {
        let ctx = context();
        let schema = sig(json!({
            "shapes": {
                "type": "Array",
                "elements": {"polymorphic": [{"type": "String"}, {"type": "Number"}]}
            }
        }));
        SchemaWalker::new(&ctx).build_validators(&schema, &DocPath::root(), false, Origin::Declared);

        assert_eq!(ctx.validators().list(), vec!["shapes", "shapes.0", "shapes.1"]);
    }

    #[test]
    fn test_build_single_polymorphic_registers_parent_and_zero() {
        let ctx = context();
        let schema = sig(json!({
            "item": {"type": "Object", "elements": {"polymorphic": {"type": "String"}}}
        }));
        SchemaWalker::new(&ctx).build_validators(&schema, &DocPath::root(), false, Origin::Declared);

        let list = ctx.validators().list();
        assert!(list.contains(&"item".to_string()));
        assert!(list.contains(&"item.0".to_string()));
    }

    #[test]
    fn test_validate_rejects_empty_path() {
        let ctx = context();
        let err = SchemaWalker::new(&ctx)
            .validate(&DocPath::root(), &json!(1), true)
            .unwrap_err();
        assert_eq!(err.first().code, "invalid_path");
    }

    #[test]
    fn test_validate_creates_lazily_when_extensible() {
        let ctx = context();
        let walker = SchemaWalker::new(&ctx);
        let path = DocPath::parse("free");

        let err = walker.validate(&path, &json!(1), false).unwrap_err();
        assert_eq!(err.summary(), "'free' is not a valid schema property");

        assert!(walker.validate(&path, &json!(1), true).is_ok());
        assert_eq!(ctx.validators().get("free").unwrap().origin(), Origin::Lazy);
    }

    #[test]
    fn test_resolve_child_wildcard_creates_validator() {
        let ctx = context();
        let children = sig(json!({"*": {"type": "Number"}}));
        let root = DocPath::root();
        let owner = Owner {
            path: &root,
            children: &children,
            extensible: false,
        };
        let walker = SchemaWalker::new(&ctx);

        assert!(walker.resolve_child(&owner, "anything", json!(3)).is_ok());
        assert!(ctx.validators().contains("anything"));
        assert_eq!(ctx.outcome("anything"), Some(PathOutcome::Valid));

        let err = walker.resolve_child(&owner, "other", json!("x")).unwrap_err();
        assert_eq!(err.summary(), "'other' expected number, type was '<string>'");
    }

    #[test]
    fn test_resolve_child_rejects_undeclared() {
        let ctx = context();
        let children = sig(json!({"a": {"type": "String"}}));
        let root = DocPath::root();
        let owner = Owner {
            path: &root,
            children: &children,
            extensible: false,
        };

        let err = SchemaWalker::new(&ctx)
            .resolve_child(&owner, "b", json!(1))
            .unwrap_err();
        assert_eq!(err.summary(), "element 'b' is not a valid element");
        assert!(matches!(ctx.outcome("b"), Some(PathOutcome::Invalid(_))));
    }

    #[test]
    fn test_resolve_child_compound_key_uses_final_segment() {
        let ctx = context();
        let children = sig(json!({"value": {"type": "String"}}));
        let root = DocPath::root();
        let owner = Owner {
            path: &root,
            children: &children,
            extensible: false,
        };
        let walker = SchemaWalker::new(&ctx);

        assert!(walker.resolve_child(&owner, "x.value", json!("ok")).is_ok());
        assert!(ctx.validators().contains("x.value"));
        let err = walker.resolve_child(&owner, "x.value", json!(1)).unwrap_err();
        assert_eq!(err.summary(), "'x.value' expected string, type was '<number>'");
    }

    #[test]
    fn test_materialize_respects_max_depth() {
        let ctx = DocumentContext::new(DocumentOptions::default().with_max_depth(1));
        let err = SchemaWalker::new(&ctx)
            .materialize(
                &Signature::default_signature(),
                &DocPath::parse("a.b"),
                true,
                json!({}),
            )
            .unwrap_err();
        assert_eq!(err.first().code, "max_depth_exceeded");
    }
}
