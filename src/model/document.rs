//! Keyed document nodes.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use stillwater::Validation;
use tracing::debug;

use crate::context::DocumentContext;
use crate::error::{MutationError, SchemaErrors};
use crate::path::{split_head, DocPath};
use crate::schema::{ObjectSchema, Schema, SchemaLike};
use crate::signature::Signature;
use crate::walker::{Owner, SchemaWalker};

use super::{is_reserved_key, Model, Node, Slot};

#[derive(Default)]
struct DocumentState {
    store: IndexMap<String, Slot>,
    dirty: bool,
    frozen: bool,
}

struct DocumentInner {
    path: DocPath,
    signature: Signature,
    children: Signature,
    schema: ObjectSchema,
    extensible: bool,
    context: Arc<DocumentContext>,
    state: RwLock<DocumentState>,
}

/// A keyed node bound to a schema fragment.
///
/// Handles are cheap to clone and share the same node.
///
/// # Example
///
/// ```rust
/// use livedoc::{Document, Model};
/// use serde_json::json;
///
/// let doc = Document::new(json!({
///     "properties": {"name": {"type": "String"}}
/// })).unwrap();
///
/// assert!(doc.set("name", json!("Ada")).is_ok());
/// assert!(doc.set("name", json!(7)).is_err());
/// assert_eq!(doc.get("name"), Some(json!("Ada")));
/// ```
#[derive(Clone)]
pub struct DocumentNode {
    inner: Arc<DocumentInner>,
}

impl DocumentNode {
    pub(crate) fn new(
        context: Arc<DocumentContext>,
        signature: Signature,
        path: DocPath,
        inherited_extensible: bool,
    ) -> Self {
        let extensible = signature.is_extensible(inherited_extensible);
        let schema = Schema::object(&signature, inherited_extensible);
        let children = signature.children();
        Self {
            inner: Arc::new(DocumentInner {
                path,
                signature,
                children,
                schema,
                extensible,
                context,
                state: RwLock::new(DocumentState::default()),
            }),
        }
    }

    /// The fragment this node is bound to.
    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    /// Returns true if undeclared keys are accepted.
    pub fn is_extensible(&self) -> bool {
        self.inner.extensible
    }

    /// Stored keys, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.state.read().store.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.read().store.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.state.read().store.contains_key(key)
    }

    /// Populates a freshly materialized node without notifying.
    pub(crate) fn load(&self, map: Map<String, Value>) -> Result<(), SchemaErrors> {
        let map = self.fill_defaults(map);
        self.set_dirty(true);
        for (key, value) in map {
            if let Err(err) = self.commit_key(&key, value) {
                let mut state = self.inner.state.write();
                state.store.clear();
                state.dirty = false;
                return Err(err.into_schema_errors());
            }
        }
        self.set_dirty(false);
        Ok(())
    }

    /// Commits one key through the resolver. The caller owns the dirty flag.
    fn commit_key(&self, key: &str, value: Value) -> Result<(), MutationError> {
        if is_reserved_key(key) {
            return Ok(());
        }
        if self.is_frozen() {
            return Err(MutationError::Frozen {
                path: self.inner.path.clone(),
            });
        }

        let replaces_node = matches!(
            self.inner.state.read().store.get(key),
            Some(Slot::Node(_))
        );
        if replaces_node {
            self.inner
                .context
                .validators()
                .prune_lazy(&self.inner.path.join(key));
        }

        let owner = Owner {
            path: &self.inner.path,
            children: &self.inner.children,
            extensible: self.inner.extensible,
        };
        let slot = SchemaWalker::new(&self.inner.context)
            .resolve_child(&owner, key, value)
            .map_err(|errors| MutationError::rejected(&self.inner.path, errors))?;

        self.inner.state.write().store.insert(key.to_string(), slot);
        Ok(())
    }

    /// Absent declared fields that carry a `default` are filled in.
    fn fill_defaults(&self, mut map: Map<String, Value>) -> Map<String, Value> {
        if !self.inner.context.options().apply_defaults {
            return map;
        }
        for (name, sig) in self.inner.children.fields() {
            if map.contains_key(name) {
                continue;
            }
            if let Some(default) = sig.default_value() {
                map.insert(name.to_string(), default.clone());
            }
        }
        map
    }

    /// Current state with one key changed, as a plain object.
    fn prospective(&self, change: impl FnOnce(&mut Map<String, Value>)) -> Value {
        let mut map = match self.to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        change(&mut map);
        Value::Object(map)
    }

    fn child_node(&self, key: &str) -> Option<Node> {
        self.inner
            .state
            .read()
            .store
            .get(key)
            .and_then(Slot::node)
            .cloned()
    }

    fn set_dirty(&self, dirty: bool) {
        self.inner.state.write().dirty = dirty;
    }

    fn frozen_error(&self) -> MutationError {
        MutationError::Frozen {
            path: self.inner.path.clone(),
        }
    }

    /// Marks the node clean and announces the failure.
    fn report(&self, err: MutationError) -> MutationError {
        self.set_dirty(false);
        if let MutationError::Rejected { errors, .. } = &err {
            self.inner.context.record_failures(errors);
            let message = err.to_string();
            debug!(path = %self.inner.path, %message, "mutation rejected");
            self.inner
                .context
                .channel()
                .send_error(&self.inner.path, &message);
        }
        err
    }

    fn announce(&self) {
        debug!(path = %self.inner.path, "mutation committed");
        self.inner.context.channel().send_next(&self.inner.path);
    }
}

impl Model for DocumentNode {
    fn path(&self) -> &DocPath {
        &self.inner.path
    }

    fn get(&self, key: &str) -> Option<Value> {
        if is_reserved_key(key) {
            return None;
        }
        if let Some(slot) = self.inner.state.read().store.get(key) {
            return Some(slot.to_value());
        }
        let (head, rest) = split_head(key)?;
        self.child_node(head)?.get(rest)
    }

    fn child(&self, key: &str) -> Option<Node> {
        if let Some(node) = self.child_node(key) {
            return Some(node);
        }
        let (head, rest) = split_head(key)?;
        self.child_node(head)?.child(rest)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), MutationError> {
        if is_reserved_key(key) {
            return Ok(());
        }
        if let Some((head, rest)) = split_head(key) {
            if let Some(child) = self.child_node(head) {
                return child.set(rest, value);
            }
        }
        if self.is_frozen() {
            return Err(self.frozen_error());
        }

        let nested = self.is_dirty();
        if !nested {
            let candidate = self.prospective(|map| {
                map.insert(key.to_string(), value.clone());
            });
            if let Err(errors) = self.validate(&candidate) {
                return Err(self.report(MutationError::rejected(&self.inner.path, errors)));
            }
            self.set_dirty(true);
        }

        match self.commit_key(key, value) {
            Ok(()) => {
                if !nested {
                    self.set_dirty(false);
                }
                self.announce();
                Ok(())
            }
            Err(err) => Err(self.report(err)),
        }
    }

    fn assign(&self, value: Value) -> Result<(), MutationError> {
        let map = match value {
            Value::Object(map) => map,
            _ => {
                return Err(MutationError::NotComposite {
                    path: self.inner.path.clone(),
                    expected: "object",
                })
            }
        };
        if self.is_frozen() {
            return Err(self.frozen_error());
        }

        let map = self.fill_defaults(map);
        let candidate = Value::Object(map);
        if let Err(errors) = self.validate(&candidate) {
            return Err(self.report(MutationError::rejected(&self.inner.path, errors)));
        }
        let map = match candidate {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let nested = self.is_dirty();
        let previous = {
            let mut state = self.inner.state.write();
            state.dirty = true;
            std::mem::take(&mut state.store)
        };
        let validators = self.inner.context.validators();
        for (key, slot) in &previous {
            if let Slot::Node(_) = slot {
                validators.prune_lazy(&self.inner.path.join(key));
            }
        }

        for (key, value) in map {
            if let Err(err) = self.commit_key(&key, value) {
                self.inner.state.write().store = previous;
                return Err(self.report(err));
            }
        }

        if !nested {
            self.set_dirty(false);
            self.announce();
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), MutationError> {
        if is_reserved_key(key) {
            return Ok(());
        }
        if let Some((head, rest)) = split_head(key) {
            if let Some(child) = self.child_node(head) {
                return child.delete(rest);
            }
        }
        if self.is_frozen() {
            return Err(self.frozen_error());
        }

        let candidate = self.prospective(|map| {
            map.shift_remove(key);
        });
        if let Err(errors) = self.validate(&candidate) {
            return Err(self.report(MutationError::rejected(&self.inner.path, errors)));
        }

        let removed = self.inner.state.write().store.shift_remove(key);
        if let Some(Slot::Node(_)) = removed {
            self.inner
                .context
                .validators()
                .prune_lazy(&self.inner.path.join(key));
        }
        debug!(path = %self.inner.path, key, "key deleted");
        Ok(())
    }

    fn validate(&self, candidate: &Value) -> Result<(), SchemaErrors> {
        self.inner.context.count_whole_validation();
        match self.inner.schema.validate(candidate, &self.inner.path) {
            Validation::Success(()) => Ok(()),
            Validation::Failure(errors) => Err(errors),
        }
    }

    fn to_value(&self) -> Value {
        let entries: Vec<(String, Slot)> = self
            .inner
            .state
            .read()
            .store
            .iter()
            .map(|(k, slot)| (k.clone(), slot.clone()))
            .collect();
        Value::Object(
            entries
                .into_iter()
                .map(|(k, slot)| (k, slot.to_value()))
                .collect(),
        )
    }

    fn freeze(&self) {
        let children: Vec<Node> = {
            let mut state = self.inner.state.write();
            state.frozen = true;
            state.store.values().filter_map(Slot::node).cloned().collect()
        };
        for child in children {
            child.freeze();
        }
    }

    fn is_frozen(&self) -> bool {
        self.inner.state.read().frozen
    }

    fn is_dirty(&self) -> bool {
        self.inner.state.read().dirty
    }
}

impl fmt::Debug for DocumentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentNode")
            .field("path", &self.inner.path.to_string())
            .field("value", &self.to_value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentOptions;
    use serde_json::json;

    fn node(schema: Value) -> DocumentNode {
        let context = DocumentContext::new(DocumentOptions::default());
        let sig = Signature::parse(schema).unwrap();
        SchemaWalker::new(&context).build_validators(
            &sig.children(),
            &DocPath::root(),
            sig.is_extensible(false),
            crate::registry::Origin::Declared,
        );
        DocumentNode::new(context, sig, DocPath::root(), false)
    }

    #[test]
    fn test_reserved_keys_are_ignored() {
        let doc = node(json!({"properties": {"a": {"type": "String"}}}));
        assert!(doc.set("$meta", json!(1)).is_ok());
        assert!(doc.get("$meta").is_none());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_load_is_silent_and_clean() {
        let doc = node(json!({"*": {"type": "*"}}));
        let map = json!({"a": 1, "b": {"c": 2}});
        doc.load(map.as_object().unwrap().clone()).unwrap();

        assert!(!doc.is_dirty());
        assert_eq!(doc.to_value(), map);
        assert_eq!(doc.inner.context.channel().sent(), 0);
    }

    #[test]
    fn test_failed_assign_restores_store() {
        let doc = node(json!({"*": {"type": "*"}}));
        doc.set("keep", json!(true)).unwrap();

        // whole check passes, but the child is too deep to materialize
        let context = DocumentContext::new(DocumentOptions::default().with_max_depth(0));
        let sig = Signature::parse(json!({"*": {"type": "*"}})).unwrap();
        let shallow = DocumentNode::new(context, sig, DocPath::root(), false);
        shallow.set("keep", json!(true)).unwrap();
        assert!(shallow.assign(json!({"x": {"y": 1}})).is_err());
        assert_eq!(shallow.to_value(), json!({"keep": true}));
        assert!(!shallow.is_dirty());

        assert!(doc.assign(json!({"x": {"y": 1}})).is_ok());
        assert_eq!(doc.to_value(), json!({"x": {"y": 1}}));
    }

    #[test]
    fn test_assign_while_dirty_does_not_announce() {
        let doc = node(json!({"*": {"type": "*"}}));
        doc.set_dirty(true);

        doc.assign(json!({"a": 1})).unwrap();

        assert_eq!(doc.get("a"), Some(json!(1)));
        assert!(doc.is_dirty());
        assert_eq!(doc.inner.context.channel().sent(), 0);
    }

    #[test]
    fn test_assign_keeps_candidate_key_order() {
        let doc = node(json!({"*": {"type": "*"}}));
        doc.assign(json!({"zeta": 1, "alpha": 2, "mid": 3})).unwrap();
        assert_eq!(doc.keys(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_fill_defaults() {
        let doc = node(json!({"properties": {
            "role": {"type": "String", "default": "user"},
            "name": {"type": "String"}
        }}));
        doc.assign(json!({"name": "a"})).unwrap();
        assert_eq!(doc.get("role"), Some(json!("user")));
    }
}
