//! Ordered document nodes.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use stillwater::Validation;
use tracing::debug;

use crate::context::DocumentContext;
use crate::error::{MutationError, SchemaError, SchemaErrors};
use crate::path::{split_head, DocPath};
use crate::schema::{ArraySchema, Schema, SchemaLike};
use crate::signature::Signature;
use crate::walker::{ItemOwner, SchemaWalker};

use super::{is_reserved_key, Model, Node, Slot};

#[derive(Default)]
struct CollectionState {
    items: Vec<Slot>,
    dirty: bool,
    frozen: bool,
}

struct CollectionInner {
    path: DocPath,
    signature: Signature,
    elements: Option<Signature>,
    schema: ArraySchema,
    extensible: bool,
    context: Arc<DocumentContext>,
    state: RwLock<CollectionState>,
}

/// An ordered node bound to a list fragment.
///
/// Keys are decimal positions. Writing at `len()` appends; writing further
/// out is refused. Items bind to `elements`, or positionally to its
/// `polymorphic` alternatives.
///
/// # Example
///
/// ```rust
/// use livedoc::{Document, Model};
/// use serde_json::json;
///
/// let doc = Document::new(json!({
///     "tags": {"type": "Array", "elements": {"type": "String"}}
/// })).unwrap();
///
/// doc.set("tags", json!(["a"])).unwrap();
/// let tags = doc.child("tags").unwrap();
/// let tags = tags.as_collection().unwrap();
///
/// tags.push(json!("b")).unwrap();
/// assert!(tags.push(json!(3)).is_err());
/// assert_eq!(doc.get("tags"), Some(json!(["a", "b"])));
/// ```
#[derive(Clone)]
pub struct CollectionNode {
    inner: Arc<CollectionInner>,
}

impl CollectionNode {
    pub(crate) fn new(
        context: Arc<DocumentContext>,
        signature: Signature,
        path: DocPath,
        inherited_extensible: bool,
    ) -> Self {
        let extensible = signature.is_extensible(inherited_extensible);
        let schema = Schema::array(&signature, inherited_extensible);
        let elements = signature.elements();
        Self {
            inner: Arc::new(CollectionInner {
                path,
                signature,
                elements,
                schema,
                extensible,
                context,
                state: RwLock::new(CollectionState::default()),
            }),
        }
    }

    /// The fragment this node is bound to.
    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.read().items.is_empty()
    }

    /// Current value at `index`.
    pub fn get_index(&self, index: usize) -> Option<Value> {
        self.inner.state.read().items.get(index).map(Slot::to_value)
    }

    /// Validates and writes one position; `index == len()` appends.
    pub fn set_index(&self, index: usize, value: Value) -> Result<(), MutationError> {
        if self.is_frozen() {
            return Err(self.frozen_error());
        }
        let len = self.len();
        if index > len {
            let errors =
                SchemaErrors::single(SchemaError::invalid_element(&self.inner.path.push_index(index)));
            return Err(self.report(MutationError::rejected(&self.inner.path, errors)));
        }

        let nested = self.is_dirty();
        if !nested {
            let candidate = self.prospective(|items| {
                if index == items.len() {
                    items.push(value.clone());
                } else {
                    items[index] = value.clone();
                }
            });
            if let Err(errors) = self.validate(&candidate) {
                return Err(self.report(MutationError::rejected(&self.inner.path, errors)));
            }
            self.set_dirty(true);
        }

        match self.commit_index(index, value) {
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

    /// Appends one item.
    pub fn push(&self, value: Value) -> Result<(), MutationError> {
        self.set_index(self.len(), value)
    }

    /// Removes the item at `index`, shifting later items down.
    ///
    /// Later items are rebuilt at their new positions. Removing past the end
    /// is a no-op.
    pub fn remove_index(&self, index: usize) -> Result<(), MutationError> {
        if self.is_frozen() {
            return Err(self.frozen_error());
        }
        let len = self.len();
        if index >= len {
            return Ok(());
        }

        let candidate = self.prospective(|items| {
            items.remove(index);
        });
        if let Err(errors) = self.validate(&candidate) {
            return Err(self.report(MutationError::rejected(&self.inner.path, errors)));
        }

        let (previous, tail) = {
            let mut state = self.inner.state.write();
            let previous = state.items.clone();
            let tail: Vec<Value> = state.items.drain(index..).skip(1).map(|s| s.to_value()).collect();
            state.dirty = true;
            (previous, tail)
        };
        let validators = self.inner.context.validators();
        for position in index..len {
            validators.prune_lazy(&self.inner.path.push_index(position));
        }

        for (offset, value) in tail.into_iter().enumerate() {
            if let Err(err) = self.commit_index(index + offset, value) {
                self.inner.state.write().items = previous;
                return Err(self.report(err));
            }
        }
        self.set_dirty(false);
        debug!(path = %self.inner.path, index, "item removed");
        Ok(())
    }

    /// Populates a freshly materialized node without notifying.
    pub(crate) fn load(&self, items: Vec<Value>) -> Result<(), SchemaErrors> {
        self.set_dirty(true);
        for (index, value) in items.into_iter().enumerate() {
            if let Err(err) = self.commit_index(index, value) {
                let mut state = self.inner.state.write();
                state.items.clear();
                state.dirty = false;
                return Err(err.into_schema_errors());
            }
        }
        self.set_dirty(false);
        Ok(())
    }

    /// Commits one position through the resolver. The caller owns the dirty flag.
    fn commit_index(&self, index: usize, value: Value) -> Result<(), MutationError> {
        if self.is_frozen() {
            return Err(self.frozen_error());
        }

        let replaces_node = matches!(
            self.inner.state.read().items.get(index),
            Some(Slot::Node(_))
        );
        if replaces_node {
            self.inner
                .context
                .validators()
                .prune_lazy(&self.inner.path.push_index(index));
        }

        let owner = ItemOwner {
            path: &self.inner.path,
            elements: self.inner.elements.as_ref(),
            extensible: self.inner.extensible,
        };
        let slot = SchemaWalker::new(&self.inner.context)
            .resolve_item(&owner, index, value)
            .map_err(|errors| MutationError::rejected(&self.inner.path, errors))?;

        let mut state = self.inner.state.write();
        if index < state.items.len() {
            state.items[index] = slot;
        } else {
            state.items.push(slot);
        }
        Ok(())
    }

    fn prospective(&self, change: impl FnOnce(&mut Vec<Value>)) -> Value {
        let mut items = self.values();
        change(&mut items);
        Value::Array(items)
    }

    fn values(&self) -> Vec<Value> {
        let slots: Vec<Slot> = self.inner.state.read().items.clone();
        slots.iter().map(Slot::to_value).collect()
    }

    fn child_node(&self, index: usize) -> Option<Node> {
        self.inner
            .state
            .read()
            .items
            .get(index)
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

    fn invalid_key(&self, key: &str) -> MutationError {
        let errors = SchemaErrors::single(SchemaError::invalid_element(&self.inner.path.join(key)));
        self.report(MutationError::rejected(&self.inner.path, errors))
    }

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

fn parse_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

impl Model for CollectionNode {
    fn path(&self) -> &DocPath {
        &self.inner.path
    }

    fn get(&self, key: &str) -> Option<Value> {
        if let Some(index) = parse_index(key) {
            return self.get_index(index);
        }
        let (head, rest) = split_head(key)?;
        self.child_node(parse_index(head)?)?.get(rest)
    }

    fn child(&self, key: &str) -> Option<Node> {
        if let Some(index) = parse_index(key) {
            return self.child_node(index);
        }
        let (head, rest) = split_head(key)?;
        self.child_node(parse_index(head)?)?.child(rest)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), MutationError> {
        if is_reserved_key(key) {
            return Ok(());
        }
        if let Some(index) = parse_index(key) {
            return self.set_index(index, value);
        }
        if let Some((head, rest)) = split_head(key) {
            if let Some(child) = parse_index(head).and_then(|i| self.child_node(i)) {
                return child.set(rest, value);
            }
        }
        if self.is_frozen() {
            return Err(self.frozen_error());
        }
        Err(self.invalid_key(key))
    }

    fn assign(&self, value: Value) -> Result<(), MutationError> {
        let items = match value {
            Value::Array(items) => items,
            _ => {
                return Err(MutationError::NotComposite {
                    path: self.inner.path.clone(),
                    expected: "array",
                })
            }
        };
        if self.is_frozen() {
            return Err(self.frozen_error());
        }

        let candidate = Value::Array(items);
        if let Err(errors) = self.validate(&candidate) {
            return Err(self.report(MutationError::rejected(&self.inner.path, errors)));
        }
        let items = match candidate {
            Value::Array(items) => items,
            _ => Vec::new(),
        };

        let nested = self.is_dirty();
        let previous = {
            let mut state = self.inner.state.write();
            state.dirty = true;
            std::mem::take(&mut state.items)
        };
        let validators = self.inner.context.validators();
        for position in 0..previous.len() {
            validators.prune_lazy(&self.inner.path.push_index(position));
        }

        for (index, value) in items.into_iter().enumerate() {
            if let Err(err) = self.commit_index(index, value) {
                self.inner.state.write().items = previous;
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
        if let Some(index) = parse_index(key) {
            return self.remove_index(index);
        }
        if let Some((head, rest)) = split_head(key) {
            if let Some(child) = parse_index(head).and_then(|i| self.child_node(i)) {
                return child.delete(rest);
            }
        }
        if self.is_frozen() {
            return Err(self.frozen_error());
        }
        Err(self.invalid_key(key))
    }

    fn validate(&self, candidate: &Value) -> Result<(), SchemaErrors> {
        self.inner.context.count_whole_validation();
        match self.inner.schema.validate(candidate, &self.inner.path) {
            Validation::Success(()) => Ok(()),
            Validation::Failure(errors) => Err(errors),
        }
    }

    fn to_value(&self) -> Value {
        Value::Array(self.values())
    }

    fn freeze(&self) {
        let children: Vec<Node> = {
            let mut state = self.inner.state.write();
            state.frozen = true;
            state.items.iter().filter_map(Slot::node).cloned().collect()
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

impl fmt::Debug for CollectionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionNode")
            .field("path", &self.inner.path.to_string())
            .field("value", &self.to_value())
            .finish()
    }
}
