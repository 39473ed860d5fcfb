//! Live document nodes.
//!
//! A document is a tree of nodes. Keyed nodes are [`DocumentNode`]s, ordered
//! nodes are [`CollectionNode`]s, and both implement [`Model`]. Scalars are
//! stored in place; composite values are materialized into child nodes bound
//! to the signature their key resolved to.
//!
//! Every public mutation validates the node's whole prospective state before
//! anything is committed and announces exactly one notification for its
//! outcome. Nested work done while the node is dirty skips the whole-state
//! check and stays silent.

mod collection;
mod document;
mod root;

use serde_json::Value;

use crate::error::{MutationError, SchemaErrors};
use crate::path::DocPath;

pub use collection::CollectionNode;
pub use document::DocumentNode;
pub use root::Document;

/// The shared surface of keyed and ordered nodes.
pub trait Model {
    /// Path of this node inside its document.
    fn path(&self) -> &DocPath;

    /// Current value under `key`. Dotted keys navigate into child nodes.
    fn get(&self, key: &str) -> Option<Value>;

    /// The child node under `key`, if the stored value is composite.
    fn child(&self, key: &str) -> Option<Node>;

    /// Validates and commits a single key.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Frozen`] without notifying when the node is
    /// frozen, and [`MutationError::Rejected`] after an error notification when
    /// the value does not conform.
    fn set(&self, key: &str, value: Value) -> Result<(), MutationError>;

    /// Replaces the whole content of the node, announcing one notification.
    ///
    /// # Errors
    ///
    /// Same as [`Model::set`], plus [`MutationError::NotComposite`] when the
    /// value has the wrong shape for this node.
    fn assign(&self, value: Value) -> Result<(), MutationError>;

    /// Removes a key after checking the remaining state.
    ///
    /// # Errors
    ///
    /// Same as [`Model::set`]. A successful delete sends no notification.
    fn delete(&self, key: &str) -> Result<(), MutationError>;

    /// Checks a candidate value against this node's signature without committing it.
    fn validate(&self, candidate: &Value) -> Result<(), SchemaErrors>;

    /// Plain JSON snapshot of the subtree.
    fn to_value(&self) -> Value;

    /// Makes this node and every current descendant immutable.
    fn freeze(&self);

    fn is_frozen(&self) -> bool;

    /// True while a mutation is being applied to this node.
    fn is_dirty(&self) -> bool;
}

/// A child node of either kind.
#[derive(Debug, Clone)]
pub enum Node {
    Document(DocumentNode),
    Collection(CollectionNode),
}

impl Node {
    pub fn as_document(&self) -> Option<&DocumentNode> {
        match self {
            Node::Document(node) => Some(node),
            Node::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionNode> {
        match self {
            Node::Collection(node) => Some(node),
            Node::Document(_) => None,
        }
    }

    fn inner(&self) -> &dyn Model {
        match self {
            Node::Document(node) => node,
            Node::Collection(node) => node,
        }
    }
}

impl Model for Node {
    fn path(&self) -> &DocPath {
        self.inner().path()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.inner().get(key)
    }

    fn child(&self, key: &str) -> Option<Node> {
        self.inner().child(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), MutationError> {
        self.inner().set(key, value)
    }

    fn assign(&self, value: Value) -> Result<(), MutationError> {
        self.inner().assign(value)
    }

    fn delete(&self, key: &str) -> Result<(), MutationError> {
        self.inner().delete(key)
    }

    fn validate(&self, candidate: &Value) -> Result<(), SchemaErrors> {
        self.inner().validate(candidate)
    }

    fn to_value(&self) -> Value {
        self.inner().to_value()
    }

    fn freeze(&self) {
        self.inner().freeze()
    }

    fn is_frozen(&self) -> bool {
        self.inner().is_frozen()
    }

    fn is_dirty(&self) -> bool {
        self.inner().is_dirty()
    }
}

/// A stored entry: a scalar kept in place or a materialized child.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Value(Value),
    Node(Node),
}

impl Slot {
    pub(crate) fn to_value(&self) -> Value {
        match self {
            Slot::Value(value) => value.clone(),
            Slot::Node(node) => node.to_value(),
        }
    }

    pub(crate) fn node(&self) -> Option<&Node> {
        match self {
            Slot::Node(node) => Some(node),
            Slot::Value(_) => None,
        }
    }
}

/// Keys beginning with `$` are internal and never stored.
pub(crate) fn is_reserved_key(key: &str) -> bool {
    key.starts_with('$')
}
