//! The document handle.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::DocumentOptions;
use crate::context::{DocumentContext, DocumentStats, PathOutcome};
use crate::error::{MutationError, SchemaErrors, SignatureError};
use crate::notify::{Observer, Subscription};
use crate::path::DocPath;
use crate::registry::{Origin, ValidatorRegistry};
use crate::signature::Signature;
use crate::walker::SchemaWalker;

use super::{CollectionNode, DocumentNode, Model, Node};

/// A live document bound to a schema.
///
/// Creating a document parses the schema, builds validators for every declared
/// path and creates the root node. A list-shaped schema produces an ordered
/// root; anything else a keyed one.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use livedoc::{Document, Model, Notification};
/// use serde_json::json;
///
/// let doc = Document::new(json!({
///     "properties": {
///         "name": {"type": "String", "required": true},
///         "tags": {"type": "Array", "elements": {"type": "String"}}
///     }
/// })).unwrap();
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// doc.subscribe(move |n: &Notification| sink.lock().unwrap().push(n.clone()));
///
/// doc.assign(json!({"name": "Ada", "tags": ["math"]})).unwrap();
/// assert!(doc.set("name", json!(1)).is_err());
///
/// let seen = seen.lock().unwrap();
/// assert_eq!(seen.len(), 2);
/// assert!(seen[0].is_next());
/// assert!(!seen[1].is_next());
/// ```
#[derive(Clone)]
pub struct Document {
    root: Node,
    context: Arc<DocumentContext>,
}

impl Document {
    /// Creates a document with default options.
    ///
    /// # Errors
    ///
    /// Fails when the schema is not a well-formed signature tree.
    pub fn new(schema: Value) -> Result<Self, SignatureError> {
        Self::with_options(schema, DocumentOptions::default())
    }

    /// Creates a document with explicit options.
    pub fn with_options(schema: Value, options: DocumentOptions) -> Result<Self, SignatureError> {
        let signature = Signature::parse(schema)?;
        let inherited = options.extensible;
        let context = DocumentContext::new(options);
        let root_path = DocPath::root();

        let walker = SchemaWalker::new(&context);
        let root = if signature.is_list() {
            walker.build_list_validators(&signature, &root_path, inherited, Origin::Declared);
            Node::Collection(CollectionNode::new(
                Arc::clone(&context),
                signature,
                root_path,
                inherited,
            ))
        } else {
            walker.build_validators(
                &signature.children(),
                &root_path,
                signature.is_extensible(inherited),
                Origin::Declared,
            );
            Node::Document(DocumentNode::new(
                Arc::clone(&context),
                signature,
                root_path,
                inherited,
            ))
        };

        debug!(validators = context.validators().len(), "document created");
        Ok(Self { root, context })
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Registers an observer for every notification of this document.
    pub fn subscribe(&self, observer: impl Observer + 'static) -> Subscription {
        self.context.channel().subscribe(observer)
    }

    /// The document's validator registry.
    pub fn registry(&self) -> &ValidatorRegistry {
        self.context.validators()
    }

    /// Every path with a registered validator, in registration order.
    pub fn validators(&self) -> Vec<String> {
        self.context.validators().list()
    }

    /// The last recorded validation outcome for a dotted path.
    pub fn outcome(&self, path: &str) -> Option<PathOutcome> {
        self.context.outcome(path)
    }

    /// Work counters for this document.
    pub fn stats(&self) -> DocumentStats {
        self.context.stats()
    }

    /// The options the document was created with.
    pub fn options(&self) -> &DocumentOptions {
        self.context.options()
    }
}

impl Model for Document {
    fn path(&self) -> &DocPath {
        self.root.path()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.root.get(key)
    }

    fn child(&self, key: &str) -> Option<Node> {
        self.root.child(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), MutationError> {
        self.root.set(key, value)
    }

    fn assign(&self, value: Value) -> Result<(), MutationError> {
        self.root.assign(value)
    }

    fn delete(&self, key: &str) -> Result<(), MutationError> {
        self.root.delete(key)
    }

    fn validate(&self, candidate: &Value) -> Result<(), SchemaErrors> {
        self.root.validate(candidate)
    }

    fn to_value(&self) -> Value {
        self.root.to_value()
    }

    fn freeze(&self) {
        self.root.freeze()
    }

    fn is_frozen(&self) -> bool {
        self.root.is_frozen()
    }

    fn is_dirty(&self) -> bool {
        self.root.is_dirty()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("stats", &self.stats())
            .finish()
    }
}
