//! # Livedoc
//!
//! Schema-bound live documents that validate every mutation before it is
//! committed and announce each outcome to subscribers.
//!
//! ## Overview
//!
//! A [`Document`] is created from a declarative schema. Every mutation
//! (single key, whole object, whole list or delete) is checked against the
//! node's entire prospective state; failures accumulate all errors rather than
//! stopping at the first one. Composite values become child nodes bound to the
//! schema fragment their key resolved to, so the same guarantees hold at
//! every depth.
//!
//! ## Core Types
//!
//! - [`Signature`]: An immutable schema fragment
//! - [`ValidatorRegistry`]: One compiled validator per document path
//! - [`Document`], [`DocumentNode`], [`CollectionNode`]: The live tree, all implementing [`Model`]
//! - [`NotificationChannel`]: Synchronous per-document notifications
//! - [`SchemaError`], [`SchemaErrors`], [`MutationError`]: Failure reporting
//!
//! ## Example
//!
//! ```rust
//! use livedoc::{Document, Model};
//! use serde_json::json;
//!
//! let doc = Document::new(json!({
//!     "properties": {
//!         "name": {"type": "String", "required": true},
//!         "address": {
//!             "type": "Object",
//!             "properties": {"city": {"type": "String"}}
//!         }
//!     }
//! })).unwrap();
//!
//! doc.assign(json!({"name": "Ada", "address": {"city": "London"}})).unwrap();
//! assert!(doc.set("address.city", json!("Paris")).is_ok());
//!
//! let err = doc.set("address.city", json!(1)).unwrap_err();
//! assert_eq!(err.to_string(), "'address.city' expected string, type was '<number>'");
//! assert_eq!(doc.get("address.city"), Some(json!("Paris")));
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod notify;
pub mod path;
pub mod registry;
pub mod schema;
pub mod signature;
mod walker;

pub use config::DocumentOptions;
pub use context::{DocumentStats, PathOutcome};
pub use error::{MutationError, SchemaError, SchemaErrors, SignatureError};
pub use model::{CollectionNode, Document, DocumentNode, Model, Node};
pub use notify::{Notification, NotificationChannel, Observer, Subscription};
pub use path::{DocPath, PathSegment};
pub use registry::{Origin, Validator, ValidatorRegistry};
pub use schema::{ArraySchema, LeafSchema, ObjectSchema, Schema, SchemaLike};
pub use signature::{Polymorphic, Signature, TypeName};
