//! Failures raised while parsing a schema signature.

use crate::path::DocPath;

/// A schema signature that cannot be used to build a document.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// A signature (or nested fragment) is not a JSON object.
    #[error("signature at '{0}' must be an object")]
    NotAnObject(DocPath),

    /// `type` names something other than a known type.
    #[error("signature at '{path}' has unknown type '{name}'")]
    UnknownType { path: DocPath, name: String },

    /// `restrict` is not a valid regular expression.
    #[error("signature at '{path}' has an invalid restrict pattern: {source}")]
    InvalidPattern {
        path: DocPath,
        #[source]
        source: regex::Error,
    },

    /// `polymorphic` is neither a signature nor a list of signatures.
    #[error("signature at '{0}' has a malformed polymorphic entry")]
    InvalidPolymorphic(DocPath),
}
