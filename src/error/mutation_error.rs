//! Failures returned by the public mutation surface.

use crate::error::{SchemaError, SchemaErrors};
use crate::path::DocPath;

/// Why a `set`, whole-object assignment or delete was refused.
///
/// The `Display` form is the descriptive error string; for rejected values it
/// is exactly the message delivered to observers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MutationError {
    /// The node (or an ancestor) is frozen. No notification is sent.
    #[error("'{path}' is frozen")]
    Frozen { path: DocPath },

    /// A whole-object or whole-list assignment received the wrong shape.
    /// No notification is sent.
    #[error("'{path}' requires a {expected} value")]
    NotComposite {
        path: DocPath,
        expected: &'static str,
    },

    /// Validation or materialization failed; an error notification was sent.
    #[error("{}", .errors.summary())]
    Rejected { path: DocPath, errors: SchemaErrors },
}

impl MutationError {
    /// The path of the node that refused the mutation.
    pub fn path(&self) -> &DocPath {
        match self {
            MutationError::Frozen { path }
            | MutationError::NotComposite { path, .. }
            | MutationError::Rejected { path, .. } => path,
        }
    }

    /// The accumulated validation errors, when the mutation was rejected by a check.
    pub fn errors(&self) -> Option<&SchemaErrors> {
        match self {
            MutationError::Rejected { errors, .. } => Some(errors),
            _ => None,
        }
    }

    pub(crate) fn rejected(path: &DocPath, errors: SchemaErrors) -> Self {
        MutationError::Rejected {
            path: path.clone(),
            errors,
        }
    }

    /// Folds any failure into schema errors so it can travel up to an enclosing node.
    pub(crate) fn into_schema_errors(self) -> SchemaErrors {
        match self {
            MutationError::Rejected { errors, .. } => errors,
            MutationError::Frozen { ref path } => SchemaErrors::single(
                SchemaError::new(path.clone(), self.to_string()).with_code("frozen"),
            ),
            MutationError::NotComposite { ref path, expected } => SchemaErrors::single(
                SchemaError::new(path.clone(), self.to_string())
                    .with_code("invalid_type")
                    .with_expected(expected),
            ),
        }
    }
}
