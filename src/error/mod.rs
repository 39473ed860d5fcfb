//! Error types for validation and mutation failures.
//!
//! [`SchemaError`] and [`SchemaErrors`] describe why a value was rejected,
//! [`MutationError`] is what the public mutation surface returns, and
//! [`SignatureError`] reports a malformed schema signature.

mod mutation_error;
mod schema_error;
mod signature_error;

pub use mutation_error::MutationError;
pub use schema_error::{SchemaError, SchemaErrors};
pub use signature_error::SignatureError;
