//! Error types for the Paddock environment abstraction.

use thiserror::Error;

/// Errors raised by environment collaborators (store, newsroom, clock).
#[derive(Debug, Error)]
pub enum EnvError {
    /// The external store rejected or failed an operation
    #[error("Store error: {0}")]
    Store(String),

    /// A record the caller required does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A notification could not be handed to the delivery collaborator
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Context operation failed
    #[error("Context error: {0}")]
    Context(String),
}

impl EnvError {
    /// Creates a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Creates a not-found error for a record description.
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    /// Creates a delivery error.
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }
}
