//! Error types for cart synchronization.
//!
//! Storage problems are treated as best-effort cache failures and are logged
//! rather than surfaced; network problems reach callers through
//! [`MutationOutcome`](crate::manager::MutationOutcome) or `load()`'s result.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors produced by the cart manager and its collaborators.
#[derive(Debug, Error)]
pub enum CartError {
    /// The backend (or the transport in front of it) reported a failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Local key-value storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A payload could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Quantities must be positive.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),
}

impl CartError {
    /// Human-readable message suitable for the UI layer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(msg) => msg.clone(),
            Self::Storage(_) | Self::Parse(_) => "Something went wrong with your cart".to_string(),
            Self::InvalidQuantity(_) => "Quantity must be at least 1".to_string(),
        }
    }
}
