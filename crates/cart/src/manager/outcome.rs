//! Results handed back to the UI layer.

use medicart_core::CartLineItem;

use super::migration::MigrationReport;
use crate::error::CartError;

/// Outcome of a cart mutation.
///
/// `Failed` carries the in-memory state that was replaced, if any, so the
/// caller can decide whether to [`revert`](super::CartManager::revert) it.
#[derive(Debug)]
#[must_use]
pub enum MutationOutcome {
    /// The change is in memory and was accepted by the backing store (or the
    /// store is best-effort and failures were logged).
    Applied,
    /// The backing store rejected the change.
    Failed {
        error: CartError,
        rollback_to: Option<Rollback>,
    },
}

impl MutationOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    #[must_use]
    pub const fn error(&self) -> Option<&CartError> {
        match self {
            Self::Applied => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    /// Drop the rollback information and keep only the error.
    ///
    /// # Errors
    ///
    /// Returns the backing store's error if the mutation failed.
    pub fn into_result(self) -> Result<(), CartError> {
        match self {
            Self::Applied => Ok(()),
            Self::Failed { error, .. } => Err(error),
        }
    }
}

/// In-memory state captured before an optimistic change.
#[derive(Debug, Clone, PartialEq)]
pub struct Rollback {
    /// The line as it was before the change.
    pub line: CartLineItem,
    /// The overlay quantity it was displayed with.
    pub overlay_quantity: Option<u32>,
}

/// What an authentication change did to the cart.
#[derive(Debug)]
pub enum AuthTransition {
    /// Status did not change.
    Unchanged,
    /// Guest became authenticated; the guest cart was replayed to the server.
    Migrated(MigrationReport),
    /// Session ended; server state was abandoned and the guest cart reloaded.
    LoggedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let applied = MutationOutcome::Applied;
        assert!(applied.is_applied());
        assert!(applied.error().is_none());

        let failed = MutationOutcome::Failed {
            error: CartError::Network("timeout".to_string()),
            rollback_to: None,
        };
        assert!(!failed.is_applied());
        assert!(matches!(failed.error(), Some(CartError::Network(_))));
        assert!(failed.into_result().is_err());
    }
}
