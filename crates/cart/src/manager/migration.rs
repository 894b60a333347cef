//! Guest cart migration results.

use medicart_core::{CartLineItem, ItemId};

/// A guest line the server refused during migration.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationFailure {
    pub line: CartLineItem,
    pub error: String,
}

/// Summary of a guest → server migration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    /// Items accepted by the server.
    pub migrated: Vec<ItemId>,
    /// Items the server rejected, with the reason.
    pub failures: Vec<MigrationFailure>,
    /// The migration did not run (another one was in progress, or the
    /// session is not authenticated).
    pub skipped: bool,
    /// The guest cart was deleted from local storage.
    pub guest_cart_cleared: bool,
    /// Error from the final server resync, if it failed.
    pub resync_error: Option<String>,
}

impl MigrationReport {
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Every attempted item reached the server.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.skipped && self.failures.is_empty()
    }

    /// Lines that failed to migrate, in replay order.
    #[must_use]
    pub fn failed_lines(&self) -> Vec<CartLineItem> {
        self.failures.iter().map(|f| f.line.clone()).collect()
    }
}
