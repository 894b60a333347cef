//! Authentication state as seen by the cart.
//!
//! The host application owns the session itself; the cart only needs to know
//! which backing store is authoritative.

use serde::{Deserialize, Serialize};

/// Whether the current session is signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// No session; the guest cart in local storage is authoritative.
    #[default]
    Guest,
    /// Signed in; the server cart is authoritative.
    Authenticated,
}

impl AuthStatus {
    /// Build from the host app's "is logged in" flag.
    #[must_use]
    pub const fn from_logged_in(logged_in: bool) -> Self {
        if logged_in {
            Self::Authenticated
        } else {
            Self::Guest
        }
    }

    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}
