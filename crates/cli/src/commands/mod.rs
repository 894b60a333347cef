//! Command implementations.
//!
//! Every command builds a [`Session`]: configuration from the environment, a
//! file-backed guest cart under the storage directory, and a REST client
//! carrying the session token when one was given.

pub mod cart;
pub mod session;

use std::path::Path;
use std::sync::Arc;

use medicart_cart::{
    AuthStatus, CartConfig, CartError, CartManager, ConfigError, FileStore, RestClient,
    StorageError,
};
use medicart_core::ItemIdError;
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The guest cart directory could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Item id rejected.
    #[error("Invalid item id: {0}")]
    InvalidItemId(#[from] ItemIdError),

    /// Quantity outside what the stepper allows.
    #[error("Quantity must be between 1 and {max}, got {got}")]
    QuantityOutOfRange { got: u32, max: u32 },

    /// Item is not in the cart.
    #[error("Item not in cart: {0}")]
    NotInCart(String),

    /// `login` was run without `--token`.
    #[error("Missing session token, pass --token or set MEDICART_TOKEN")]
    MissingToken,

    /// The cart rejected the operation.
    #[error("{}", .0.user_message())]
    Cart(#[from] CartError),
}

/// Everything a command needs to talk to the cart.
pub struct Session {
    pub manager: CartManager,
    pub client: RestClient,
}

impl Session {
    /// Build a session and load the cart for `token`'s auth status.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing, the storage directory
    /// cannot be created, or the HTTP client cannot be built.
    pub async fn open(
        storage_dir: &Path,
        token: Option<SecretString>,
    ) -> Result<Self, CommandError> {
        let session = Self::connect(storage_dir, token).await?;
        session.manager.load().await?;
        Ok(session)
    }

    /// Build a session without loading anything.
    pub(crate) async fn connect(
        storage_dir: &Path,
        token: Option<SecretString>,
    ) -> Result<Self, CommandError> {
        let config = CartConfig::from_env()?;
        let storage = FileStore::open(storage_dir).await?;
        let client =
            RestClient::new(&config).map_err(|e| CommandError::HttpClient(e.to_string()))?;

        let auth = AuthStatus::from_logged_in(token.is_some());
        if let Some(token) = token {
            client.set_token(token).await;
        }
        tracing::debug!(?auth, dir = %storage.dir().display(), "Cart session opened");

        let manager = CartManager::new(config, Arc::new(client.clone()), Arc::new(storage), auth);
        Ok(Self { manager, client })
    }
}
