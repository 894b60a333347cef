//! Medicart cart synchronization.
//!
//! Keeps the app's cart consistent with one backing store at a time: local
//! key-value storage while the user is a guest, the server cart once they
//! sign in. On login the guest cart is replayed into the server cart.
//!
//! # Architecture
//!
//! The manager only sees three narrow collaborators:
//! - [`http::HttpRequester`] - performs REST calls, returns `{data, error}`
//! - [`storage::KeyValueStore`] - async string storage for the guest cart
//! - [`auth::AuthStatus`] - guest or authenticated, pushed in by the host app
//!
//! # Modules
//!
//! - [`manager`] - [`CartManager`] and its result types
//! - [`http`] - request collaborator, `reqwest` client, cart endpoints
//! - [`storage`] - memory and file-backed key-value stores
//! - [`config`] - environment-driven configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod manager;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::AuthStatus;
pub use config::{CartConfig, ConfigError, GuestCartRetention};
pub use error::CartError;
pub use http::{ApiRequest, ApiResponse, HttpMethod, HttpRequester, RestClient};
pub use manager::{
    AuthTransition, CartManager, MigrationFailure, MigrationReport, MutationOutcome, Rollback,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
