//! Medicart Core - Shared types library.
//!
//! This crate provides common types used across all Medicart components:
//! - `cart` - Cart synchronization manager and its collaborators
//! - `cli` - Command-line driver for the cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Item identifiers, prices, product types, and cart line items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
