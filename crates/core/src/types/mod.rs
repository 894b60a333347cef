//! Core types for Medicart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;

pub use cart::{CartLineItem, MAX_MANUAL_QUANTITY};
pub use id::{ItemId, ItemIdError};
pub use price::{CurrencyCode, Price};
pub use product::ProductType;
