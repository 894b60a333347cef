//! Typed wrappers around the server cart endpoints.
//!
//! | Purpose | Method | Path |
//! |---|---|---|
//! | Fetch cart | GET | `/user/get-cart` |
//! | Add item | POST | `/user/add-to-cart` |
//! | Change quantity | PUT | `/user/change-cart-product-quantity` |
//! | Remove item | PUT | `/user/remove-item-from-cart` |

use std::sync::Arc;

use medicart_core::{CartLineItem, ItemId, ProductType};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use super::{ApiRequest, HttpMethod, HttpRequester};
use crate::error::CartError;
use crate::manager::state::normalize_lines;

pub const GET_CART: &str = "/user/get-cart";
pub const ADD_TO_CART: &str = "/user/add-to-cart";
pub const CHANGE_QUANTITY: &str = "/user/change-cart-product-quantity";
pub const REMOVE_FROM_CART: &str = "/user/remove-item-from-cart";

/// Server cart endpoints bound to one product category.
#[derive(Clone)]
pub struct CartApi {
    http: Arc<dyn HttpRequester>,
    product_type: ProductType,
}

impl CartApi {
    #[must_use]
    pub fn new(http: Arc<dyn HttpRequester>, product_type: ProductType) -> Self {
        Self { http, product_type }
    }

    /// Fetch the signed-in user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Network` if the request fails, or
    /// `CartError::Parse` if the body is not a recognizable cart.
    pub async fn fetch_cart(&self) -> Result<ServerCart, CartError> {
        let data = self
            .http
            .request(ApiRequest::new(HttpMethod::Get, GET_CART).authenticated())
            .await
            .into_result()?;
        ServerCart::from_value(data)
    }

    /// Add `quantity` of an item to the server cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Network` if the backend rejects the request.
    pub async fn add_item(&self, item_id: &ItemId, quantity: u32) -> Result<Value, CartError> {
        let payload = json!({
            "productId": item_id,
            "quantity": quantity,
            "type": self.product_type,
        });
        self.http
            .request(
                ApiRequest::new(HttpMethod::Post, ADD_TO_CART)
                    .with_payload(payload)
                    .authenticated(),
            )
            .await
            .into_result()
    }

    /// Set the quantity of an item already in the server cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Network` if the backend rejects the request.
    pub async fn change_quantity(
        &self,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<Value, CartError> {
        let payload = json!({
            "itemId": item_id,
            "quantity": quantity,
            "type": self.product_type,
        });
        self.http
            .request(
                ApiRequest::new(HttpMethod::Put, CHANGE_QUANTITY)
                    .with_payload(payload)
                    .authenticated(),
            )
            .await
            .into_result()
    }

    /// Remove an item from the server cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Network` if the backend rejects the request.
    pub async fn remove_item(&self, item_id: &ItemId) -> Result<Value, CartError> {
        let payload = json!({
            "itemId": item_id,
            "type": self.product_type,
        });
        self.http
            .request(
                ApiRequest::new(HttpMethod::Put, REMOVE_FROM_CART)
                    .with_payload(payload)
                    .authenticated(),
            )
            .await
            .into_result()
    }
}

/// Cart contents as returned by `GET /user/get-cart`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerCart {
    pub items: Vec<CartLineItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerCartItem {
    #[serde(alias = "productId", alias = "_id")]
    item_id: String,
    quantity: u32,
    #[serde(default, alias = "unitPrice")]
    price: Option<Decimal>,
    #[serde(default, alias = "product")]
    item_details: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ItemsEnvelope {
    #[serde(default)]
    items: Vec<ServerCartItem>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CartBody {
    Nested { cart: ItemsEnvelope },
    Flat(ItemsEnvelope),
    Bare(Vec<ServerCartItem>),
}

impl ServerCart {
    /// Decode a cart body. Accepts `{"items": [...]}`, `{"cart": {"items":
    /// [...]}}`, a bare array, or `null` (empty cart).
    ///
    /// Lines with a zero quantity or an unusable id are dropped, and ids are
    /// trimmed and merged so the result always holds one line per item.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Parse` if the body matches none of those shapes.
    pub fn from_value(value: Value) -> Result<Self, CartError> {
        if value.is_null() {
            return Ok(Self::default());
        }

        let raw = match serde_json::from_value::<CartBody>(value)? {
            CartBody::Nested { cart } => cart.items,
            CartBody::Flat(envelope) => envelope.items,
            CartBody::Bare(items) => items,
        };

        let lines = raw
            .into_iter()
            .filter_map(|entry| {
                let item_id = match ItemId::parse(&entry.item_id) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(raw_id = %entry.item_id, error = %e, "Dropping server cart line with invalid id");
                        return None;
                    }
                };
                let mut line = CartLineItem::new(item_id, entry.quantity, entry.item_details);
                if entry.price.is_some() {
                    line.unit_price = entry.price;
                }
                Some(line)
            })
            .collect();
        let items = normalize_lines(lines);

        Ok(Self { items })
    }
}
