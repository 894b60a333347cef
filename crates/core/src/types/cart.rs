//! Cart line items.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

use super::ItemId;

/// Highest quantity the app's quantity pickers accept for manual entry.
///
/// This is a UI convention; the cart itself only requires quantities to be
/// positive.
pub const MAX_MANUAL_QUANTITY: u32 = 20;

/// A single product line in the cart.
///
/// Serialized in camelCase because the same shape is stored as the guest
/// cart blob on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Product identity. Unique within a cart.
    pub item_id: ItemId,
    /// Persisted quantity (always positive).
    pub quantity: u32,
    /// Unit price captured when the item was added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    /// Opaque product metadata kept for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_details: Option<serde_json::Value>,
}

impl CartLineItem {
    /// Build a line from product details, taking the unit price from
    /// `details.price` when present.
    #[must_use]
    pub fn new(item_id: ItemId, quantity: u32, item_details: Option<serde_json::Value>) -> Self {
        let unit_price = item_details.as_ref().and_then(price_from_details);
        Self {
            item_id,
            quantity,
            unit_price,
            item_details,
        }
    }

    /// Price used for totals: the captured unit price, else the price in the
    /// product details, else zero.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.unit_price
            .or_else(|| self.item_details.as_ref().and_then(price_from_details))
            .unwrap_or(Decimal::ZERO)
    }

    /// Display name from the product details, if any.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        let details = self.item_details.as_ref()?;
        details
            .get("name")
            .or_else(|| details.get("title"))
            .and_then(serde_json::Value::as_str)
    }
}

/// Read `price` out of product details. Accepts JSON numbers and numeric
/// strings.
fn price_from_details(details: &serde_json::Value) -> Option<Decimal> {
    match details.get("price")? {
        serde_json::Value::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        serde_json::Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> ItemId {
        ItemId::parse(s).unwrap()
    }

    #[test]
    fn test_new_takes_price_from_details() {
        let line = CartLineItem::new(id("p1"), 2, Some(json!({"name": "Paracetamol", "price": 45.5})));
        assert_eq!(line.unit_price, Some(Decimal::new(455, 1)));
        assert_eq!(line.display_name(), Some("Paracetamol"));
    }

    #[test]
    fn test_effective_price_prefers_unit_price() {
        let mut line = CartLineItem::new(id("p1"), 1, Some(json!({"price": "80"})));
        line.unit_price = Some(Decimal::new(75, 0));
        assert_eq!(line.effective_price(), Decimal::new(75, 0));
    }

    #[test]
    fn test_effective_price_falls_back_to_details_then_zero() {
        let mut line = CartLineItem::new(id("p1"), 1, Some(json!({"price": "80"})));
        line.unit_price = None;
        assert_eq!(line.effective_price(), Decimal::new(80, 0));

        let bare = CartLineItem::new(id("p2"), 1, None);
        assert_eq!(bare.effective_price(), Decimal::ZERO);
    }

    #[test]
    fn test_non_numeric_price_is_ignored() {
        let line = CartLineItem::new(id("p1"), 1, Some(json!({"price": "call us"})));
        assert_eq!(line.unit_price, None);
    }

    #[test]
    fn test_guest_blob_shape() {
        let line = CartLineItem::new(id("p1"), 3, None);
        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value, json!({"itemId": "p1", "quantity": 3}));
    }
}
