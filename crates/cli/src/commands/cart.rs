//! Cart editing commands.

use medicart_core::{ItemId, MAX_MANUAL_QUANTITY};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use super::{CommandError, Session};

/// Product details recorded with a guest cart line.
fn details(item_id: &ItemId, price: Option<Decimal>, name: Option<String>) -> Option<Value> {
    if price.is_none() && name.is_none() {
        return None;
    }
    let mut details = Map::new();
    details.insert("id".to_owned(), Value::String(item_id.to_string()));
    if let Some(name) = name {
        details.insert("name".to_owned(), Value::String(name));
    }
    if let Some(price) = price {
        details.insert("price".to_owned(), Value::String(price.to_string()));
    }
    Some(Value::Object(details))
}

/// Add `quantity` of an item.
pub async fn add(
    session: &Session,
    item_id: &str,
    quantity: u32,
    price: Option<Decimal>,
    name: Option<String>,
) -> Result<(), CommandError> {
    let item_id = ItemId::parse(item_id)?;
    let details = details(&item_id, price, name);
    session
        .manager
        .add_item(item_id, quantity, details)
        .await
        .into_result()?;
    Ok(())
}

/// Set an item's quantity, then flush the debounced write before exiting.
pub async fn set_quantity(
    session: &Session,
    item_id: &str,
    quantity: u32,
) -> Result<(), CommandError> {
    if !(1..=MAX_MANUAL_QUANTITY).contains(&quantity) {
        return Err(CommandError::QuantityOutOfRange {
            got: quantity,
            max: MAX_MANUAL_QUANTITY,
        });
    }
    let item_id = ItemId::parse(item_id)?;
    if session.manager.displayed_quantity(&item_id).is_none() {
        return Err(CommandError::NotInCart(item_id.to_string()));
    }

    session.manager.update_quantity(&item_id, quantity);
    let flushed = session.manager.flush_pending().await;
    tracing::debug!(flushed, "Flushed pending quantity writes");
    Ok(())
}

/// Remove an item. A rejected server removal is reported, not reverted.
pub async fn remove(session: &Session, item_id: &str) -> Result<(), CommandError> {
    let item_id = ItemId::parse(item_id)?;
    if session.manager.displayed_quantity(&item_id).is_none() {
        return Err(CommandError::NotInCart(item_id.to_string()));
    }
    session.manager.remove_item(&item_id).await.into_result()?;
    Ok(())
}
