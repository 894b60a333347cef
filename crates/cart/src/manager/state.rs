//! In-memory cart state and derived aggregates.

use std::collections::{HashMap, HashSet};

use medicart_core::{CartLineItem, ItemId};
use rust_decimal::Decimal;

use crate::auth::AuthStatus;

/// Cart contents plus the quantity overlay shown to the user.
///
/// `overlay` holds the quantity the user last asked for; `items[].quantity`
/// is what has been persisted. Display always prefers the overlay.
#[derive(Debug, Default)]
pub(crate) struct CartState {
    pub(crate) auth: AuthStatus,
    pub(crate) items: Vec<CartLineItem>,
    pub(crate) overlay: HashMap<ItemId, u32>,
}

/// A line taken out of the cart, with the overlay value it had.
#[derive(Debug)]
pub(crate) struct RemovedLine {
    pub(crate) line: CartLineItem,
    pub(crate) overlay: Option<u32>,
}

impl CartState {
    pub(crate) fn new(auth: AuthStatus) -> Self {
        Self {
            auth,
            ..Self::default()
        }
    }

    pub(crate) fn line(&self, item_id: &ItemId) -> Option<&CartLineItem> {
        self.items.iter().find(|line| &line.item_id == item_id)
    }

    pub(crate) fn displayed_quantity(&self, item_id: &ItemId) -> Option<u32> {
        let line = self.line(item_id)?;
        Some(self.overlay.get(item_id).copied().unwrap_or(line.quantity))
    }

    /// Lines with the overlay applied.
    pub(crate) fn displayed_items(&self) -> Vec<CartLineItem> {
        self.items
            .iter()
            .map(|line| {
                let mut line = line.clone();
                if let Some(&quantity) = self.overlay.get(&line.item_id) {
                    line.quantity = quantity;
                }
                line
            })
            .collect()
    }

    pub(crate) fn item_total(&self) -> Decimal {
        self.items
            .iter()
            .map(|line| {
                let quantity = self.overlay.get(&line.item_id).copied().unwrap_or(line.quantity);
                line.effective_price() * Decimal::from(quantity)
            })
            .sum()
    }

    pub(crate) fn item_count(&self) -> u32 {
        self.items
            .iter()
            .map(|line| self.overlay.get(&line.item_id).copied().unwrap_or(line.quantity))
            .fold(0, u32::saturating_add)
    }

    /// Replace every line, e.g. after a fetch. Overlay entries for items in
    /// `keep_overlay` (writes still pending) survive if the item does.
    pub(crate) fn replace_all(&mut self, items: Vec<CartLineItem>, keep_overlay: &HashSet<ItemId>) {
        let mut overlay: HashMap<ItemId, u32> = items
            .iter()
            .map(|line| (line.item_id.clone(), line.quantity))
            .collect();
        for (item_id, quantity) in self.overlay.drain() {
            if keep_overlay.contains(&item_id) && overlay.contains_key(&item_id) {
                overlay.insert(item_id, quantity);
            }
        }
        self.items = items;
        self.overlay = overlay;
    }

    /// Add `quantity` to an existing line or append a new one.
    pub(crate) fn add_or_increment(
        &mut self,
        item_id: ItemId,
        quantity: u32,
        item_details: Option<serde_json::Value>,
    ) {
        let displayed = self.displayed_quantity(&item_id);
        if let Some(line) = self.items.iter_mut().find(|line| line.item_id == item_id) {
            line.quantity = line.quantity.saturating_add(quantity);
            if line.item_details.is_none() && item_details.is_some() {
                *line = CartLineItem::new(line.item_id.clone(), line.quantity, item_details);
            }
            let shown = displayed.unwrap_or(0).saturating_add(quantity);
            self.overlay.insert(item_id, shown);
        } else {
            self.overlay.insert(item_id.clone(), quantity);
            self.items
                .push(CartLineItem::new(item_id, quantity, item_details));
        }
    }

    pub(crate) fn remove(&mut self, item_id: &ItemId) -> Option<RemovedLine> {
        let index = self.items.iter().position(|line| &line.item_id == item_id)?;
        let line = self.items.remove(index);
        let overlay = self.overlay.remove(item_id);
        Some(RemovedLine { line, overlay })
    }

    /// Put a removed line back. Returns `false` if the item is already in
    /// the cart again.
    pub(crate) fn restore(&mut self, line: CartLineItem, overlay: Option<u32>) -> bool {
        if self.line(&line.item_id).is_some() {
            return false;
        }
        if let Some(quantity) = overlay {
            self.overlay.insert(line.item_id.clone(), quantity);
        }
        self.items.push(line);
        true
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.overlay.clear();
    }
}

/// Enforce one line per item and positive quantities.
pub(crate) fn normalize_lines(raw: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut items: Vec<CartLineItem> = Vec::with_capacity(raw.len());
    for line in raw.into_iter().filter(|line| line.quantity > 0) {
        if let Some(existing) = items.iter_mut().find(|l| l.item_id == line.item_id) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
            if existing.unit_price.is_none() {
                existing.unit_price = line.unit_price;
            }
            continue;
        }
        items.push(line);
    }
    items
}
