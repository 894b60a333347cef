//! Terminal output.

#![allow(clippy::print_stdout)]

use medicart_cart::{CartManager, MigrationReport};
use medicart_core::{CurrencyCode, Price};

/// Print the cart lines followed by count and subtotal.
pub fn cart(manager: &CartManager) {
    let items = manager.items();
    if items.is_empty() {
        println!("Cart is empty ({:?})", manager.auth_status());
        return;
    }

    for line in &items {
        let unit = Price::new(line.effective_price(), CurrencyCode::default());
        let name = line.display_name().unwrap_or("-");
        println!(
            "{:<24} {:<32} x{:<3} {}",
            line.item_id,
            name,
            line.quantity,
            unit.display()
        );
    }
    println!(
        "{} item(s), subtotal {}",
        manager.item_count(),
        manager.subtotal().display()
    );
}

/// Print what a login did with the guest cart.
pub fn migration(report: &MigrationReport) {
    if report.skipped {
        println!("Guest cart migration skipped");
        return;
    }

    println!("Migrated {} item(s) to the server cart", report.migrated.len());
    for failure in &report.failures {
        println!(
            "  failed: {} x{} ({})",
            failure.line.item_id, failure.line.quantity, failure.error
        );
    }
    if !report.guest_cart_cleared {
        println!("Guest cart kept on this device");
    }
    if let Some(error) = &report.resync_error {
        println!("Could not refresh server cart: {error}");
    }
}
