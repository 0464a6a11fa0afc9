use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::settings::load_settings;
use crate::store::open_store;

pub fn list() -> Result<()> {
    let store = open_store(&load_settings())?;
    let subs = store.list()?;
    if subs.is_empty() {
        println!("No subscriptions yet. Add one with `subtrack add` or `subtrack import`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Price", "Cycle", "Next Billing", "Category", "Payment"]);
    for sub in &subs {
        let rec = &sub.record;
        table.add_row(vec![
            Cell::new(sub.id),
            Cell::new(&rec.name),
            Cell::new(money(rec.price, rec.currency)),
            Cell::new(rec.billing_cycle),
            Cell::new(rec.next_billing_date.format("%Y-%m-%d")),
            Cell::new(&rec.category),
            Cell::new(rec.payment_method.as_deref().unwrap_or_default()),
        ]);
    }
    println!("Subscriptions\n{table}");
    Ok(())
}

pub fn remove(id: i64) -> Result<()> {
    let mut store = open_store(&load_settings())?;
    store.remove(id)?;
    println!("Removed subscription #{id}");
    Ok(())
}
