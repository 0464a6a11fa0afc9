use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::fmt::money;
use crate::importer::validate_fields;
use crate::models::{Currency, SubscriptionRecord};
use crate::settings::load_settings;
use crate::store::open_store;

/// Raw `add` arguments as typed on the command line.
pub struct AddArgs {
    pub name: String,
    pub price: String,
    pub cycle: String,
    pub next: String,
    pub currency: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Same rules as a CSV row, except an unknown currency is refused outright:
/// the user is right there to fix it.
pub fn build_record(args: AddArgs) -> Result<SubscriptionRecord> {
    let category = non_empty(args.category);
    let payment_method = non_empty(args.payment_method);
    let notes = non_empty(args.notes);

    let mut fields: HashMap<&str, &str> = HashMap::from([
        ("name", args.name.trim()),
        ("price", args.price.trim()),
        ("billingcycle", args.cycle.trim()),
        ("nextbillingdate", args.next.trim()),
    ]);
    for (key, value) in [
        ("category", &category),
        ("paymentmethod", &payment_method),
        ("notes", &notes),
    ] {
        if let Some(v) = value {
            fields.insert(key, v.as_str());
        }
    }
    let (mut record, _) = validate_fields(&fields).map_err(AppError::Invalid)?;

    if let Some(code) = non_empty(args.currency) {
        record.currency = Currency::from_code(&code.to_uppercase())
            .ok_or_else(|| AppError::Invalid(format!("Unsupported currency \"{code}\".")))?;
    }
    Ok(record)
}

pub fn run(args: AddArgs) -> Result<()> {
    let record = build_record(args)?;
    let mut store = open_store(&load_settings())?;
    let id = store.add(&record)?;
    println!(
        "Added subscription #{id}: {} ({} {})",
        record.name,
        money(record.price, record.currency),
        record.billing_cycle
    );
    Ok(())
}
