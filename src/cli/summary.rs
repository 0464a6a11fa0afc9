use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::reports::{get_spending_summary, upcoming_renewals};
use crate::settings::load_settings;
use crate::store::open_store;

pub fn run(days: Option<u32>) -> Result<()> {
    let settings = load_settings();
    let days = days.unwrap_or(settings.renewal_window_days);
    let store = open_store(&settings)?;
    let subs = store.list()?;

    if subs.is_empty() {
        println!("No subscriptions yet. Add one with `subtrack add` or `subtrack import`.");
        return Ok(());
    }

    let summary = get_spending_summary(&subs);

    let mut totals = Table::new();
    totals.set_header(vec!["Currency", "Monthly", "Yearly", "Active", "Custom"]);
    for (currency, t) in &summary.by_currency {
        let custom = if t.custom_count == 0 {
            String::new()
        } else {
            format!("{} ({})", t.custom_count, money(t.custom_total, *currency))
        };
        totals.add_row(vec![
            Cell::new(currency),
            Cell::new(money(t.monthly_total, *currency)),
            Cell::new(money(t.yearly_total, *currency)),
            Cell::new(t.active_count),
            Cell::new(custom),
        ]);
    }
    println!("{}\n{totals}", "Spending".bold());

    if !summary.categories.is_empty() {
        let mut categories = Table::new();
        categories.set_header(vec!["Category", "Currency", "Per Month", "Count"]);
        for item in &summary.categories {
            categories.add_row(vec![
                Cell::new(&item.name),
                Cell::new(item.currency),
                Cell::new(money(item.monthly, item.currency)),
                Cell::new(item.count),
            ]);
        }
        println!("\n{}\n{categories}", "By Category".bold());
    }

    let today = chrono::Local::now().date_naive();
    let upcoming = upcoming_renewals(&subs, today, days);
    println!("\n{}", format!("Renewals in the next {days} days").bold());
    if upcoming.is_empty() {
        println!("None.");
        return Ok(());
    }
    let mut renewals = Table::new();
    renewals.set_header(vec!["Date", "Name", "Price", "Cycle"]);
    for sub in &upcoming {
        let rec = &sub.record;
        let date = rec.next_billing_date.format("%Y-%m-%d").to_string();
        let date_cell = if rec.next_billing_date == today {
            Cell::new(date.yellow().bold())
        } else {
            Cell::new(date)
        };
        renewals.add_row(vec![
            date_cell,
            Cell::new(&rec.name),
            Cell::new(money(rec.price, rec.currency)),
            Cell::new(rec.billing_cycle),
        ]);
    }
    println!("{renewals}");
    Ok(())
}
