use csv::{QuoteStyle, WriterBuilder};
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::SubscriptionRecord;

pub const EXPORT_HEADER: [&str; 4] = ["Name", "Price", "Billing Cycle", "Next Billing Date"];

/// Render records as CSV. Values are written verbatim with no quoting, the
/// same naive format the importer reads; a name containing a comma will not
/// survive a round trip.
pub fn export_to_csv(records: &[SubscriptionRecord]) -> Result<String> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());

    wtr.write_record(EXPORT_HEADER)?;
    for rec in records {
        wtr.write_record([
            rec.name.clone(),
            rec.price.to_string(),
            rec.billing_cycle.as_str().to_string(),
            rec.next_billing_date.format("%Y-%m-%d").to_string(),
        ])?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Other(format!("Failed to finish CSV export: {e}")))?;
    let mut out =
        String::from_utf8(bytes).map_err(|e| AppError::Other(format!("Export is not UTF-8: {e}")))?;
    // Rows are joined, not terminated.
    if out.ends_with('\n') {
        out.pop();
    }
    info!(count = records.len(), "exported subscriptions");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::importer::parse_subscriptions;
    use crate::models::{BillingCycle, Currency, DEFAULT_CATEGORY};

    fn record(name: &str, price: f64, cycle: BillingCycle, date: (i32, u32, u32)) -> SubscriptionRecord {
        SubscriptionRecord {
            name: name.to_string(),
            price,
            currency: Currency::Usd,
            billing_cycle: cycle,
            next_billing_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            category: DEFAULT_CATEGORY.to_string(),
            payment_method: None,
            notes: None,
        }
    }

    #[test]
    fn test_export_empty_is_header_only() {
        assert_eq!(export_to_csv(&[]).unwrap(), "Name,Price,Billing Cycle,Next Billing Date");
    }

    #[test]
    fn test_export_rows() {
        let records = vec![
            record("Netflix", 15.99, BillingCycle::Monthly, (2024, 2, 1)),
            record("Figma", 144.0, BillingCycle::Yearly, (2024, 6, 30)),
        ];
        let csv = export_to_csv(&records).unwrap();
        assert_eq!(
            csv,
            "Name,Price,Billing Cycle,Next Billing Date\n\
             Netflix,15.99,monthly,2024-02-01\n\
             Figma,144,yearly,2024-06-30"
        );
    }

    #[test]
    fn test_export_does_not_quote_commas() {
        let records = vec![record("Acme, Inc", 10.0, BillingCycle::Custom, (2024, 1, 9))];
        let csv = export_to_csv(&records).unwrap();
        assert!(csv.ends_with("\nAcme, Inc,10,custom,2024-01-09"));
    }

    #[test]
    fn test_export_reimports() {
        let records = vec![
            record("Netflix", 15.99, BillingCycle::Monthly, (2024, 2, 1)),
            record("iCloud", 2.99, BillingCycle::Monthly, (2024, 3, 12)),
        ];
        let parsed = parse_subscriptions(&export_to_csv(&records).unwrap());
        assert!(parsed.success);
        assert_eq!(parsed.records(), records.as_slice());
    }
}
