use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::models::{BillingCycle, Currency, Subscription};

/// Spend normalized to a month and a year for one currency. Custom cycles have
/// no fixed period, so they are only counted and summed at face value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrencyTotals {
    pub monthly_total: f64,
    pub yearly_total: f64,
    pub active_count: usize,
    pub custom_count: usize,
    pub custom_total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryItem {
    pub currency: Currency,
    pub name: String,
    pub monthly: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SpendingSummary {
    pub by_currency: BTreeMap<Currency, CurrencyTotals>,
    pub categories: Vec<CategoryItem>,
}

/// Monthly-equivalent price, or `None` for custom cycles.
pub fn monthly_equivalent(price: f64, cycle: BillingCycle) -> Option<f64> {
    match cycle {
        BillingCycle::Monthly => Some(price),
        BillingCycle::Yearly => Some(price / 12.0),
        BillingCycle::Custom => None,
    }
}

pub fn get_spending_summary(subs: &[Subscription]) -> SpendingSummary {
    let mut by_currency: BTreeMap<Currency, CurrencyTotals> = BTreeMap::new();
    let mut by_category: BTreeMap<(Currency, String), (f64, usize)> = BTreeMap::new();

    for sub in subs {
        let rec = &sub.record;
        let totals = by_currency.entry(rec.currency).or_default();
        match monthly_equivalent(rec.price, rec.billing_cycle) {
            Some(monthly) => {
                totals.active_count += 1;
                totals.monthly_total += monthly;
                totals.yearly_total += monthly * 12.0;
                let entry = by_category
                    .entry((rec.currency, rec.category.clone()))
                    .or_default();
                entry.0 += monthly;
                entry.1 += 1;
            }
            None => {
                totals.custom_count += 1;
                totals.custom_total += rec.price;
            }
        }
    }

    let mut categories: Vec<CategoryItem> = by_category
        .into_iter()
        .map(|((currency, name), (monthly, count))| CategoryItem {
            currency,
            name,
            monthly,
            count,
        })
        .collect();
    categories.sort_by(|a, b| {
        a.currency
            .cmp(&b.currency)
            .then_with(|| b.monthly.total_cmp(&a.monthly))
            .then_with(|| a.name.cmp(&b.name))
    });

    SpendingSummary {
        by_currency,
        categories,
    }
}

/// Subscriptions billing within `days` of `today`, inclusive on both ends.
pub fn upcoming_renewals(subs: &[Subscription], today: NaiveDate, days: u32) -> Vec<Subscription> {
    let until = today + Duration::days(i64::from(days));
    let mut upcoming: Vec<Subscription> = subs
        .iter()
        .filter(|s| s.record.next_billing_date >= today && s.record.next_billing_date <= until)
        .cloned()
        .collect();
    upcoming.sort_by(|a, b| {
        a.record
            .next_billing_date
            .cmp(&b.record.next_billing_date)
            .then_with(|| a.record.name.cmp(&b.record.name))
    });
    upcoming
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubscriptionRecord;

    fn sub(
        id: i64,
        name: &str,
        price: f64,
        cycle: BillingCycle,
        currency: Currency,
        category: &str,
        date: NaiveDate,
    ) -> Subscription {
        Subscription {
            id,
            record: SubscriptionRecord {
                name: name.to_string(),
                price,
                currency,
                billing_cycle: cycle,
                next_billing_date: date,
                category: category.to_string(),
                payment_method: None,
                notes: None,
            },
            import_id: None,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn fixture() -> Vec<Subscription> {
        vec![
            sub(1, "Netflix", 15.0, BillingCycle::Monthly, Currency::Usd, "Entertainment", d(2024, 2, 1)),
            sub(2, "Figma", 144.0, BillingCycle::Yearly, Currency::Usd, "Design", d(2024, 2, 3)),
            sub(3, "Spotify", 10.0, BillingCycle::Monthly, Currency::Usd, "Entertainment", d(2024, 2, 20)),
            sub(4, "Domain", 30.0, BillingCycle::Custom, Currency::Usd, "General", d(2024, 1, 31)),
            sub(5, "Deezer", 12.0, BillingCycle::Monthly, Currency::Eur, "Entertainment", d(2024, 2, 1)),
        ]
    }

    #[test]
    fn test_monthly_equivalent() {
        assert_eq!(monthly_equivalent(12.0, BillingCycle::Monthly), Some(12.0));
        assert_eq!(monthly_equivalent(120.0, BillingCycle::Yearly), Some(10.0));
        assert_eq!(monthly_equivalent(5.0, BillingCycle::Custom), None);
    }

    #[test]
    fn test_spending_summary_by_currency() {
        let summary = get_spending_summary(&fixture());
        let usd = &summary.by_currency[&Currency::Usd];
        assert_eq!(usd.active_count, 3);
        assert!((usd.monthly_total - 37.0).abs() < 1e-9);
        assert!((usd.yearly_total - 444.0).abs() < 1e-9);
        assert_eq!(usd.custom_count, 1);
        assert_eq!(usd.custom_total, 30.0);

        let eur = &summary.by_currency[&Currency::Eur];
        assert_eq!(eur.monthly_total, 12.0);
        assert_eq!(eur.custom_count, 0);
    }

    #[test]
    fn test_category_breakdown_sorted() {
        let summary = get_spending_summary(&fixture());
        let rows: Vec<(Currency, &str, usize)> = summary
            .categories
            .iter()
            .map(|c| (c.currency, c.name.as_str(), c.count))
            .collect();
        assert_eq!(
            rows,
            vec![
                (Currency::Usd, "Entertainment", 2),
                (Currency::Usd, "Design", 1),
                (Currency::Eur, "Entertainment", 1),
            ]
        );
    }

    #[test]
    fn test_empty_summary() {
        let summary = get_spending_summary(&[]);
        assert!(summary.by_currency.is_empty());
        assert!(summary.categories.is_empty());
    }

    #[test]
    fn test_upcoming_renewals_window() {
        let upcoming = upcoming_renewals(&fixture(), d(2024, 2, 1), 7);
        let names: Vec<&str> = upcoming.iter().map(|s| s.record.name.as_str()).collect();
        assert_eq!(names, vec!["Deezer", "Netflix", "Figma"]);
    }

    #[test]
    fn test_upcoming_renewals_zero_days_is_today_only() {
        let upcoming = upcoming_renewals(&fixture(), d(2024, 2, 3), 0);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].record.name, "Figma");
    }
}
