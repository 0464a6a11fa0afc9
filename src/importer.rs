use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{
    BillingCycle, Currency, HeaderCheck, ParseResult, SubscriptionRecord, DEFAULT_CATEGORY,
};
use crate::store::{InsertOutcome, SubscriptionStore};

pub const REQUIRED_HEADERS: &[&str] = &["name", "price", "billingcycle", "nextbillingdate"];

const TEMPLATE_HEADER: &str =
    "Name,Price,Billing Cycle,Next Billing Date,Category,Currency,Payment Method,Notes";
const TEMPLATE_EXAMPLE: &str =
    "Netflix,15.99,monthly,2024-02-01,Entertainment,USD,Credit Card,Family plan";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lowercase and drop every whitespace character: "Next Billing Date" -> "nextbillingdate".
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Positive, finite price or nothing.
pub fn parse_price(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%b %d %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Lenient calendar-date parsing. ISO dates are the documented format; the
/// others cover what spreadsheet exports commonly produce.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}

/// One record per line. Quoting is switched off, so every comma is a field
/// separator.
fn read_rows(lines: &[&str]) -> std::result::Result<Vec<csv::StringRecord>, csv::Error> {
    let joined = lines.join("\n");
    csv::ReaderBuilder::new()
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(joined.as_bytes())
        .records()
        .collect()
}

/// Zip header names against a row. Short rows pad with "", extra values are dropped.
fn row_map<'a>(headers: &'a [String], values: &[&'a str]) -> HashMap<&'a str, &'a str> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), values.get(i).copied().unwrap_or("")))
        .collect()
}

fn optional(fields: &HashMap<&str, &str>, key: &str) -> Option<String> {
    fields
        .get(key)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

// ---------------------------------------------------------------------------
// Row validation
// ---------------------------------------------------------------------------

/// Validation result for one data row.
#[derive(Debug)]
pub enum RowOutcome {
    Valid {
        record: SubscriptionRecord,
        warning: Option<String>,
    },
    Invalid(String),
}

/// Validate one set of fields keyed by normalized header. Messages carry no
/// row prefix. The warning, if any, is for an unsupported currency.
pub fn validate_fields(
    fields: &HashMap<&str, &str>,
) -> std::result::Result<(SubscriptionRecord, Option<String>), String> {
    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|h| fields.get(h).map_or(true, |v| v.is_empty()))
        .collect();
    if !missing.is_empty() {
        return Err(format!("Missing required fields: {}", missing.join(", ")));
    }

    let raw_price = fields["price"];
    let price = parse_price(raw_price)
        .ok_or_else(|| format!("Invalid price \"{raw_price}\". Must be a positive number."))?;

    let raw_cycle = fields["billingcycle"];
    let billing_cycle = BillingCycle::parse(raw_cycle).ok_or_else(|| {
        format!("Invalid billing cycle \"{raw_cycle}\". Must be monthly, yearly, or custom.")
    })?;

    let raw_date = fields["nextbillingdate"];
    let next_billing_date = parse_date(raw_date)
        .ok_or_else(|| format!("Invalid date \"{raw_date}\". Use YYYY-MM-DD format."))?;

    let raw_currency = fields.get("currency").copied().unwrap_or("");
    let (currency, warning) = if raw_currency.is_empty() {
        (Currency::Usd, None)
    } else {
        match Currency::from_code(&raw_currency.to_uppercase()) {
            Some(c) => (c, None),
            None => (
                Currency::Usd,
                Some(format!("Unsupported currency \"{raw_currency}\". Using USD instead.")),
            ),
        }
    };

    let record = SubscriptionRecord {
        name: fields["name"].to_string(),
        price,
        currency,
        billing_cycle,
        next_billing_date,
        category: optional(fields, "category").unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        payment_method: optional(fields, "paymentmethod"),
        notes: optional(fields, "notes"),
    };
    Ok((record, warning))
}

/// Validate a single CSV row. `row` is the 1-based index among data rows and
/// only feeds the messages.
pub fn validate_row(row: usize, fields: &HashMap<&str, &str>) -> RowOutcome {
    match validate_fields(fields) {
        Ok((record, warning)) => RowOutcome::Valid {
            record,
            warning: warning.map(|w| format!("Row {row}: {w}")),
        },
        Err(message) => RowOutcome::Invalid(format!("Row {row}: {message}")),
    }
}

// ---------------------------------------------------------------------------
// parse_subscriptions
// ---------------------------------------------------------------------------

/// Parse CSV bytes as read from disk. Invalid UTF-8 is reported as a parse
/// failure, never returned as an error. A leading byte order mark is dropped
/// by `parse_subscriptions`.
pub fn parse_subscription_bytes(raw: &[u8]) -> ParseResult {
    match std::str::from_utf8(raw) {
        Ok(text) => parse_subscriptions(text),
        Err(e) => ParseResult::failure(format!("Failed to parse CSV: {e}")),
    }
}

/// Parse newline/comma separated text into subscription records.
///
/// Fields are split on bare commas: quoting is not supported, so a value
/// containing a comma shifts every later column. Every data row is accounted
/// for exactly once, either as a record or as an error; a bad row never stops
/// the rows after it.
pub fn parse_subscriptions(raw: &str) -> ParseResult {
    // Spreadsheet "CSV UTF-8" exports start with a BOM.
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let lines: Vec<&str> = raw.split('\n').filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return ParseResult::failure("CSV must have at least a header row and one data row");
    }

    let rows = match read_rows(&lines) {
        Ok(rows) => rows,
        Err(e) => return ParseResult::failure(format!("Failed to parse CSV: {e}")),
    };
    let Some((header_row, data_rows)) = rows.split_first() else {
        return ParseResult::failure("CSV must have at least a header row and one data row");
    };

    let headers: Vec<String> = header_row.iter().map(normalize_header).collect();
    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|h| !headers.iter().any(|x| x == h))
        .collect();
    if !missing.is_empty() {
        return ParseResult::failure(format!("Missing required headers: {}", missing.join(", ")));
    }

    let mut records = Vec::new();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut has_errors = false;

    for (idx, csv_row) in data_rows.iter().enumerate() {
        let row = idx + 1;
        let values: Vec<&str> = csv_row.iter().collect();
        let fields = row_map(&headers, &values);
        match validate_row(row, &fields) {
            RowOutcome::Valid { record, warning } => {
                debug!(row, name = %record.name, "parsed subscription row");
                warnings.extend(warning);
                records.push(record);
            }
            RowOutcome::Invalid(message) => {
                debug!(row, reason = %message, "rejected subscription row");
                errors.push(message);
                has_errors = true;
            }
        }
    }

    if records.is_empty() {
        errors.push("No valid subscriptions found in CSV".to_string());
    }

    if !warnings.is_empty() {
        let summary = format!("{} warnings found during parsing", warnings.len());
        warnings.insert(0, summary);
    }

    let success = !has_errors && !records.is_empty();
    ParseResult {
        success,
        data: (!records.is_empty()).then_some(records),
        errors,
        warnings,
    }
}

// ---------------------------------------------------------------------------
// Template & header validation
// ---------------------------------------------------------------------------

pub fn generate_template() -> String {
    format!("{TEMPLATE_HEADER}\n{TEMPLATE_EXAMPLE}")
}

/// Per-header check used when mapping columns interactively. Unlike the
/// parser, each missing header gets its own error.
pub fn validate_headers<S: AsRef<str>>(headers: &[S]) -> HeaderCheck {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h.as_ref())).collect();
    let errors: Vec<String> = REQUIRED_HEADERS
        .iter()
        .filter(|req| !normalized.iter().any(|h| h == *req))
        .map(|req| format!("Missing required header: {req}"))
        .collect();
    HeaderCheck {
        valid: errors.is_empty(),
        errors,
    }
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

pub struct ImportResult {
    pub parse: ParseResult,
    pub outcomes: Vec<InsertOutcome>,
    pub duplicate_file: bool,
}

impl ImportResult {
    /// Nothing was stored because the file had errors.
    pub fn rejected(&self) -> bool {
        !self.parse.success
    }

    pub fn imported(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_inserted()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.imported()
    }
}

/// Parse a CSV file and bulk insert its records. A file with any hard error is
/// rejected whole, even when some rows were valid, and a file whose bytes were
/// already imported is skipped. A file none of whose records could be stored
/// is not remembered, so it can be imported again.
pub fn import_file(store: &mut dyn SubscriptionStore, file_path: &Path) -> Result<ImportResult> {
    let bytes = std::fs::read(file_path)?;
    let parse = parse_subscription_bytes(&bytes);
    if !parse.success {
        warn!(
            file = %file_path.display(),
            errors = parse.errors.len(),
            "import rejected"
        );
        return Ok(ImportResult {
            parse,
            outcomes: Vec::new(),
            duplicate_file: false,
        });
    }

    let checksum = compute_checksum(&bytes);
    if let Some(batch) = store.find_import(&checksum)? {
        info!(file = %file_path.display(), previous = %batch.imported_at, "duplicate import skipped");
        return Ok(ImportResult {
            parse,
            outcomes: Vec::new(),
            duplicate_file: true,
        });
    }

    let filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let batch = store.import_batch(filename, &checksum, parse.records())?;
    if batch.import_id.is_none() {
        warn!(file = filename, "no records could be stored");
    }

    let result = ImportResult {
        parse,
        outcomes: batch.outcomes,
        duplicate_file: false,
    };
    info!(
        file = filename,
        imported = result.imported(),
        failed = result.failed(),
        "import finished"
    );
    Ok(result)
}
