use crate::models::Currency;

fn group_thousands(int_part: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format an amount with the currency's symbol and thousands separators: $1,234.56, ¥1,200
pub fn money(val: f64, currency: Currency) -> String {
    let negative = val < 0.0;
    let fixed = format!("{:.*}", currency.decimals(), val.abs());
    let (int_part, dec_part) = match fixed.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (fixed.as_str(), None),
    };
    let grouped = group_thousands(int_part);
    let sign = if negative { "-" } else { "" };
    let symbol = currency.symbol();
    match dec_part {
        Some(d) => format!("{sign}{symbol}{grouped}.{d}"),
        None => format!("{sign}{symbol}{grouped}"),
    }
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
