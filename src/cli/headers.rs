use colored::Colorize;

use crate::error::{AppError, Result};
use crate::importer::validate_headers;

pub fn run(file: &str) -> Result<()> {
    let content = std::fs::read_to_string(file)?;
    let header_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let headers: Vec<&str> = header_line.split(',').collect();

    let check = validate_headers(&headers);
    if check.valid {
        println!("{} all required headers present", "ok:".green().bold());
        return Ok(());
    }
    for err in &check.errors {
        println!("{} {err}", "error:".red().bold());
    }
    Err(AppError::Invalid(format!(
        "{} required header(s) missing",
        check.errors.len()
    )))
}
