use std::path::PathBuf;

use colored::Colorize;

use crate::error::{AppError, Result};
use crate::importer::{import_file, parse_subscription_bytes};
use crate::models::ParseResult;
use crate::settings::load_settings;
use crate::store::{open_store, InsertOutcome};

fn print_messages(result: &ParseResult) {
    for err in &result.errors {
        println!("{} {err}", "error:".red().bold());
    }
    for warning in &result.warnings {
        println!("{} {warning}", "warning:".yellow().bold());
    }
}

fn print_json(result: &ParseResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).map_err(|e| AppError::Other(e.to_string()))?;
    println!("{json}");
    Ok(())
}

pub fn run(file: &str, dry_run: bool, json: bool) -> Result<()> {
    let file_path = PathBuf::from(file);

    if dry_run {
        let parse = parse_subscription_bytes(&std::fs::read(&file_path)?);
        if json {
            print_json(&parse)?;
        } else {
            print_messages(&parse);
            println!(
                "{} valid, {} error(s); nothing saved (dry run)",
                parse.records().len(),
                parse.errors.len()
            );
        }
        return if parse.success {
            Ok(())
        } else {
            Err(AppError::ImportRejected(parse.errors.len()))
        };
    }

    let mut store = open_store(&load_settings())?;
    let result = import_file(&mut *store, &file_path)?;

    if json {
        print_json(&result.parse)?;
    } else {
        print_messages(&result.parse);
    }
    if result.rejected() {
        return Err(AppError::ImportRejected(result.parse.errors.len()));
    }
    if result.duplicate_file {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    }

    if !json {
        for (rec, outcome) in result.parse.records().iter().zip(&result.outcomes) {
            if let InsertOutcome::Failed(reason) = outcome {
                println!("{} {}: {reason}", "failed:".red().bold(), rec.name);
            }
        }
        println!("{} imported, {} failed", result.imported(), result.failed());
    }
    Ok(())
}
