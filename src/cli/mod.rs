pub mod add;
pub mod completions;
pub mod export;
pub mod headers;
pub mod import;
pub mod init;
pub mod list;
pub mod status;
pub mod summary;
pub mod template;

use std::path::Path;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::settings::Backend;

/// Write to `output` when given, otherwise print to stdout.
pub(crate) fn write_or_print(content: &str, output: Option<&str>) -> Result<()> {
    match output {
        Some(path) => {
            let path = Path::new(path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, format!("{content}\n"))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "subtrack", about = "Track recurring subscriptions and what they cost.")]
pub struct Cli {
    /// Log verbosity: error, warn, info, debug, trace (default from settings)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up subtrack: choose a data directory and storage backend.
    Init {
        /// Path for subtrack data (default: ~/Documents/subtrack)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Storage backend
        #[arg(long, value_enum)]
        backend: Option<Backend>,
    },
    /// Add a subscription.
    Add {
        /// Subscription name, e.g. 'Netflix'
        name: String,
        /// Price per billing cycle
        #[arg(long)]
        price: String,
        /// Billing cycle: monthly, yearly, custom
        #[arg(long)]
        cycle: String,
        /// Next billing date: YYYY-MM-DD
        #[arg(long)]
        next: String,
        /// Currency code (USD, EUR, GBP, CAD, AUD, JPY)
        #[arg(long)]
        currency: Option<String>,
        /// Category (default: General)
        #[arg(long)]
        category: Option<String>,
        /// Payment method
        #[arg(long = "payment-method")]
        payment_method: Option<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List stored subscriptions.
    List,
    /// Remove a subscription by ID.
    Remove {
        /// Subscription ID (shown in `subtrack list`)
        id: i64,
    },
    /// Import subscriptions from a CSV file.
    Import {
        /// Path to the CSV file
        file: String,
        /// Validate only; store nothing
        #[arg(long = "dry-run")]
        dry_run: bool,
        /// Print the parse result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export subscriptions to CSV.
    Export {
        /// Output file path (default: stdout)
        #[arg(long)]
        output: Option<String>,
    },
    /// Print an example CSV to fill in.
    Template {
        /// Output file path (default: stdout)
        #[arg(long)]
        output: Option<String>,
    },
    /// Check that a CSV file has the required column headers.
    CheckHeaders {
        /// Path to the CSV file
        file: String,
    },
    /// Spending summary and upcoming renewals.
    Summary {
        /// Renewal window in days (default from settings)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Show settings and summary statistics.
    Status,
    /// Generate shell completions.
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}
