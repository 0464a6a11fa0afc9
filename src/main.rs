mod cli;
mod db;
mod error;
mod exporter;
mod fmt;
mod importer;
mod models;
mod reports;
mod settings;
mod store;

use std::io::stderr;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use cli::add::AddArgs;
use cli::{Cli, Commands};

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => {
            eprintln!("Invalid log level '{level}', defaulting to 'warn'");
            LevelFilter::WARN
        }
    }
}

fn setup_logging(level: LevelFilter) {
    // stdout carries command output (CSV exports in particular), so logs go to stderr
    let terminal_log = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry().with(terminal_log).init();
}

fn main() {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings::load_settings().log_level);
    setup_logging(parse_log_level(&level));

    let result = match cli.command {
        Some(Commands::Init { data_dir, backend }) => cli::init::run(data_dir, backend),
        Some(Commands::Add {
            name,
            price,
            cycle,
            next,
            currency,
            category,
            payment_method,
            notes,
        }) => cli::add::run(AddArgs {
            name,
            price,
            cycle,
            next,
            currency,
            category,
            payment_method,
            notes,
        }),
        Some(Commands::List) => cli::list::list(),
        Some(Commands::Remove { id }) => cli::list::remove(id),
        Some(Commands::Import {
            file,
            dry_run,
            json,
        }) => cli::import::run(&file, dry_run, json),
        Some(Commands::Export { output }) => cli::export::run(output),
        Some(Commands::Template { output }) => cli::template::run(output),
        Some(Commands::CheckHeaders { file }) => cli::headers::run(&file),
        Some(Commands::Summary { days }) => cli::summary::run(days),
        Some(Commands::Status) => cli::status::run(),
        Some(Commands::Completions { shell }) => cli::completions::run(shell),
        None => cli::summary::run(None),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
