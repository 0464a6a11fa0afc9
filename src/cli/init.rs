use std::path::PathBuf;

use tracing::info;

use crate::db::DB_FILE;
use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_file_exists, shellexpand_path, Backend};
use crate::store::open_store;

pub fn run(data_dir: Option<String>, backend: Option<Backend>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if !settings_file_exists() {
        // First run: prompt for data dir
        println!("Data directory [{}]: ", settings.data_dir);
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).ok();
        let chosen = input.trim();
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(chosen);
        }
    }
    if let Some(backend) = backend {
        settings.backend = backend;
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    open_store(&settings)?;
    info!(data_dir = %resolved.display(), backend = %settings.backend, "initialized");

    match settings.backend {
        Backend::Sqlite => println!("Initialized subtrack at {}", resolved.join(DB_FILE).display()),
        Backend::Memory => println!(
            "Initialized subtrack at {} (memory backend: nothing is saved between runs)",
            resolved.display()
        ),
    }
    Ok(())
}
