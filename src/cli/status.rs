use crate::db::DB_FILE;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::{load_settings, settings_file_exists, Backend};
use crate::store::open_store;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);

    if !settings_file_exists() {
        println!("Not initialized. Run `subtrack init` to set up.");
        println!();
    }
    println!("Data dir:   {}", data_dir.display());
    println!("Backend:    {}", settings.backend);
    println!("Renewals:   next {} days", settings.renewal_window_days);
    println!("Log level:  {}", settings.log_level);

    if settings.backend == Backend::Sqlite {
        let db_path = data_dir.join(DB_FILE);
        if !db_path.exists() {
            println!();
            println!("Database not found. Run `subtrack init` to set up.");
            return Ok(());
        }
        println!("Database:   {}", db_path.display());
        println!("DB size:    {}", format_bytes(std::fs::metadata(&db_path)?.len()));
    }

    let store = open_store(&settings)?;
    let subs = store.list()?;
    let imported = subs.iter().filter(|s| s.import_id.is_some()).count();

    println!();
    println!("Subscriptions:  {}", subs.len());
    println!("From imports:   {imported}");
    Ok(())
}
