use crate::cli::write_or_print;
use crate::error::Result;
use crate::exporter::export_to_csv;
use crate::models::SubscriptionRecord;
use crate::settings::load_settings;
use crate::store::open_store;

pub fn run(output: Option<String>) -> Result<()> {
    let store = open_store(&load_settings())?;
    let records: Vec<SubscriptionRecord> = store.list()?.into_iter().map(|s| s.record).collect();
    let csv = export_to_csv(&records)?;
    write_or_print(&csv, output.as_deref())
}
