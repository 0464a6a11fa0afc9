use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::db::{get_connection, init_db, DB_FILE};
use crate::error::{AppError, Result};
use crate::models::{BillingCycle, Currency, ImportBatch, Subscription, SubscriptionRecord};
use crate::settings::{Backend, Settings};

/// Per-record result of a bulk insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(i64),
    Failed(String),
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

fn count_inserted(outcomes: &[InsertOutcome]) -> usize {
    outcomes.iter().filter(|o| o.is_inserted()).count()
}

/// Result of storing one imported file.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// `None` when no record made it in and the batch was not recorded.
    pub import_id: Option<i64>,
    pub outcomes: Vec<InsertOutcome>,
}

/// Persistence seam for subscriptions and import batches.
pub trait SubscriptionStore {
    fn backend(&self) -> Backend;

    fn add(&mut self, record: &SubscriptionRecord) -> Result<i64>;

    /// Insert every record, continuing past failures. Outcomes line up with `records`.
    fn insert_many(
        &mut self,
        records: &[SubscriptionRecord],
        import_id: Option<i64>,
    ) -> Result<Vec<InsertOutcome>>;

    fn list(&self) -> Result<Vec<Subscription>>;

    fn remove(&mut self, id: i64) -> Result<()>;

    fn find_import(&self, checksum: &str) -> Result<Option<ImportBatch>>;

    /// Record an import batch together with its records, all or nothing. The
    /// batch is kept only if at least one record was stored, and its
    /// `record_count` is the number actually inserted.
    fn import_batch(
        &mut self,
        filename: &str,
        checksum: &str,
        records: &[SubscriptionRecord],
    ) -> Result<BatchOutcome>;
}

/// Open the store named by the settings. SQLite databases are created and
/// migrated on first use.
pub fn open_store(settings: &Settings) -> Result<Box<dyn SubscriptionStore>> {
    debug!(backend = %settings.backend, "opening store");
    match settings.backend {
        Backend::Sqlite => {
            let dir = Path::new(&settings.data_dir);
            std::fs::create_dir_all(dir)?;
            Ok(Box::new(SqliteStore::open(&dir.join(DB_FILE))?))
        }
        Backend::Memory => Ok(Box::new(MemoryStore::default())),
    }
}

/// Shared check so both backends refuse the same records.
fn check_record(record: &SubscriptionRecord) -> std::result::Result<(), String> {
    if record.name.trim().is_empty() {
        return Err("name must not be empty".to_string());
    }
    if !(record.price.is_finite() && record.price > 0.0) {
        return Err(format!("price must be positive, got {}", record.price));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn from_connection(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { conn })
    }

    fn insert_one(&self, record: &SubscriptionRecord, import_id: Option<i64>) -> Result<i64> {
        check_record(record).map_err(AppError::Invalid)?;
        self.conn.execute(
            "INSERT INTO subscriptions (name, price, currency, billing_cycle, next_billing_date, \
             category, payment_method, notes, import_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                record.name,
                record.price,
                record.currency.code(),
                record.billing_cycle.as_str(),
                record.next_billing_date,
                record.category,
                record.payment_method,
                record.notes,
                import_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_each(&self, records: &[SubscriptionRecord], import_id: Option<i64>) -> Vec<InsertOutcome> {
        records
            .iter()
            .map(|rec| match self.insert_one(rec, import_id) {
                Ok(id) => InsertOutcome::Inserted(id),
                Err(e) => InsertOutcome::Failed(e.to_string()),
            })
            .collect()
    }
}

fn conversion_error(col: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        col,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

fn row_to_subscription(row: &Row) -> rusqlite::Result<Subscription> {
    let currency: String = row.get(3)?;
    let cycle: String = row.get(4)?;
    Ok(Subscription {
        id: row.get(0)?,
        record: SubscriptionRecord {
            name: row.get(1)?,
            price: row.get(2)?,
            currency: Currency::from_code(&currency)
                .ok_or_else(|| conversion_error(3, format!("unknown currency {currency}")))?,
            billing_cycle: BillingCycle::parse(&cycle)
                .ok_or_else(|| conversion_error(4, format!("unknown billing cycle {cycle}")))?,
            next_billing_date: row.get(5)?,
            category: row.get(6)?,
            payment_method: row.get(7)?,
            notes: row.get(8)?,
        },
        import_id: row.get(9)?,
    })
}

impl SubscriptionStore for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn add(&mut self, record: &SubscriptionRecord) -> Result<i64> {
        let id = self.insert_one(record, None)?;
        debug!(id, name = %record.name, "added subscription");
        Ok(id)
    }

    fn insert_many(
        &mut self,
        records: &[SubscriptionRecord],
        import_id: Option<i64>,
    ) -> Result<Vec<InsertOutcome>> {
        let tx = self.conn.unchecked_transaction()?;
        let outcomes = self.insert_each(records, import_id);
        tx.commit()?;
        let inserted = count_inserted(&outcomes);
        info!(inserted, failed = outcomes.len() - inserted, "bulk insert finished");
        Ok(outcomes)
    }

    fn list(&self) -> Result<Vec<Subscription>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, price, currency, billing_cycle, next_billing_date, category, \
             payment_method, notes, import_id \
             FROM subscriptions ORDER BY next_billing_date, name, id",
        )?;
        let rows = stmt
            .query_map([], row_to_subscription)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn remove(&mut self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM subscriptions WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(AppError::NotFound(id));
        }
        debug!(id, "removed subscription");
        Ok(())
    }

    fn find_import(&self, checksum: &str) -> Result<Option<ImportBatch>> {
        let batch = self
            .conn
            .query_row(
                "SELECT id, filename, record_count, checksum, imported_at FROM imports WHERE checksum = ?1",
                [checksum],
                |row| {
                    Ok(ImportBatch {
                        id: row.get(0)?,
                        filename: row.get(1)?,
                        record_count: row.get(2)?,
                        checksum: row.get(3)?,
                        imported_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(batch)
    }

    fn import_batch(
        &mut self,
        filename: &str,
        checksum: &str,
        records: &[SubscriptionRecord],
    ) -> Result<BatchOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute(
            "INSERT INTO imports (filename, record_count, checksum) VALUES (?1, 0, ?2)",
            rusqlite::params![filename, checksum],
        )?;
        let import_id = self.conn.last_insert_rowid();
        let outcomes = self.insert_each(records, Some(import_id));
        let inserted = count_inserted(&outcomes);
        if inserted == 0 {
            tx.rollback()?;
            info!(filename, "no records stored, import batch discarded");
            return Ok(BatchOutcome {
                import_id: None,
                outcomes,
            });
        }
        self.conn.execute(
            "UPDATE imports SET record_count = ?1 WHERE id = ?2",
            rusqlite::params![inserted as i64, import_id],
        )?;
        tx.commit()?;
        info!(import_id, inserted, failed = outcomes.len() - inserted, "import batch stored");
        Ok(BatchOutcome {
            import_id: Some(import_id),
            outcomes,
        })
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    subscriptions: Vec<Subscription>,
    imports: Vec<ImportBatch>,
    last_id: i64,
    last_import_id: i64,
}

impl MemoryStore {
    fn insert_one(&mut self, record: &SubscriptionRecord, import_id: Option<i64>) -> Result<i64> {
        check_record(record).map_err(AppError::Invalid)?;
        self.last_id += 1;
        self.subscriptions.push(Subscription {
            id: self.last_id,
            record: record.clone(),
            import_id,
        });
        Ok(self.last_id)
    }

    fn insert_each(&mut self, records: &[SubscriptionRecord], import_id: Option<i64>) -> Vec<InsertOutcome> {
        records
            .iter()
            .map(|rec| match self.insert_one(rec, import_id) {
                Ok(id) => InsertOutcome::Inserted(id),
                Err(e) => InsertOutcome::Failed(e.to_string()),
            })
            .collect()
    }
}

impl SubscriptionStore for MemoryStore {
    fn backend(&self) -> Backend {
        Backend::Memory
    }

    fn add(&mut self, record: &SubscriptionRecord) -> Result<i64> {
        self.insert_one(record, None)
    }

    fn insert_many(
        &mut self,
        records: &[SubscriptionRecord],
        import_id: Option<i64>,
    ) -> Result<Vec<InsertOutcome>> {
        Ok(self.insert_each(records, import_id))
    }

    fn list(&self) -> Result<Vec<Subscription>> {
        let mut subs = self.subscriptions.clone();
        subs.sort_by(|a, b| {
            a.record
                .next_billing_date
                .cmp(&b.record.next_billing_date)
                .then_with(|| a.record.name.cmp(&b.record.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(subs)
    }

    fn remove(&mut self, id: i64) -> Result<()> {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        if self.subscriptions.len() == before {
            return Err(AppError::NotFound(id));
        }
        Ok(())
    }

    fn find_import(&self, checksum: &str) -> Result<Option<ImportBatch>> {
        Ok(self.imports.iter().find(|b| b.checksum == checksum).cloned())
    }

    fn import_batch(
        &mut self,
        filename: &str,
        checksum: &str,
        records: &[SubscriptionRecord],
    ) -> Result<BatchOutcome> {
        let import_id = self.last_import_id + 1;
        // Failed records are never pushed, so there is nothing to undo.
        let outcomes = self.insert_each(records, Some(import_id));
        let inserted = count_inserted(&outcomes);
        if inserted == 0 {
            return Ok(BatchOutcome {
                import_id: None,
                outcomes,
            });
        }
        self.last_import_id = import_id;
        self.imports.push(ImportBatch {
            id: import_id,
            filename: filename.to_string(),
            record_count: inserted as i64,
            checksum: checksum.to_string(),
            imported_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });
        Ok(BatchOutcome {
            import_id: Some(import_id),
            outcomes,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::DEFAULT_CATEGORY;

    fn record(name: &str, price: f64, date: (i32, u32, u32)) -> SubscriptionRecord {
        SubscriptionRecord {
            name: name.to_string(),
            price,
            currency: Currency::Eur,
            billing_cycle: BillingCycle::Yearly,
            next_billing_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            category: DEFAULT_CATEGORY.to_string(),
            payment_method: Some("Visa".to_string()),
            notes: None,
        }
    }

    fn sqlite_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn exercise_store(store: &mut dyn SubscriptionStore) {
        let a = store.add(&record("Zoom", 149.9, (2024, 5, 1))).unwrap();
        let outcomes = store
            .insert_many(
                &[
                    record("Adobe", 599.88, (2024, 3, 1)),
                    record("Broken", -1.0, (2024, 3, 1)),
                    record("Apple", 99.0, (2024, 3, 1)),
                ],
                None,
            )
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_inserted());
        assert!(matches!(&outcomes[1], InsertOutcome::Failed(msg) if msg.contains("price")));
        assert!(outcomes[2].is_inserted());

        let subs = store.list().unwrap();
        let names: Vec<&str> = subs.iter().map(|s| s.record.name.as_str()).collect();
        assert_eq!(names, vec!["Adobe", "Apple", "Zoom"]);
        assert_eq!(subs[2].record, record("Zoom", 149.9, (2024, 5, 1)));

        store.remove(a).unwrap();
        assert!(matches!(store.remove(a), Err(AppError::NotFound(id)) if id == a));
        assert_eq!(store.list().unwrap().len(), 2);
    }

    fn exercise_imports(store: &mut dyn SubscriptionStore) {
        assert!(store.find_import("abc123").unwrap().is_none());
        let batch = store
            .import_batch(
                "subs.csv",
                "abc123",
                &[record("Notion", 96.0, (2024, 8, 1)), record("Broken", 0.0, (2024, 8, 1))],
            )
            .unwrap();
        let id = batch.import_id.unwrap();
        assert!(batch.outcomes[0].is_inserted());
        assert!(!batch.outcomes[1].is_inserted());

        let stored = store.find_import("abc123").unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.filename, "subs.csv");
        assert_eq!(stored.record_count, 1);
        assert_eq!(store.list().unwrap()[0].import_id, Some(id));
    }

    fn exercise_empty_batch(store: &mut dyn SubscriptionStore) {
        let batch = store
            .import_batch("bad.csv", "def456", &[record("Broken", -1.0, (2024, 8, 1))])
            .unwrap();
        assert_eq!(batch.import_id, None);
        assert_eq!(batch.outcomes.len(), 1);
        assert!(store.find_import("def456").unwrap().is_none());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_store_crud() {
        let (_dir, mut store) = sqlite_store();
        exercise_store(&mut store);
    }

    #[test]
    fn test_memory_store_crud() {
        let mut store = MemoryStore::default();
        exercise_store(&mut store);
    }

    #[test]
    fn test_sqlite_store_imports() {
        let (_dir, mut store) = sqlite_store();
        exercise_imports(&mut store);
    }

    #[test]
    fn test_memory_store_imports() {
        let mut store = MemoryStore::default();
        exercise_imports(&mut store);
    }

    #[test]
    fn test_sqlite_batch_without_inserts_is_not_recorded() {
        let (_dir, mut store) = sqlite_store();
        exercise_empty_batch(&mut store);
    }

    #[test]
    fn test_memory_batch_without_inserts_is_not_recorded() {
        let mut store = MemoryStore::default();
        exercise_empty_batch(&mut store);
    }

    #[test]
    fn test_sqlite_store_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.add(&record("Netflix", 15.99, (2024, 2, 1))).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let subs = store.list().unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].record.currency, Currency::Eur);
        assert_eq!(subs[0].record.payment_method.as_deref(), Some("Visa"));
    }

    #[test]
    fn test_sqlite_store_from_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let mut store = SqliteStore::from_connection(conn).unwrap();
        store.add(&record("Netflix", 15.99, (2024, 2, 1))).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_open_store_selects_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings {
            data_dir: dir.path().join("data").to_string_lossy().to_string(),
            ..Settings::default()
        };
        let store = open_store(&settings).unwrap();
        assert_eq!(store.backend(), Backend::Sqlite);
        assert!(dir.path().join("data").join(DB_FILE).exists());

        settings.backend = Backend::Memory;
        let store = open_store(&settings).unwrap();
        assert_eq!(store.backend(), Backend::Memory);
    }
}
