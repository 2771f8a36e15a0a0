//! Record store layer.
//!
//! [`RecordStore`] is the list/insert/delete contract for doctors and bills.
//! [`RestStore`] talks to a hosted table API; [`SqliteStore`] keeps the same
//! tables in an embedded SQLite file.

mod bills;
mod doctors;
mod rest;
mod schema;

pub use rest::*;
pub use schema::*;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

use crate::models::{Bill, Doctor, NewBill, NewDoctor, RecordId};

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected store response: {0}")]
    Decode(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Store misconfigured: {0}")]
    Config(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// List/insert/delete over the two record collections.
///
/// Bills are listed by `bill_date` descending, doctors by `name` ascending.
pub trait RecordStore: Send + Sync {
    fn list_doctors(&self) -> StoreResult<Vec<Doctor>>;
    fn insert_doctor(&self, doctor: &NewDoctor) -> StoreResult<Doctor>;
    /// Returns whether a row was removed.
    fn delete_doctor(&self, id: &RecordId) -> StoreResult<bool>;

    fn list_bills(&self) -> StoreResult<Vec<Bill>>;
    fn insert_bill(&self, bill: &NewBill) -> StoreResult<Bill>;
    /// Returns whether a row was removed.
    fn delete_bill(&self, id: &RecordId) -> StoreResult<bool>;
}

/// Open the store named by `url`.
///
/// `sqlite::memory:` and `sqlite:<path>` select the embedded store;
/// `http(s)://` selects the hosted table API, which requires `key`.
pub fn open_store(url: &str, key: Option<&str>) -> StoreResult<Box<dyn RecordStore>> {
    if let Some(path) = url.strip_prefix("sqlite:") {
        let db = if path == ":memory:" {
            Database::open_in_memory()?
        } else {
            Database::open(path)?
        };
        info!(path, "Using embedded SQLite store");
        return Ok(Box::new(SqliteStore::new(db)));
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        let key = key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| StoreError::Config("hosted store requires an access key".into()))?;
        info!(url, "Using hosted table store");
        return Ok(Box::new(RestStore::new(url, key)?));
    }

    Err(StoreError::Config(format!("unsupported store URL: {}", url)))
}

// =========================================================================
// Embedded SQLite store
// =========================================================================

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> StoreResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Thread-safe [`RecordStore`] over an embedded [`Database`].
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> StoreResult<T>) -> StoreResult<T> {
        let db = self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&db)
    }
}

impl RecordStore for SqliteStore {
    fn list_doctors(&self) -> StoreResult<Vec<Doctor>> {
        self.with_db(|db| db.list_doctors())
    }

    fn insert_doctor(&self, doctor: &NewDoctor) -> StoreResult<Doctor> {
        self.with_db(|db| db.insert_doctor(doctor))
    }

    fn delete_doctor(&self, id: &RecordId) -> StoreResult<bool> {
        self.with_db(|db| db.delete_doctor(id))
    }

    fn list_bills(&self) -> StoreResult<Vec<Bill>> {
        self.with_db(|db| db.list_bills())
    }

    fn insert_bill(&self, bill: &NewBill) -> StoreResult<Bill> {
        self.with_db(|db| db.insert_bill(bill))
    }

    fn delete_bill(&self, id: &RecordId) -> StoreResult<bool> {
        self.with_db(|db| db.delete_bill(id))
    }
}

/// Map SQLite constraint failures to [`StoreError::Constraint`].
fn constraint_or(err: rusqlite::Error, context: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            StoreError::Constraint(context.to_string())
        }
        _ => StoreError::Sqlite(err),
    }
}
