//! Database layer for ontoeval.
//!
//! Provides a `Database` struct that owns the SQLite connection, exposes the
//! comparisons store, and serves as a persistent [`ComparisonCache`].

mod comparisons;

pub use comparisons::{ComparisonRecord, Comparisons};

use ontoeval_diff::{CacheError, CacheKey, ComparisonCache, DiffComparison};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// SQLite database holding cached comparisons.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the cache at [`Database::default_path`], creating its directory.
    pub fn open() -> Result<Self, rusqlite::Error> {
        let path = Self::default_path();
        if let Some(dir) = path.parent() {
            // A missing directory surfaces as an open error below
            let _ = std::fs::create_dir_all(dir);
        }
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self, rusqlite::Error> {
        Self::with_schema(Connection::open(path)?)
    }

    /// Open a database that lives only as long as this value.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> Result<Self, rusqlite::Error> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// `<data_local_dir>/ontoeval/ontoeval.db`, e.g.
    /// `~/.local/share/ontoeval/ontoeval.db` on Linux.
    pub fn default_path() -> PathBuf {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("ontoeval").join("ontoeval.db")
    }

    /// Access the comparisons store.
    pub fn comparisons(&self) -> Comparisons<'_> {
        let conn = self.conn.lock().expect("Database lock poisoned");
        Comparisons::new(conn)
    }

    fn try_comparisons(&self) -> Result<Comparisons<'_>, CacheError> {
        let conn: MutexGuard<'_, Connection> = self
            .conn
            .lock()
            .map_err(|_| CacheError::Backend("Database lock poisoned".into()))?;
        Ok(Comparisons::new(conn))
    }

    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS comparisons (
                key TEXT PRIMARY KEY,
                target_hash TEXT NOT NULL,
                predicted_hash TEXT NOT NULL,
                result TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_comparisons_target_hash ON comparisons(target_hash);
            "#,
        )
    }
}

impl ComparisonCache for Database {
    fn get(&self, key: &CacheKey) -> Result<Option<DiffComparison>, CacheError> {
        let record = self
            .try_comparisons()?
            .get(&key.as_string())
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        match record {
            Some(record) => Ok(Some(record.comparison()?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &CacheKey, comparison: &DiffComparison) -> Result<(), CacheError> {
        let record = ComparisonRecord::new(key, comparison)?;
        self.try_comparisons()?
            .save(&record)
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}
