//! Comparisons store for cached diff comparison results.

use chrono::{DateTime, Utc};
use ontoeval_diff::{CacheKey, DiffComparison};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;

/// A stored comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub key: String,
    pub target_hash: String,
    pub predicted_hash: String,
    pub result: String, // JSON blob of DiffComparison
    pub created_at: DateTime<Utc>,
}

impl ComparisonRecord {
    pub fn new(key: &CacheKey, comparison: &DiffComparison) -> Result<Self, serde_json::Error> {
        Ok(Self {
            key: key.as_string(),
            target_hash: key.target.clone(),
            predicted_hash: key.predicted.clone(),
            result: serde_json::to_string(comparison)?,
            created_at: Utc::now(),
        })
    }

    /// Decode the stored comparison.
    pub fn comparison(&self) -> Result<DiffComparison, serde_json::Error> {
        serde_json::from_str(&self.result)
    }
}

/// Comparisons store with a borrowed connection.
pub struct Comparisons<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Comparisons<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Save a comparison record (insert or replace).
    pub fn save(&self, record: &ComparisonRecord) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            r#"
            INSERT INTO comparisons (key, target_hash, predicted_hash, result, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(key) DO UPDATE SET
                result = excluded.result,
                created_at = excluded.created_at
            "#,
            params![
                record.key,
                record.target_hash,
                record.predicted_hash,
                record.result,
                record.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Get a comparison by cache key.
    pub fn get(&self, key: &str) -> Result<Option<ComparisonRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT key, target_hash, predicted_hash, result, created_at FROM comparisons WHERE key = ?1",
                params![key],
                Self::row_to_record,
            )
            .optional()
    }

    /// All comparisons recorded against one target diff, newest first.
    pub fn list_for_target(&self, target_hash: &str) -> Result<Vec<ComparisonRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT key, target_hash, predicted_hash, result, created_at FROM comparisons WHERE target_hash = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![target_hash], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }

    pub fn count(&self) -> Result<usize, rusqlite::Error> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM comparisons", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete a comparison by cache key.
    pub fn delete(&self, key: &str) -> Result<bool, rusqlite::Error> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM comparisons WHERE key = ?1", params![key])?;
        Ok(rows_affected > 0)
    }

    /// Remove every cached comparison, returning how many were removed.
    pub fn clear(&self) -> Result<usize, rusqlite::Error> {
        self.conn.execute("DELETE FROM comparisons", [])
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<ComparisonRecord, rusqlite::Error> {
        let created_at_str: String = row.get(4)?;

        Ok(ComparisonRecord {
            key: row.get(0)?,
            target_hash: row.get(1)?,
            predicted_hash: row.get(2)?,
            result: row.get(3)?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
