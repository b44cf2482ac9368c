//! Opaque get/set-JSON key-value store and its SQLite implementation.
//!
//! # Responsibility
//! - Persist arbitrary JSON values under string keys for one client.
//! - Hide SQL details from the local note store.
//!
//! # Invariants
//! - Stored text that no longer parses as JSON reads back as `None`, the same
//!   as an absent key. Only backend failures are reported as errors.
//! - Each call is atomic on its own; multi-call read-modify-write cycles must
//!   be serialized by the caller.

use crate::db::DbError;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of the key-value backend.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialize(serde_json::Error),
    LockPoisoned(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "local storage failure: {err}"),
            Self::Serialize(err) => write!(f, "local storage encode failure: {err}"),
            Self::LockPoisoned(what) => write!(f, "local storage lock poisoned: {what}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::LockPoisoned(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Persistent get/set-JSON contract scoped to the running client.
pub trait KeyValueStore: Send + Sync {
    /// Reads the JSON value under `key`; `None` when absent or unparseable.
    fn get_json(&self, key: &str) -> StoreResult<Option<Value>>;
    /// Replaces the value under `key`.
    fn set_json(&self, key: &str, value: &Value) -> StoreResult<()>;
    /// Removes `key`; removing an absent key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get_json(&self, key: &str) -> StoreResult<Option<Value>> {
        (**self).get_json(key)
    }

    fn set_json(&self, key: &str, value: &Value) -> StoreResult<()> {
        (**self).set_json(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }
}

/// Key-value store over the `kv_entries` table.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    /// Wraps a migrated connection (see [`crate::db::open_db`]).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Stores raw text under `key` without JSON validation.
    ///
    /// Exists so callers can import legacy payloads verbatim.
    pub fn set_raw(&self, key: &str, raw: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        upsert(&conn, key, raw)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::LockPoisoned("sqlite connection"))
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get_json(&self, key: &str) -> StoreResult<Option<Value>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(
                    "event=kv_read module=db status=corrupt key={key} bytes={} error={err}",
                    raw.len()
                );
                Ok(None)
            }
        }
    }

    fn set_json(&self, key: &str, value: &Value) -> StoreResult<()> {
        let encoded = serde_json::to_string(value)?;
        let conn = self.lock()?;
        upsert(&conn, key, &encoded)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }
}

fn upsert(conn: &Connection, key: &str, raw: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![key, raw],
    )?;
    Ok(())
}
