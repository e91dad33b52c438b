// SQLite persistence layer for draft rotation state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::store::KeyValueStore;

/// SQLite-backed key-value storage for rotation state.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure the schema
    /// exists. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS draft_state (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection. A poisoned mutex is reported as an
    /// error like any other backend failure.
    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    /// Persist a raw string under `key`. Uses INSERT OR REPLACE so repeated
    /// saves overwrite the previous value.
    pub fn save_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO draft_state (key, value, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
            params![key, value],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load the raw string stored under `key`, if any.
    pub fn load_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM draft_state WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .context("failed to query draft state")
    }

    pub fn delete_state(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM draft_state WHERE key = ?1", params![key])
            .context("failed to delete state")?;
        Ok(())
    }

    /// Delete several keys at once. Uses a transaction with automatic
    /// rollback on error, so either every key goes or none do.
    pub fn delete_states(&self, keys: &[&str]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to begin transaction")?;
        for key in keys {
            tx.execute("DELETE FROM draft_state WHERE key = ?1", params![key])
                .with_context(|| format!("failed to delete {key}"))?;
        }
        tx.commit().context("failed to commit delete_states")?;
        Ok(())
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.load_state(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.save_state(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.delete_state(key)
    }

    fn delete_many(&self, keys: &[&str]) -> Result<()> {
        self.delete_states(keys)
    }
}
