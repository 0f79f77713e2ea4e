//! Key/value persistence for the save slot.
//!
//! RULE: Only store.rs talks to the database.
//! The save coordinator calls store methods: it never executes SQL directly.

use crate::{error::SimResult, types::Tick};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;

/// The external key/value store a save lives in.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> SimResult<Option<String>>;
    fn put(&mut self, key: &str, value: &str, tick: Tick) -> SimResult<()>;
    fn remove(&mut self, key: &str) -> SimResult<()>;
}

/// SQLite-backed store: one row per key in `save_slot`.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the save database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let store = Self { conn: Connection::open_in_memory()? };
        store.migrate()?;
        Ok(store)
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    /// Tick and wall-clock time of the last write to `key`.
    pub fn saved_at(&self, key: &str) -> SimResult<Option<(Tick, String)>> {
        let row = self
            .conn
            .query_row(
                "SELECT saved_tick, saved_at FROM save_slot WHERE save_key = ?1",
                params![key],
                |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(row)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> SimResult<Option<String>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM save_slot WHERE save_key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn put(&mut self, key: &str, value: &str, tick: Tick) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO save_slot (save_key, payload, saved_tick, saved_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(save_key) DO UPDATE SET
                payload = excluded.payload,
                saved_tick = excluded.saved_tick,
                saved_at = excluded.saved_at",
            params![key, value, tick as i64, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SimResult<()> {
        self.conn.execute("DELETE FROM save_slot WHERE save_key = ?1", params![key])?;
        Ok(())
    }
}

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> SimResult<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str, _tick: Tick) -> SimResult<()> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SimResult<()> {
        self.slots.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_put_overwrites_single_slot() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.put("slot", "first", 10).unwrap();
        store.put("slot", "second", 20).unwrap();
        assert_eq!(store.get("slot").unwrap().as_deref(), Some("second"));
        assert_eq!(store.saved_at("slot").unwrap().map(|(tick, _)| tick), Some(20));
    }

    #[test]
    fn sqlite_remove_clears_slot() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.put("slot", "payload", 1).unwrap();
        store.remove("slot").unwrap();
        assert_eq!(store.get("slot").unwrap(), None);
        assert_eq!(store.saved_at("slot").unwrap(), None);
    }

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.put("k", "v", 0).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
