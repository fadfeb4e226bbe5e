use crate::config::AppPaths;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Key/value persistence for the serialized ledger document.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

pub fn db_path(paths: &AppPaths) -> PathBuf {
    paths.data_dir.join("moneyflow.sqlite3")
}

pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    pub fn open(paths: &AppPaths) -> Result<Self> {
        fs::create_dir_all(&paths.data_dir)
            .with_context(|| format!("Failed to create data dir {}", paths.data_dir.display()))?;

        let path = db_path(paths);
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open DB {}", path.display()))?;

        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl KvStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .with_context(|| format!("Failed to read key '{key}'"))?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO kv (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("Failed to write key '{key}'"))?;
        Ok(())
    }
}

/// Volatile store, handy for tests and dry runs.
#[derive(Default)]
pub struct MemoryKv {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryKv {
    pub fn with_entry(key: &str, value: &str) -> Self {
        let kv = Self::default();
        kv.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        kv
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_set_overwrites_previous_value() {
        let kv = SqliteKv::open_in_memory().expect("open");
        assert_eq!(kv.get("k").expect("get"), None);
        kv.set("k", "one").expect("set");
        kv.set("k", "two").expect("set");
        assert_eq!(kv.get("k").expect("get").as_deref(), Some("two"));
    }
}
