// Persistent key-value store for draft state.
//
// The core talks to storage through the `Store` trait: opaque JSON values
// addressed by namespace + key, with `None` signalling absence. The shipped
// implementation is SQLite; tests open it at `:memory:`.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Namespaces
// ---------------------------------------------------------------------------

/// Namespace holding one `DraftState` value per draft id.
pub const NS_DRAFT: &str = "draft";
/// Namespace for deviation records, keyed by draft id + pick number.
pub const NS_DEVIATION: &str = "deviation";
/// Namespace for per-pick board-summary audit entries.
pub const NS_AUDIT: &str = "audit";
/// Namespace for store-level metadata (current draft id).
pub const NS_META: &str = "meta";

/// Key in [`NS_META`] holding the active draft id.
pub const KEY_CURRENT_DRAFT: &str = "current_draft_id";

/// Compose the key for a per-pick entry (deviations, audit summaries).
/// Zero-padded so lexicographic listing order matches pick order.
pub fn pick_key(draft_id: &str, pick_number: u32) -> String {
    format!("{draft_id}:{pick_number:04}")
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// A write to be applied as part of an atomic batch.
pub type BatchEntry = (&'static str, String, Value);

/// Storage collaborator boundary. Implementations must apply `put_batch`
/// atomically: either every entry lands or none do.
pub trait Store: Send + Sync {
    /// Load the value at `namespace`/`key`, or `None` if absent.
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>>;

    /// Write a single value, replacing any previous one.
    fn put(&self, namespace: &str, key: &str, value: &Value) -> Result<()>;

    /// Write several values atomically.
    fn put_batch(&self, entries: &[BatchEntry]) -> Result<()>;

    /// All entries in `namespace` whose key starts with `prefix`, sorted by
    /// key.
    fn list_prefix(&self, namespace: &str, prefix: &str) -> Result<Vec<(String, Value)>>;

    /// Remove a value if present.
    fn delete(&self, namespace: &str, key: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

/// SQLite-backed [`Store`]. A single table holds every namespace; values are
/// stored as JSON text.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`. Pass `":memory:"` for an
    /// ephemeral database (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set store pragmas")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT NOT NULL,
                key       TEXT NOT NULL,
                value     TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            );",
        )
        .context("failed to create store schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("store mutex poisoned")
    }
}

impl Store for SqliteStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM kv WHERE namespace = ?1 AND key = ?2")
            .context("failed to prepare get query")?;

        let mut rows = stmt
            .query_map(params![namespace, key], |row| row.get::<_, String>(0))
            .context("failed to query store")?;

        match rows.next() {
            Some(row_result) => {
                let json_str = row_result.context("failed to read store row")?;
                let value: Value = serde_json::from_str(&json_str)
                    .context("failed to deserialize stored value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn put(&self, namespace: &str, key: &str, value: &Value) -> Result<()> {
        let conn = self.conn();
        let json_str = serde_json::to_string(value).context("failed to serialize value")?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (namespace, key, value) VALUES (?1, ?2, ?3)",
            params![namespace, key, json_str],
        )
        .context("failed to write store value")?;
        Ok(())
    }

    fn put_batch(&self, entries: &[BatchEntry]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin batch transaction")?;

        for (namespace, key, value) in entries {
            let json_str =
                serde_json::to_string(value).context("failed to serialize batch value")?;
            tx.execute(
                "INSERT OR REPLACE INTO kv (namespace, key, value) VALUES (?1, ?2, ?3)",
                params![namespace, key, json_str],
            )
            .context("failed to write batch entry")?;
        }

        tx.commit().context("failed to commit batch")?;
        Ok(())
    }

    fn list_prefix(&self, namespace: &str, prefix: &str) -> Result<Vec<(String, Value)>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT key, value FROM kv WHERE namespace = ?1 ORDER BY key")
            .context("failed to prepare list query")?;

        // Prefix matching happens here rather than in SQL: LIKE would treat
        // the underscores in draft ids as wildcards.
        let entries = stmt
            .query_map(params![namespace], |row| {
                let key: String = row.get(0)?;
                let json_str: String = row.get(1)?;
                Ok((key, json_str))
            })
            .context("failed to query store listing")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map store rows")?;

        entries
            .into_iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, json_str)| {
                let value: Value = serde_json::from_str(&json_str)
                    .with_context(|| format!("failed to deserialize value at {key}"))?;
                Ok((key, value))
            })
            .collect()
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
            params![namespace, key],
        )
        .context("failed to delete store value")?;
        Ok(())
    }
}
