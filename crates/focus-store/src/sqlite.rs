//! SQLite-based store implementation

use chrono::{DateTime, Utc};
use focus_api::{HistoryEntry, HistoryEventType};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{Store, StoreChange, StoreError, StoreKey, StoreResult};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Number of history rows kept; older rows are pruned on append
pub const HISTORY_RETENTION: usize = 5000;

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<StoreChange>,
    history_retention: usize,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let store = Self {
            conn: Mutex::new(conn),
            changes,
            history_retention: HISTORY_RETENTION,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Keep at most `rows` history entries (minimum one)
    pub fn with_history_retention(mut self, rows: usize) -> Self {
        self.history_retention = rows.max(1);
        self
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Key-value state, one JSON value per key
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL
            );

            -- History log (append-only)
            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn get(&self, key: StoreKey) -> StoreResult<Option<Value>> {
        let conn = self.lock()?;

        let json: Option<String> = conn
            .query_row(
                "SELECT value_json FROM kv WHERE key = ?",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: StoreKey, value: Value) -> StoreResult<()> {
        let json = serde_json::to_string(&value)?;
        {
            let conn = self.lock()?;
            conn.execute(
                r#"
                INSERT INTO kv (key, value_json)
                VALUES (?, ?)
                ON CONFLICT(key)
                DO UPDATE SET value_json = excluded.value_json
                "#,
                params![key.as_str(), json],
            )?;
        }

        debug!(key = %key, "Value stored");

        // No receivers is fine; nobody is listening yet.
        let _ = self.changes.send(StoreChange { key, value });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    fn append_history(&self, entry: HistoryEntry) -> StoreResult<i64> {
        let conn = self.lock()?;
        let event_json = serde_json::to_string(&entry.event)?;

        conn.execute(
            "INSERT INTO history (timestamp, event_json) VALUES (?, ?)",
            params![entry.timestamp.to_rfc3339(), event_json],
        )?;

        let id = conn.last_insert_rowid();
        let pruned = conn.execute(
            "DELETE FROM history WHERE id <= ?",
            params![id - self.history_retention as i64],
        )?;
        debug!(entry_id = id, pruned, "History entry appended");

        Ok(id)
    }

    fn recent_history(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM history ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| focus_util::now());
            let event: HistoryEventType = serde_json::from_str(&event_json)?;

            entries.push(HistoryEntry {
                id,
                timestamp,
                event,
            });
        }

        Ok(entries)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_api::{Interval, TimerPhase, TimerState};

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_unset_keys_read_defaults() {
        let store = SqliteStore::in_memory().unwrap();

        assert!(store.get(StoreKey::TimerState).unwrap().is_none());
        assert!(store.blocking_enabled().unwrap());
        assert!(store.blocked_sites().unwrap().is_empty());
        assert_eq!(store.timer_state().unwrap(), TimerState::default());
        assert_eq!(
            store.get_or_default(StoreKey::BlockingEnabled).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_timer_state_replaced_wholesale() {
        let store = SqliteStore::in_memory().unwrap();

        let mut state = TimerState::default();
        state.goal = "draft chapter".into();
        state.phase = TimerPhase::Running {
            interval: Interval::Work,
            start_time: focus_util::now(),
        };
        store.set_timer_state(&state).unwrap();
        assert_eq!(store.timer_state().unwrap(), state);

        let idle = TimerState::idle(20, 5);
        store.set_timer_state(&idle).unwrap();
        assert_eq!(store.timer_state().unwrap(), idle);
    }

    #[test]
    fn test_blocking_settings() {
        let store = SqliteStore::in_memory().unwrap();

        store.set_blocking_enabled(false).unwrap();
        assert!(!store.blocking_enabled().unwrap());

        let sites = vec!["instagram".to_string(), "youtube".to_string()];
        store.set_blocked_sites(&sites).unwrap();
        assert_eq!(store.blocked_sites().unwrap(), sites);
    }

    #[tokio::test]
    async fn test_every_set_notifies() {
        let store = SqliteStore::in_memory().unwrap();
        let mut rx = store.subscribe();

        store.set_blocking_enabled(false).unwrap();
        store.set_blocking_enabled(false).unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.key, StoreKey::BlockingEnabled);
        assert_eq!(first.value, Value::Bool(false));

        let second = rx.recv().await.unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn test_history_log() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .append_history(HistoryEntry::new(HistoryEventType::DaemonStarted))
            .unwrap();
        store
            .append_history(HistoryEntry::new(HistoryEventType::IntervalCompleted {
                interval: Interval::Work,
                duration_min: 35,
                goal: String::new(),
            }))
            .unwrap();

        let entries = store.recent_history(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(
            entries[0].event,
            HistoryEventType::IntervalCompleted { .. }
        ));
        assert!(matches!(entries[1].event, HistoryEventType::DaemonStarted));
        assert!(entries[0].id > entries[1].id);

        assert_eq!(store.recent_history(1).unwrap().len(), 1);
    }

    #[test]
    fn test_history_pruned_to_retention() {
        let store = SqliteStore::in_memory()
            .unwrap()
            .with_history_retention(3);

        for _ in 0..4 {
            store
                .append_history(HistoryEntry::new(HistoryEventType::DaemonStarted))
                .unwrap();
        }
        let last = store
            .append_history(HistoryEntry::new(HistoryEventType::TimerReset))
            .unwrap();

        let entries = store.recent_history(100).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, last);
        assert!(matches!(entries[0].event, HistoryEventType::TimerReset));
        assert_eq!(entries[2].id, last - 2);
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focusd.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .set_blocked_sites(&["reddit".to_string()])
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.blocked_sites().unwrap(), vec!["reddit".to_string()]);
    }
}
