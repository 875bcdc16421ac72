//! Store trait definitions

use focus_api::{HistoryEntry, TimerState};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::{StoreChange, StoreKey, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Key-value state

    /// Read a key; `None` if it has never been written
    fn get(&self, key: StoreKey) -> StoreResult<Option<Value>>;

    /// Replace a key's value and notify subscribers
    fn set(&self, key: StoreKey, value: Value) -> StoreResult<()>;

    /// Receive a [`StoreChange`] for every successful `set`
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;

    /// Read a key, falling back to its default
    fn get_or_default(&self, key: StoreKey) -> StoreResult<Value> {
        Ok(self.get(key)?.unwrap_or_else(|| key.default_value()))
    }

    fn timer_state(&self) -> StoreResult<TimerState> {
        match self.get(StoreKey::TimerState)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(TimerState::default()),
        }
    }

    fn set_timer_state(&self, state: &TimerState) -> StoreResult<()> {
        self.set(StoreKey::TimerState, serde_json::to_value(state)?)
    }

    fn blocking_enabled(&self) -> StoreResult<bool> {
        match self.get(StoreKey::BlockingEnabled)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(true),
        }
    }

    fn set_blocking_enabled(&self, enabled: bool) -> StoreResult<()> {
        self.set(StoreKey::BlockingEnabled, Value::Bool(enabled))
    }

    fn blocked_sites(&self) -> StoreResult<Vec<String>> {
        match self.get(StoreKey::BlockedSites)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    fn set_blocked_sites(&self, sites: &[String]) -> StoreResult<()> {
        self.set(StoreKey::BlockedSites, serde_json::to_value(sites)?)
    }

    // History

    /// Append a history entry, returning its row id
    fn append_history(&self, entry: HistoryEntry) -> StoreResult<i64>;

    /// Most recent entries, newest first
    fn recent_history(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
