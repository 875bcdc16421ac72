//! Persistence for focusd
//!
//! Three JSON values live under fixed keys (the timer record, the blocking
//! toggle and the keyword list). Every write is broadcast as a
//! [`StoreChange`]. History is a separate append-only table.

mod keys;
mod sqlite;
mod traits;

pub use keys::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored value is not valid JSON for its key: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("store connection lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;
