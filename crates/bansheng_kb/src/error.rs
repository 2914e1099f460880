//! Knowledge base error types

use crate::types::FactKind;

/// Errors raised by the knowledge store, seeder and configuration layer.
///
/// The search layer never surfaces these to callers: it logs them and
/// degrades to empty results.
#[derive(Debug, thiserror::Error)]
pub enum KbError {
    #[error("knowledge store is closed")]
    StoreClosed,

    #[error("knowledge store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid {kind} record: {reason}")]
    InvalidRecord { kind: FactKind, reason: String },
}

pub type Result<T> = std::result::Result<T, KbError>;
