use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot prepare database directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No database path configured and no home directory to default to")]
    NoPath,

    #[error("Migration v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A stored value could not be turned back into a job field.
    #[error("Job '{id}' has an invalid {column}: {reason}")]
    InvalidColumn {
        id: String,
        column: &'static str,
        reason: String,
    },

    #[error("JSON column encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database task did not complete: {0}")]
    Task(String),

    #[error("Database lock poisoned")]
    LockPoisoned,
}
