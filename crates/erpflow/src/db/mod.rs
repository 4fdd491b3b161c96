//! Durable job records in SQLite.
//!
//! One `rusqlite::Connection` sits behind a mutex; every query goes through
//! [`Database::with_conn`]. Async callers use [`SqliteJobStore`], which moves
//! the work onto the blocking pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;

use crate::config::EngineConfig;

pub mod error;
pub mod job_repo;
pub mod migrations;
pub mod store;

pub use error::DatabaseError;
pub use store::SqliteJobStore;

/// Worker slots may write at the same moment; let SQLite wait for the lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle. Clones use the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Database {
    /// Opens or creates the file, switches it to WAL and brings the schema
    /// up to date.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        migrations::run_all(&conn)?;

        log::info!("Job database ready at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens the database named by the engine configuration, or the
    /// per-user default when none is set.
    pub fn open_configured(config: &EngineConfig) -> Result<Self, DatabaseError> {
        let path = config.resolved_database_path().ok_or(DatabaseError::NoPath)?;
        Self::open(&path)
    }

    /// Migrated in-memory database, gone when the last clone drops.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// File backing this database; `None` for in-memory ones.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }
}

/// `~/.erpflow/data/erpflow.db`
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".erpflow").join("data").join("erpflow.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_count(db: &Database) -> u32 {
        db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn test_in_memory_has_no_path() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.path().is_none());
        assert_eq!(job_count(&db), 0);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state").join("jobs.db");

        let db = Database::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn test_open_configured_uses_database_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configured.db");
        let mut config = EngineConfig::new("https://erp.example.com");
        config.database_path = Some(path.to_string_lossy().into_owned());

        let db = Database::open_configured(&config).unwrap();
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn test_default_database_path() {
        let path = default_database_path().unwrap();
        assert!(path.ends_with(".erpflow/data/erpflow.db"));
    }

    #[test]
    fn test_clones_share_the_connection() {
        let db = Database::open_in_memory().unwrap();
        let other = db.clone();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO jobs (id, job_type, status, created_at, updated_at)
                 VALUES ('t1', 'erp-estimation-workflow', 'pending', '2026-01-01', '2026-01-01')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        assert_eq!(job_count(&other), 1);
    }
}
