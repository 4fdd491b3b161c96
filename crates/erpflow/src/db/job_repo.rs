//! Queries over the `jobs` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database. JSON columns are kept as text.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub job_type: String,
    pub status: String,
    pub metadata: Option<String>,
    pub result: Option<String>,
    pub retry_count: u32,
    pub sender: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_type: row.get("job_type")?,
            status: row.get("status")?,
            metadata: row.get("metadata")?,
            result: row.get("result")?,
            retry_count: row.get("retry_count")?,
            sender: row.get("sender")?,
            error: row.get("error")?,
            created_at: row.get("created_at")?,
            started_at: row.get("started_at")?,
            completed_at: row.get("completed_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, job_type, status, metadata, result, retry_count, sender,
             error, created_at, started_at, completed_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                job.id,
                job.job_type,
                job.status,
                job.metadata,
                job.result,
                job.retry_count,
                job.sender,
                job.error,
                job.created_at,
                job.started_at,
                job.completed_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Updates an existing job row. All fields except `id` and `created_at` are overwritten.
pub fn update(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET job_type=?2, status=?3, metadata=?4, result=?5, retry_count=?6,
             sender=?7, error=?8, started_at=?9, completed_at=?10, updated_at=?11
             WHERE id=?1",
            params![
                job.id,
                job.job_type,
                job.status,
                job.metadata,
                job.result,
                job.retry_count,
                job.sender,
                job.error,
                job.started_at,
                job.completed_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Inserts the row or overwrites the existing one with the same id.
pub fn upsert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, job_type, status, metadata, result, retry_count, sender,
             error, created_at, started_at, completed_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET job_type=excluded.job_type, status=excluded.status,
             metadata=excluded.metadata, result=excluded.result,
             retry_count=excluded.retry_count, sender=excluded.sender, error=excluded.error,
             started_at=excluded.started_at, completed_at=excluded.completed_at,
             updated_at=excluded.updated_at",
            params![
                job.id,
                job.job_type,
                job.status,
                job.metadata,
                job.result,
                job.retry_count,
                job.sender,
                job.error,
                job.created_at,
                job.started_at,
                job.completed_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Counts jobs in the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
