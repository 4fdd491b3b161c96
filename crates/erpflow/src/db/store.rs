use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use super::job_repo::{self, JobRow};
use super::{Database, DatabaseError};
use crate::error::RunnerError;
use crate::runner::{Job, JobStatus, JobStore};

/// `JobStore` backed by the `jobs` table. Queries run on the blocking pool.
#[derive(Clone)]
pub struct SqliteJobStore {
    db: Database,
}

impl SqliteJobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn get(&self, id: &str) -> Result<Option<Job>, RunnerError> {
        let db = self.db.clone();
        let id = id.to_string();
        let job = tokio::task::spawn_blocking(move || {
            job_repo::find_by_id(&db, &id)?.map(job_from_row).transpose()
        })
        .await
        .map_err(|e| DatabaseError::Task(e.to_string()))??;
        Ok(job)
    }

    async fn upsert(&self, job: &Job) -> Result<(), RunnerError> {
        let db = self.db.clone();
        let row = row_from_job(job)?;
        tokio::task::spawn_blocking(move || job_repo::upsert(&db, &row))
            .await
            .map_err(|e| DatabaseError::Task(e.to_string()))??;
        Ok(())
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(id: &str, column: &'static str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| DatabaseError::InvalidColumn {
            id: id.to_string(),
            column,
            reason: format!("'{}': {}", raw, e),
        })
}

fn row_from_job(job: &Job) -> Result<JobRow, DatabaseError> {
    let metadata = if job.metadata.is_null() {
        None
    } else {
        Some(serde_json::to_string(&job.metadata)?)
    };
    let result = job.result.as_ref().map(serde_json::to_string).transpose()?;

    Ok(JobRow {
        id: job.id.clone(),
        job_type: job.job_type.clone(),
        status: job.status.as_str().to_string(),
        metadata,
        result,
        retry_count: job.retry_count,
        sender: job.sender.clone(),
        error: job.error.clone(),
        created_at: timestamp(&job.created_at),
        started_at: job.started_at.as_ref().map(timestamp),
        completed_at: job.completed_at.as_ref().map(timestamp),
        updated_at: timestamp(&Utc::now()),
    })
}

fn job_from_row(row: JobRow) -> Result<Job, DatabaseError> {
    let status = JobStatus::parse(&row.status).ok_or_else(|| DatabaseError::InvalidColumn {
        id: row.id.clone(),
        column: "status",
        reason: format!("unknown value '{}'", row.status),
    })?;
    let metadata = match row.metadata.as_deref() {
        Some(raw) => serde_json::from_str(raw)?,
        None => serde_json::Value::Null,
    };
    let result = row.result.as_deref().map(serde_json::from_str).transpose()?;
    let started_at = row
        .started_at
        .as_deref()
        .map(|raw| parse_timestamp(&row.id, "started_at", raw))
        .transpose()?;
    let completed_at = row
        .completed_at
        .as_deref()
        .map(|raw| parse_timestamp(&row.id, "completed_at", raw))
        .transpose()?;

    Ok(Job {
        created_at: parse_timestamp(&row.id, "created_at", &row.created_at)?,
        id: row.id,
        job_type: row.job_type,
        status,
        metadata,
        result,
        retry_count: row.retry_count,
        sender: row.sender,
        error: row.error,
        started_at,
        completed_at,
    })
}
