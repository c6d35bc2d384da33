//! Enqueue entry point for background jobs.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use crate::{
    db::{
        handlers::Jobs,
        models::jobs::{JobCreateDBRequest, JobDBResponse},
    },
    errors::{Error, Result},
};

/// Handle for putting jobs on the queue.
#[derive(Clone)]
pub struct JobQueue {
    pool: PgPool,
    max_attempts: i32,
}

impl JobQueue {
    pub fn new(pool: PgPool, max_attempts: i32) -> Self {
        Self { pool, max_attempts }
    }

    /// Enqueue a job, due immediately unless `scheduled_at` says otherwise.
    #[instrument(skip(self, args), fields(name = %name), err)]
    pub async fn enqueue(&self, name: &str, args: serde_json::Value, scheduled_at: Option<DateTime<Utc>>) -> Result<JobDBResponse> {
        let mut conn = self.pool.acquire().await.map_err(crate::db::errors::DbError::from)?;
        let mut jobs = Jobs::new(&mut conn);

        let job = jobs
            .enqueue(&JobCreateDBRequest {
                name: name.to_string(),
                args,
                max_attempts: self.max_attempts,
                scheduled_at: scheduled_at.unwrap_or_else(Utc::now),
            })
            .await
            .map_err(Error::Database)?;

        tracing::info!(job_id = %job.id, "Enqueued job {name}");
        Ok(job)
    }
}
