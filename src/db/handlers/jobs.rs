//! Database repository for the background job queue.

use crate::db::{
    errors::Result,
    models::jobs::{JobCreateDBRequest, JobDBResponse, JobStatus},
};
use crate::types::{JobId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing jobs
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub skip: i64,
    pub limit: i64,
    pub status: Option<JobStatus>,
}

impl JobFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }
}

pub struct Jobs<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Jobs<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    pub async fn enqueue(&mut self, request: &JobCreateDBRequest) -> Result<JobDBResponse> {
        let job = sqlx::query_as::<_, JobDBResponse>(
            r#"
            INSERT INTO jobs (name, args, max_attempts, scheduled_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.args)
        .bind(request.max_attempts)
        .bind(request.scheduled_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(job)
    }

    #[instrument(skip(self), fields(job_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: JobId) -> Result<Option<JobDBResponse>> {
        let job = sqlx::query_as::<_, JobDBResponse>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(job)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &JobFilter) -> Result<Vec<JobDBResponse>> {
        use sqlx::QueryBuilder;

        let mut query = QueryBuilder::new("SELECT * FROM jobs WHERE 1=1");
        if let Some(status) = filter.status {
            query.push(" AND status = ");
            query.push_bind(status);
        }
        query.push(" ORDER BY scheduled_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let jobs = query.build_query_as::<JobDBResponse>().fetch_all(&mut *self.db).await?;

        Ok(jobs)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &JobFilter) -> Result<i64> {
        use sqlx::QueryBuilder;

        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM jobs WHERE 1=1");
        if let Some(status) = filter.status {
            query.push(" AND status = ");
            query.push_bind(status);
        }

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Atomically claim up to `batch` due jobs for this worker.
    ///
    /// `FOR UPDATE SKIP LOCKED` lets multiple workers poll the same table
    /// without handing out the same job twice.
    #[instrument(skip(self), err)]
    pub async fn claim_due(&mut self, batch: i64) -> Result<Vec<JobDBResponse>> {
        let jobs = sqlx::query_as::<_, JobDBResponse>(
            r#"
            UPDATE jobs SET
                status = 'running',
                attempts = attempts + 1,
                updated_at = NOW()
            WHERE id IN (
                SELECT id FROM jobs
                WHERE status = 'pending' AND scheduled_at <= NOW()
                ORDER BY scheduled_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(batch)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(jobs)
    }

    #[instrument(skip(self), fields(job_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_succeeded(&mut self, id: JobId) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = 'succeeded', last_error = NULL, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    /// Record a failed attempt. When `retry_at` is set the job goes back to
    /// pending with the new due time, otherwise it is failed for good.
    #[instrument(skip(self, error), fields(job_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_failed(&mut self, id: JobId, error: &str, retry_at: Option<DateTime<Utc>>) -> Result<()> {
        match retry_at {
            Some(retry_at) => {
                sqlx::query(
                    "UPDATE jobs SET status = 'pending', scheduled_at = $2, last_error = $3, updated_at = NOW() WHERE id = $1",
                )
                .bind(id)
                .bind(retry_at)
                .bind(error)
                .execute(&mut *self.db)
                .await?;
            }
            None => {
                sqlx::query("UPDATE jobs SET status = 'failed', last_error = $2, updated_at = NOW() WHERE id = $1")
                    .bind(id)
                    .bind(error)
                    .execute(&mut *self.db)
                    .await?;
            }
        }

        Ok(())
    }

    /// True when a job with this name is already queued for the given due time.
    /// The scheduler uses this to keep recurring ticks idempotent.
    #[instrument(skip(self), err)]
    pub async fn exists_scheduled(&mut self, name: &str, scheduled_at: DateTime<Utc>) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM jobs WHERE name = $1 AND scheduled_at = $2)")
            .bind(name)
            .bind(scheduled_at)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notify(scheduled_at: DateTime<Utc>) -> JobCreateDBRequest {
        JobCreateDBRequest {
            name: "notify_customers".to_string(),
            args: serde_json::json!({ "message": "Hello wednesday" }),
            max_attempts: 3,
            scheduled_at,
        }
    }

    #[sqlx::test]
    async fn claim_skips_future_jobs(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Jobs::new(&mut conn);

        repo.enqueue(&notify(Utc::now() - chrono::Duration::minutes(1))).await.unwrap();
        repo.enqueue(&notify(Utc::now() + chrono::Duration::hours(1))).await.unwrap();

        let claimed = repo.claim_due(10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].status, JobStatus::Running);
        assert_eq!(claimed[0].attempts, 1);
    }

    #[sqlx::test]
    async fn failed_job_with_retry_goes_back_to_pending(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Jobs::new(&mut conn);
        let job = repo.enqueue(&notify(Utc::now() - chrono::Duration::minutes(1))).await.unwrap();

        let claimed = repo.claim_due(10).await.unwrap();
        assert_eq!(claimed.len(), 1);

        let retry_at = Utc::now() + chrono::Duration::seconds(30);
        repo.mark_failed(job.id, "smtp timeout", Some(retry_at)).await.unwrap();

        let reloaded = repo.get_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, JobStatus::Pending);
        assert_eq!(reloaded.last_error.as_deref(), Some("smtp timeout"));

        // Not due yet, so nothing to claim
        assert!(repo.claim_due(10).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn terminal_failure_is_not_retried(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Jobs::new(&mut conn);
        let job = repo.enqueue(&notify(Utc::now() - chrono::Duration::minutes(1))).await.unwrap();

        repo.claim_due(10).await.unwrap();
        repo.mark_failed(job.id, "boom", None).await.unwrap();

        let reloaded = repo.get_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, JobStatus::Failed);
        assert!(repo.claim_due(10).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn exists_scheduled_deduplicates_ticks(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Jobs::new(&mut conn);

        let due = Utc::now() + chrono::Duration::hours(2);
        assert!(!repo.exists_scheduled("notify_customers", due).await.unwrap());
        repo.enqueue(&notify(due)).await.unwrap();
        assert!(repo.exists_scheduled("notify_customers", due).await.unwrap());
    }
}
