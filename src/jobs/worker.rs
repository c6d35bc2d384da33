//! Polling worker that schedules recurring jobs and executes due ones.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    config::JobsConfig,
    db::{
        handlers::Jobs,
        models::jobs::{JobCreateDBRequest, JobDBResponse},
    },
    email::EmailService,
    errors::{Error, Result},
    jobs::{notify, schedule},
};

/// Background worker daemon.
///
/// Each poll does two things: pre-enqueue the next tick of every recurring
/// schedule entry (idempotent via the (name, scheduled_at) check), and claim
/// and run due jobs.
pub struct JobWorker {
    pool: PgPool,
    config: JobsConfig,
    email: Arc<EmailService>,
}

impl JobWorker {
    pub fn new(pool: PgPool, config: JobsConfig, email: Arc<EmailService>) -> Self {
        Self { pool, config, email }
    }

    /// Run the worker loop until the token is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!("Job worker started, polling every {:?}", self.config.poll_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!("Job worker tick failed: {e:#}");
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Job worker shutting down");
                    break;
                }
            }
        }
    }

    pub(crate) async fn tick(&self) -> Result<()> {
        self.schedule_recurring().await?;
        self.process_due().await
    }

    /// Enqueue the next occurrence of each recurring schedule entry.
    #[instrument(skip(self), err)]
    async fn schedule_recurring(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(crate::db::errors::DbError::from)?;
        let mut jobs = Jobs::new(&mut conn);

        for entry in &self.config.schedule {
            let next = schedule::next_occurrence(entry, Utc::now())?;
            if jobs.exists_scheduled(&entry.job, next).await? {
                continue;
            }
            let job = jobs
                .enqueue(&JobCreateDBRequest {
                    name: entry.job.clone(),
                    args: entry.args.clone(),
                    max_attempts: self.config.max_attempts,
                    scheduled_at: next,
                })
                .await?;
            tracing::info!(job_id = %job.id, "Scheduled recurring job {} for {}", entry.job, next);
        }

        Ok(())
    }

    /// Claim due jobs and run them, with retry bookkeeping.
    #[instrument(skip(self), err)]
    async fn process_due(&self) -> Result<()> {
        let claimed = {
            let mut conn = self.pool.acquire().await.map_err(crate::db::errors::DbError::from)?;
            Jobs::new(&mut conn).claim_due(self.config.claim_batch_size).await?
        };

        for job in claimed {
            let outcome = self.execute(&job).await;

            let mut conn = self.pool.acquire().await.map_err(crate::db::errors::DbError::from)?;
            let mut jobs = Jobs::new(&mut conn);
            match outcome {
                Ok(()) => {
                    tracing::info!(job_id = %job.id, "Job {} succeeded", job.name);
                    jobs.mark_succeeded(job.id).await?;
                }
                Err(e) => {
                    let retry_at = if job.attempts < job.max_attempts {
                        Some(Utc::now() + self.backoff(job.attempts))
                    } else {
                        None
                    };
                    tracing::warn!(
                        job_id = %job.id,
                        attempts = job.attempts,
                        retrying = retry_at.is_some(),
                        "Job {} failed: {e:#}",
                        job.name
                    );
                    jobs.mark_failed(job.id, &e.to_string(), retry_at).await?;
                }
            }
        }

        Ok(())
    }

    async fn execute(&self, job: &JobDBResponse) -> Result<()> {
        match job.name.as_str() {
            "notify_customers" => notify::notify_customers(&self.pool, &self.email, &job.args).await,
            other => Err(Error::BadRequest {
                message: format!("unknown job '{other}'"),
            }),
        }
    }

    /// Exponential backoff for the attempt that just failed.
    fn backoff(&self, attempts: i32) -> chrono::Duration {
        let exponent = attempts.saturating_sub(1).clamp(0, 16) as u32;
        let factor = self.config.retry_backoff_factor.max(1).saturating_pow(exponent);
        let delay = self.config.retry_backoff.saturating_mul(factor);
        chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 1_000))
    }
}

/// Compute the delay before the next retry, exposed for configuration docs.
pub fn retry_delay(base: Duration, factor: u32, attempts: i32) -> Duration {
    let exponent = attempts.saturating_sub(1).clamp(0, 16) as u32;
    base.saturating_mul(factor.max(1).saturating_pow(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, EmailConfig, EmailTransportConfig};
    use crate::db::models::jobs::JobStatus;

    fn test_worker(pool: PgPool, dir: &std::path::Path, config: JobsConfig) -> JobWorker {
        let email_config = Config {
            email: EmailConfig {
                transport: EmailTransportConfig::File {
                    path: dir.to_string_lossy().to_string(),
                },
                ..Default::default()
            },
            ..Default::default()
        };
        let email = Arc::new(EmailService::new(&email_config).unwrap());
        JobWorker::new(pool, config, email)
    }

    #[sqlx::test]
    async fn tick_runs_due_notify_job(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let config = JobsConfig {
            schedule: vec![],
            ..Default::default()
        };
        let worker = test_worker(pool.clone(), dir.path(), config);

        let user_id: uuid::Uuid =
            sqlx::query_scalar("INSERT INTO users (username, email, auth_source) VALUES ('ann', 'ann@example.com', 'native') RETURNING id")
                .fetch_one(&pool)
                .await
                .unwrap();
        sqlx::query("INSERT INTO customers (user_id) VALUES ($1)")
            .bind(user_id)
            .execute(&pool)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let job = Jobs::new(&mut conn)
            .enqueue(&JobCreateDBRequest {
                name: "notify_customers".to_string(),
                args: serde_json::json!({ "message": "Hello wednesday" }),
                max_attempts: 3,
                scheduled_at: Utc::now() - chrono::Duration::minutes(1),
            })
            .await
            .unwrap();
        drop(conn);

        worker.tick().await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let reloaded = Jobs::new(&mut conn).get_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, JobStatus::Succeeded);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[sqlx::test]
    async fn unknown_job_is_retried_then_failed(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let config = JobsConfig {
            schedule: vec![],
            retry_backoff: Duration::from_secs(0),
            max_attempts: 2,
            ..Default::default()
        };
        let worker = test_worker(pool.clone(), dir.path(), config);

        let mut conn = pool.acquire().await.unwrap();
        let job = Jobs::new(&mut conn)
            .enqueue(&JobCreateDBRequest {
                name: "does_not_exist".to_string(),
                args: serde_json::json!({}),
                max_attempts: 2,
                scheduled_at: Utc::now() - chrono::Duration::minutes(1),
            })
            .await
            .unwrap();
        drop(conn);

        // First attempt fails and requeues with zero backoff
        worker.tick().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let after_first = Jobs::new(&mut conn).get_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(after_first.status, JobStatus::Pending);
        assert_eq!(after_first.attempts, 1);
        drop(conn);

        // Second attempt exhausts max_attempts
        worker.tick().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let after_second = Jobs::new(&mut conn).get_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(after_second.status, JobStatus::Failed);
        assert!(after_second.last_error.is_some());
    }

    #[sqlx::test]
    async fn recurring_schedule_enqueues_once(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let config = JobsConfig::default(); // carries the Wednesday notify entry
        let worker = test_worker(pool.clone(), dir.path(), config);

        worker.tick().await.unwrap();
        worker.tick().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE name = 'notify_customers'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn retry_delay_grows_exponentially() {
        let base = Duration::from_secs(30);
        assert_eq!(retry_delay(base, 2, 1), Duration::from_secs(30));
        assert_eq!(retry_delay(base, 2, 2), Duration::from_secs(60));
        assert_eq!(retry_delay(base, 2, 3), Duration::from_secs(120));
    }
}
