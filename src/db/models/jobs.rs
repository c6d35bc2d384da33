//! Database models for background jobs.

use crate::types::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle state of a queued job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Database request for enqueueing a job
#[derive(Debug, Clone)]
pub struct JobCreateDBRequest {
    pub name: String,
    pub args: serde_json::Value,
    pub max_attempts: i32,
    pub scheduled_at: DateTime<Utc>,
}

/// Database response for a job
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobDBResponse {
    pub id: JobId,
    pub name: String,
    pub args: serde_json::Value,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub scheduled_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
