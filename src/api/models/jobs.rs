//! API request/response models for background jobs.

use super::pagination::Pagination;
use crate::db::models::jobs::{JobDBResponse, JobStatus};
use crate::errors::{Error, Result};
use crate::types::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for listing jobs
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListJobsQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Filter by job status
    pub status: Option<JobStatus>,
}

/// Request body for enqueueing a job by hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct JobCreate {
    /// Registered job name, e.g. "notify_customers"
    pub name: Option<String>,
    /// Arguments passed to the job
    #[serde(default)]
    pub args: serde_json::Value,
    /// When the job becomes due (null for immediately)
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl JobCreate {
    pub fn validate(self) -> Result<(String, serde_json::Value, Option<DateTime<Utc>>)> {
        match self.name {
            Some(name) if !name.trim().is_empty() => Ok((name.trim().to_string(), self.args, self.scheduled_at)),
            Some(_) => Err(Error::field("name", "This field may not be blank.")),
            None => Err(Error::field("name", "This field is required.")),
        }
    }
}

/// Full job details returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobResponse {
    #[schema(value_type = String, format = "uuid")]
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

impl From<JobDBResponse> for JobResponse {
    fn from(db: JobDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            args: db.args,
            status: db.status,
            attempts: db.attempts,
            max_attempts: db.max_attempts,
            scheduled_at: db.scheduled_at,
            last_error: db.last_error,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
