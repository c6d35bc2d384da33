//! Handlers for inspecting and enqueueing background jobs (staff only).

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        jobs::{JobCreate, JobResponse, ListJobsQuery},
        pagination::PaginatedResponse,
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::handlers::{JobFilter, Jobs},
    errors::{Error, Result},
    types::JobId,
};

/// List background jobs (staff only)
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    params(ListJobsQuery),
    responses(
        (status = 200, description = "Paginated jobs", body = PaginatedResponse<JobResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Staff role required"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_jobs(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Jobs, operation::ReadAll>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<PaginatedResponse<JobResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = JobFilter::new(skip, limit);
    if let Some(status) = query.status {
        filter = filter.with_status(status);
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Jobs::new(&mut pool_conn);

    let total_count = repo.count(&filter).await?;
    let jobs = repo.list(&filter).await?;
    let data = jobs.into_iter().map(JobResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Enqueue a background job (staff only)
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = JobCreate,
    responses(
        (status = 201, description = "Job enqueued", body = JobResponse),
        (status = 400, description = "Validation failed"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_job(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Jobs, operation::CreateAll>,
    Json(request): Json<JobCreate>,
) -> Result<(StatusCode, Json<JobResponse>)> {
    let (name, args, scheduled_at) = request.validate()?;

    let job = state.job_queue.enqueue(&name, args, scheduled_at).await?;

    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}

/// Get a background job by id (staff only)
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job details", body = JobResponse),
        (status = 404, description = "Job not found"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_job(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Jobs, operation::ReadAll>,
    Path(id): Path<JobId>,
) -> Result<Json<JobResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Jobs::new(&mut pool_conn);

    let job = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Job".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(JobResponse::from(job)))
}
