//! Handlers for customer profiles.
//!
//! Staff manage the full customer directory; regular users read and update
//! their own profile through the `/store/customers/me` routes, which create
//! an empty profile on first access.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        customers::{CustomerCreate, CustomerResponse, CustomerUpdate, ListCustomersQuery},
        pagination::PaginatedResponse,
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::handlers::{CustomerFilter, Customers, Repository},
    errors::{Error, Result},
    types::CustomerId,
};

fn customer_not_found(id: CustomerId) -> Error {
    Error::NotFound {
        resource: "Customer".to_string(),
        id: id.to_string(),
    }
}

/// List customer profiles (staff only)
#[utoipa::path(
    get,
    path = "/store/customers",
    tag = "customers",
    params(ListCustomersQuery),
    responses(
        (status = 200, description = "Paginated customers", body = PaginatedResponse<CustomerResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Staff role required"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_customers(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Customers, operation::ReadAll>,
    Query(query): Query<ListCustomersQuery>,
) -> Result<Json<PaginatedResponse<CustomerResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = CustomerFilter::new(skip, limit);
    if let Some(membership) = query.membership {
        filter = filter.with_membership(membership);
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Customers::new(&mut pool_conn);

    let total_count = repo.count(&filter).await?;
    let customers = repo.list(&filter).await?;
    let data = customers.into_iter().map(CustomerResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Create a customer profile for a user (staff only)
#[utoipa::path(
    post,
    path = "/store/customers",
    tag = "customers",
    request_body = CustomerCreate,
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "User already has a customer profile"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_customer(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Customers, operation::CreateAll>,
    Json(request): Json<CustomerCreate>,
) -> Result<(StatusCode, Json<CustomerResponse>)> {
    let create_request = request.validate()?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Customers::new(&mut pool_conn);
    let customer = repo.create(&create_request).await?;

    Ok((StatusCode::CREATED, Json(CustomerResponse::from(customer))))
}

/// Get the calling user's own customer profile
///
/// Creates an empty profile on first access.
#[utoipa::path(
    get,
    path = "/store/customers/me",
    tag = "customers",
    responses(
        (status = 200, description = "Own customer profile", body = CustomerResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_own_customer(
    State(state): State<AppState>,
    perm: RequiresPermission<resource::Customers, operation::ReadOwn>,
) -> Result<Json<CustomerResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Customers::new(&mut tx);

    let customer = repo.get_or_create_for_user(perm.id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(CustomerResponse::from(customer)))
}

/// Update the calling user's own customer profile
///
/// Membership changes are ignored for non-staff callers.
#[utoipa::path(
    put,
    path = "/store/customers/me",
    tag = "customers",
    request_body = CustomerUpdate,
    responses(
        (status = 200, description = "Own profile updated", body = CustomerResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_own_customer(
    State(state): State<AppState>,
    perm: RequiresPermission<resource::Customers, operation::UpdateOwn>,
    Json(request): Json<CustomerUpdate>,
) -> Result<Json<CustomerResponse>> {
    let update_request = request.validate(perm.is_staff)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Customers::new(&mut tx);

    let customer = repo.get_or_create_for_user(perm.id).await?;
    let updated = repo.update(customer.id, &update_request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(CustomerResponse::from(updated)))
}

/// Get a customer profile by id (staff only)
#[utoipa::path(
    get,
    path = "/store/customers/{id}",
    tag = "customers",
    params(("id" = i64, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer details", body = CustomerResponse),
        (status = 404, description = "Customer not found"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_customer(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Customers, operation::ReadAll>,
    Path(id): Path<CustomerId>,
) -> Result<Json<CustomerResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Customers::new(&mut pool_conn);

    let customer = repo.get_by_id(id).await?.ok_or_else(|| customer_not_found(id))?;

    Ok(Json(CustomerResponse::from(customer)))
}

/// Partially update a customer profile (staff only)
#[utoipa::path(
    patch,
    path = "/store/customers/{id}",
    tag = "customers",
    params(("id" = i64, Path, description = "Customer ID")),
    request_body = CustomerUpdate,
    responses(
        (status = 200, description = "Customer updated", body = CustomerResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Customer not found"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_customer(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Customers, operation::UpdateAll>,
    Path(id): Path<CustomerId>,
    Json(request): Json<CustomerUpdate>,
) -> Result<Json<CustomerResponse>> {
    let update_request = request.validate(true)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Customers::new(&mut pool_conn);
    let customer = repo.update(id, &update_request).await?;

    Ok(Json(CustomerResponse::from(customer)))
}

/// Delete a customer profile (staff only)
///
/// Fails with 405 when the customer has placed orders.
#[utoipa::path(
    delete,
    path = "/store/customers/{id}",
    tag = "customers",
    params(("id" = i64, Path, description = "Customer ID")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 404, description = "Customer not found"),
        (status = 405, description = "Customer has placed orders"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_customer(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Customers, operation::DeleteAll>,
    Path(id): Path<CustomerId>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Customers::new(&mut tx);

    let deleted = repo.delete(id).await?;
    if !deleted {
        return Err(customer_not_found(id));
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{customers::CustomerResponse, pagination::PaginatedResponse},
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_me_creates_profile_on_first_access(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool).await;

        let (name, value) = add_auth_headers(&user);
        let response = app.get("/store/customers/me").add_header(name, value).await;

        response.assert_status_ok();
        let profile: CustomerResponse = response.json();
        assert_eq!(profile.user_id, user.id);
        assert!(profile.phone.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_me_update_cannot_change_membership(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool).await;

        let (name, value) = add_auth_headers(&user);
        let response = app
            .put("/store/customers/me")
            .add_header(name, value)
            .json(&json!({"phone": "+1-555-0000", "membership": "GOLD"}))
            .await;

        response.assert_status_ok();
        let profile: CustomerResponse = response.json();
        assert_eq!(profile.phone.as_deref(), Some("+1-555-0000"));
        // Tier stays at the default for self-service updates
        assert_eq!(serde_json::to_value(profile.membership).unwrap(), json!("BRONZE"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_directory_is_staff_only(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool).await;

        let response = app.get("/store/customers").await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let (name, value) = add_auth_headers(&user);
        let response = app.get("/store/customers").add_header(name, value).await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_staff_crud_on_customers(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let staff = create_test_admin_user(&pool).await;
        let user = create_test_user(&pool).await;

        let (name, value) = add_auth_headers(&staff);
        let response = app
            .post("/store/customers")
            .add_header(name.clone(), value.clone())
            .json(&json!({"user_id": user.id, "phone": "+1-555-0199"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let customer: CustomerResponse = response.json();

        let response = app
            .patch(&format!("/store/customers/{}", customer.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"membership": "SILVER"}))
            .await;
        response.assert_status_ok();
        let updated: CustomerResponse = response.json();
        assert_eq!(serde_json::to_value(updated.membership).unwrap(), json!("SILVER"));

        let response = app.get("/store/customers?membership=SILVER").add_header(name.clone(), value.clone()).await;
        response.assert_status_ok();
        let page: PaginatedResponse<CustomerResponse> = response.json();
        assert_eq!(page.total_count, 1);

        let response = app
            .delete(&format!("/store/customers/{}", customer.id))
            .add_header(name.clone(), value.clone())
            .await;
        response.assert_status(StatusCode::NO_CONTENT);

        let response = app
            .get(&format!("/store/customers/{}", customer.id))
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}
