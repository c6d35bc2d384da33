//! Handlers for the collection catalog endpoints.
//!
//! Reads are anonymous; writes require the staff role. Deleting a collection
//! that still contains products is rejected with 405 by the repository guard.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        collections::{CollectionCreate, CollectionResponse, CollectionUpdate, ListCollectionsQuery},
        pagination::PaginatedResponse,
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::handlers::{CollectionFilter, Collections, Repository},
    errors::{Error, Result},
    types::CollectionId,
};

/// List collections
#[utoipa::path(
    get,
    path = "/store/collections",
    tag = "collections",
    params(ListCollectionsQuery),
    responses(
        (status = 200, description = "Paginated collections", body = PaginatedResponse<CollectionResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_collections(
    State(state): State<AppState>,
    Query(query): Query<ListCollectionsQuery>,
) -> Result<Json<PaginatedResponse<CollectionResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = CollectionFilter::new(skip, limit);
    if let Some(search) = query.search {
        filter = filter.with_search(search);
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Collections::new(&mut pool_conn);

    let total_count = repo.count(&filter).await?;
    let collections = repo.list(&filter).await?;
    let data = collections.into_iter().map(CollectionResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Create a collection
#[utoipa::path(
    post,
    path = "/store/collections",
    tag = "collections",
    request_body = CollectionCreate,
    responses(
        (status = 201, description = "Collection created", body = CollectionResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Staff role required"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_collection(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Collections, operation::CreateAll>,
    Json(request): Json<CollectionCreate>,
) -> Result<(StatusCode, Json<CollectionResponse>)> {
    let create_request = request.validate()?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Collections::new(&mut pool_conn);
    let collection = repo.create(&create_request).await?;

    Ok((StatusCode::CREATED, Json(CollectionResponse::from(collection))))
}

/// Get a collection by id, including its product count
#[utoipa::path(
    get,
    path = "/store/collections/{id}",
    tag = "collections",
    params(("id" = i64, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Collection details", body = CollectionResponse),
        (status = 404, description = "Collection not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_collection(State(state): State<AppState>, Path(id): Path<CollectionId>) -> Result<Json<CollectionResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Collections::new(&mut pool_conn);

    let collection = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Collection".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(CollectionResponse::from(collection)))
}

/// Partially update a collection
#[utoipa::path(
    patch,
    path = "/store/collections/{id}",
    tag = "collections",
    params(("id" = i64, Path, description = "Collection ID")),
    request_body = CollectionUpdate,
    responses(
        (status = 200, description = "Collection updated", body = CollectionResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Collection not found"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_collection(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Collections, operation::UpdateAll>,
    Path(id): Path<CollectionId>,
    Json(request): Json<CollectionUpdate>,
) -> Result<Json<CollectionResponse>> {
    let update_request = request.validate()?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Collections::new(&mut pool_conn);
    let collection = repo.update(id, &update_request).await?;

    Ok(Json(CollectionResponse::from(collection)))
}

/// Delete a collection
///
/// Fails with 405 when products still reference the collection.
#[utoipa::path(
    delete,
    path = "/store/collections/{id}",
    tag = "collections",
    params(("id" = i64, Path, description = "Collection ID")),
    responses(
        (status = 204, description = "Collection deleted"),
        (status = 404, description = "Collection not found"),
        (status = 405, description = "Collection still contains products"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_collection(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Collections, operation::DeleteAll>,
    Path(id): Path<CollectionId>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Collections::new(&mut tx);

    let deleted = repo.delete(id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "Collection".to_string(),
            id: id.to_string(),
        });
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{collections::CollectionResponse, pagination::PaginatedResponse},
        db::{
            handlers::{Collections, Repository},
            models::{collections::CollectionCreateDBRequest, products::ProductCreateDBRequest},
        },
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    async fn create_collection(pool: &PgPool, title: &str) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Collections::new(&mut conn);
        repo.create(&CollectionCreateDBRequest {
            title: title.to_string(),
            featured_product_id: None,
        })
        .await
        .unwrap()
        .id
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_anonymous_create_is_unauthorized(pool: PgPool) {
        let app = create_test_app(pool).await;

        let response = app.post("/store/collections").json(&json!({"title": "Lamps"})).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_non_staff_create_is_forbidden(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool).await;

        let (name, value) = add_auth_headers(&user);
        let response = app.post("/store/collections").add_header(name, value).json(&json!({"title": "Lamps"})).await;

        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_with_empty_title_returns_field_errors(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let staff = create_test_admin_user(&pool).await;

        let (name, value) = add_auth_headers(&staff);
        let response = app.post("/store/collections").add_header(name, value).json(&json!({"title": ""})).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        let messages = body["title"].as_array().expect("per-field error list");
        assert!(!messages.is_empty());
        assert!(messages[0].as_str().unwrap().contains("blank"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_retrieve_with_products_count(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let staff = create_test_admin_user(&pool).await;

        let (name, value) = add_auth_headers(&staff);
        let response = app
            .post("/store/collections")
            .add_header(name, value)
            .json(&json!({"title": "Kitchen"}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let created: CollectionResponse = response.json();
        assert!(created.id > 0);
        assert_eq!(created.title, "Kitchen");
        assert_eq!(created.products_count, 0);

        // Attach a product and re-read
        let mut conn = pool.acquire().await.unwrap();
        let mut products = crate::db::handlers::Products::new(&mut conn);
        products
            .create(&ProductCreateDBRequest {
                title: "Pan".to_string(),
                slug: "pan".to_string(),
                description: None,
                unit_price: rust_decimal::Decimal::new(1999, 2),
                inventory: 5,
                collection_id: created.id,
                images: vec![],
            })
            .await
            .unwrap();
        drop(conn);

        let response = app.get(&format!("/store/collections/{}", created.id)).await;
        response.assert_status_ok();
        let fetched: CollectionResponse = response.json();
        assert_eq!(fetched.products_count, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_is_paginated(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        for i in 0..5 {
            create_collection(&pool, &format!("Collection {i}")).await;
        }

        let response = app.get("/store/collections?limit=3").await;
        response.assert_status_ok();
        let page: PaginatedResponse<CollectionResponse> = response.json();
        assert_eq!(page.data.len(), 3);
        assert_eq!(page.total_count, 5);

        let response = app.get("/store/collections?skip=4&limit=3").await;
        response.assert_status_ok();
        let page: PaginatedResponse<CollectionResponse> = response.json();
        assert_eq!(page.data.len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_collection(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let staff = create_test_admin_user(&pool).await;
        let id = create_collection(&pool, "Old title").await;

        let (name, value) = add_auth_headers(&staff);
        let response = app
            .patch(&format!("/store/collections/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "New title"}))
            .await;

        response.assert_status_ok();
        let updated: CollectionResponse = response.json();
        assert_eq!(updated.title, "New title");

        // Blank title on update is also rejected
        let response = app
            .patch(&format!("/store/collections/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "   "}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // Unknown id
        let response = app
            .patch("/store/collections/999999")
            .add_header(name, value)
            .json(&json!({"title": "Whatever"}))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_clears_featured_product_with_null(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let staff = create_test_admin_user(&pool).await;
        let id = create_collection(&pool, "Showcase").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut products = crate::db::handlers::Products::new(&mut conn);
        let product_id = products
            .create(&ProductCreateDBRequest {
                title: "Vase".to_string(),
                slug: "vase".to_string(),
                description: None,
                unit_price: rust_decimal::Decimal::new(1500, 2),
                inventory: 2,
                collection_id: id,
                images: vec![],
            })
            .await
            .unwrap()
            .id;
        drop(conn);

        let (name, value) = add_auth_headers(&staff);
        let response = app
            .patch(&format!("/store/collections/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"featured_product_id": product_id}))
            .await;
        response.assert_status_ok();
        let updated: CollectionResponse = response.json();
        assert_eq!(updated.featured_product_id, Some(product_id));

        // Omitting the field keeps the current value
        let response = app
            .patch(&format!("/store/collections/{id}"))
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "Showcase 2"}))
            .await;
        response.assert_status_ok();
        let updated: CollectionResponse = response.json();
        assert_eq!(updated.featured_product_id, Some(product_id));

        // Explicit null clears it
        let response = app
            .patch(&format!("/store/collections/{id}"))
            .add_header(name, value)
            .json(&json!({"featured_product_id": null}))
            .await;
        response.assert_status_ok();
        let updated: CollectionResponse = response.json();
        assert_eq!(updated.featured_product_id, None);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_empty_collection(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let staff = create_test_admin_user(&pool).await;
        let id = create_collection(&pool, "Disposable").await;

        let (name, value) = add_auth_headers(&staff);
        let response = app.delete(&format!("/store/collections/{id}")).add_header(name, value).await;

        response.assert_status(StatusCode::NO_CONTENT);
        let response = app.get(&format!("/store/collections/{id}")).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_collection_with_products_is_rejected(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let staff = create_test_admin_user(&pool).await;
        let id = create_collection(&pool, "Stocked").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut products = crate::db::handlers::Products::new(&mut conn);
        products
            .create(&ProductCreateDBRequest {
                title: "Kettle".to_string(),
                slug: "kettle".to_string(),
                description: None,
                unit_price: rust_decimal::Decimal::new(2500, 2),
                inventory: 3,
                collection_id: id,
                images: vec![],
            })
            .await
            .unwrap();
        drop(conn);

        let (name, value) = add_auth_headers(&staff);
        let response = app.delete(&format!("/store/collections/{id}")).add_header(name, value).await;

        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);

        // Collection survives the rejected delete
        let response = app.get(&format!("/store/collections/{id}")).await;
        response.assert_status_ok();
    }
}
