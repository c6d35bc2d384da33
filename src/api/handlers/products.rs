//! Handlers for the product catalog, including nested review and image routes.
//!
//! Product reads are anonymous; product and image writes require the staff
//! role, while reviews can be posted by any authenticated user. Deleting a
//! product that appears on an order is rejected with 405.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        products::{
            ListProductsQuery, ProductCreate, ProductImageCreate, ProductImageResponse, ProductResponse, ProductUpdate,
        },
        reviews::{ListReviewsQuery, ReviewCreate, ReviewResponse},
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::handlers::{ProductFilter, Products, Repository, Reviews},
    errors::{Error, Result},
    types::ProductId,
};

fn product_not_found(id: ProductId) -> Error {
    Error::NotFound {
        resource: "Product".to_string(),
        id: id.to_string(),
    }
}

/// List products
#[utoipa::path(
    get,
    path = "/store/products",
    tag = "products",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Paginated products", body = PaginatedResponse<ProductResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<PaginatedResponse<ProductResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = ProductFilter::new(skip, limit);
    if let Some(collection_id) = query.collection_id {
        filter = filter.with_collection(collection_id);
    }
    if let Some(search) = query.search {
        filter = filter.with_search(search);
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Products::new(&mut pool_conn);

    let total_count = repo.count(&filter).await?;
    let products = repo.list(&filter).await?;
    let data = products.into_iter().map(ProductResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/store/products",
    tag = "products",
    request_body = ProductCreate,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Staff role required"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Products, operation::CreateAll>,
    Json(request): Json<ProductCreate>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let create_request = request.validate()?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Products::new(&mut tx);
    let product = repo.create(&create_request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

/// Get a product by id
#[utoipa::path(
    get,
    path = "/store/products/{id}",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product details", body = ProductResponse),
        (status = 404, description = "Product not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_product(State(state): State<AppState>, Path(id): Path<ProductId>) -> Result<Json<ProductResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Products::new(&mut pool_conn);

    let product = repo.get_by_id(id).await?.ok_or_else(|| product_not_found(id))?;

    Ok(Json(ProductResponse::from(product)))
}

/// Partially update a product
#[utoipa::path(
    patch,
    path = "/store/products/{id}",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = ProductUpdate,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Product not found"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_product(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Products, operation::UpdateAll>,
    Path(id): Path<ProductId>,
    Json(request): Json<ProductUpdate>,
) -> Result<Json<ProductResponse>> {
    let update_request = request.validate()?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Products::new(&mut pool_conn);
    let product = repo.update(id, &update_request).await?;

    Ok(Json(ProductResponse::from(product)))
}

/// Delete a product
///
/// Fails with 405 when the product appears in any order.
#[utoipa::path(
    delete,
    path = "/store/products/{id}",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found"),
        (status = 405, description = "Product is referenced by order items"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_product(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Products, operation::DeleteAll>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Products::new(&mut tx);

    let deleted = repo.delete(id).await?;
    if !deleted {
        return Err(product_not_found(id));
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// List reviews for a product
#[utoipa::path(
    get,
    path = "/store/products/{id}/reviews",
    tag = "reviews",
    params(("id" = i64, Path, description = "Product ID"), ListReviewsQuery),
    responses(
        (status = 200, description = "Paginated reviews", body = PaginatedResponse<ReviewResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Query(query): Query<ListReviewsQuery>,
) -> Result<Json<PaginatedResponse<ReviewResponse>>> {
    let (skip, limit) = query.pagination.params();

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Reviews::new(&mut pool_conn);

    let total_count = repo.count_for_product(id).await?;
    let reviews = repo.list_for_product(id, skip, limit).await?;
    let data = reviews.into_iter().map(ReviewResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Post a review on a product
#[utoipa::path(
    post,
    path = "/store/products/{id}/reviews",
    tag = "reviews",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = ReviewCreate,
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Product not found"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_review(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Reviews, operation::CreateOwn>,
    Path(id): Path<ProductId>,
    Json(request): Json<ReviewCreate>,
) -> Result<(StatusCode, Json<ReviewResponse>)> {
    let create_request = request.validate(id)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Reviews::new(&mut pool_conn);
    let review = repo.create(&create_request).await.map_err(|e| match e {
        crate::db::errors::DbError::NotFound => product_not_found(id),
        other => Error::Database(other),
    })?;

    Ok((StatusCode::CREATED, Json(ReviewResponse::from(review))))
}

/// List images attached to a product
#[utoipa::path(
    get,
    path = "/store/products/{id}/images",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Images for the product", body = Vec<ProductImageResponse>),
        (status = 404, description = "Product not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_product_images(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<ProductImageResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Products::new(&mut pool_conn);

    repo.get_by_id(id).await?.ok_or_else(|| product_not_found(id))?;
    let images = repo.list_images(id).await?;

    Ok(Json(images.into_iter().map(ProductImageResponse::from).collect()))
}

/// Attach an image to a product
#[utoipa::path(
    post,
    path = "/store/products/{id}/images",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = ProductImageCreate,
    responses(
        (status = 201, description = "Image attached", body = ProductImageResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Product not found"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_product_image(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Products, operation::UpdateAll>,
    Path(id): Path<ProductId>,
    Json(request): Json<ProductImageCreate>,
) -> Result<(StatusCode, Json<ProductImageResponse>)> {
    let image = request.validate()?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Products::new(&mut pool_conn);

    repo.get_by_id(id).await?.ok_or_else(|| product_not_found(id))?;
    let stored = repo.add_image(id, &image).await?;

    Ok((StatusCode::CREATED, Json(ProductImageResponse::from(stored))))
}
