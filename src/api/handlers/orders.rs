//! Handlers for orders.
//!
//! Customers place orders against their own profile and see only their own
//! history; staff see everything and manage payment status. Unit prices are
//! captured at placement time by the repository.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        orders::{ListOrdersQuery, OrderCreate, OrderResponse, OrderUpdate},
        pagination::PaginatedResponse,
    },
    auth::permissions::{RequiresPermission, can_read_all_resources, operation, resource},
    db::{
        handlers::{Customers, OrderFilter, Orders, Repository},
        models::orders::{OrderCreateDBRequest, OrderUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{OrderId, Resource},
};

fn order_not_found(id: OrderId) -> Error {
    Error::NotFound {
        resource: "Order".to_string(),
        id: id.to_string(),
    }
}

/// List orders
///
/// Staff see every order; other users see only their own.
#[utoipa::path(
    get,
    path = "/store/orders",
    tag = "orders",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Paginated orders", body = PaginatedResponse<OrderResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_orders(
    State(state): State<AppState>,
    perm: RequiresPermission<resource::Orders, operation::ReadOwn>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<PaginatedResponse<OrderResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = OrderFilter::new(skip, limit);
    if let Some(payment_status) = query.payment_status {
        filter = filter.with_payment_status(payment_status);
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if !can_read_all_resources(&perm, Resource::Orders) {
        let mut customers = Customers::new(&mut pool_conn);
        match customers.get_by_user_id(perm.id).await? {
            Some(customer) => filter = filter.with_customer(customer.id),
            // No profile yet means no orders yet
            None => return Ok(Json(PaginatedResponse::new(vec![], 0, skip, limit))),
        }
    }

    let mut repo = Orders::new(&mut pool_conn);
    let total_count = repo.count(&filter).await?;
    let orders = repo.list(&filter).await?;
    let data = orders.into_iter().map(OrderResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Place an order for the calling user
///
/// Creates the customer profile on first use. Line items reference products
/// by id; the current product price is captured into each line.
#[utoipa::path(
    post,
    path = "/store/orders",
    tag = "orders",
    request_body = OrderCreate,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Validation failed or unknown product"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    perm: RequiresPermission<resource::Orders, operation::CreateOwn>,
    Json(request): Json<OrderCreate>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let items = request.validate()?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut customers = Customers::new(&mut tx);
    let customer = customers.get_or_create_for_user(perm.id).await?;

    let mut repo = Orders::new(&mut tx);
    let order = repo
        .create(&OrderCreateDBRequest {
            customer_id: customer.id,
            items,
        })
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// Get an order by id
///
/// Staff can read any order; other users only their own.
#[utoipa::path(
    get,
    path = "/store/orders/{id}",
    tag = "orders",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order details", body = OrderResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Order not found"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_order(
    State(state): State<AppState>,
    perm: RequiresPermission<resource::Orders, operation::ReadOwn>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Orders::new(&mut pool_conn);

    let order = repo.get_by_id(id).await?.ok_or_else(|| order_not_found(id))?;

    if !can_read_all_resources(&perm, Resource::Orders) {
        let mut customers = Customers::new(&mut pool_conn);
        let owns = customers
            .get_by_user_id(perm.id)
            .await?
            .is_some_and(|c| c.id == order.customer_id);
        // Hide other customers' orders rather than confirming they exist
        if !owns {
            return Err(order_not_found(id));
        }
    }

    Ok(Json(OrderResponse::from(order)))
}

/// Update an order's payment status (staff only)
#[utoipa::path(
    patch,
    path = "/store/orders/{id}",
    tag = "orders",
    params(("id" = i64, Path, description = "Order ID")),
    request_body = OrderUpdate,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Order not found"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_order(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Orders, operation::UpdateAll>,
    Path(id): Path<OrderId>,
    Json(request): Json<OrderUpdate>,
) -> Result<Json<OrderResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Orders::new(&mut pool_conn);

    let order = repo
        .update(
            id,
            &OrderUpdateDBRequest {
                payment_status: request.payment_status,
            },
        )
        .await?;

    Ok(Json(OrderResponse::from(order)))
}

/// Delete an order (staff only)
#[utoipa::path(
    delete,
    path = "/store/orders/{id}",
    tag = "orders",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Order not found"),
    ),
    security(("session_cookie" = []), ("proxy_header" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_order(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Orders, operation::DeleteAll>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Orders::new(&mut tx);

    let deleted = repo.delete(id).await?;
    if !deleted {
        return Err(order_not_found(id));
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{orders::OrderResponse, pagination::PaginatedResponse},
        db::{
            handlers::{Collections, Products, Repository},
            models::{collections::CollectionCreateDBRequest, products::ProductCreateDBRequest},
        },
        test_utils::*,
    };
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::json;
    use sqlx::PgPool;

    async fn create_product(pool: &PgPool, title: &str, price: Decimal) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        let mut collections = Collections::new(&mut conn);
        let collection = collections
            .create(&CollectionCreateDBRequest {
                title: format!("Collection for {title}"),
                featured_product_id: None,
            })
            .await
            .unwrap();

        let mut products = Products::new(&mut conn);
        products
            .create(&ProductCreateDBRequest {
                title: title.to_string(),
                slug: title.to_lowercase().replace(' ', "-"),
                description: None,
                unit_price: price,
                inventory: 100,
                collection_id: collection.id,
                images: vec![],
            })
            .await
            .unwrap()
            .id
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_place_order_captures_prices(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool).await;
        let product_id = create_product(&pool, "Notebook", Decimal::new(1250, 2)).await;

        let (name, value) = add_auth_headers(&user);
        let response = app
            .post("/store/orders")
            .add_header(name, value)
            .json(&json!({"items": [{"product_id": product_id, "quantity": 3}]}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let order: OrderResponse = response.json();
        assert!(order.id > 0);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 3);
        assert_eq!(order.items[0].unit_price, Decimal::new(1250, 2));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_order_requires_authentication(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let product_id = create_product(&pool, "Pencil", Decimal::new(199, 2)).await;

        let response = app
            .post("/store/orders")
            .json(&json!({"items": [{"product_id": product_id, "quantity": 1}]}))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_empty_order_is_rejected(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool).await;

        let (name, value) = add_auth_headers(&user);
        let response = app
            .post("/store/orders")
            .add_header(name, value)
            .json(&json!({"items": []}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert!(body["items"].is_array());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_customers_see_only_their_own_orders(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let alice = create_test_user(&pool).await;
        let bob = create_test_user(&pool).await;
        let staff = create_test_admin_user(&pool).await;
        let product_id = create_product(&pool, "Mug", Decimal::new(850, 2)).await;

        let (name, value) = add_auth_headers(&alice);
        let response = app
            .post("/store/orders")
            .add_header(name.clone(), value.clone())
            .json(&json!({"items": [{"product_id": product_id, "quantity": 2}]}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let alice_order: OrderResponse = response.json();

        // Alice sees her order
        let response = app.get("/store/orders").add_header(name.clone(), value.clone()).await;
        response.assert_status_ok();
        let page: PaginatedResponse<OrderResponse> = response.json();
        assert_eq!(page.total_count, 1);

        // Bob sees nothing, and cannot fetch Alice's order by id
        let (bob_name, bob_value) = add_auth_headers(&bob);
        let response = app.get("/store/orders").add_header(bob_name.clone(), bob_value.clone()).await;
        response.assert_status_ok();
        let page: PaginatedResponse<OrderResponse> = response.json();
        assert_eq!(page.total_count, 0);

        let response = app
            .get(&format!("/store/orders/{}", alice_order.id))
            .add_header(bob_name, bob_value)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        // Staff see everything
        let (staff_name, staff_value) = add_auth_headers(&staff);
        let response = app.get("/store/orders").add_header(staff_name.clone(), staff_value.clone()).await;
        response.assert_status_ok();
        let page: PaginatedResponse<OrderResponse> = response.json();
        assert_eq!(page.total_count, 1);

        let response = app
            .get(&format!("/store/orders/{}", alice_order.id))
            .add_header(staff_name, staff_value)
            .await;
        response.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_staff_update_payment_status(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool).await;
        let staff = create_test_admin_user(&pool).await;
        let product_id = create_product(&pool, "Poster", Decimal::new(500, 2)).await;

        let (name, value) = add_auth_headers(&user);
        let response = app
            .post("/store/orders")
            .add_header(name.clone(), value.clone())
            .json(&json!({"items": [{"product_id": product_id, "quantity": 1}]}))
            .await;
        let order: OrderResponse = response.json();

        // The customer cannot change payment status
        let response = app
            .patch(&format!("/store/orders/{}", order.id))
            .add_header(name, value)
            .json(&json!({"payment_status": "COMPLETE"}))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let (staff_name, staff_value) = add_auth_headers(&staff);
        let response = app
            .patch(&format!("/store/orders/{}", order.id))
            .add_header(staff_name, staff_value)
            .json(&json!({"payment_status": "COMPLETE"}))
            .await;
        response.assert_status_ok();
        let updated: OrderResponse = response.json();
        assert_eq!(serde_json::to_value(updated.payment_status).unwrap(), json!("COMPLETE"));
    }
}
