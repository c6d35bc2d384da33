//! Database repository for orders.

use std::collections::HashMap;

use crate::api::models::orders::PaymentStatus;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::orders::{OrderCreateDBRequest, OrderDBResponse, OrderItemDBResponse, OrderUpdateDBRequest},
};
use crate::types::{CustomerId, OrderId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

/// Filter for listing orders
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub skip: i64,
    pub limit: i64,
    pub customer_id: Option<CustomerId>,
    pub payment_status: Option<PaymentStatus>,
}

impl OrderFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = Some(payment_status);
        self
    }
}

// Database entity model, without the items relation
#[derive(Debug, Clone, FromRow)]
struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub placed_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
}

impl Order {
    fn with_items(self, items: Vec<OrderItemDBResponse>) -> OrderDBResponse {
        OrderDBResponse {
            id: self.id,
            customer_id: self.customer_id,
            placed_at: self.placed_at,
            payment_status: self.payment_status,
            items,
        }
    }
}

pub struct Orders<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Orders<'c> {
    type CreateRequest = OrderCreateDBRequest;
    type UpdateRequest = OrderUpdateDBRequest;
    type Response = OrderDBResponse;
    type Id = OrderId;
    type Filter = OrderFilter;

    /// Place an order. Unit prices are captured from the product rows at
    /// insert time, so later price changes never rewrite order history.
    #[instrument(skip(self, request), fields(customer_id = request.customer_id, items = request.items.len()), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let order = sqlx::query_as::<_, Order>("INSERT INTO orders (customer_id) VALUES ($1) RETURNING *")
            .bind(request.customer_id)
            .fetch_one(&mut *self.db)
            .await?;

        let mut items = Vec::with_capacity(request.items.len());
        for spec in &request.items {
            let unit_price = sqlx::query_scalar::<_, Decimal>("SELECT unit_price FROM products WHERE id = $1")
                .bind(spec.product_id)
                .fetch_optional(&mut *self.db)
                .await?
                .ok_or_else(|| DbError::ForeignKeyViolation {
                    constraint: Some("order_items_product_id_fkey".to_string()),
                    table: Some("order_items".to_string()),
                    message: format!("product {} does not exist", spec.product_id),
                })?;

            let item = sqlx::query_as::<_, OrderItemDBResponse>(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(order.id)
            .bind(spec.product_id)
            .bind(spec.quantity)
            .bind(unit_price)
            .fetch_one(&mut *self.db)
            .await?;
            items.push(item);
        }

        Ok(order.with_items(items))
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        match order {
            Some(order) => {
                let items = self.list_items(order.id).await?;
                Ok(Some(order.with_items(items)))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // Order items cascade with the order
        let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                payment_status = COALESCE($2, payment_status)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.payment_status)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        let items = self.list_items(order.id).await?;
        Ok(order.with_items(items))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        use sqlx::QueryBuilder;

        let mut query = QueryBuilder::new("SELECT * FROM orders WHERE 1=1");
        push_filters(&mut query, filter);
        query.push(" ORDER BY placed_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let orders = query.build_query_as::<Order>().fetch_all(&mut *self.db).await?;

        // Load all items for the page in one query
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let items = sqlx::query_as::<_, OrderItemDBResponse>("SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY id")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItemDBResponse>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|o| {
                let items = by_order.remove(&o.id).unwrap_or_default();
                o.with_items(items)
            })
            .collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        use sqlx::QueryBuilder;

        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE 1=1");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

fn push_filters(query: &mut sqlx::QueryBuilder<'_, sqlx::Postgres>, filter: &OrderFilter) {
    if let Some(customer_id) = filter.customer_id {
        query.push(" AND customer_id = ");
        query.push_bind(customer_id);
    }
    if let Some(payment_status) = filter.payment_status {
        query.push(" AND payment_status = ");
        query.push_bind(payment_status);
    }
}

impl<'c> Orders<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    async fn list_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemDBResponse>> {
        let items = sqlx::query_as::<_, OrderItemDBResponse>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
            .bind(order_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::orders::OrderItemSpec;
    use crate::types::ProductId;

    async fn seed_customer_and_product(conn: &mut PgConnection) -> (CustomerId, ProductId) {
        let user_id: uuid::Uuid =
            sqlx::query_scalar("INSERT INTO users (username, email, auth_source) VALUES ('buyer', 'buyer@example.com', 'native') RETURNING id")
                .fetch_one(&mut *conn)
                .await
                .unwrap();
        let customer_id: i64 = sqlx::query_scalar("INSERT INTO customers (user_id) VALUES ($1) RETURNING id")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        let collection_id: i64 = sqlx::query_scalar("INSERT INTO collections (title) VALUES ('Grocery') RETURNING id")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        let product_id: i64 = sqlx::query_scalar(
            "INSERT INTO products (title, slug, unit_price, inventory, collection_id) VALUES ('Bread', 'bread', 4.50, 10, $1) RETURNING id",
        )
        .bind(collection_id)
        .fetch_one(&mut *conn)
        .await
        .unwrap();
        (customer_id, product_id)
    }

    #[sqlx::test]
    async fn create_captures_unit_price(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let (customer_id, product_id) = seed_customer_and_product(&mut conn).await;

        let mut repo = Orders::new(&mut conn);
        let order = repo
            .create(&OrderCreateDBRequest {
                customer_id,
                items: vec![OrderItemSpec { product_id, quantity: 2 }],
            })
            .await
            .unwrap();

        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[0].unit_price, Decimal::new(450, 2));
    }

    #[sqlx::test]
    async fn create_with_unknown_product_fails(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let (customer_id, _) = seed_customer_and_product(&mut conn).await;

        let mut repo = Orders::new(&mut conn);
        let err = repo
            .create(&OrderCreateDBRequest {
                customer_id,
                items: vec![OrderItemSpec {
                    product_id: 9999,
                    quantity: 1,
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[sqlx::test]
    async fn update_sets_payment_status(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let (customer_id, product_id) = seed_customer_and_product(&mut conn).await;
        let mut repo = Orders::new(&mut conn);
        let order = repo
            .create(&OrderCreateDBRequest {
                customer_id,
                items: vec![OrderItemSpec { product_id, quantity: 1 }],
            })
            .await
            .unwrap();

        let updated = repo
            .update(
                order.id,
                &OrderUpdateDBRequest {
                    payment_status: Some(PaymentStatus::Complete),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::Complete);
        assert_eq!(updated.items.len(), 1);
    }

    #[sqlx::test]
    async fn list_scopes_to_customer(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let (customer_id, product_id) = seed_customer_and_product(&mut conn).await;
        let mut repo = Orders::new(&mut conn);
        repo.create(&OrderCreateDBRequest {
            customer_id,
            items: vec![OrderItemSpec { product_id, quantity: 1 }],
        })
        .await
        .unwrap();

        let scoped = OrderFilter::new(0, 10).with_customer(customer_id);
        assert_eq!(repo.list(&scoped).await.unwrap().len(), 1);
        assert_eq!(repo.count(&scoped).await.unwrap(), 1);

        let other = OrderFilter::new(0, 10).with_customer(customer_id + 1);
        assert!(repo.list(&other).await.unwrap().is_empty());
    }
}
