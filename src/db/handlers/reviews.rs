//! Database repository for product reviews.

use crate::db::{
    errors::{DbError, Result},
    models::reviews::{ReviewCreateDBRequest, ReviewDBResponse},
};
use crate::types::{ProductId, ReviewId};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Reviews<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Reviews<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Store a review. Fails with [`DbError::NotFound`] when the product does
    /// not exist, so handlers can render a 404 for the nested route.
    #[instrument(skip(self, request), fields(product_id = request.product_id), err)]
    pub async fn create(&mut self, request: &ReviewCreateDBRequest) -> Result<ReviewDBResponse> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(request.product_id)
            .fetch_one(&mut *self.db)
            .await?;
        if !exists {
            return Err(DbError::NotFound);
        }

        let review = sqlx::query_as::<_, ReviewDBResponse>(
            r#"
            INSERT INTO reviews (product_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(request.product_id)
        .bind(&request.name)
        .bind(&request.description)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(review)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: ReviewId) -> Result<Option<ReviewDBResponse>> {
        let review = sqlx::query_as::<_, ReviewDBResponse>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(review)
    }

    #[instrument(skip(self), err)]
    pub async fn list_for_product(&mut self, product_id: ProductId, skip: i64, limit: i64) -> Result<Vec<ReviewDBResponse>> {
        let reviews = sqlx::query_as::<_, ReviewDBResponse>(
            "SELECT * FROM reviews WHERE product_id = $1 ORDER BY date DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(product_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(reviews)
    }

    #[instrument(skip(self), err)]
    pub async fn count_for_product(&mut self, product_id: ProductId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_product(conn: &mut PgConnection) -> ProductId {
        let collection_id: i64 = sqlx::query_scalar("INSERT INTO collections (title) VALUES ('Stationary') RETURNING id")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        sqlx::query_scalar(
            "INSERT INTO products (title, slug, unit_price, inventory, collection_id) VALUES ('Pen', 'pen', 2, 50, $1) RETURNING id",
        )
        .bind(collection_id)
        .fetch_one(conn)
        .await
        .unwrap()
    }

    #[sqlx::test]
    async fn reviews_require_an_existing_product(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reviews::new(&mut conn);

        let err = repo
            .create(&ReviewCreateDBRequest {
                product_id: 12345,
                name: "Alice".to_string(),
                description: "Nice".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[sqlx::test]
    async fn create_and_list_for_product(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let product_id = seed_product(&mut conn).await;
        let mut repo = Reviews::new(&mut conn);

        for name in ["Alice", "Bob"] {
            repo.create(&ReviewCreateDBRequest {
                product_id,
                name: name.to_string(),
                description: "Writes well".to_string(),
            })
            .await
            .unwrap();
        }

        let reviews = repo.list_for_product(product_id, 0, 10).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(repo.count_for_product(product_id).await.unwrap(), 2);
    }
}
