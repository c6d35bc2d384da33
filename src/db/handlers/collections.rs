//! Database repository for collections.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::collections::{CollectionCreateDBRequest, CollectionDBResponse, CollectionUpdateDBRequest},
};
use crate::types::{CollectionId, Operation};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing collections
#[derive(Debug, Clone)]
pub struct CollectionFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>, // Case-insensitive substring search on title
}

impl CollectionFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit, search: None }
    }

    pub fn with_search(mut self, search: String) -> Self {
        self.search = Some(search);
        self
    }
}

pub struct Collections<'c> {
    db: &'c mut PgConnection,
}

const SELECT_WITH_COUNT: &str = r#"
    SELECT c.id, c.title, c.featured_product_id,
           (SELECT COUNT(*) FROM products p WHERE p.collection_id = c.id) AS products_count
    FROM collections c
"#;

#[async_trait::async_trait]
impl<'c> Repository for Collections<'c> {
    type CreateRequest = CollectionCreateDBRequest;
    type UpdateRequest = CollectionUpdateDBRequest;
    type Response = CollectionDBResponse;
    type Id = CollectionId;
    type Filter = CollectionFilter;

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        // A new collection cannot have products yet, so products_count is constant 0
        let collection = sqlx::query_as::<_, CollectionDBResponse>(
            r#"
            INSERT INTO collections (title, featured_product_id)
            VALUES ($1, $2)
            RETURNING id, title, featured_product_id, 0::bigint AS products_count
            "#,
        )
        .bind(&request.title)
        .bind(request.featured_product_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(collection)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let collection = sqlx::query_as::<_, CollectionDBResponse>(&format!("{SELECT_WITH_COUNT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(collection)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // Referential guard: a collection with products cannot be deleted.
        // The count and the delete run on the same connection, inside the
        // caller's transaction.
        let products_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE collection_id = $1")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;

        if products_count > 0 {
            return Err(DbError::ProtectedEntity {
                operation: Operation::DeleteAll,
                reason: format!("{products_count} product(s) still belong to it"),
                entity_type: "Collection".to_string(),
                entity_id: Some(id.to_string()),
            });
        }

        let result = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let collection = sqlx::query_as::<_, CollectionDBResponse>(
            r#"
            WITH updated AS (
                UPDATE collections SET
                    title = COALESCE($2, title),
                    featured_product_id = CASE WHEN $3 THEN $4 ELSE featured_product_id END
                WHERE id = $1
                RETURNING id, title, featured_product_id
            )
            SELECT u.id, u.title, u.featured_product_id,
                   (SELECT COUNT(*) FROM products p WHERE p.collection_id = u.id) AS products_count
            FROM updated u
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(request.featured_product_id.is_some())
        .bind(request.featured_product_id.flatten())
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(collection)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        use sqlx::QueryBuilder;

        let mut query = QueryBuilder::new(SELECT_WITH_COUNT);
        query.push(" WHERE 1=1");

        if let Some(ref search) = filter.search {
            let search_pattern = format!("%{}%", search.to_lowercase());
            query.push(" AND LOWER(c.title) LIKE ");
            query.push_bind(search_pattern);
        }

        query.push(" ORDER BY c.title LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let collections = query.build_query_as::<CollectionDBResponse>().fetch_all(&mut *self.db).await?;

        Ok(collections)
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        use sqlx::QueryBuilder;

        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM collections c WHERE 1=1");
        if let Some(ref search) = filter.search {
            let search_pattern = format!("%{}%", search.to_lowercase());
            query.push(" AND LOWER(c.title) LIKE ");
            query.push_bind(search_pattern);
        }

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

impl<'c> Collections<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}
