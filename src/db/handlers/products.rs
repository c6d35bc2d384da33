//! Database repository for products and their images.

use std::collections::HashMap;

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::products::{ProductCreateDBRequest, ProductDBResponse, ProductImageDBResponse, ProductUpdateDBRequest},
};
use crate::types::{CollectionId, Operation, ProductId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

/// Filter for listing products
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub skip: i64,
    pub limit: i64,
    pub collection_id: Option<CollectionId>,
    pub search: Option<String>, // Case-insensitive substring search on title and description
}

impl ProductFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_collection(mut self, collection_id: CollectionId) -> Self {
        self.collection_id = Some(collection_id);
        self
    }

    pub fn with_search(mut self, search: String) -> Self {
        self.search = Some(search);
        self
    }
}

// Database entity model, without the images relation
#[derive(Debug, Clone, FromRow)]
struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub inventory: i32,
    pub collection_id: CollectionId,
    pub last_update: DateTime<Utc>,
}

impl Product {
    fn with_images(self, images: Vec<ProductImageDBResponse>) -> ProductDBResponse {
        ProductDBResponse {
            id: self.id,
            title: self.title,
            slug: self.slug,
            description: self.description,
            unit_price: self.unit_price,
            inventory: self.inventory,
            collection_id: self.collection_id,
            last_update: self.last_update,
            images,
        }
    }
}

pub struct Products<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Products<'c> {
    type CreateRequest = ProductCreateDBRequest;
    type UpdateRequest = ProductUpdateDBRequest;
    type Response = ProductDBResponse;
    type Id = ProductId;
    type Filter = ProductFilter;

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (title, slug, description, unit_price, inventory, collection_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&request.title)
        .bind(&request.slug)
        .bind(&request.description)
        .bind(request.unit_price)
        .bind(request.inventory)
        .bind(request.collection_id)
        .fetch_one(&mut *self.db)
        .await?;

        let mut images = Vec::with_capacity(request.images.len());
        for image in &request.images {
            let stored = sqlx::query_as::<_, ProductImageDBResponse>(
                "INSERT INTO product_images (product_id, image) VALUES ($1, $2) RETURNING *",
            )
            .bind(product.id)
            .bind(image)
            .fetch_one(&mut *self.db)
            .await?;
            images.push(stored);
        }

        Ok(product.with_images(images))
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        match product {
            Some(product) => {
                let images = self.list_images(product.id).await?;
                Ok(Some(product.with_images(images)))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // Referential guard: a product referenced by order items cannot be
        // deleted. Runs on the same connection as the delete itself.
        let order_items = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM order_items WHERE product_id = $1")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;

        if order_items > 0 {
            return Err(DbError::ProtectedEntity {
                operation: Operation::DeleteAll,
                reason: format!("{order_items} order item(s) still reference it"),
                entity_type: "Product".to_string(),
                entity_id: Some(id.to_string()),
            });
        }

        let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                description = CASE WHEN $4 THEN $5 ELSE description END,
                unit_price = COALESCE($6, unit_price),
                inventory = COALESCE($7, inventory),
                collection_id = COALESCE($8, collection_id),
                last_update = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.slug)
        .bind(request.description.is_some())
        .bind(request.description.clone().flatten())
        .bind(request.unit_price)
        .bind(request.inventory)
        .bind(request.collection_id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        let images = self.list_images(product.id).await?;
        Ok(product.with_images(images))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        use sqlx::QueryBuilder;

        let mut query = QueryBuilder::new("SELECT * FROM products WHERE 1=1");
        push_filters(&mut query, filter);
        query.push(" ORDER BY title LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let products = query.build_query_as::<Product>().fetch_all(&mut *self.db).await?;

        // Load all images for the page in one query
        let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();
        let images = sqlx::query_as::<_, ProductImageDBResponse>(
            "SELECT * FROM product_images WHERE product_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&mut *self.db)
        .await?;

        let mut by_product: HashMap<ProductId, Vec<ProductImageDBResponse>> = HashMap::new();
        for image in images {
            by_product.entry(image.product_id).or_default().push(image);
        }

        Ok(products
            .into_iter()
            .map(|p| {
                let images = by_product.remove(&p.id).unwrap_or_default();
                p.with_images(images)
            })
            .collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        use sqlx::QueryBuilder;

        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM products WHERE 1=1");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

fn push_filters(query: &mut sqlx::QueryBuilder<'_, sqlx::Postgres>, filter: &ProductFilter) {
    if let Some(collection_id) = filter.collection_id {
        query.push(" AND collection_id = ");
        query.push_bind(collection_id);
    }
    if let Some(ref search) = filter.search {
        let search_pattern = format!("%{}%", search.to_lowercase());
        query.push(" AND (LOWER(title) LIKE ");
        query.push_bind(search_pattern.clone());
        query.push(" OR LOWER(COALESCE(description, '')) LIKE ");
        query.push_bind(search_pattern);
        query.push(")");
    }
}

impl<'c> Products<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Attach an image to an existing product.
    #[instrument(skip(self, image), err)]
    pub async fn add_image(&mut self, product_id: ProductId, image: &str) -> Result<ProductImageDBResponse> {
        let stored = sqlx::query_as::<_, ProductImageDBResponse>(
            "INSERT INTO product_images (product_id, image) VALUES ($1, $2) RETURNING *",
        )
        .bind(product_id)
        .bind(image)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(stored)
    }

    /// List the images attached to a product.
    #[instrument(skip(self), err)]
    pub async fn list_images(&mut self, product_id: ProductId) -> Result<Vec<ProductImageDBResponse>> {
        let images = sqlx::query_as::<_, ProductImageDBResponse>(
            "SELECT * FROM product_images WHERE product_id = $1 ORDER BY id",
        )
        .bind(product_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(images)
    }
}
