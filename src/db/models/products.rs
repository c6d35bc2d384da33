//! Database models for products and product images.

use crate::types::{CollectionId, ProductId, ProductImageId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for creating a product, with any initial images
#[derive(Debug, Clone)]
pub struct ProductCreateDBRequest {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub inventory: i32,
    pub collection_id: CollectionId,
    pub images: Vec<String>,
}

/// Database request for a partial product update.
///
/// `description` is doubly optional: the outer `None` leaves the column
/// unchanged, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdateDBRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub unit_price: Option<Decimal>,
    pub inventory: Option<i32>,
    pub collection_id: Option<CollectionId>,
}

/// Database response for a product, with its images loaded
#[derive(Debug, Clone)]
pub struct ProductDBResponse {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub inventory: i32,
    pub collection_id: CollectionId,
    pub last_update: DateTime<Utc>,
    pub images: Vec<ProductImageDBResponse>,
}

/// Database response for a product image
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductImageDBResponse {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub image: String,
}
