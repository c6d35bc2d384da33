//! Database models for collections.

use crate::types::{CollectionId, ProductId};

/// Database request for creating a collection
#[derive(Debug, Clone)]
pub struct CollectionCreateDBRequest {
    pub title: String,
    pub featured_product_id: Option<ProductId>,
}

/// Database request for a partial collection update.
///
/// `featured_product_id` is doubly optional: the outer `None` leaves the
/// column unchanged, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct CollectionUpdateDBRequest {
    pub title: Option<String>,
    pub featured_product_id: Option<Option<ProductId>>,
}

/// Database response for a collection, with its product count
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionDBResponse {
    pub id: CollectionId,
    pub title: String,
    pub featured_product_id: Option<ProductId>,
    pub products_count: i64,
}
