//! Database models for product reviews.

use crate::types::{ProductId, ReviewId};
use chrono::NaiveDate;

/// Database request for creating a review
#[derive(Debug, Clone)]
pub struct ReviewCreateDBRequest {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
}

/// Database response for a review
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewDBResponse {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
}
