//! API request/response models for product reviews.

use super::pagination::Pagination;
use crate::db::models::reviews::{ReviewCreateDBRequest, ReviewDBResponse};
use crate::errors::{Error, FieldErrors, Result};
use crate::types::{ProductId, ReviewId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for listing reviews of a product
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListReviewsQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

/// Request body for posting a review on a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReviewCreate {
    /// Display name of the reviewer
    #[schema(example = "Alice")]
    pub name: Option<String>,
    /// Review text
    pub description: Option<String>,
}

impl ReviewCreate {
    /// Validate the payload and convert it into a database request for `product_id`.
    pub fn validate(self, product_id: ProductId) -> Result<ReviewCreateDBRequest> {
        let mut errors = FieldErrors::new();

        let name = require_non_blank("name", self.name, &mut errors);
        let description = require_non_blank("description", self.description, &mut errors);

        if !errors.is_empty() {
            return Err(Error::Validation { errors });
        }

        Ok(ReviewCreateDBRequest {
            product_id,
            name: name.unwrap_or_default(),
            description: description.unwrap_or_default(),
        })
    }
}

fn require_non_blank(field: &str, value: Option<String>, errors: &mut FieldErrors) -> Option<String> {
    match value {
        None => {
            errors.insert(field.to_string(), vec!["This field is required.".to_string()]);
            None
        }
        Some(v) if v.trim().is_empty() => {
            errors.insert(field.to_string(), vec!["This field may not be blank.".to_string()]);
            None
        }
        Some(v) => Some(v.trim().to_string()),
    }
}

/// A stored review returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
}

impl From<ReviewDBResponse> for ReviewResponse {
    fn from(db: ReviewDBResponse) -> Self {
        Self {
            id: db.id,
            product_id: db.product_id,
            name: db.name,
            description: db.description,
            date: db.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_requires_name_and_description() {
        let err = ReviewCreate::default().validate(1).unwrap_err();
        match err {
            Error::Validation { errors } => {
                assert!(errors.contains_key("name"));
                assert!(errors.contains_key("description"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_review_carries_product_id() {
        let req = ReviewCreate {
            name: Some("Alice".to_string()),
            description: Some("Great chair".to_string()),
        }
        .validate(42)
        .unwrap();
        assert_eq!(req.product_id, 42);
        assert_eq!(req.name, "Alice");
    }
}
