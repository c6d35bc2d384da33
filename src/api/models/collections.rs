//! API request/response models for collections.

use super::pagination::Pagination;
use crate::db::models::collections::{CollectionCreateDBRequest, CollectionDBResponse, CollectionUpdateDBRequest};
use crate::errors::{Error, FieldErrors, Result};
use crate::types::{CollectionId, ProductId};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const MAX_TITLE_LENGTH: usize = 255;

/// Query parameters for listing collections
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListCollectionsQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Search query to filter collections by title (case-insensitive substring match)
    pub search: Option<String>,
}

/// Request body for creating a new collection.
///
/// Fields are optional at the serde level so that missing values produce
/// per-field validation errors rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CollectionCreate {
    /// Display title for the collection
    #[schema(example = "Summer essentials")]
    pub title: Option<String>,
    /// Product highlighted on the collection page (null for none)
    pub featured_product_id: Option<ProductId>,
}

impl CollectionCreate {
    /// Validate the payload and convert it into a database request.
    pub fn validate(self) -> Result<CollectionCreateDBRequest> {
        let mut errors = FieldErrors::new();

        let title = match self.title {
            None => {
                errors.insert("title".to_string(), vec!["This field is required.".to_string()]);
                None
            }
            Some(t) => validate_title(t, &mut errors),
        };

        if !errors.is_empty() {
            return Err(Error::Validation { errors });
        }

        Ok(CollectionCreateDBRequest {
            // Validation above guarantees presence
            title: title.unwrap_or_default(),
            featured_product_id: self.featured_product_id,
        })
    }
}

/// Request body for updating an existing collection. All fields are optional;
/// only provided fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CollectionUpdate {
    /// New display title (omit to keep unchanged)
    pub title: Option<String>,
    /// New featured product (omit to keep unchanged, null to clear)
    #[serde(default, with = "serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i64>)]
    pub featured_product_id: Option<Option<ProductId>>,
}

impl CollectionUpdate {
    /// Validate the payload and convert it into a database request.
    pub fn validate(self) -> Result<CollectionUpdateDBRequest> {
        let mut errors = FieldErrors::new();

        let title = match self.title {
            None => None,
            Some(t) => validate_title(t, &mut errors),
        };

        if !errors.is_empty() {
            return Err(Error::Validation { errors });
        }

        Ok(CollectionUpdateDBRequest {
            title,
            featured_product_id: self.featured_product_id,
        })
    }
}

fn validate_title(title: String, errors: &mut FieldErrors) -> Option<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        errors.insert("title".to_string(), vec!["This field may not be blank.".to_string()]);
        return None;
    }
    if trimmed.len() > MAX_TITLE_LENGTH {
        errors.insert(
            "title".to_string(),
            vec![format!("Ensure this field has no more than {MAX_TITLE_LENGTH} characters.")],
        );
        return None;
    }
    Some(trimmed.to_string())
}

/// Full collection details returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionResponse {
    /// Unique identifier for the collection
    pub id: CollectionId,
    /// Display title for the collection
    pub title: String,
    /// Product highlighted on the collection page
    pub featured_product_id: Option<ProductId>,
    /// Number of products in this collection
    pub products_count: i64,
}

impl From<CollectionDBResponse> for CollectionResponse {
    fn from(db: CollectionDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            featured_product_id: db.featured_product_id,
            products_count: db.products_count,
        }
    }
}
