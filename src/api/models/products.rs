//! API request/response models for products and product images.

use super::pagination::Pagination;
use crate::db::models::products::{
    ProductCreateDBRequest, ProductDBResponse, ProductImageDBResponse, ProductUpdateDBRequest,
};
use crate::errors::{Error, FieldErrors, Result};
use crate::types::{CollectionId, ProductId, ProductImageId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const MAX_TITLE_LENGTH: usize = 255;

/// Query parameters for listing products
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListProductsQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Only include products belonging to this collection
    pub collection_id: Option<CollectionId>,

    /// Search query to filter products by title or description (case-insensitive substring match)
    pub search: Option<String>,
}

/// Request body for creating a new product.
///
/// Fields are optional at the serde level so that missing values produce
/// per-field validation errors rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProductCreate {
    #[schema(example = "Rustic wooden chair")]
    pub title: Option<String>,
    /// URL slug; derived from the title when omitted
    pub slug: Option<String>,
    pub description: Option<String>,
    /// Price per unit, must be at least 1
    #[schema(value_type = f64, example = 19.99)]
    pub unit_price: Option<Decimal>,
    /// Units in stock, must not be negative
    pub inventory: Option<i32>,
    /// Collection this product belongs to
    pub collection_id: Option<CollectionId>,
    /// Image paths to attach on creation
    #[serde(default)]
    pub images: Vec<String>,
}

impl ProductCreate {
    /// Validate the payload and convert it into a database request.
    pub fn validate(self) -> Result<ProductCreateDBRequest> {
        let mut errors = FieldErrors::new();

        let title = match self.title {
            None => {
                errors.insert("title".to_string(), vec!["This field is required.".to_string()]);
                None
            }
            Some(t) => validate_title(t, &mut errors),
        };

        let unit_price = match self.unit_price {
            None => {
                errors.insert("unit_price".to_string(), vec!["This field is required.".to_string()]);
                None
            }
            Some(p) => validate_unit_price(p, &mut errors),
        };

        let inventory = match self.inventory {
            None => {
                errors.insert("inventory".to_string(), vec!["This field is required.".to_string()]);
                None
            }
            Some(i) => validate_inventory(i, &mut errors),
        };

        if self.collection_id.is_none() {
            errors.insert("collection_id".to_string(), vec!["This field is required.".to_string()]);
        }

        if !errors.is_empty() {
            return Err(Error::Validation { errors });
        }

        let title = title.unwrap_or_default();
        let slug = match self.slug {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => slugify(&title),
        };

        Ok(ProductCreateDBRequest {
            slug,
            title,
            description: self.description,
            unit_price: unit_price.unwrap_or_default(),
            inventory: inventory.unwrap_or_default(),
            collection_id: self.collection_id.unwrap_or_default(),
            images: self.images,
        })
    }
}

/// Request body for updating an existing product. All fields are optional;
/// only provided fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub slug: Option<String>,
    /// New description (omit to keep unchanged, null to clear)
    #[serde(default, with = "serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[schema(value_type = Option<f64>)]
    pub unit_price: Option<Decimal>,
    pub inventory: Option<i32>,
    pub collection_id: Option<CollectionId>,
}

impl ProductUpdate {
    /// Validate the payload and convert it into a database request.
    pub fn validate(self) -> Result<ProductUpdateDBRequest> {
        let mut errors = FieldErrors::new();

        let title = match self.title {
            None => None,
            Some(t) => validate_title(t, &mut errors),
        };
        let unit_price = match self.unit_price {
            None => None,
            Some(p) => validate_unit_price(p, &mut errors),
        };
        let inventory = match self.inventory {
            None => None,
            Some(i) => validate_inventory(i, &mut errors),
        };

        if !errors.is_empty() {
            return Err(Error::Validation { errors });
        }

        Ok(ProductUpdateDBRequest {
            title,
            slug: self.slug,
            description: self.description,
            unit_price,
            inventory,
            collection_id: self.collection_id,
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

fn validate_unit_price(price: Decimal, errors: &mut FieldErrors) -> Option<Decimal> {
    if price < Decimal::ONE {
        errors.insert(
            "unit_price".to_string(),
            vec!["Ensure this value is greater than or equal to 1.".to_string()],
        );
        return None;
    }
    Some(price)
}

fn validate_inventory(inventory: i32, errors: &mut FieldErrors) -> Option<i32> {
    if inventory < 0 {
        errors.insert(
            "inventory".to_string(),
            vec!["Ensure this value is greater than or equal to 0.".to_string()],
        );
        return None;
    }
    Some(inventory)
}

/// Derive a URL slug from a title.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() { "product".to_string() } else { slug }
}

/// Full product details returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    pub inventory: i32,
    pub collection_id: CollectionId,
    pub last_update: DateTime<Utc>,
    pub images: Vec<ProductImageResponse>,
}

impl From<ProductDBResponse> for ProductResponse {
    fn from(db: ProductDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            slug: db.slug,
            description: db.description,
            unit_price: db.unit_price,
            inventory: db.inventory,
            collection_id: db.collection_id,
            last_update: db.last_update,
            images: db.images.into_iter().map(ProductImageResponse::from).collect(),
        }
    }
}

/// Request body for attaching an image to a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProductImageCreate {
    /// Path or URL of the stored image
    pub image: Option<String>,
}

impl ProductImageCreate {
    pub fn validate(self) -> Result<String> {
        match self.image {
            Some(image) if !image.trim().is_empty() => Ok(image.trim().to_string()),
            Some(_) => Err(Error::field("image", "This field may not be blank.")),
            None => Err(Error::field("image", "This field is required.")),
        }
    }
}

/// A stored product image.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductImageResponse {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub image: String,
}

impl From<ProductImageDBResponse> for ProductImageResponse {
    fn from(db: ProductImageDBResponse) -> Self {
        Self {
            id: db.id,
            product_id: db.product_id,
            image: db.image,
        }
    }
}
