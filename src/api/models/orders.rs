//! API request/response models for orders.

use super::pagination::Pagination;
use crate::db::models::orders::{OrderDBResponse, OrderItemDBResponse, OrderItemSpec};
use crate::errors::{Error, FieldErrors, Result};
use crate::types::{CustomerId, OrderId, OrderItemId, ProductId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Payment state of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Complete,
    Failed,
}

/// Query parameters for listing orders
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListOrdersQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Filter by payment status
    pub payment_status: Option<PaymentStatus>,
}

/// One line of an order being placed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct OrderItemCreate {
    pub product_id: Option<ProductId>,
    pub quantity: Option<i32>,
}

/// Request body for placing an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct OrderCreate {
    #[serde(default)]
    pub items: Vec<OrderItemCreate>,
}

impl OrderCreate {
    /// Validate the payload into a list of item specifications.
    ///
    /// Unit prices are not taken from the client; they are captured from the
    /// product rows when the order is written.
    pub fn validate(self) -> Result<Vec<OrderItemSpec>> {
        let mut errors = FieldErrors::new();

        if self.items.is_empty() {
            errors.insert("items".to_string(), vec!["This list may not be empty.".to_string()]);
            return Err(Error::Validation { errors });
        }

        let mut specs = Vec::with_capacity(self.items.len());
        for (idx, item) in self.items.into_iter().enumerate() {
            let product_id = match item.product_id {
                Some(id) => Some(id),
                None => {
                    errors.insert(format!("items.{idx}.product_id"), vec!["This field is required.".to_string()]);
                    None
                }
            };
            let quantity = match item.quantity {
                Some(q) if q > 0 => Some(q),
                Some(_) => {
                    errors.insert(
                        format!("items.{idx}.quantity"),
                        vec!["Ensure this value is greater than or equal to 1.".to_string()],
                    );
                    None
                }
                None => {
                    errors.insert(format!("items.{idx}.quantity"), vec!["This field is required.".to_string()]);
                    None
                }
            };
            if let (Some(product_id), Some(quantity)) = (product_id, quantity) {
                specs.push(OrderItemSpec { product_id, quantity });
            }
        }

        if !errors.is_empty() {
            return Err(Error::Validation { errors });
        }

        Ok(specs)
    }
}

/// Request body for updating an order. Only the payment status can change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct OrderUpdate {
    pub payment_status: Option<PaymentStatus>,
}

/// One stored line of an order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: i32,
    /// Price per unit captured when the order was placed
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
}

impl From<OrderItemDBResponse> for OrderItemResponse {
    fn from(db: OrderItemDBResponse) -> Self {
        Self {
            id: db.id,
            product_id: db.product_id,
            quantity: db.quantity,
            unit_price: db.unit_price,
        }
    }
}

/// Full order details returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub placed_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderDBResponse> for OrderResponse {
    fn from(db: OrderDBResponse) -> Self {
        Self {
            id: db.id,
            customer_id: db.customer_id,
            placed_at: db.placed_at,
            payment_status: db.payment_status,
            items: db.items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}
