//! Database models for orders.

use crate::api::models::orders::PaymentStatus;
use crate::types::{CustomerId, OrderId, OrderItemId, ProductId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// One line of an order being written, before prices are captured
#[derive(Debug, Clone)]
pub struct OrderItemSpec {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Database request for placing an order
#[derive(Debug, Clone)]
pub struct OrderCreateDBRequest {
    pub customer_id: CustomerId,
    pub items: Vec<OrderItemSpec>,
}

/// Database request for updating an order
#[derive(Debug, Clone, Default)]
pub struct OrderUpdateDBRequest {
    pub payment_status: Option<PaymentStatus>,
}

/// Database response for an order item
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemDBResponse {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Database response for an order, with its items loaded
#[derive(Debug, Clone)]
pub struct OrderDBResponse {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub placed_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub items: Vec<OrderItemDBResponse>,
}
