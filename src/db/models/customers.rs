//! Database models for customers.

use crate::api::models::customers::MembershipTier;
use crate::types::{CustomerId, UserId};
use chrono::NaiveDate;

/// Database request for creating a customer profile
#[derive(Debug, Clone)]
pub struct CustomerCreateDBRequest {
    pub user_id: UserId,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// Database request for a partial customer update
#[derive(Debug, Clone, Default)]
pub struct CustomerUpdateDBRequest {
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub membership: Option<MembershipTier>,
}

/// Database response for a customer
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerDBResponse {
    pub id: CustomerId,
    pub user_id: UserId,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub membership: MembershipTier,
}
