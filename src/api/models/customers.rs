//! API request/response models for customers.

use super::pagination::Pagination;
use crate::db::models::customers::{CustomerCreateDBRequest, CustomerDBResponse, CustomerUpdateDBRequest};
use crate::errors::{Error, FieldErrors, Result};
use crate::types::{CustomerId, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Loyalty tier attached to a customer profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "membership_tier", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipTier {
    Bronze,
    Silver,
    Gold,
}

/// Query parameters for listing customers
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListCustomersQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Filter by membership tier
    pub membership: Option<MembershipTier>,
}

/// Request body for creating a customer profile on behalf of a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CustomerCreate {
    /// The user this profile belongs to
    #[schema(value_type = String, format = "uuid")]
    pub user_id: Option<UserId>,
    #[schema(example = "+1-555-0134")]
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

impl CustomerCreate {
    /// Validate the payload and convert it into a database request.
    pub fn validate(self) -> Result<CustomerCreateDBRequest> {
        let mut errors = FieldErrors::new();

        let Some(user_id) = self.user_id else {
            errors.insert("user_id".to_string(), vec!["This field is required.".to_string()]);
            return Err(Error::Validation { errors });
        };

        let phone = match self.phone {
            None => None,
            Some(p) if p.trim().is_empty() => {
                errors.insert("phone".to_string(), vec!["This field may not be blank.".to_string()]);
                None
            }
            Some(p) => Some(p.trim().to_string()),
        };

        if !errors.is_empty() {
            return Err(Error::Validation { errors });
        }

        Ok(CustomerCreateDBRequest {
            user_id,
            phone,
            birth_date: self.birth_date,
        })
    }
}

/// Request body for updating a customer profile. All fields are optional;
/// only provided fields will be updated.
///
/// `membership` is honoured only for staff callers; regular users editing
/// their own profile cannot change their tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CustomerUpdate {
    #[schema(example = "+1-555-0134")]
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub membership: Option<MembershipTier>,
}

impl CustomerUpdate {
    /// Validate the payload and convert it into a database request.
    ///
    /// `allow_membership` drops the membership change for non-staff callers.
    pub fn validate(self, allow_membership: bool) -> Result<CustomerUpdateDBRequest> {
        let mut errors = FieldErrors::new();

        let phone = match self.phone {
            None => None,
            Some(p) if p.trim().is_empty() => {
                errors.insert("phone".to_string(), vec!["This field may not be blank.".to_string()]);
                None
            }
            Some(p) => Some(p.trim().to_string()),
        };

        if !errors.is_empty() {
            return Err(Error::Validation { errors });
        }

        Ok(CustomerUpdateDBRequest {
            phone,
            birth_date: self.birth_date,
            membership: if allow_membership { self.membership } else { None },
        })
    }
}

/// Full customer details returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    pub id: CustomerId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub membership: MembershipTier,
}

impl From<CustomerDBResponse> for CustomerResponse {
    fn from(db: CustomerDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            phone: db.phone,
            birth_date: db.birth_date,
            membership: db.membership,
        }
    }
}
