//! Common type definitions and permission system types.
//!
//! Store entities use sequential `i64` ids (what the database generates from
//! `BIGSERIAL`), while identity users are keyed by UUID.
//!
//! The permission system is built from three types:
//!
//! - [`Resource`]: what entity type is being accessed
//! - [`Operation`]: what action is being performed
//! - [`Permission`]: an authorization requirement combining the two

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type JobId = Uuid;
pub type CollectionId = i64;
pub type ProductId = i64;
pub type ProductImageId = i64;
pub type CustomerId = i64;
pub type OrderId = i64;
pub type OrderItemId = i64;
pub type ReviewId = i64;

/// Abbreviate a UUID to its first 8 characters for more readable logs
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

// Operations that can be performed on resources.
// *-All means unrestricted access, *-Own means restricted to own resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    CreateAll,
    CreateOwn,
    ReadAll,
    ReadOwn,
    UpdateAll,
    UpdateOwn,
    DeleteAll,
    DeleteOwn,
}

// Resources that can be operated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Collections,
    Products,
    Customers,
    Orders,
    Reviews,
    Users,
    Jobs,
}

// Permission requirements for authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    /// Simple permission: (Resource, Operation)
    Allow(Resource, Operation),
    /// Logical combinator: any one of the listed permissions suffices
    Any(Vec<Permission>),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateAll | Operation::CreateOwn => write!(f, "Create"),
            Operation::ReadAll | Operation::ReadOwn => write!(f, "Read"),
            Operation::UpdateAll | Operation::UpdateOwn => write!(f, "Update"),
            Operation::DeleteAll | Operation::DeleteOwn => write!(f, "Delete"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Collections => "collections",
            Resource::Products => "products",
            Resource::Customers => "customers",
            Resource::Orders => "orders",
            Resource::Reviews => "reviews",
            Resource::Users => "users",
            Resource::Jobs => "jobs",
        };
        write!(f, "{name}")
    }
}
