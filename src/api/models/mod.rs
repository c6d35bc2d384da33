//! API request/response models.

pub mod auth;
pub mod collections;
pub mod customers;
pub mod jobs;
pub mod orders;
pub mod pagination;
pub mod products;
pub mod reviews;
pub mod users;
