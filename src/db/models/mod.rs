//! Database request/response models.

pub mod collections;
pub mod customers;
pub mod jobs;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;
