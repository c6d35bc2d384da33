//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection or transaction, provides
//! strongly-typed CRUD operations, and returns domain models from
//! [`crate::db::models`]. Mutations that need a referential guard (counting
//! dependents before a delete) run both steps on the same connection, so a
//! caller-supplied transaction makes them atomic.
//!
//! Usage pattern:
//!
//! ```ignore
//! use storefront::db::handlers::{Collections, Repository};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = Collections::new(&mut tx);
//!     let collection = repo.get_by_id(1).await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod collections;
pub mod customers;
pub mod jobs;
pub mod orders;
pub mod products;
pub mod repository;
pub mod reviews;
pub mod users;

pub use collections::{CollectionFilter, Collections};
pub use customers::{CustomerFilter, Customers};
pub use jobs::{JobFilter, Jobs};
pub use orders::{OrderFilter, Orders};
pub use products::{ProductFilter, Products};
pub use repository::Repository;
pub use reviews::Reviews;
pub use users::{UserFilter, Users};
