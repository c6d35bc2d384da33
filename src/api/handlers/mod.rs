//! HTTP request handlers, organized by resource.
//!
//! Each handler deserializes and validates the request, checks
//! authentication/authorization via the extractors in [`crate::auth`],
//! delegates to the repositories in [`crate::db::handlers`], and serializes
//! the response. Errors are returned as [`crate::errors::Error`], which
//! converts into the appropriate HTTP status and JSON body.

pub mod auth;
pub mod collections;
pub mod customers;
pub mod jobs;
pub mod orders;
pub mod products;
