//! Authentication and authorization.
//!
//! Two authentication methods are supported:
//!
//! 1. **Session authentication**: username/password login issues a JWT stored
//!    in an HTTP-only cookie.
//! 2. **Proxy header authentication**: a trusted upstream proxy asserts the
//!    user's email in a configurable header (SSO deployments).
//!
//! Authorization is role-based: staff users can manage the catalog and read
//! every customer and order, regular users are limited to their own customer
//! profile and orders. Handlers declare their requirement with the
//! [`permissions::RequiresPermission`] extractor.

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
