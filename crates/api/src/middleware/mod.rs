//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireManager`] -- Requires `production_manager` or `admin`.

pub mod auth;
pub mod rbac;
