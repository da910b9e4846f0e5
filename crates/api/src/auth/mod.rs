//! Authentication primitives.
//!
//! - [`jwt`] -- validation of HS256 bearer tokens issued by the external auth
//!   service.

pub mod jwt;
