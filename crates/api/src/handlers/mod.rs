//! HTTP handlers, one module per resource.
//!
//! Handlers validate input, perform the primary write, and hand
//! propagation to [`crate::engine`].

pub mod comment;
pub mod feedback;
pub mod notification;
pub mod quality_check;
pub mod step;
