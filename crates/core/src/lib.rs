//! Millwright domain core.
//!
//! Pure, I/O-free logic for production feedback state propagation. The DB
//! and API layers call into these modules for status aggregation, quality
//! scoring, notification routing, marketplace sync guards, comment rules,
//! and shared validation.

pub mod comments;
pub mod error;
pub mod feedback;
pub mod marketplace;
pub mod notifications;
pub mod quality;
pub mod roles;
pub mod steps;
pub mod types;
