//! External delivery channels.
//!
//! Email delivery for notifications and the marketplace update push used by
//! the synchronizer. Neither channel retries; callers record the outcome.

pub mod email;
pub mod marketplace;
