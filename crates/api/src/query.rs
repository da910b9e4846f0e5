//! Shared query parameter types for API handlers.

use millwright_core::comments::VisibilityFilter;
use serde::Deserialize;

/// Default page size for list endpoints.
pub const DEFAULT_LIMIT: i64 = 50;

/// Maximum page size for list endpoints.
pub const MAX_LIMIT: i64 = 200;

/// Query parameters for comment listing (`?visibility=all|public|customer`).
#[derive(Debug, Deserialize)]
pub struct VisibilityParams {
    #[serde(default)]
    pub visibility: VisibilityFilter,
}
