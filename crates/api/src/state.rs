use std::sync::Arc;

use millwright_events::{EmailChannel, MarketplaceClient};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: millwright_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Email channel for notifications with email delivery. `None` disables email.
    pub email: Option<Arc<dyn EmailChannel>>,
    /// Marketplace client used by the synchronizer.
    pub marketplace: Arc<dyn MarketplaceClient>,
}
