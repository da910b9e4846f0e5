//! Marketplace update push.
//!
//! [`HttpMarketplaceClient`] sends a JSON-encoded [`MarketplacePayload`] to
//! `POST {MARKETPLACE_API_URL}/production/update` with a bearer credential.
//! A single attempt is made under a bounded timeout; there is no retry.
//! Operators re-send manually after a failure.

use std::time::Duration;

use async_trait::async_trait;
use millwright_core::marketplace::{MarketplacePayload, MARKETPLACE_UPDATE_PATH};

/// Default HTTP timeout for one push.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for marketplace push failures.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The marketplace returned a non-2xx status code.
    #[error("Marketplace returned HTTP {0}")]
    HttpStatus(u16),

    /// No marketplace endpoint is configured for this deployment.
    #[error("Marketplace integration is not configured")]
    NotConfigured,
}

// ---------------------------------------------------------------------------
// MarketplaceConfig
// ---------------------------------------------------------------------------

/// Configuration for the marketplace HTTP client.
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// Base URL; the update path is appended.
    pub base_url: String,
    /// Bearer credential sent in the `Authorization` header.
    pub api_token: Option<String>,
    /// Upper bound on one push.
    pub timeout: Duration,
}

impl MarketplaceConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `MARKETPLACE_API_URL` is not set.
    ///
    /// | Variable                   | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `MARKETPLACE_API_URL`      | yes      |         |
    /// | `MARKETPLACE_API_TOKEN`    | no       |         |
    /// | `MARKETPLACE_TIMEOUT_SECS` | no       | `10`    |
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("MARKETPLACE_API_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())?;
        Some(Self {
            base_url,
            api_token: std::env::var("MARKETPLACE_API_TOKEN").ok(),
            timeout: Duration::from_secs(
                std::env::var("MARKETPLACE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        })
    }

    /// Full URL of the update endpoint.
    pub fn endpoint(&self) -> String {
        format!(
            "{}{MARKETPLACE_UPDATE_PATH}",
            self.base_url.trim_end_matches('/')
        )
    }
}

// ---------------------------------------------------------------------------
// Client seam
// ---------------------------------------------------------------------------

/// Pushes feedback summaries to the external marketplace.
#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    async fn push_update(&self, payload: &MarketplacePayload) -> Result<(), MarketplaceError>;

    /// Whether pushes can reach a marketplace at all.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Stand-in used when no marketplace URL is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMarketplace;

#[async_trait]
impl MarketplaceClient for DisabledMarketplace {
    async fn push_update(&self, _payload: &MarketplacePayload) -> Result<(), MarketplaceError> {
        Err(MarketplaceError::NotConfigured)
    }

    fn is_configured(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// HttpMarketplaceClient
// ---------------------------------------------------------------------------

/// Posts marketplace updates over HTTP.
pub struct HttpMarketplaceClient {
    client: reqwest::Client,
    config: MarketplaceConfig,
}

impl HttpMarketplaceClient {
    /// Create a client with the configured timeout.
    pub fn new(config: MarketplaceConfig) -> Result<Self, MarketplaceError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl MarketplaceClient for HttpMarketplaceClient {
    async fn push_update(&self, payload: &MarketplacePayload) -> Result<(), MarketplaceError> {
        let url = self.config.endpoint();
        let mut request = self.client.post(&url).json(payload);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::warn!(
                url = %url,
                status,
                production_id = %payload.production_id,
                "Marketplace rejected update",
            );
            return Err(MarketplaceError::HttpStatus(status));
        }

        tracing::info!(
            url = %url,
            production_id = %payload.production_id,
            "Marketplace update sent",
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
