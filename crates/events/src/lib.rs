//! Millwright external delivery channels.
//!
//! Both outbound integrations sit behind `async-trait` seams so the
//! propagation engine can be exercised with in-memory fakes:
//!
//! - [`EmailChannel`] with the SMTP implementation [`SmtpEmailChannel`].
//! - [`MarketplaceClient`] with the HTTP implementation [`HttpMarketplaceClient`]
//!   and [`DisabledMarketplace`] for deployments without a marketplace.

pub mod delivery;

pub use delivery::email::{EmailChannel, EmailConfig, EmailError, EmailMessage, SmtpEmailChannel};
pub use delivery::marketplace::{
    DisabledMarketplace, HttpMarketplaceClient, MarketplaceClient, MarketplaceConfig,
    MarketplaceError,
};
