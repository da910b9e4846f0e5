//! Email notification delivery via SMTP.
//!
//! [`SmtpEmailChannel`] wraps the `lettre` async SMTP transport to send
//! plain-text notification emails. Configuration is loaded from environment
//! variables; if `SMTP_HOST` is not set, [`EmailConfig::from_env`] returns
//! `None` and email delivery is disabled.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use millwright_core::notifications::{Priority, Recipient};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// No mailbox is known for the recipient.
    #[error("No email address for recipient {0}")]
    UnknownRecipient(String),

    /// The SMTP exchange did not finish within the configured timeout.
    #[error("Email delivery timed out after {0}s")]
    Timeout(u64),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@millwright.local";

/// Default bound on a single send.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the SMTP email channel.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
    /// Shared mailbox per role, used for role-addressed notifications.
    pub role_mailboxes: HashMap<String, String>,
    /// Upper bound on one SMTP exchange.
    pub timeout: Duration,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured and should be skipped.
    ///
    /// | Variable               | Required | Default                     |
    /// |------------------------|----------|-----------------------------|
    /// | `SMTP_HOST`            | yes      |                             |
    /// | `SMTP_PORT`            | no       | `587`                       |
    /// | `SMTP_FROM`            | no       | `noreply@millwright.local`  |
    /// | `SMTP_USER`            | no       |                             |
    /// | `SMTP_PASSWORD`        | no       |                             |
    /// | `EMAIL_ROLE_MAILBOXES` | no       | empty (`role=addr,...`)     |
    /// | `EMAIL_TIMEOUT_SECS`   | no       | `10`                        |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            role_mailboxes: std::env::var("EMAIL_ROLE_MAILBOXES")
                .map(|raw| parse_role_mailboxes(&raw))
                .unwrap_or_default(),
            timeout: Duration::from_secs(
                std::env::var("EMAIL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        })
    }
}

/// Parse `role=address` pairs separated by commas. Malformed pairs are skipped.
pub fn parse_role_mailboxes(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (role, address) = pair.split_once('=')?;
            let (role, address) = (role.trim(), address.trim());
            (!role.is_empty() && address.contains('@'))
                .then(|| (role.to_string(), address.to_string()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Channel seam
// ---------------------------------------------------------------------------

/// One outbound notification email.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
    pub priority: Priority,
}

/// Sends a notification email. `Ok(())` means the message was handed off.
#[async_trait]
pub trait EmailChannel: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Resolve the mailbox for a recipient.
///
/// Email recipients carry their address; role recipients use the configured
/// role mailbox. User recipients have no address on record here.
pub fn resolve_address(
    recipient: &Recipient,
    role_mailboxes: &HashMap<String, String>,
) -> Result<String, EmailError> {
    match recipient {
        Recipient::Email(address) => Ok(address.clone()),
        Recipient::Role(role) => role_mailboxes
            .get(role)
            .cloned()
            .ok_or_else(|| EmailError::UnknownRecipient(format!("role '{role}'"))),
        Recipient::User(id) => Err(EmailError::UnknownRecipient(format!("user {id}"))),
    }
}

fn subject_line(message: &EmailMessage) -> String {
    match message.priority {
        Priority::High => format!("[Millwright][HIGH] {}", message.subject),
        _ => format!("[Millwright] {}", message.subject),
    }
}

// ---------------------------------------------------------------------------
// SmtpEmailChannel
// ---------------------------------------------------------------------------

/// Sends notification emails via SMTP.
pub struct SmtpEmailChannel {
    config: EmailConfig,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailChannel {
    /// Build the SMTP transport for the given configuration.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port)
                .timeout(Some(config.timeout));

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: transport_builder.build(),
            config,
        })
    }
}

#[async_trait]
impl EmailChannel for SmtpEmailChannel {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let to = resolve_address(&message.recipient, &self.config.role_mailboxes)?;

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject_line(message))
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        tokio::time::timeout(self.config.timeout, self.mailer.send(email))
            .await
            .map_err(|_| EmailError::Timeout(self.config.timeout.as_secs()))??;

        tracing::info!(to = %to, priority = message.priority.as_str(), "Notification email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
