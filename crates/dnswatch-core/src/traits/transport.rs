// # Notification Transport Trait
//
// Defines the interface for delivering a rendered change notification to a
// single recipient.
//
// ## Implementations
//
// - SMTP: `dnswatch-notify-smtp` crate
// - Future: webhooks, chat integrations
//
// The engine is agnostic to how a message travels; it only needs to know
// whether one delivery attempt succeeded.

use async_trait::async_trait;
use std::fmt;

use crate::config::RecipientConfig;
use crate::traits::renderer::RenderedMessage;

/// A notification recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// Delivery address
    pub address: String,
    /// Optional display name
    pub display_name: Option<String>,
}

impl Recipient {
    /// Create a recipient
    pub fn new(address: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            address: address.into(),
            display_name,
        }
    }
}

impl From<&RecipientConfig> for Recipient {
    fn from(config: &RecipientConfig) -> Self {
        Self::new(config.address.clone(), config.display_name.clone())
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "{} <{}>", name, self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// Trait for notification transport implementations
///
/// # Responsibilities
///
/// One call is one delivery attempt to one recipient. Transports must not
/// retry internally or fan out to other recipients; the notifier isolates
/// per-recipient failures and decides what counts as overall failure.
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Deliver a message to one recipient
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The transport accepted the message
    /// - `Err(Error)`: Delivery failed
    async fn send(
        &self,
        recipient: &Recipient,
        message: &RenderedMessage,
    ) -> Result<(), crate::Error>;

    /// Get the transport name (for logging/debugging)
    fn transport_name(&self) -> &'static str;
}

/// Helper trait for constructing transports from configuration
pub trait TransportFactory: Send + Sync {
    /// Create a NotificationTransport instance from configuration
    fn create(
        &self,
        config: &crate::config::TransportConfig,
    ) -> Result<Box<dyn NotificationTransport>, crate::Error>;
}
