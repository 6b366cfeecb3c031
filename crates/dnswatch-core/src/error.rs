//! Error types for the DNS watcher
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for watcher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DNS watcher
#[derive(Error, Debug)]
pub enum Error {
    /// Name resolution failed
    #[error("Resolution error for {name}: {message}")]
    Resolve {
        /// Watched name
        name: String,
        /// Resolver message
        message: String,
    },

    /// Resolution succeeded but produced no usable address
    #[error("Resolution of {0} returned no addresses")]
    EmptyResolution(String),

    /// Resolution did not complete within the configured timeout
    #[error("Resolution of {name} timed out after {timeout_secs}s")]
    ResolveTimeout {
        /// Watched name
        name: String,
        /// Timeout that elapsed
        timeout_secs: u64,
    },

    /// Message rendering errors
    #[error("Render error: {0}")]
    Render(String),

    /// Delivery to a single recipient failed
    #[error("Transport error ({recipient}): {message}")]
    Transport {
        /// Recipient address
        recipient: String,
        /// Transport message
        message: String,
    },

    /// A change event could not be delivered to any recipient
    #[error("Notification error: {0}")]
    Notification(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine used out of order (e.g. start before init)
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution error
    pub fn resolve(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolve {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an empty resolution error
    pub fn empty_resolution(name: impl Into<String>) -> Self {
        Self::EmptyResolution(name.into())
    }

    /// Create a render error
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Create a per-recipient transport error
    pub fn transport(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            recipient: recipient.into(),
            message: message.into(),
        }
    }

    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a lifecycle error
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Whether this error is a transient resolution failure that the next
    /// tick retries on its own
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::Resolve { .. } | Self::EmptyResolution(_) | Self::ResolveTimeout { .. }
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
