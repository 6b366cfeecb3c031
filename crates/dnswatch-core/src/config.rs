//! Configuration types for the DNS watcher
//!
//! The configuration is a static, pre-parsed value. The engine reads it once
//! during `init()` and never again.

use serde::{Deserialize, Serialize};

/// Upper bound accepted for the retention window (7 days)
const MAX_RETENTION_SECS: u64 = 7 * 24 * 3600;

/// Main watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Names to resolve and watch
    pub watched: Vec<WatchedNameConfig>,

    /// Who gets notified when a watched name changes
    pub recipients: Vec<RecipientConfig>,

    /// Resolver configuration
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Notification transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl WatchConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            watched: Vec::new(),
            recipients: Vec::new(),
            resolver: ResolverConfig::default(),
            transport: TransportConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Add a watched name
    pub fn with_watched(mut self, name: impl Into<String>) -> Self {
        self.watched.push(WatchedNameConfig::new(name));
        self
    }

    /// Add a recipient
    pub fn with_recipient(mut self, recipient: RecipientConfig) -> Self {
        self.recipients.push(recipient);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.watched.iter().any(|w| w.enabled) {
            return Err(crate::Error::config("No watched names configured"));
        }

        for watched in &self.watched {
            if watched.name.trim().is_empty() {
                return Err(crate::Error::config("Watched name cannot be empty"));
            }
        }

        if self.recipients.is_empty() {
            return Err(crate::Error::config("No recipients configured"));
        }

        for recipient in &self.recipients {
            recipient.validate()?;
        }

        self.transport.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A single watched name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchedNameConfig {
    /// Name to resolve (e.g., "example.com")
    pub name: String,

    /// Whether this name is checked
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl WatchedNameConfig {
    /// Create a new watched name configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    /// Enable or disable the name
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// A notification recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientConfig {
    /// Delivery address (e.g., "ops@example.com")
    pub address: String,

    /// Display name used in greetings and message headers
    #[serde(default)]
    pub display_name: Option<String>,
}

impl RecipientConfig {
    /// Create a recipient without a display name
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: None,
        }
    }

    /// Set the display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Parse `"Display Name <addr@host>"` or a bare `"addr@host"`
    pub fn parse(raw: &str) -> Result<Self, crate::Error> {
        let raw = raw.trim();
        let recipient = match (raw.find('<'), raw.rfind('>')) {
            (Some(open), Some(close)) if open < close => {
                let name = raw[..open].trim().trim_matches('"').trim();
                let address = raw[open + 1..close].trim();
                let mut recipient = Self::new(address);
                if !name.is_empty() {
                    recipient = recipient.with_display_name(name);
                }
                recipient
            }
            _ => Self::new(raw),
        };
        recipient.validate()?;
        Ok(recipient)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        let Some((local, domain)) = self.address.split_once('@') else {
            return Err(crate::Error::config(format!(
                "Recipient address '{}' is missing '@'",
                self.address
            )));
        };
        if local.is_empty() || domain.is_empty() || self.address.contains(char::is_whitespace) {
            return Err(crate::Error::config(format!(
                "Recipient address '{}' is malformed",
                self.address
            )));
        }
        Ok(())
    }
}

/// Resolver configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolverConfig {
    /// Operating system resolver (getaddrinfo)
    #[default]
    System,

    /// hickory stub resolver using the system's resolv.conf
    Hickory,

    /// Custom resolver
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ResolverConfig {
    /// Get the resolver type name
    pub fn type_name(&self) -> &str {
        match self {
            ResolverConfig::System => "system",
            ResolverConfig::Hickory => "hickory",
            ResolverConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Notification transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// SMTP submission (STARTTLS)
    Smtp {
        /// SMTP relay hostname
        host: String,
        /// SMTP port
        #[serde(default = "default_smtp_port")]
        port: u16,
        /// Sender address
        from: String,
        /// Optional SMTP username
        #[serde(default)]
        username: Option<String>,
        /// Optional SMTP password
        #[serde(default)]
        password: Option<String>,
        /// Log messages instead of sending them
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom transport
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl TransportConfig {
    /// Validate the transport configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            TransportConfig::Smtp { host, from, .. } => {
                if host.is_empty() {
                    return Err(crate::Error::config("SMTP host cannot be empty"));
                }
                if from.is_empty() {
                    return Err(crate::Error::config("SMTP sender cannot be empty"));
                }
                Ok(())
            }
            TransportConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom transport factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom transport config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the transport type name
    pub fn type_name(&self) -> &str {
        match self {
            TransportConfig::Smtp { .. } => "smtp",
            TransportConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Smtp {
            host: String::new(),
            port: default_smtp_port(),
            from: String::new(),
            username: None,
            password: None,
            dry_run: false,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between two checks of all watched names
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// How long an observed address keeps suppressing change notifications
    ///
    /// Absorbs round-robin answers and flapping resolvers: an address only
    /// counts as new when it has not been seen at all within this window.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Upper bound on a single resolution (in seconds)
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,

    /// Capacity of the internal event channel
    ///
    /// When full, new engine events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Name of the template handed to the message renderer
    #[serde(default = "default_template_name")]
    pub template_name: String,
}

impl EngineConfig {
    /// Retention window as a chrono duration
    pub fn retention(&self) -> chrono::Duration {
        // bounded by validate()
        chrono::Duration::seconds(self.retention_secs.min(MAX_RETENTION_SECS) as i64)
    }

    /// Tick interval as a std duration
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_interval_secs)
    }

    /// Resolution timeout as a std duration
    pub fn resolve_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.resolve_timeout_secs)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.tick_interval_secs == 0 {
            return Err(crate::Error::config("Tick interval must be > 0"));
        }
        if self.retention_secs == 0 || self.retention_secs > MAX_RETENTION_SECS {
            return Err(crate::Error::config(format!(
                "Retention must be between 1 and {} seconds",
                MAX_RETENTION_SECS
            )));
        }
        if self.resolve_timeout_secs == 0 {
            return Err(crate::Error::config("Resolve timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        if self.template_name.is_empty() {
            return Err(crate::Error::config("Template name cannot be empty"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            retention_secs: default_retention_secs(),
            resolve_timeout_secs: default_resolve_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            template_name: default_template_name(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_smtp_port() -> u16 {
    587
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_retention_secs() -> u64 {
    300
}

fn default_resolve_timeout_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_template_name() -> String {
    crate::notifier::CHANGE_TEMPLATE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> WatchConfig {
        let mut config = WatchConfig::new()
            .with_watched("example.com")
            .with_recipient(RecipientConfig::new("ops@example.com"));
        config.transport = TransportConfig::Smtp {
            host: "smtp.example.com".to_string(),
            port: 587,
            from: "dnswatch@example.com".to_string(),
            username: None,
            password: None,
            dry_run: true,
        };
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_no_watched_names_rejected() {
        let mut config = valid_config();
        config.watched.clear();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.watched = vec![WatchedNameConfig::new("example.com").with_enabled(false)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_recipients_rejected() {
        let mut config = valid_config();
        config.recipients.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_bounds() {
        let mut config = valid_config();
        config.engine.tick_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.engine.retention_secs = MAX_RETENTION_SECS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_recipient_parse() {
        let r = RecipientConfig::parse("Ops Team <ops@example.com>").unwrap();
        assert_eq!(r.address, "ops@example.com");
        assert_eq!(r.display_name.as_deref(), Some("Ops Team"));

        let r = RecipientConfig::parse(" ops@example.com ").unwrap();
        assert_eq!(r.address, "ops@example.com");
        assert_eq!(r.display_name, None);

        assert!(RecipientConfig::parse("not-an-address").is_err());
        assert!(RecipientConfig::parse("@example.com").is_err());
    }

    #[test]
    fn test_defaults_from_json() {
        let json = serde_json::json!({
            "watched": [{ "name": "example.com" }],
            "recipients": [{ "address": "ops@example.com" }],
            "transport": { "type": "smtp", "host": "smtp.example.com", "from": "a@b.c" }
        });
        let config: WatchConfig = serde_json::from_value(json).unwrap();
        assert!(config.watched[0].enabled);
        assert_eq!(config.engine.tick_interval_secs, 60);
        assert_eq!(config.engine.retention_secs, 300);
        assert_eq!(config.resolver.type_name(), "system");
        assert_eq!(config.transport.type_name(), "smtp");
        assert!(config.validate().is_ok());
    }
}
