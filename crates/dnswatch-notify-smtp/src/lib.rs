// # SMTP Notification Transport
//
// This crate delivers rendered change notifications by SMTP submission
// (STARTTLS, port 587 by default).
//
// ## Behavior
//
// - ✅ One message per recipient per change, addressed `Display Name <addr>`
// - ✅ Plain-text body, as rendered by the engine
// - ✅ Optional SMTP authentication
// - ✅ Dry-run mode: messages are logged instead of sent
// - ❌ NO retry logic (a failed recipient is reported to the engine)
// - ❌ NO queueing or background tasks
//
// ## Security Requirements
//
// - The SMTP password NEVER appears in logs or Debug output

use async_trait::async_trait;
use dnswatch_core::config::TransportConfig;
use dnswatch_core::traits::{NotificationTransport, Recipient, RenderedMessage, TransportFactory};
use dnswatch_core::{Error, Result};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt;
use tracing::{debug, info, warn};

/// SMTP notification transport
pub struct SmtpTransport {
    host: String,
    port: u16,
    from: Mailbox,
    username: Option<String>,

    /// `None` in dry-run mode
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpTransport {
    /// Create a transport that submits through `host:port`
    ///
    /// # Parameters
    ///
    /// - `host`: SMTP relay hostname
    /// - `port`: Submission port
    /// - `from`: Sender, either `addr@host` or `Name <addr@host>`
    /// - `credentials`: Optional (username, password)
    /// - `dry_run`: Log messages instead of sending them
    pub fn new(
        host: impl Into<String>,
        port: u16,
        from: &str,
        credentials: Option<(String, String)>,
        dry_run: bool,
    ) -> Result<Self> {
        let host = host.into();
        let from: Mailbox = from
            .parse()
            .map_err(|e| Error::config(format!("Invalid sender '{}': {}", from, e)))?;

        let username = credentials.as_ref().map(|(user, _)| user.clone());

        let mailer = if dry_run {
            warn!("SMTP transport running in DRY-RUN mode - no mail will be sent");
            None
        } else {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
                .map_err(|e| Error::config(format!("Invalid SMTP relay '{}': {}", host, e)))?
                .port(port);

            if let Some((user, pass)) = credentials {
                builder = builder.credentials(Credentials::new(user, pass));
            }

            Some(builder.build())
        };

        Ok(Self {
            host,
            port,
            from,
            username,
            mailer,
        })
    }

    /// Whether messages are only logged
    pub fn is_dry_run(&self) -> bool {
        self.mailer.is_none()
    }

    /// Build the MIME message for one recipient
    fn build_message(&self, recipient: &Recipient, message: &RenderedMessage) -> Result<Message> {
        let address: Address = recipient
            .address
            .parse()
            .map_err(|e| Error::transport(&recipient.address, format!("invalid address: {}", e)))?;
        let to = Mailbox::new(recipient.display_name.clone(), address);

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body_text().into_owned())
            .map_err(|e| Error::transport(&recipient.address, e.to_string()))
    }
}

impl fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("from", &self.from.to_string())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("dry_run", &self.is_dry_run())
            .finish()
    }
}

#[async_trait]
impl NotificationTransport for SmtpTransport {
    async fn send(&self, recipient: &Recipient, message: &RenderedMessage) -> Result<()> {
        let email = self.build_message(recipient, message)?;

        let Some(mailer) = &self.mailer else {
            info!(
                "[DRY-RUN] Would send '{}' to {} via {}:{}",
                message.subject, recipient, self.host, self.port
            );
            debug!("[DRY-RUN] Body:\n{}", message.body_text());
            return Ok(());
        };

        mailer
            .send(email)
            .await
            .map_err(|e| Error::transport(&recipient.address, e.to_string()))?;

        info!("Sent '{}' to {}", message.subject, recipient);
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "smtp"
    }
}

/// Factory for creating SMTP transports
pub struct SmtpTransportFactory;

impl TransportFactory for SmtpTransportFactory {
    fn create(&self, config: &TransportConfig) -> Result<Box<dyn NotificationTransport>> {
        match config {
            TransportConfig::Smtp {
                host,
                port,
                from,
                username,
                password,
                dry_run,
            } => {
                if host.is_empty() {
                    return Err(Error::config("SMTP host is required"));
                }

                let credentials = match (username, password) {
                    (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
                    (Some(_), None) | (None, Some(_)) => {
                        return Err(Error::config(
                            "SMTP username and password must be set together",
                        ));
                    }
                    (None, None) => None,
                };

                Ok(Box::new(SmtpTransport::new(
                    host.clone(),
                    *port,
                    from,
                    credentials,
                    *dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for SMTP transport factory")),
        }
    }
}

/// Register the SMTP transport with a registry
///
/// Call this function to make the "smtp" transport available in the registry.
pub fn register(registry: &dnswatch_core::ComponentRegistry) {
    registry.register_transport("smtp", Box::new(SmtpTransportFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn smtp_config(dry_run: bool) -> TransportConfig {
        TransportConfig::Smtp {
            host: "smtp.example.com".to_string(),
            port: 587,
            from: "DNSWatcher <dnswatch@example.com>".to_string(),
            username: Some("dnswatch".to_string()),
            password: Some("hunter2".to_string()),
            dry_run,
        }
    }

    fn message() -> RenderedMessage {
        RenderedMessage {
            subject: "DNSWatcher example.com has changed".to_string(),
            body: b"Previous IP: 10.0.0.1\nNew IP: 10.0.0.2\n".to_vec(),
        }
    }

    #[test]
    fn test_factory_creation() {
        let transport = SmtpTransportFactory.create(&smtp_config(true));
        assert!(transport.is_ok());
        assert_eq!(transport.unwrap().transport_name(), "smtp");
    }

    #[test]
    fn test_factory_rejects_half_credentials() {
        let config = TransportConfig::Smtp {
            host: "smtp.example.com".to_string(),
            port: 587,
            from: "dnswatch@example.com".to_string(),
            username: Some("dnswatch".to_string()),
            password: None,
            dry_run: false,
        };
        assert!(matches!(
            SmtpTransportFactory.create(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_invalid_sender_is_config_error() {
        let result = SmtpTransport::new("smtp.example.com", 587, "not an address", None, true);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_redacts_password() {
        let transport = SmtpTransport::new(
            "smtp.example.com",
            587,
            "dnswatch@example.com",
            Some(("dnswatch".to_string(), "hunter2".to_string())),
            true,
        )
        .unwrap();

        let debug = format!("{:?}", transport);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_message_uses_display_name() {
        let transport =
            SmtpTransport::new("smtp.example.com", 587, "dnswatch@example.com", None, true)
                .unwrap();
        let recipient = Recipient::new("ops@example.com", Some("Ops Team".to_string()));

        let email = transport.build_message(&recipient, &message()).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("Ops Team"));
        assert!(raw.contains("<ops@example.com>"));
        assert!(raw.contains("Subject: DNSWatcher example.com has changed"));
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing() {
        let registry = dnswatch_core::ComponentRegistry::new();
        register(&registry);

        let transport = assert_ok!(registry.create_transport(&smtp_config(true)));
        let recipient = Recipient::new("ops@example.com", None);

        // no relay is reachable from tests; dry-run must not try
        assert_ok!(transport.send(&recipient, &message()).await);
    }

    #[tokio::test]
    async fn test_malformed_recipient_is_transport_error() {
        let transport =
            SmtpTransport::new("smtp.example.com", 587, "dnswatch@example.com", None, true)
                .unwrap();
        let recipient = Recipient::new("nobody", None);

        let result = transport.send(&recipient, &message()).await;
        assert!(matches!(result, Err(Error::Transport { .. })));
    }
}
