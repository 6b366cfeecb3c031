//! Change notifier
//!
//! Turns a [`ChangeEvent`] into one rendered message and dispatches it to
//! every configured recipient. A failing recipient never prevents delivery to
//! the others; only when *every* recipient fails is the event reported as a
//! failure.

pub mod template;

pub use template::{RenderFn, TemplateRenderer};

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::traits::{MessageFields, MessageRenderer, NotificationTransport, Recipient};
use crate::watcher::ChangeEvent;

/// Name of the built-in change template
pub const CHANGE_TEMPLATE: &str = "change";

/// Field: watched name
pub const FIELD_NAME: &str = "HostName";
/// Field: previous address, or [`NO_PREVIOUS`]
pub const FIELD_PREVIOUS: &str = "PreviousIp";
/// Field: new address
pub const FIELD_NEW: &str = "NewIp";
/// Field: human-readable time since the previous change
pub const FIELD_ELAPSED: &str = "Elapsed";
/// Field: detection time (RFC 3339)
pub const FIELD_TIMESTAMP: &str = "Timestamp";
/// Field: id of the running process
pub const FIELD_PID: &str = "Pid";
/// Field: host the process runs on
pub const FIELD_PROCESS_HOST: &str = "ProcessHostname";

/// Rendered in place of the previous address when there was none
pub const NO_PREVIOUS: &str = "none";

/// Identity of the running process, included in every notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    /// Process id
    pub pid: u32,
    /// Host identity
    pub hostname: String,
}

impl ProcessIdentity {
    /// Identity of the current process
    ///
    /// The host is taken from `HOSTNAME`, falling back to `unknown`.
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            hostname: std::env::var("HOSTNAME")
                .ok()
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// Outcome of dispatching one change event
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Recipients the transport accepted the message for
    pub delivered: Vec<Recipient>,
    /// Recipients whose delivery failed, with the error
    pub failed: Vec<(Recipient, Error)>,
}

impl DispatchReport {
    /// Whether every recipient failed
    pub fn all_failed(&self) -> bool {
        self.delivered.is_empty() && !self.failed.is_empty()
    }
}

/// Renders and dispatches change notifications
pub struct ChangeNotifier {
    recipients: Vec<Recipient>,
    transport: Arc<dyn NotificationTransport>,
    renderer: Arc<dyn MessageRenderer>,
    template_name: String,
    identity: ProcessIdentity,
}

impl ChangeNotifier {
    /// Create a notifier
    pub fn new(
        recipients: Vec<Recipient>,
        transport: Arc<dyn NotificationTransport>,
        renderer: Arc<dyn MessageRenderer>,
        template_name: impl Into<String>,
        identity: ProcessIdentity,
    ) -> Self {
        Self {
            recipients,
            transport,
            renderer,
            template_name: template_name.into(),
            identity,
        }
    }

    /// Configured recipients
    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Fields handed to the renderer for `event`
    pub fn fields(&self, event: &ChangeEvent) -> MessageFields {
        let mut fields = MessageFields::new();
        fields.insert(FIELD_NAME.to_string(), event.name.clone());
        fields.insert(
            FIELD_PREVIOUS.to_string(),
            event
                .previous
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| NO_PREVIOUS.to_string()),
        );
        fields.insert(FIELD_NEW.to_string(), event.new.to_string());
        fields.insert(
            FIELD_ELAPSED.to_string(),
            format_elapsed(event.since_last_change),
        );
        fields.insert(FIELD_TIMESTAMP.to_string(), event.detected_at.to_rfc3339());
        fields.insert(FIELD_PID.to_string(), self.identity.pid.to_string());
        fields.insert(
            FIELD_PROCESS_HOST.to_string(),
            self.identity.hostname.clone(),
        );
        fields
    }

    /// Render `event` once and send it to every recipient
    ///
    /// # Returns
    ///
    /// - `Ok(DispatchReport)`: At least one recipient accepted the message
    ///   (individual failures are listed in the report)
    /// - `Err(Error)`: Rendering failed, or every recipient failed
    pub async fn notify(&self, event: &ChangeEvent) -> Result<DispatchReport> {
        let message = self
            .renderer
            .render(&self.template_name, &self.fields(event))?;

        debug!(
            "Dispatching '{}' to {} recipient(s) via {}",
            message.subject,
            self.recipients.len(),
            self.transport.transport_name()
        );

        let mut report = DispatchReport::default();
        for recipient in &self.recipients {
            match self.transport.send(recipient, &message).await {
                Ok(()) => {
                    debug!("Notified {} about {}", recipient, event.name);
                    report.delivered.push(recipient.clone());
                }
                Err(e) => {
                    warn!("Failed to notify {} about {}: {}", recipient, event.name, e);
                    report.failed.push((recipient.clone(), e));
                }
            }
        }

        if report.all_failed() {
            return Err(Error::notification(format!(
                "change of {} could not be delivered to any of {} recipient(s)",
                event.name,
                report.failed.len()
            )));
        }

        info!(
            "Change of {} delivered to {}/{} recipient(s)",
            event.name,
            report.delivered.len(),
            self.recipients.len()
        );
        Ok(report)
    }
}

/// Format a duration as `1d 2h 3m 4s`, dropping leading zero units
///
/// Negative durations (clock stepped backwards) render as `0s`.
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
