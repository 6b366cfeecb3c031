//! Message renderer trait
//!
//! Rendering is a pure function from a set of named fields to a message. The
//! notifier supplies a fixed set of fields and does not care how they end up
//! formatted.

use std::collections::BTreeMap;

/// Named fields handed to a renderer
pub type MessageFields = BTreeMap<String, String>;

/// A rendered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Subject line
    pub subject: String,
    /// Message body
    pub body: Vec<u8>,
}

impl RenderedMessage {
    /// Body as text, replacing invalid UTF-8
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Trait for message renderers
pub trait MessageRenderer: Send + Sync {
    /// Render the template `template_name` with `fields`
    ///
    /// # Returns
    ///
    /// - `Ok(RenderedMessage)`: The rendered subject and body
    /// - `Err(Error)`: Unknown template or a field the template needs is missing
    fn render(
        &self,
        template_name: &str,
        fields: &MessageFields,
    ) -> Result<RenderedMessage, crate::Error>;
}
