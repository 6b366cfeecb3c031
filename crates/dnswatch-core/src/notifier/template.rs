//! Notification templates
//!
//! Templates are askama templates compiled into the crate (see `templates/`).
//! A [`TemplateRenderer`] maps template names to render functions; each
//! function pulls the fields it needs out of the field map, and a missing
//! one is a render error, never an empty string.

use std::collections::HashMap;

use askama::Template;

use crate::error::{Error, Result};
use crate::traits::{MessageFields, MessageRenderer, RenderedMessage};

use super::{
    CHANGE_TEMPLATE, FIELD_ELAPSED, FIELD_NAME, FIELD_NEW, FIELD_PID, FIELD_PREVIOUS,
    FIELD_PROCESS_HOST, FIELD_TIMESTAMP,
};

/// Renders one named template from a field map
pub type RenderFn = fn(&MessageFields) -> Result<RenderedMessage>;

/// Subject line of the change notification
#[derive(Template)]
#[template(path = "change_subject.txt")]
pub struct ChangeSubject<'a> {
    pub host_name: &'a str,
}

/// Body of the change notification
#[derive(Template)]
#[template(path = "change_body.txt")]
pub struct ChangeBody<'a> {
    pub host_name: &'a str,
    pub previous_ip: &'a str,
    pub new_ip: &'a str,
    pub elapsed: &'a str,
    pub timestamp: &'a str,
    pub process_hostname: &'a str,
    pub pid: &'a str,
}

impl<'a> ChangeBody<'a> {
    /// Fill the body from a field map
    pub fn from_fields(fields: &'a MessageFields) -> Result<Self> {
        Ok(Self {
            host_name: field(fields, FIELD_NAME)?,
            previous_ip: field(fields, FIELD_PREVIOUS)?,
            new_ip: field(fields, FIELD_NEW)?,
            elapsed: field(fields, FIELD_ELAPSED)?,
            timestamp: field(fields, FIELD_TIMESTAMP)?,
            process_hostname: field(fields, FIELD_PROCESS_HOST)?,
            pid: field(fields, FIELD_PID)?,
        })
    }
}

/// The built-in change notification
pub fn render_change(fields: &MessageFields) -> Result<RenderedMessage> {
    let subject = ChangeSubject {
        host_name: field(fields, FIELD_NAME)?,
    }
    .render()
    .map_err(|e| Error::render(format!("Change subject: {}", e)))?;

    let body = ChangeBody::from_fields(fields)?
        .render()
        .map_err(|e| Error::render(format!("Change body: {}", e)))?;

    Ok(RenderedMessage {
        subject: subject.trim_end().to_string(),
        body: body.into_bytes(),
    })
}

fn field<'a>(fields: &'a MessageFields, key: &str) -> Result<&'a str> {
    fields
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| Error::render(format!("Missing field: {}", key)))
}

/// Renderer over a set of named templates
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    templates: HashMap<String, RenderFn>,
}

impl TemplateRenderer {
    /// Create a renderer with no templates
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Create a renderer holding the built-in change template
    pub fn new() -> Self {
        Self::empty().with_template(CHANGE_TEMPLATE, render_change)
    }

    /// Register (or replace) a template
    pub fn with_template(mut self, name: impl Into<String>, render: RenderFn) -> Self {
        self.templates.insert(name.into(), render);
        self
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRenderer for TemplateRenderer {
    fn render(&self, template_name: &str, fields: &MessageFields) -> Result<RenderedMessage> {
        let render = self
            .templates
            .get(template_name)
            .ok_or_else(|| Error::render(format!("Unknown template: {}", template_name)))?;

        render(fields)
    }
}
