//! Prompt rendering on handlebars templates.

use std::fs;
use std::path::Path;

use finbot_core::{FinbotError, Result};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use crate::session::{Field, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    BaseInit,
    BaseInput,
    BaseInputExists,
    BaseInputConfirmation,
}

impl Template {
    pub const ALL: [Template; 4] = [
        Template::BaseInit,
        Template::BaseInput,
        Template::BaseInputExists,
        Template::BaseInputConfirmation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Template::BaseInit => "base_init",
            Template::BaseInput => "base_input",
            Template::BaseInputExists => "base_input_exists",
            Template::BaseInputConfirmation => "base_input_confirmation",
        }
    }

    /// Prompt template for the next field: `BaseInput` until something was collected.
    pub fn for_fields(fields: &[Field]) -> Self {
        if fields.is_empty() {
            Template::BaseInput
        } else {
            Template::BaseInputExists
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            Template::BaseInit => include_str!("../templates/base_init.hbs"),
            Template::BaseInput => include_str!("../templates/base_input.hbs"),
            Template::BaseInputExists => include_str!("../templates/base_input_exists.hbs"),
            Template::BaseInputConfirmation => {
                include_str!("../templates/base_input_confirmation.hbs")
            }
        }
    }
}

/// Data handed to a template.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderContext {
    pub command: Option<String>,
    pub data: Vec<Field>,
    /// Name of the field being asked for.
    pub params: Option<String>,
    pub confirm: Option<String>,
    pub note: Option<String>,
}

impl RenderContext {
    pub fn from_session(session: &Session) -> Self {
        Self {
            command: session.command.map(|c| c.label().to_string()),
            data: session.fields.clone(),
            params: None,
            confirm: session
                .confirmed
                .map(|yes| if yes { "yes" } else { "no" }.to_string()),
            note: None,
        }
    }

    pub fn params(mut self, params: impl Into<String>) -> Self {
        self.params = Some(params.into());
        self
    }

    pub fn note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

pub trait Renderer: Send + Sync {
    fn render(&self, template: Template, context: &RenderContext) -> Result<String>;
}

/// Renders the built-in templates as HTML. Values are HTML-escaped.
pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        for template in Template::ALL {
            registry
                .register_template_string(template.name(), template.builtin())
                .map_err(|e| FinbotError::Render(e.to_string()))?;
        }
        Ok(Self { registry })
    }

    /// Built-in templates, with any `<name>.hbs` found in `dir` taking precedence.
    pub fn with_template_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut renderer = Self::new()?;
        for template in Template::ALL {
            let path = dir.join(format!("{}.hbs", template.name()));
            if !path.is_file() {
                debug!(path = %path.display(), "No override, using built-in template");
                continue;
            }
            let source = fs::read_to_string(&path)?;
            renderer
                .registry
                .register_template_string(template.name(), source)
                .map_err(|e| FinbotError::Render(format!("{}: {}", path.display(), e)))?;
            info!(template = template.name(), path = %path.display(), "Template override loaded");
        }
        Ok(renderer)
    }
}

impl Renderer for HandlebarsRenderer {
    fn render(&self, template: Template, context: &RenderContext) -> Result<String> {
        let text = self
            .registry
            .render(template.name(), context)
            .map_err(|e| FinbotError::Render(e.to_string()))?;
        Ok(text.trim().to_string())
    }
}
