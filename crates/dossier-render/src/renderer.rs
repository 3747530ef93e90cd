//! Template renderer implementation.

use crate::error::{RenderError, Result};
use crate::template::{DossierTemplate, ScrollTemplate, TemplateName};
use crate::view::DossierView;
use askama::Template;
use chrono::{DateTime, Utc};
use dossier_common::Document;
use dossier_config::TemplateConfig;
use dossier_redact::RedactionPolicy;
use tracing::{debug, info, warn};

/// Rendered markup plus what it was rendered with.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    pub template: TemplateName,
    /// True when the requested template was unknown and the default was used.
    pub fell_back: bool,
    pub title: String,
    pub control_number: String,
    pub html: String,
}

/// Binds documents to the fixed template set.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    default_template: String,
    policy: RedactionPolicy,
}

impl TemplateRenderer {
    pub fn new(templates: &TemplateConfig, policy: &RedactionPolicy) -> Self {
        Self {
            default_template: templates.default_template.clone(),
            policy: policy.clone(),
        }
    }

    /// All template names this renderer can produce.
    pub fn available() -> &'static [TemplateName] {
        &TemplateName::ALL
    }

    /// Pick the template for a request.
    ///
    /// A missing or unknown request falls back to the configured default.
    /// Returns the template and whether a fallback happened.
    pub fn resolve(&self, requested: Option<&str>) -> Result<(TemplateName, bool)> {
        if let Some(name) = requested {
            match name.parse::<TemplateName>() {
                Ok(template) => return Ok((template, false)),
                Err(_) => warn!(
                    requested = name,
                    default = %self.default_template,
                    "unknown template, falling back to default"
                ),
            }
        }
        let template = self
            .default_template
            .parse::<TemplateName>()
            .map_err(|_| RenderError::UnknownDefaultTemplate(self.default_template.clone()))?;
        Ok((template, requested.is_some()))
    }

    /// Render a document now.
    pub fn render(&self, doc: &Document, requested: Option<&str>) -> Result<RenderedReport> {
        self.render_at(doc, requested, Utc::now())
    }

    /// Render a document with an explicit generation timestamp.
    pub fn render_at(
        &self,
        doc: &Document,
        requested: Option<&str>,
        generated_at: DateTime<Utc>,
    ) -> Result<RenderedReport> {
        let (template, fell_back) = self.resolve(requested)?;
        let view = DossierView::from_document(doc);
        let generated_at = generated_at.format("%Y-%m-%d %H:%M UTC").to_string();
        let css_class = self.policy.css_class.as_str();

        debug!(template = %template, sections = view.sections.len(), "rendering document");
        let html = match template {
            TemplateName::Dossier => DossierTemplate {
                view: &view,
                css_class,
                generated_at: &generated_at,
            }
            .render()?,
            TemplateName::Scroll => ScrollTemplate {
                view: &view,
                css_class,
                generated_at: &generated_at,
            }
            .render()?,
        };

        info!(
            template = %template,
            bytes = html.len(),
            title = %view.title,
            "Report rendered"
        );

        Ok(RenderedReport {
            template,
            fell_back,
            title: view.title,
            control_number: view.control_number,
            html,
        })
    }
}
