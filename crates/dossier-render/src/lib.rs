//! Template rendering for dossier reports.
//!
//! Binds a [`Document`](dossier_common::Document) to one of a fixed set of
//! templates and produces markup for the PDF stage.
//!
//! # Features
//!
//! - **Fixed template set**: `dossier` (tabular) and `scroll` (narrative);
//!   unknown names fall back to the configured default
//! - **Render-time redaction**: every printed value passes through the
//!   `redact` filter, which escapes it and marks `||spans||`
//! - **Markings**: classification banner, TLP level and a document control
//!   number derived from the report id, plus handling, declassification,
//!   distribution, source, threat and legal statements derived from metadata
//!
//! # Example
//!
//! ```
//! use dossier_common::Document;
//! use dossier_config::TemplateConfig;
//! use dossier_redact::RedactionPolicy;
//! use dossier_render::TemplateRenderer;
//!
//! let doc = Document::from_json_str(r#"{"summary": "Met ||Source A||"}"#).unwrap();
//! let renderer = TemplateRenderer::new(&TemplateConfig::default(), &RedactionPolicy::default());
//! let report = renderer.render(&doc, None).unwrap();
//! assert!(report.html.contains(r#"data-redaction-length="8""#));
//! ```

pub mod error;
pub mod markings;
pub mod renderer;
pub mod template;
pub mod view;

pub use error::{RenderError, Result};
pub use renderer::{RenderedReport, TemplateRenderer};
pub use markings::Markings;
pub use template::TemplateName;
pub use view::{control_number, DossierView};
