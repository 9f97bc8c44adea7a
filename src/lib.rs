//! Storefront Templates - server-side HTML/XML template rendering
//!
//! Binds named record lists to markup in one of two dialects:
//!
//! - **component loop**: elements marked `data-v-component-<kind>` are stamped once per record,
//!   with `data-v-<singular>-<field>` attributes receiving the record's values;
//! - **rule script**: a block of directive lines (aliases, one `foreach` loop, selector rules)
//!   followed by the markup skeleton they apply to.
//!
//! # Example
//!
//! ```rust
//! use storefront_templates::{render, ComponentDataRegistry, Record};
//! use serde_json::json;
//!
//! let mut registry = ComponentDataRegistry::new();
//! let records: Vec<Record> = serde_json::from_value(json!([{"name": "Widget"}])).unwrap();
//! registry.set("products", records);
//!
//! let html = render(
//!     r#"<ul data-v-component-products="products"><li data-v-product data-v-product-name>x</li></ul>"#,
//!     &registry,
//! )
//! .unwrap();
//! assert!(html.contains(">Widget</li>"));
//! ```

pub mod config;
pub mod dialect;
pub mod directive;
pub mod dom;
pub mod engine;
pub mod error;
pub mod processor;
pub mod registry;
pub mod store;

pub use config::{ConfigError, EngineConfig};
pub use dialect::Dialect;
pub use directive::Script;
pub use dom::{data_key, DomError, MarkupMode};
pub use engine::{CacheStats, TemplateEngine};
pub use error::{Diagnostic, DiagnosticKind};
pub use registry::{ComponentDataRegistry, Record, RegistryError};
pub use store::TemplateStore;

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during a render
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template file could not be read
    #[error("failed to read template '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The markup reader failed
    #[error(transparent)]
    Markup(#[from] DomError),
}

/// Render in-memory template text in HTML mode
///
/// Shorthand for [`TemplateEngine::render_source`] on a default engine.
pub fn render(source: &str, registry: &ComponentDataRegistry) -> Result<String, RenderError> {
    TemplateEngine::new().render_source(source, Path::new(""), registry)
}
