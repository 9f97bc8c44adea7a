//! Template engine: cache, registry and dialect dispatch

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::dialect::Dialect;
use crate::dom::MarkupMode;
use crate::processor::{ComponentLoopProcessor, RuleScriptProcessor};
use crate::registry::{ComponentDataRegistry, Record};
use crate::store::TemplateStore;
use crate::RenderError;

/// Snapshot of the engine's caches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Templates held in the source cache
    pub templates: usize,
    /// Components registered in the engine-owned registry
    pub component_data: usize,
    /// Template files read from disk since the engine was created
    pub reads: usize,
}

/// Renders templates from disk against registered component data
///
/// The engine is `Sync`: any number of threads may call [`render_with`](Self::render_with)
/// concurrently, each with its own registry. [`render`](Self::render) uses the engine-owned
/// registry, which can only be changed through `&mut self`.
#[derive(Debug, Default)]
pub struct TemplateEngine {
    config: EngineConfig,
    store: TemplateStore,
    registry: ComponentDataRegistry,
}

impl TemplateEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let store = match &config.template_root {
            Some(root) => TemplateStore::with_root(root),
            None => TemplateStore::new(),
        };
        Self {
            config,
            store,
            registry: ComponentDataRegistry::new(),
        }
    }

    /// Replace the engine-owned registry
    pub fn with_registry(mut self, registry: ComponentDataRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ComponentDataRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentDataRegistry {
        &mut self.registry
    }

    /// Register (or replace) the records for a component
    pub fn set_component_data(&mut self, name: impl Into<String>, records: Vec<Record>) {
        self.registry.set(name, records);
    }

    /// Raw text of a template, loaded through the cache
    pub fn source(&self, path: impl AsRef<Path>) -> Result<Arc<str>, RenderError> {
        self.store.load(path.as_ref())
    }

    /// Render a template against the engine-owned registry
    pub fn render(&self, path: impl AsRef<Path>) -> Result<String, RenderError> {
        self.render_with(path, &self.registry)
    }

    /// Render a template against an explicit registry
    pub fn render_with(
        &self,
        path: impl AsRef<Path>,
        registry: &ComponentDataRegistry,
    ) -> Result<String, RenderError> {
        let path = path.as_ref();
        let source = self.store.load(path)?;
        self.render_source(&source, path, registry)
    }

    /// Render in-memory template text
    ///
    /// `path_hint` only selects the serialization mode of component-loop templates.
    pub fn render_source(
        &self,
        source: &str,
        path_hint: &Path,
        registry: &ComponentDataRegistry,
    ) -> Result<String, RenderError> {
        let dialect = Dialect::choose(source);
        debug!(path = %path_hint.display(), %dialect, "rendering template");

        let output = match dialect {
            Dialect::ComponentLoop => {
                let mode = if self.config.is_xml(path_hint) {
                    MarkupMode::Xml
                } else {
                    MarkupMode::Html
                };
                ComponentLoopProcessor::new(registry).render(source, mode)?
            }
            Dialect::RuleScript => RuleScriptProcessor::new(registry).render(source)?,
        };
        Ok(output)
    }

    /// Drop every cached template
    ///
    /// Registered component data is kept. To start from an empty registry as well, assign
    /// `ComponentDataRegistry::new()` through [`registry_mut`](Self::registry_mut).
    pub fn clear_cache(&self) {
        self.store.clear();
        debug!("template cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            templates: self.store.len(),
            component_data: self.registry.len(),
            reads: self.store.reads(),
        }
    }
}
