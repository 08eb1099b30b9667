//! Tool catalog: immutable, name-indexed set of compiled tools, plus the
//! handle that publishes it to concurrent sessions.
//!
//! A catalog is never patched. Reloading a description builds a whole new
//! catalog and swaps it in with a single atomic store, so readers see either
//! the old snapshot or the new one.

use crate::spec::{load_document, SpecModel};
use crate::tools::compiler::compile;
use crate::tools::tool::Tool;
use crate::types::{Error, Result};
use arc_swap::ArcSwap;
use reqwest::Url;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// Tool catalog
// =============================================================================

/// Compiled tools for one loaded description.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
    base_url: Option<Url>,
}

impl ToolCatalog {
    /// Index a compiled tool list. Fails if two tools share a name.
    pub fn build(tools: Vec<Tool>) -> Result<Self> {
        let mut index = HashMap::with_capacity(tools.len());
        for (position, tool) in tools.iter().enumerate() {
            if index.insert(tool.name.clone(), position).is_some() {
                return Err(Error::DuplicateToolName(tool.name.clone()));
            }
        }
        Ok(Self {
            tools,
            index,
            base_url: None,
        })
    }

    /// Compile a description and index the result, taking the base URL from
    /// `base_url_override` or else the document's first server.
    pub fn from_spec(spec: &SpecModel, base_url_override: Option<&str>) -> Result<Self> {
        let catalog = Self::build(compile(spec)?)?;
        Ok(catalog.with_base_url(base_url_override.or(spec.base_url())))
    }

    /// Attach the base URL for outbound calls. An unparsable URL is logged
    /// and treated as absent.
    pub fn with_base_url(mut self, base_url: Option<&str>) -> Self {
        self.base_url = base_url
            .filter(|url| !url.is_empty())
            .and_then(|url| match Url::parse(url) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!("Ignoring unusable base URL {:?}: {}", url, e);
                    None
                }
            });
        self
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).and_then(|&i| self.tools.get(i))
    }

    /// Get a tool by name, failing with [`Error::ToolNotFound`].
    pub fn lookup(&self, name: &str) -> Result<&Tool> {
        self.get(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))
    }

    /// All tools in compiled order.
    pub fn list(&self) -> &[Tool] {
        &self.tools
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// =============================================================================
// Published catalog
// =============================================================================

/// Process-wide publication point for the current catalog.
///
/// Lifecycle is `load → compile → publish`. Readers call [`load`] and keep
/// the returned snapshot for the duration of one request.
///
/// [`load`]: CatalogHandle::load
#[derive(Debug)]
pub struct CatalogHandle {
    current: ArcSwap<ToolCatalog>,
    base_url_override: Option<String>,
}

impl CatalogHandle {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self {
            current: ArcSwap::from_pointee(catalog),
            base_url_override: None,
        }
    }

    /// Load, compile and wrap a description file.
    pub fn open(path: impl AsRef<Path>, base_url_override: Option<String>) -> Result<Self> {
        let spec = load_document(path)?;
        let catalog = ToolCatalog::from_spec(&spec, base_url_override.as_deref())?;
        Ok(Self {
            current: ArcSwap::from_pointee(catalog),
            base_url_override,
        })
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<ToolCatalog> {
        self.current.load_full()
    }

    /// Replace the published catalog.
    pub fn publish(&self, catalog: ToolCatalog) {
        let count = catalog.len();
        self.current.store(Arc::new(catalog));
        tracing::info!(tools = count, "Published tool catalog");
    }

    /// Rebuild from a description file and publish it. On any error the
    /// previous catalog stays published. Returns the new tool count.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<usize> {
        let spec = load_document(path)?;
        let catalog = ToolCatalog::from_spec(&spec, self.base_url_override.as_deref())?;
        let count = catalog.len();
        self.publish(catalog);
        Ok(count)
    }
}

// =============================================================================
// Tests
// =============================================================================
