//! Compile-time table of plugin constructors keyed by entry id

use std::collections::HashMap;
use std::sync::Arc;

use super::trait_def::{Plugin, PluginContext};
use crate::application::errors::PluginError;

/// Builds a plugin instance from its context
pub type PluginFactory = Arc<dyn Fn(PluginContext) -> Result<Box<dyn Plugin>, PluginError> + Send + Sync>;

/// Every plugin implementation this host binary can instantiate
#[derive(Clone, Default)]
pub struct PluginCatalog {
    entries: HashMap<String, PluginFactory>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-populated with the built-in plugins
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        super::builtin::register_builtins(&mut catalog);
        catalog
    }

    /// Register a constructor. A later registration under the same id replaces the earlier one.
    pub fn register<F>(&mut self, entry: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(PluginContext) -> Result<Box<dyn Plugin>, PluginError> + Send + Sync + 'static,
    {
        self.entries.insert(entry.into(), Arc::new(factory));
        self
    }

    pub fn get(&self, entry: &str) -> Option<PluginFactory> {
        self.entries.get(entry).cloned()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains_key(entry)
    }

    pub fn entries(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}
