//! Host API handed to plugins

use std::sync::{Arc, Weak};

use super::manager::{PluginManager, ScanReport};
use super::trait_def::PluginInfo;
use crate::application::errors::PluginError;

/// Weak handle on the plugin manager.
///
/// Plugins keep this instead of the manager itself, so a plugin never keeps
/// its own host alive. Calls made after the manager is gone fail cleanly.
#[derive(Clone, Default)]
pub struct PluginHost {
    manager: Weak<PluginManager>,
}

impl PluginHost {
    pub(crate) fn new(manager: Weak<PluginManager>) -> Self {
        Self { manager }
    }

    /// A host that is not attached to any manager
    pub fn detached() -> Self {
        Self::default()
    }

    fn manager(&self) -> Result<Arc<PluginManager>, PluginError> {
        self.manager
            .upgrade()
            .ok_or_else(|| PluginError::Internal("plugin host has shut down".to_string()))
    }

    pub fn list_plugins(&self) -> Vec<PluginInfo> {
        self.manager.upgrade().map(|m| m.list()).unwrap_or_default()
    }

    pub fn get_plugin(&self, name: &str) -> Option<PluginInfo> {
        self.manager.upgrade()?.get(name)
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.manager.upgrade().is_some_and(|m| m.has(name))
    }

    pub async fn unload_plugin(&self, name: &str) -> Result<(), PluginError> {
        self.manager()?.unload(name).await
    }

    pub async fn reload_plugin(&self, name: &str) -> Result<ScanReport, PluginError> {
        self.manager()?.reload(name).await
    }

    pub async fn enable_plugin(&self, name: &str) -> Result<(), PluginError> {
        self.manager()?.enable(name).await
    }

    pub async fn disable_plugin(&self, name: &str) -> Result<(), PluginError> {
        self.manager()?.disable(name).await
    }

    pub async fn delete_plugin(&self, name: &str) -> Result<(), PluginError> {
        self.manager()?.delete(name).await
    }

    pub async fn run_plugin_task(&self, name: &str, task: &str) -> Result<(), PluginError> {
        self.manager()?.run_task(name, task).await
    }
}
