//! Plugin trait definitions

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::host::PluginHost;
use crate::application::errors::PluginError;
use crate::application::services::AccountMode;
use crate::domain::entities::{CommandDefinition, CommandInfo, RunTaskDefinition, UpdateHandlerDefinition};
use crate::domain::traits::{ConfigStore, Transport};

/// Core plugin trait that all plugins must implement
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique identifier for the plugin
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Account mode tag: `bot`, `user` or `universal`
    fn plugin_type(&self) -> &str;

    fn commands(&self) -> Vec<CommandDefinition> {
        Vec::new()
    }

    fn update_handlers(&self) -> Vec<UpdateHandlerDefinition> {
        Vec::new()
    }

    fn run_tasks(&self) -> Vec<RunTaskDefinition> {
        Vec::new()
    }

    /// Called once after the plugin is registered and its tasks scheduled
    async fn on_load(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called when the plugin is unloaded
    async fn destroy(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Which account modes a plugin runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Bot,
    User,
    Universal,
}

impl PluginType {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "bot" => Some(PluginType::Bot),
            "user" => Some(PluginType::User),
            "universal" | "any" => Some(PluginType::Universal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginType::Bot => "bot",
            PluginType::User => "user",
            PluginType::Universal => "universal",
        }
    }

    pub fn supports(&self, mode: AccountMode) -> bool {
        match self {
            PluginType::Universal => true,
            PluginType::Bot => mode == AccountMode::Bot,
            PluginType::User => mode == AccountMode::User,
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check the fields every plugin must provide and return its parsed type
pub fn validate_contract(plugin: &dyn Plugin) -> Result<PluginType, PluginError> {
    for (field, value) in [
        ("name", plugin.name()),
        ("version", plugin.version()),
        ("description", plugin.description()),
        ("type", plugin.plugin_type()),
    ] {
        if value.trim().is_empty() {
            return Err(PluginError::Contract(format!(
                "plugin '{}' has an empty {}",
                plugin.name(),
                field
            )));
        }
    }
    PluginType::parse(plugin.plugin_type()).ok_or_else(|| {
        PluginError::Contract(format!(
            "plugin '{}' has unknown type '{}'",
            plugin.name(),
            plugin.plugin_type()
        ))
    })
}

/// Handed to a plugin constructor
#[derive(Clone)]
pub struct PluginContext {
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn ConfigStore>,
    pub host: PluginHost,
    /// Free-form `settings` from the plugin manifest
    pub settings: serde_json::Value,
    pub source: PathBuf,
}

/// Plugin information for listing
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub plugin_type: PluginType,
    pub source: PathBuf,
    pub commands: Vec<CommandInfo>,
    pub tasks: Vec<String>,
}
