//! Application layer errors

use std::path::PathBuf;
use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by plugin loading and lifecycle operations
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Failed to load plugin from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Plugin entry '{package}' required by {path} is not compiled into this host")]
    MissingEntry { path: PathBuf, package: String },

    #[error("Plugin '{0}' already loaded")]
    Duplicate(String),

    #[error("Plugin contract violated: {0}")]
    Contract(String),

    #[error("Plugin '{name}' targets '{plugin_type}' accounts, runtime is in {mode} mode")]
    Incompatible {
        name: String,
        plugin_type: String,
        mode: String,
    },

    #[error("Plugin '{0}' is disabled")]
    Disabled(String),

    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Plugin '{0}' is not loaded")]
    NotLoaded(String),

    #[error("Plugin '{0}' is not disabled")]
    NotDisabled(String),

    #[error("Plugin '{0}' is already disabled")]
    AlreadyDisabled(String),

    #[error("Run task '{task}' not found in plugin '{plugin}'")]
    TaskNotFound { plugin: String, task: String },

    #[error("Run task '{task}' of plugin '{plugin}' failed: {source}")]
    Task {
        plugin: String,
        task: String,
        #[source]
        source: HandlerError,
    },

    #[error("Lifecycle operation failed for '{name}': {reason}")]
    Lifecycle { name: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single command, update or run handler
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Execution failed: {0}")]
    Failed(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Timed out after {0:?}")]
    TimedOut(std::time::Duration),

    #[error("Handler panicked: {0}")]
    Panicked(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<BotError> for HandlerError {
    fn from(e: BotError) -> Self {
        HandlerError::Failed(e.to_string())
    }
}

impl From<PluginError> for HandlerError {
    fn from(e: PluginError) -> Self {
        HandlerError::Failed(e.to_string())
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// A command invocation refused by the access resolver.
///
/// The reason is shown to the caller as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct AccessDenied {
    pub reason: String,
}

impl AccessDenied {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
