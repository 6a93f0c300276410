//! Message-driven plugin runtime for chat bots.
//!
//! Plugins are discovered from a plugin directory, receive prefixed commands
//! through access-checked routing, observe every platform update concurrently
//! and run background tasks on cron or interval triggers.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;

pub use application::errors::{BotError, HandlerError, PluginError};
pub use application::messaging::{DispatchReport, UpdateDispatcher};
pub use application::services::{AccountMode, RuntimeSettings};
pub use plugins::{Plugin, PluginCatalog, PluginContext, PluginHost, PluginLoader, PluginManager};
