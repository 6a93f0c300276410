//! Plugin system for carik-bot
//!
//! Plugins are Rust types registered in a [`PluginCatalog`] at process start.
//! The plugin directory decides which of them are loaded: each plugin is a
//! `<name>.yaml` manifest or a `<name>/plugin.yaml` directory.

pub mod builtin;
pub mod catalog;
pub mod host;
pub mod loader;
pub mod manager;
pub mod manifest;
pub mod registry;
pub mod scheduler;
pub mod trait_def;

pub use catalog::{PluginCatalog, PluginFactory};
pub use host::PluginHost;
pub use loader::{PluginCandidate, PluginLoader};
pub use manager::{ManagerOptions, PluginManager, ScanReport};
pub use manifest::PluginManifest;
pub use registry::{LoadedPlugin, PluginRegistry};
pub use scheduler::TaskScheduler;
pub use trait_def::{Plugin, PluginContext, PluginInfo, PluginType};
