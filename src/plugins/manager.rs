//! Plugin manager - handles plugin lifecycle
//!
//! All registry mutations go through this type and are serialized by a
//! single lifecycle lock. Handlers read the registry through snapshots and
//! never mutate it directly.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::catalog::PluginCatalog;
use super::host::PluginHost;
use super::loader::{PluginCandidate, PluginLoader};
use super::registry::{LoadedPlugin, PluginRegistry};
use super::scheduler::TaskScheduler;
use super::trait_def::{validate_contract, Plugin, PluginContext, PluginInfo};
use crate::application::errors::PluginError;
use crate::application::messaging::isolation::panic_message;
use crate::application::services::{AccountMode, RuntimeSettings};
use crate::domain::traits::Transport;

/// Knobs for the plugin manager
#[derive(Debug, Clone, Default)]
pub struct ManagerOptions {
    /// Limit applied to every command, update and run handler. `None` disables it.
    pub handler_timeout: Option<Duration>,
}

/// Outcome of one scan over the plugin directory
#[derive(Debug, Default)]
pub struct ScanReport {
    pub loaded: Vec<String>,
    pub errors: Vec<PluginError>,
}

/// Manages all plugins for the bot
pub struct PluginManager {
    this: Weak<PluginManager>,
    registry: PluginRegistry,
    loader: PluginLoader,
    catalog: PluginCatalog,
    scheduler: TaskScheduler,
    settings: RuntimeSettings,
    transport: Arc<dyn Transport>,
    options: ManagerOptions,
    lifecycle: Mutex<()>,
}

impl PluginManager {
    pub fn new(
        catalog: PluginCatalog,
        loader: PluginLoader,
        transport: Arc<dyn Transport>,
        settings: RuntimeSettings,
        options: ManagerOptions,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            registry: PluginRegistry::new(),
            loader,
            catalog,
            scheduler: TaskScheduler::new(Arc::clone(&transport), options.handler_timeout),
            settings,
            transport,
            options,
            lifecycle: Mutex::new(()),
        })
    }

    /// Host API handle for plugins
    pub fn host(&self) -> PluginHost {
        PluginHost::new(self.this.clone())
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn handler_timeout(&self) -> Option<Duration> {
        self.options.handler_timeout
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn plugin_dir(&self) -> &Path {
        self.loader.plugin_dir()
    }

    /// Snapshot of the loaded plugins in load order
    pub fn loaded(&self) -> Vec<Arc<LoadedPlugin>> {
        self.registry.list()
    }

    pub fn get(&self, name: &str) -> Option<PluginInfo> {
        self.registry.get(name).map(|p| p.info())
    }

    pub fn list(&self) -> Vec<PluginInfo> {
        self.registry.list().iter().map(|p| p.info()).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    /// Load every plugin in the plugin directory that is not loaded yet
    pub async fn load_all(&self) -> Result<ScanReport, PluginError> {
        let _guard = self.lifecycle.lock().await;
        self.scan_locked().await
    }

    /// Unload a plugin: run its `destroy` hook, stop its tasks, drop it from the registry
    pub async fn unload(&self, name: &str) -> Result<(), PluginError> {
        let _guard = self.lifecycle.lock().await;
        self.unload_locked(name).await
    }

    /// Unload `name` if loaded, then rescan the plugin directory
    pub async fn reload(&self, name: &str) -> Result<ScanReport, PluginError> {
        let _guard = self.lifecycle.lock().await;
        if self.registry.has(name) {
            self.unload_locked(name).await.map_err(|e| lifecycle(name, e))?;
        }
        let report = self.scan_locked().await?;
        if !self.registry.has(name) {
            warn!(plugin = %name, "Plugin not loaded after reload");
        }
        Ok(report)
    }

    /// Remove `name` from the disabled set. Does not load it.
    pub async fn enable(&self, name: &str) -> Result<(), PluginError> {
        let _guard = self.lifecycle.lock().await;
        let removed = self
            .settings
            .remove_disabled(name)
            .await
            .map_err(|e| lifecycle(name, e))?;
        if !removed {
            return Err(PluginError::NotDisabled(name.to_string()));
        }
        info!(plugin = %name, "Enabled plugin");
        Ok(())
    }

    /// Unload `name` if loaded, then add it to the disabled set.
    ///
    /// A plugin is never left both disabled and registered: if the flag cannot
    /// be persisted the plugin stays unloaded but enabled.
    pub async fn disable(&self, name: &str) -> Result<(), PluginError> {
        let _guard = self.lifecycle.lock().await;
        if self.settings.is_disabled(name).await {
            return Err(PluginError::AlreadyDisabled(name.to_string()));
        }
        if self.registry.has(name) {
            self.unload_locked(name).await.map_err(|e| lifecycle(name, e))?;
        }
        self.settings
            .add_disabled(name)
            .await
            .map_err(|e| lifecycle(name, e))?;
        info!(plugin = %name, "Disabled plugin");
        Ok(())
    }

    /// Unload `name` and remove its file or directory. Irreversible.
    pub async fn delete(&self, name: &str) -> Result<(), PluginError> {
        let _guard = self.lifecycle.lock().await;
        let path = self
            .registry
            .get(name)
            .map(|p| p.source.clone())
            .or_else(|| self.loader.locate(name))
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;

        if self.registry.has(name) {
            self.unload_locked(name).await.map_err(|e| lifecycle(name, e))?;
        }

        let removed = if path.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        removed.map_err(|e| lifecycle(name, e))?;

        if let Err(e) = self.settings.remove_disabled(name).await {
            error!(plugin = %name, "Failed to clear disabled flag: {}", e);
        }
        info!(plugin = %name, path = %path.display(), "Deleted plugin");
        Ok(())
    }

    /// Fire one run task of a loaded plugin and wait for it
    pub async fn run_task(&self, name: &str, task: &str) -> Result<(), PluginError> {
        let plugin = self
            .registry
            .get(name)
            .ok_or_else(|| PluginError::NotLoaded(name.to_string()))?;
        let definition = plugin.task(task).ok_or_else(|| PluginError::TaskNotFound {
            plugin: name.to_string(),
            task: task.to_string(),
        })?;

        let outcome = self.scheduler.run_once(name, definition).join().await;
        outcome.result.map_err(|source| PluginError::Task {
            plugin: name.to_string(),
            task: task.to_string(),
            source,
        })
    }

    /// Unload every plugin, newest first
    pub async fn shutdown(&self) {
        let _guard = self.lifecycle.lock().await;
        for name in self.registry.names().into_iter().rev() {
            if let Err(e) = self.unload_locked(&name).await {
                error!(plugin = %name, "Failed to unload during shutdown: {}", e);
            }
        }
    }

    async fn scan_locked(&self) -> Result<ScanReport, PluginError> {
        let candidates = self.loader.scan()?;
        let disabled = self.settings.disabled().await;
        let mode = self.settings.account_mode().await;
        let mut report = ScanReport::default();

        for candidate in candidates {
            if self.registry.list().iter().any(|p| p.source == candidate.path) {
                debug!(path = %candidate.path.display(), "Already loaded");
                continue;
            }

            match self.load_candidate(&candidate, &disabled, mode).await {
                Ok(name) => report.loaded.push(name),
                Err(e) => {
                    log_load_error(&candidate, &e);
                    report.errors.push(e);
                }
            }
        }

        info!(
            loaded = report.loaded.len(),
            skipped = report.errors.len(),
            total = self.registry.len(),
            "Plugin scan finished"
        );
        Ok(report)
    }

    async fn load_candidate(
        &self,
        candidate: &PluginCandidate,
        disabled: &HashSet<String>,
        mode: AccountMode,
    ) -> Result<String, PluginError> {
        let manifest = candidate.manifest()?;
        let declared = manifest.name_or(&candidate.stem).to_string();
        if disabled.contains(&declared) {
            return Err(PluginError::Disabled(declared));
        }

        let entry = manifest.entry_or(&candidate.stem).to_string();
        let factory = self.catalog.get(&entry).ok_or_else(|| PluginError::MissingEntry {
            path: candidate.path.clone(),
            package: entry.clone(),
        })?;

        let ctx = PluginContext {
            transport: Arc::clone(&self.transport),
            store: Arc::clone(self.settings.store()),
            host: self.host(),
            settings: manifest.settings.clone(),
            source: candidate.path.clone(),
        };
        let instance: Arc<dyn Plugin> = match std::panic::catch_unwind(AssertUnwindSafe(|| factory(ctx))) {
            Ok(Ok(plugin)) => Arc::from(plugin),
            Ok(Err(e)) => return Err(load_error(candidate, format!("constructor failed: {}", e))),
            Err(panic) => {
                return Err(load_error(
                    candidate,
                    format!("constructor panicked: {}", panic_message(panic)),
                ))
            }
        };

        let plugin_type = validate_contract(instance.as_ref())?;
        let name = instance.name().to_string();
        if name != declared && disabled.contains(&name) {
            return Err(PluginError::Disabled(name));
        }
        if !plugin_type.supports(mode) {
            return Err(PluginError::Incompatible {
                name,
                plugin_type: plugin_type.to_string(),
                mode: mode.to_string(),
            });
        }

        let loaded = Arc::new(LoadedPlugin::new(instance, plugin_type, candidate.path.clone()));
        self.registry.insert(Arc::clone(&loaded))?;
        self.scheduler.schedule(&name, &loaded.run_tasks);

        let hook = Arc::clone(&loaded.instance);
        let on_load = match tokio::spawn(async move { hook.on_load().await }).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(e) if e.is_panic() => Err(format!("panicked: {}", panic_message(e.into_panic()))),
            Err(e) => Err(e.to_string()),
        };
        if let Err(reason) = on_load {
            self.scheduler.cancel_plugin(&name);
            if let Err(e) = self.registry.remove(&name) {
                error!(plugin = %name, "Failed to roll back registration: {}", e);
            }
            return Err(load_error(candidate, format!("on_load failed: {}", reason)));
        }

        info!(
            plugin = %name,
            version = %loaded.version,
            commands = loaded.commands.len(),
            tasks = loaded.run_tasks.len(),
            "Loaded plugin"
        );
        Ok(name)
    }

    async fn unload_locked(&self, name: &str) -> Result<(), PluginError> {
        let plugin = self
            .registry
            .get(name)
            .ok_or_else(|| PluginError::NotLoaded(name.to_string()))?;

        let hook = Arc::clone(&plugin.instance);
        match tokio::spawn(async move { hook.destroy().await }).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(plugin = %name, "destroy() failed: {}", e),
            Err(e) => warn!(plugin = %name, "destroy() did not complete: {}", e),
        }

        let stopped = self.scheduler.cancel_plugin(name);
        self.registry.remove(name)?;
        info!(plugin = %name, stopped_tasks = stopped, "Unloaded plugin");
        Ok(())
    }
}

fn lifecycle(name: &str, e: impl std::fmt::Display) -> PluginError {
    PluginError::Lifecycle {
        name: name.to_string(),
        reason: e.to_string(),
    }
}

fn load_error(candidate: &PluginCandidate, reason: String) -> PluginError {
    PluginError::Load {
        path: candidate.path.clone(),
        reason,
    }
}

fn log_load_error(candidate: &PluginCandidate, e: &PluginError) {
    let path = candidate.path.display();
    match e {
        PluginError::Disabled(_) | PluginError::Incompatible { .. } => {
            warn!(path = %path, "Skipping plugin: {}", e)
        }
        PluginError::MissingEntry { package, .. } => error!(
            path = %path,
            "{}; build the host with the crate that registers '{}'",
            e,
            package
        ),
        _ => error!(path = %path, "Failed to load plugin: {}", e),
    }
}
