//! Plugin registry - Holds the loaded plugins in load order

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use super::trait_def::{Plugin, PluginInfo, PluginType};
use crate::application::errors::PluginError;
use crate::domain::entities::{CommandDefinition, RunTaskDefinition, UpdateHandlerDefinition};

/// A plugin instance together with the definitions it declared at load time
pub struct LoadedPlugin {
    pub name: String,
    pub version: String,
    pub description: String,
    pub plugin_type: PluginType,
    pub source: PathBuf,
    pub instance: Arc<dyn Plugin>,
    pub commands: Vec<CommandDefinition>,
    pub update_handlers: Vec<UpdateHandlerDefinition>,
    pub run_tasks: Vec<RunTaskDefinition>,
}

impl LoadedPlugin {
    pub fn new(instance: Arc<dyn Plugin>, plugin_type: PluginType, source: PathBuf) -> Self {
        Self {
            name: instance.name().to_string(),
            version: instance.version().to_string(),
            description: instance.description().to_string(),
            plugin_type,
            source,
            commands: instance.commands(),
            update_handlers: instance.update_handlers(),
            run_tasks: instance.run_tasks(),
            instance,
        }
    }

    pub fn command(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.iter().find(|c| c.matches(name))
    }

    pub fn task(&self, name: &str) -> Option<&RunTaskDefinition> {
        self.run_tasks.iter().find(|t| t.name == name)
    }

    pub fn info(&self) -> PluginInfo {
        PluginInfo {
            name: self.name.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            plugin_type: self.plugin_type,
            source: self.source.clone(),
            commands: self.commands.iter().map(|c| c.info()).collect(),
            tasks: self.run_tasks.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

/// Registry for managing loaded plugins
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<Vec<Arc<LoadedPlugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loaded plugin. The first plugin with a given name wins.
    pub fn insert(&self, plugin: Arc<LoadedPlugin>) -> Result<(), PluginError> {
        let mut plugins = self
            .plugins
            .write()
            .map_err(|_| PluginError::Internal("Lock poisoned".to_string()))?;

        if plugins.iter().any(|p| p.name == plugin.name) {
            return Err(PluginError::Duplicate(plugin.name.clone()));
        }

        plugins.push(plugin);
        Ok(())
    }

    /// Get a plugin by name
    pub fn get(&self, name: &str) -> Option<Arc<LoadedPlugin>> {
        self.plugins.read().ok()?.iter().find(|p| p.name == name).cloned()
    }

    /// All plugins in load order
    pub fn list(&self) -> Vec<Arc<LoadedPlugin>> {
        self.plugins.read().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.list().iter().map(|p| p.name.clone()).collect()
    }

    /// Check if a plugin is loaded
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&self, name: &str) -> Result<Arc<LoadedPlugin>, PluginError> {
        let mut plugins = self
            .plugins
            .write()
            .map_err(|_| PluginError::Internal("Lock poisoned".to_string()))?;

        let index = plugins
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| PluginError::NotLoaded(name.to_string()))?;
        Ok(plugins.remove(index))
    }

    /// Get the number of loaded plugins
    pub fn len(&self) -> usize {
        self.plugins.read().map(|p| p.len()).unwrap_or(0)
    }

    /// Check if no plugins are loaded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Plugin for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn version(&self) -> &str {
            "0.1.0"
        }
        fn description(&self) -> &str {
            "test"
        }
        fn plugin_type(&self) -> &str {
            "universal"
        }
    }

    fn loaded(name: &'static str, source: &str) -> Arc<LoadedPlugin> {
        Arc::new(LoadedPlugin::new(Arc::new(Named(name)), PluginType::Universal, PathBuf::from(source)))
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = PluginRegistry::new();
        registry.insert(loaded("echo", "a.yaml")).unwrap();
        let err = registry.insert(loaded("echo", "b.yaml")).unwrap_err();
        assert!(matches!(err, PluginError::Duplicate(name) if name == "echo"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("echo").unwrap().source, PathBuf::from("a.yaml"));
    }

    #[test]
    fn test_list_keeps_insertion_order() {
        let registry = PluginRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.insert(loaded(name, "x")).unwrap();
        }
        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);

        registry.remove("alpha").unwrap();
        assert_eq!(registry.names(), vec!["zeta", "mid"]);
        assert!(matches!(registry.remove("alpha"), Err(PluginError::NotLoaded(_))));
    }
}
