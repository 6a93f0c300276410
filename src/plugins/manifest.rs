//! Plugin manifest definition

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::errors::PluginError;

/// Contents of a `<name>.yaml` file or a plugin directory's `plugin.yaml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginManifest {
    /// Plugin name, defaults to the file or directory stem
    #[serde(default)]
    pub name: Option<String>,

    /// Catalog entry id, defaults to the plugin name
    #[serde(default)]
    pub entry: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    /// Passed to the plugin constructor untouched
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl PluginManifest {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PluginError::Load {
            path: path.to_path_buf(),
            reason: format!("Failed to read manifest: {}", e),
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| PluginError::Load {
            path: path.to_path_buf(),
            reason: format!("Failed to parse manifest: {}", e),
        })
    }

    pub fn name_or<'a>(&'a self, stem: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(stem)
    }

    pub fn entry_or<'a>(&'a self, stem: &'a str) -> &'a str {
        self.entry.as_deref().unwrap_or_else(|| self.name_or(stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_defaults_from_stem() {
        let manifest: PluginManifest = serde_yaml::from_str("author: someone").unwrap();
        assert_eq!(manifest.name_or("weather"), "weather");
        assert_eq!(manifest.entry_or("weather"), "weather");
    }

    #[test]
    fn test_manifest_entry_and_settings() {
        let manifest: PluginManifest =
            serde_yaml::from_str("name: forecast\nentry: weather\nsettings:\n  city: Jakarta\n").unwrap();
        assert_eq!(manifest.name_or("x"), "forecast");
        assert_eq!(manifest.entry_or("x"), "weather");
        assert_eq!(manifest.settings["city"], "Jakarta");
    }
}
