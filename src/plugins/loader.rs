//! Plugin loader - Discovers plugin manifests in the plugin directory

use std::path::{Path, PathBuf};

use super::manifest::PluginManifest;
use crate::application::errors::PluginError;

/// Fixed entry file inside a plugin directory
pub const ENTRY_FILE: &str = "plugin.yaml";

const MANIFEST_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Dependency and build directories that never hold plugins
const IGNORED_DIRS: [&str; 3] = ["node_modules", "target", "vendor"];

/// One plugin found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCandidate {
    /// The plugin file or directory
    pub path: PathBuf,
    pub manifest_path: PathBuf,
    /// File stem or directory name
    pub stem: String,
}

impl PluginCandidate {
    pub fn manifest(&self) -> Result<PluginManifest, PluginError> {
        PluginManifest::from_file(&self.manifest_path)
    }
}

/// Plugin loader
#[derive(Debug, Clone)]
pub struct PluginLoader {
    plugin_dir: PathBuf,
}

impl PluginLoader {
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// List top-level plugin candidates in lexical order
    pub fn scan(&self) -> Result<Vec<PluginCandidate>, PluginError> {
        let mut candidates = Vec::new();

        if !self.plugin_dir.exists() {
            tracing::warn!("Plugin directory does not exist: {}", self.plugin_dir.display());
            return Ok(candidates);
        }

        let entries = std::fs::read_dir(&self.plugin_dir).map_err(|e| PluginError::Load {
            path: self.plugin_dir.clone(),
            reason: format!("Failed to read plugin directory: {}", e),
        })?;

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            if let Some(candidate) = Self::candidate(&entry.path()) {
                candidates.push(candidate);
            }
        }

        candidates.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(candidates)
    }

    fn candidate(path: &Path) -> Option<PluginCandidate> {
        let file_name = path.file_name()?.to_str()?;
        if file_name.starts_with('.') {
            return None;
        }

        if path.is_dir() {
            if IGNORED_DIRS.contains(&file_name) {
                return None;
            }
            let manifest_path = path.join(ENTRY_FILE);
            if !manifest_path.is_file() {
                tracing::debug!("Skipping {}: no {}", path.display(), ENTRY_FILE);
                return None;
            }
            return Some(PluginCandidate {
                path: path.to_path_buf(),
                manifest_path,
                stem: file_name.to_string(),
            });
        }

        let extension = path.extension()?.to_str()?;
        if !MANIFEST_EXTENSIONS.contains(&extension) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?.to_string();
        Some(PluginCandidate {
            path: path.to_path_buf(),
            manifest_path: path.to_path_buf(),
            stem,
        })
    }

    /// Find the on-disk entry for `name` by naming convention
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            return None;
        }
        let dir = self.plugin_dir.join(name);
        if dir.join(ENTRY_FILE).is_file() {
            return Some(dir);
        }
        MANIFEST_EXTENSIONS
            .iter()
            .map(|ext| self.plugin_dir.join(format!("{}.{}", name, ext)))
            .find(|p| p.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn plugin_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("echo.yaml"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a plugin").unwrap();
        fs::write(dir.path().join(".hidden.yaml"), "").unwrap();
        fs::create_dir(dir.path().join("weather")).unwrap();
        fs::write(dir.path().join("weather").join(ENTRY_FILE), "settings: {}").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules").join(ENTRY_FILE), "").unwrap();
        dir
    }

    #[test]
    fn test_scan_finds_top_level_candidates() {
        let dir = plugin_dir();
        let stems: Vec<String> = PluginLoader::new(dir.path())
            .scan()
            .unwrap()
            .into_iter()
            .map(|c| c.stem)
            .collect();
        assert_eq!(stems, vec!["echo", "weather"]);
    }

    #[test]
    fn test_scan_missing_directory_is_empty() {
        let loader = PluginLoader::new("/definitely/not/here");
        assert!(loader.scan().unwrap().is_empty());
    }

    #[test]
    fn test_locate_by_name() {
        let dir = plugin_dir();
        let loader = PluginLoader::new(dir.path());
        assert_eq!(loader.locate("echo"), Some(dir.path().join("echo.yaml")));
        assert_eq!(loader.locate("weather"), Some(dir.path().join("weather")));
        assert_eq!(loader.locate("empty"), None);
        assert_eq!(loader.locate("../echo"), None);
        assert_eq!(loader.locate("missing"), None);
    }
}
