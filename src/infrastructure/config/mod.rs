//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::application::services::AccountMode;

/// Bootstrap configuration read at process start
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub plugins: PluginConfig,
    pub storage: StorageConfig,
    pub runtime: RuntimeConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    /// Own handle, used to match `/cmd@handle` mentions
    pub username: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginConfig {
    pub directory: PathBuf,
    pub auto_load: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// JSON file holding the persisted runtime documents
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Used when the persisted config has no prefixes
    pub prefixes: Vec<String>,
    /// 0 disables the limit
    pub handler_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AdminConfig {
    /// Seeds the super-admin when none is persisted yet
    pub owner: Option<String>,
    /// Seeds the account mode on first start
    pub account_mode: Option<AccountMode>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "carik-bot".to_string(),
            username: "carik_bot".to_string(),
        }
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./plugins"),
            auto_load: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/runtime.json"),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            prefixes: vec!["/".to_string(), "!".to_string()],
            handler_timeout_secs: 120,
        }
    }
}

impl RuntimeConfig {
    pub fn handler_timeout(&self) -> Option<Duration> {
        (self.handler_timeout_secs > 0).then(|| Duration::from_secs(self.handler_timeout_secs))
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.username.trim().is_empty() {
            return Err(ConfigError::MissingField("bot.username".to_string()));
        }
        if self.runtime.prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue("runtime.prefixes contains an empty prefix".to_string()));
        }
        Ok(())
    }

    /// Apply environment overrides on top of `self`
    pub fn with_env(mut self) -> Self {
        if let Ok(dir) = std::env::var("BOT_PLUGIN_DIR") {
            self.plugins.directory = PathBuf::from(dir);
        }

        if let Ok(prefixes) = std::env::var("BOT_PREFIXES") {
            let prefixes: Vec<String> = prefixes.split_whitespace().map(str::to_string).collect();
            if !prefixes.is_empty() {
                self.runtime.prefixes = prefixes;
            }
        }

        if let Ok(owner) = std::env::var("BOT_OWNER") {
            self.admin.owner = Some(owner);
        }

        if let Ok(store) = std::env::var("BOT_STORE") {
            self.storage.path = PathBuf::from(store);
        }

        self
    }

    pub fn load_env() -> Self {
        Config::default().with_env()
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
