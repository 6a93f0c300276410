//! Persisted runtime settings layered over code-declared defaults

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::errors::{ConfigError, StorageError};
use crate::domain::entities::{CommandScope, Permission};
use crate::domain::traits::ConfigStore;

pub const PLUGINS_DOC: &str = "plugins";
pub const CONFIG_DOC: &str = "config";
pub const ADMIN_DOC: &str = "admin";
pub const ACCOUNT_MODE_DOC: &str = "accountMode";

/// Prefixes used when none are persisted
pub const DEFAULT_PREFIXES: [&str; 2] = ["/", "!"];

/// Whether the runtime drives a service (bot) account or a personal account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountMode {
    #[default]
    Bot,
    User,
}

impl AccountMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountMode::Bot => "bot",
            AccountMode::User => "user",
        }
    }

    pub fn is_self_operated(&self) -> bool {
        *self == AccountMode::User
    }
}

impl fmt::Display for AccountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginsDocument {
    #[serde(default)]
    pub disabled: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Per-command replacement for the declared scope and permission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessOverride {
    #[serde(default)]
    pub scope: Option<CommandScope>,
    #[serde(default)]
    pub permission: Option<Permission>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub command_overrides: HashMap<String, AccessOverride>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDocument {
    #[serde(default)]
    pub super_admin: Option<String>,
    #[serde(default)]
    pub admins: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountModeDocument {
    #[serde(default)]
    pub mode: AccountMode,
}

/// Typed access to the persisted documents the runtime consumes.
///
/// Reads never fail: a missing or malformed document yields its default and
/// the problem is logged. Writes go through [`ConfigStore::update`].
#[derive(Clone)]
pub struct RuntimeSettings {
    store: Arc<dyn ConfigStore>,
    default_prefixes: Vec<String>,
}

impl RuntimeSettings {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            default_prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn with_default_prefixes(mut self, prefixes: Vec<String>) -> Self {
        if !prefixes.is_empty() {
            self.default_prefixes = prefixes;
        }
        self
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    async fn document<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.store.read(key).await {
            Ok(Some(value)) => parse_document(key, value),
            Ok(None) => T::default(),
            Err(e) => {
                tracing::error!(document = key, "Failed to read settings, using defaults: {}", e);
                T::default()
            }
        }
    }

    pub async fn disabled(&self) -> HashSet<String> {
        let doc: PluginsDocument = self.document(PLUGINS_DOC).await;
        doc.disabled.into_iter().collect()
    }

    pub async fn is_disabled(&self, name: &str) -> bool {
        self.disabled().await.contains(name)
    }

    /// Add `name` to the disabled set. Returns false if it was already there.
    pub async fn add_disabled(&self, name: &str) -> Result<bool, StorageError> {
        let name = name.to_string();
        self.mutate_plugins(move |doc| {
            if doc.disabled.contains(&name) {
                false
            } else {
                doc.disabled.push(name);
                true
            }
        })
        .await
    }

    /// Remove `name` from the disabled set. Returns false if it was absent.
    pub async fn remove_disabled(&self, name: &str) -> Result<bool, StorageError> {
        let name = name.to_string();
        self.mutate_plugins(move |doc| {
            let before = doc.disabled.len();
            doc.disabled.retain(|n| *n != name);
            doc.disabled.len() != before
        })
        .await
    }

    async fn mutate_plugins<F>(&self, f: F) -> Result<bool, StorageError>
    where
        F: FnOnce(&mut PluginsDocument) -> bool + Send + 'static,
    {
        let changed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&changed);
        self.store
            .update(
                PLUGINS_DOC,
                Box::new(move |current| {
                    let mut doc: PluginsDocument =
                        current.map(|v| parse_document(PLUGINS_DOC, v)).unwrap_or_default();
                    let did_change = f(&mut doc);
                    flag.store(did_change, Ordering::SeqCst);
                    serde_json::to_value(&doc).unwrap_or_else(|_| serde_json::json!({ "disabled": [] }))
                }),
            )
            .await?;
        Ok(changed.load(Ordering::SeqCst))
    }

    /// Configured command prefixes, or the defaults if none are persisted
    pub async fn prefixes(&self) -> Vec<String> {
        let doc: ConfigDocument = self.document(CONFIG_DOC).await;
        let prefixes: Vec<String> = doc.prefixes.into_iter().filter(|p| !p.is_empty()).collect();
        if prefixes.is_empty() {
            self.default_prefixes.clone()
        } else {
            prefixes
        }
    }

    pub async fn command_overrides(&self) -> HashMap<String, AccessOverride> {
        let doc: ConfigDocument = self.document(CONFIG_DOC).await;
        doc.command_overrides
    }

    pub async fn set_command_override(&self, command: &str, access: AccessOverride) -> Result<(), StorageError> {
        let command = command.to_string();
        self.store
            .update(
                CONFIG_DOC,
                Box::new(move |current| {
                    let mut doc: ConfigDocument =
                        current.map(|v| parse_document(CONFIG_DOC, v)).unwrap_or_default();
                    doc.command_overrides.insert(command, access);
                    serde_json::to_value(&doc).unwrap_or_else(|_| serde_json::json!({}))
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn admin(&self) -> AdminDocument {
        self.document(ADMIN_DOC).await
    }

    /// Record `owner` as super-admin unless one is already configured
    pub async fn seed_owner(&self, owner: &str) -> Result<(), StorageError> {
        let owner = owner.to_string();
        self.store
            .update(
                ADMIN_DOC,
                Box::new(move |current| {
                    let mut doc: AdminDocument =
                        current.map(|v| parse_document(ADMIN_DOC, v)).unwrap_or_default();
                    if doc.super_admin.is_none() {
                        doc.super_admin = Some(owner);
                    }
                    serde_json::to_value(&doc).unwrap_or_else(|_| serde_json::json!({}))
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn account_mode(&self) -> AccountMode {
        let doc: AccountModeDocument = self.document(ACCOUNT_MODE_DOC).await;
        doc.mode
    }

    /// Record `mode` unless an account mode is already persisted
    pub async fn seed_account_mode(&self, mode: AccountMode) -> Result<(), StorageError> {
        self.store
            .update(
                ACCOUNT_MODE_DOC,
                Box::new(move |current| {
                    current
                        .filter(|v| v.get("mode").is_some())
                        .unwrap_or_else(|| serde_json::json!({ "mode": mode.as_str() }))
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn set_account_mode(&self, mode: AccountMode) -> Result<(), StorageError> {
        self.store
            .update(
                ACCOUNT_MODE_DOC,
                Box::new(move |_| serde_json::json!({ "mode": mode.as_str() })),
            )
            .await?;
        Ok(())
    }
}

fn parse_document<T: DeserializeOwned + Default>(key: &str, value: serde_json::Value) -> T {
    match serde_json::from_value(value) {
        Ok(doc) => doc,
        Err(e) => {
            let err = ConfigError::Parse(format!("document '{}': {}", key, e));
            tracing::error!("{}, using defaults", err);
            T::default()
        }
    }
}
