//! Decides whether a caller may invoke a command in a given chat

use std::collections::HashMap;

use super::settings_service::{AccessOverride, AccountMode, AdminDocument, RuntimeSettings};
use crate::application::errors::AccessDenied;
use crate::domain::entities::{ChatKind, CommandScope, Permission};

/// Caller authority, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    User,
    Admin,
    Owner,
}

/// One command invocation to be checked
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Prefix the caller typed, echoed back in denial reasons
    pub prefix: &'a str,
    pub command: &'a str,
    pub scope: &'a CommandScope,
    pub permission: Permission,
    pub chat_kind: ChatKind,
    pub caller: Option<&'a str>,
}

/// Snapshot of everything the access decision depends on
#[derive(Debug, Clone, Default)]
pub struct AccessResolver {
    pub mode: AccountMode,
    pub self_id: String,
    pub admin: AdminDocument,
    pub overrides: HashMap<String, AccessOverride>,
}

impl AccessResolver {
    pub fn new(mode: AccountMode, self_id: impl Into<String>, admin: AdminDocument) -> Self {
        Self {
            mode,
            self_id: self_id.into(),
            admin,
            overrides: HashMap::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, AccessOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Read the current policy from persisted settings
    pub async fn from_settings(settings: &RuntimeSettings, self_id: impl Into<String>) -> Self {
        let mode = settings.account_mode().await;
        let admin = settings.admin().await;
        let overrides = settings.command_overrides().await;
        Self::new(mode, self_id, admin).with_overrides(overrides)
    }

    fn is_self(&self, caller: Option<&str>) -> bool {
        self.mode.is_self_operated() && caller.is_some_and(|c| c == self.self_id)
    }

    pub fn resolve_tier(&self, caller: Option<&str>) -> Tier {
        let Some(caller) = caller else {
            return Tier::User;
        };
        if self.admin.super_admin.as_deref() == Some(caller) || self.is_self(Some(caller)) {
            Tier::Owner
        } else if self.admin.admins.iter().any(|a| a == caller) {
            Tier::Admin
        } else {
            Tier::User
        }
    }

    /// Allow or deny, stopping at the first failing check
    pub fn check(&self, request: AccessRequest<'_>) -> Result<(), AccessDenied> {
        // An override replaces both fields; missing ones fall back to the open defaults.
        let (scope, permission) = match self.overrides.get(request.command) {
            Some(o) => (o.scope.clone().unwrap_or_default(), o.permission.unwrap_or_default()),
            None => (request.scope.clone(), request.permission),
        };

        if !scope.admits(request.chat_kind) {
            return Err(AccessDenied::new(format!(
                "{}{} can only be used in {} chats",
                request.prefix, request.command, scope
            )));
        }

        if self.is_self(request.caller) {
            return Ok(());
        }

        let tier = self.resolve_tier(request.caller);
        let required = match permission {
            Permission::All if self.mode.is_self_operated() => Tier::Admin,
            Permission::All => Tier::User,
            Permission::Admin => Tier::Admin,
            Permission::Owner => Tier::Owner,
        };

        if tier >= required {
            Ok(())
        } else if required == Tier::Owner {
            Err(AccessDenied::new(format!(
                "{}{} is reserved for the owner",
                request.prefix, request.command
            )))
        } else {
            Err(AccessDenied::new(format!(
                "{}{} requires admin rights",
                request.prefix, request.command
            )))
        }
    }
}
