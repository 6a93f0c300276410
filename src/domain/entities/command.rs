use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use super::{ChatKind, Message};
use crate::application::errors::HandlerError;
use crate::domain::traits::Transport;

/// Future returned by every plugin handler
pub type HandlerFuture = BoxFuture<'static, Result<(), HandlerError>>;

/// Command handler function type
pub type CommandHandler = Arc<dyn Fn(CommandContext) -> HandlerFuture + Send + Sync>;

/// A single chat-context class a command may be scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeClass {
    All,
    Private,
    Group,
    Channel,
}

impl ScopeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeClass::All => "all",
            ScopeClass::Private => "private",
            ScopeClass::Group => "group",
            ScopeClass::Channel => "channel",
        }
    }

    pub fn admits(&self, kind: ChatKind) -> bool {
        match self {
            ScopeClass::All => true,
            ScopeClass::Private => kind == ChatKind::Private,
            ScopeClass::Group => kind == ChatKind::Group,
            ScopeClass::Channel => kind == ChatKind::Channel,
        }
    }
}

/// Where a command may be invoked: one class or a set of classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandScope {
    One(ScopeClass),
    Many(Vec<ScopeClass>),
}

impl CommandScope {
    pub fn all() -> Self {
        CommandScope::One(ScopeClass::All)
    }

    pub fn only(classes: impl IntoIterator<Item = ScopeClass>) -> Self {
        CommandScope::Many(classes.into_iter().collect())
    }

    /// Normalized set of classes, never empty
    pub fn classes(&self) -> Vec<ScopeClass> {
        match self {
            CommandScope::One(class) => vec![*class],
            CommandScope::Many(classes) if classes.is_empty() => vec![ScopeClass::All],
            CommandScope::Many(classes) => classes.clone(),
        }
    }

    pub fn admits(&self, kind: ChatKind) -> bool {
        self.classes().iter().any(|c| c.admits(kind))
    }
}

impl Default for CommandScope {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for CommandScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.classes().iter().map(|c| c.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

/// Permission tier a command requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    All,
    Admin,
    Owner,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::All => "all",
            Permission::Admin => "admin",
            Permission::Owner => "owner",
        }
    }
}

/// Everything a command handler gets to see about one invocation
#[derive(Clone)]
pub struct CommandContext {
    pub plugin: String,
    /// Prefix the command was typed with
    pub prefix: String,
    pub command: String,
    pub args: Vec<String>,
    pub message: Message,
    pub chat_kind: ChatKind,
    pub transport: Arc<dyn Transport>,
}

impl CommandContext {
    /// Send a text reply into the chat the command came from
    pub async fn reply(&self, text: &str) -> Result<String, HandlerError> {
        self.transport
            .send_message(&self.message.chat_id, text)
            .await
            .map_err(|e| HandlerError::Transport(e.to_string()))
    }
}

/// Represents a command a plugin exposes
#[derive(Clone)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    pub scope: CommandScope,
    pub permission: Permission,
    pub show_in_help: bool,
    pub handler: CommandHandler,
}

impl CommandDefinition {
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            scope: CommandScope::default(),
            permission: Permission::default(),
            show_in_help: true,
            handler: Arc::new(move |ctx| handler(ctx).boxed()),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_scope(mut self, scope: CommandScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.show_in_help = false;
        self
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn info(&self) -> CommandInfo {
        CommandInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            scope: self.scope.clone(),
            permission: self.permission,
            show_in_help: self.show_in_help,
        }
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// Handler-free view of a command for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
    pub scope: CommandScope,
    pub permission: Permission,
    pub show_in_help: bool,
}
