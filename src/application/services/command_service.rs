//! Routes prefixed commands to every plugin that declares them

use std::sync::Arc;
use std::time::Duration;

use super::access_service::{AccessRequest, AccessResolver};
use super::settings_service::RuntimeSettings;
use crate::application::errors::AccessDenied;
use crate::application::messaging::isolation::Isolated;
use crate::application::messaging::parser::CommandParser;
use crate::domain::entities::{CommandContext, Message};
use crate::domain::traits::Transport;
use crate::plugins::registry::LoadedPlugin;

/// Result of routing one message
pub struct RoutedCommand {
    pub name: String,
    pub args: Vec<String>,
    /// One spawned handler per plugin that passed the access check, in registry order
    pub jobs: Vec<Isolated>,
    pub denied: Vec<(String, AccessDenied)>,
}

pub struct CommandRouter {
    transport: Arc<dyn Transport>,
    settings: RuntimeSettings,
    timeout: Option<Duration>,
}

impl CommandRouter {
    pub fn new(transport: Arc<dyn Transport>, settings: RuntimeSettings, timeout: Option<Duration>) -> Self {
        Self {
            transport,
            settings,
            timeout,
        }
    }

    /// Parse `message` and start the handlers of every plugin that declares the command.
    ///
    /// Returns `None` when the message is not a command for this host.
    pub async fn route(&self, plugins: &[Arc<LoadedPlugin>], message: &Message) -> Option<RoutedCommand> {
        let text = message.command_text()?;
        let info = self.transport.bot_info();
        let parser = CommandParser::new(self.settings.prefixes().await, info.username.as_str());
        let parsed = parser.parse(text)?;

        let chat_kind = self.transport.classify_chat(message);
        let resolver = AccessResolver::from_settings(&self.settings, info.id.as_str()).await;

        let mut routed = RoutedCommand {
            name: parsed.name.clone(),
            args: parsed.args.clone(),
            jobs: Vec::new(),
            denied: Vec::new(),
        };

        for plugin in plugins {
            let Some(command) = plugin.command(&parsed.name) else {
                continue;
            };

            let request = AccessRequest {
                prefix: &parsed.prefix,
                command: &command.name,
                scope: &command.scope,
                permission: command.permission,
                chat_kind,
                caller: message.sender_id(),
            };
            if let Err(denied) = resolver.check(request) {
                tracing::info!(plugin = %plugin.name, command = %command.name, "Access denied: {}", denied);
                routed.denied.push((plugin.name.clone(), denied));
                continue;
            }

            let ctx = CommandContext {
                plugin: plugin.name.clone(),
                prefix: parsed.prefix.clone(),
                command: command.name.clone(),
                args: parsed.args.clone(),
                message: message.clone(),
                chat_kind,
                transport: Arc::clone(&self.transport),
            };
            let fut = (command.handler)(ctx);
            routed
                .jobs
                .push(Isolated::spawn(plugin.name.clone(), format!("command:{}", command.name), fut, self.timeout));
        }

        if routed.jobs.is_empty() {
            if let Some((_, denied)) = routed.denied.first() {
                if let Err(e) = self.transport.send_message(&message.chat_id, &denied.reason).await {
                    tracing::warn!("Failed to send access denial: {}", e);
                }
            }
        }

        Some(routed)
    }
}
