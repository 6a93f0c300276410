//! Update dispatcher - Fans every platform event out to interested plugins

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;

use crate::application::errors::{AccessDenied, HandlerError};
use crate::application::messaging::isolation::Isolated;
use crate::application::services::CommandRouter;
use crate::domain::entities::{Update, UpdateContext, UpdateKind};
use crate::plugins::PluginManager;

/// What happened to one update
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Command name, if the update carried a command for this host
    pub command: Option<String>,
    /// Plugins whose command handler ran, in registry order
    pub invoked: Vec<String>,
    pub denied: Vec<(String, AccessDenied)>,
    /// Handlers that ran, command and update handlers alike
    pub handled: usize,
    pub failures: Vec<(String, HandlerError)>,
}

/// Routes commands and runs generic update handlers for every inbound event
pub struct UpdateDispatcher {
    manager: Arc<PluginManager>,
    router: CommandRouter,
}

impl UpdateDispatcher {
    pub fn new(manager: Arc<PluginManager>) -> Self {
        let router = CommandRouter::new(
            Arc::clone(manager.transport()),
            manager.settings().clone(),
            manager.handler_timeout(),
        );
        Self { manager, router }
    }

    /// Run every matching handler concurrently and wait for all of them
    pub async fn dispatch(&self, update: Update) -> DispatchReport {
        let plugins = self.manager.loaded();
        let timeout = self.manager.handler_timeout();
        let mut jobs = Vec::new();

        for plugin in &plugins {
            for handler in plugin.update_handlers.iter().filter(|h| h.kind == update.kind) {
                let ctx = UpdateContext {
                    plugin: plugin.name.clone(),
                    update: update.clone(),
                    transport: Arc::clone(self.manager.transport()),
                };
                let fut = (handler.handler)(ctx);
                jobs.push(Isolated::spawn(plugin.name.clone(), format!("update:{}", update.kind), fut, timeout));
            }
        }

        let mut report = DispatchReport::default();
        if update.kind == UpdateKind::NewMessage {
            if let Some(message) = &update.message {
                if let Some(routed) = self.router.route(&plugins, message).await {
                    report.command = Some(routed.name);
                    report.invoked = routed.jobs.iter().map(|j| j.plugin().to_string()).collect();
                    report.denied = routed.denied;
                    jobs.extend(routed.jobs);
                }
            }
        }

        for outcome in join_all(jobs.into_iter().map(Isolated::join)).await {
            report.handled += 1;
            if let Err(e) = outcome.result {
                report.failures.push((outcome.plugin, e));
            }
        }
        report
    }

    /// Dispatch updates until the channel closes. Each update is handled on its own task.
    pub async fn run(self: Arc<Self>, mut updates: mpsc::Receiver<Update>) {
        while let Some(update) = updates.recv().await {
            let dispatcher = Arc::clone(&self);
            tokio::spawn(async move {
                let kind = update.kind.clone();
                let report = dispatcher.dispatch(update).await;
                tracing::debug!(
                    kind = %kind,
                    command = ?report.command,
                    handled = report.handled,
                    failed = report.failures.len(),
                    "Update dispatched"
                );
            });
        }
        tracing::info!("Update stream closed");
    }
}
