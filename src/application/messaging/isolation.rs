//! Runs one plugin handler as an independent task with failure isolation

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::application::errors::HandlerError;
use crate::domain::entities::HandlerFuture;

/// Result of one isolated handler run
#[derive(Debug)]
pub struct HandlerOutcome {
    pub plugin: String,
    pub handler: String,
    pub result: Result<(), HandlerError>,
}

/// A spawned handler. Panics and timeouts surface as [`HandlerError`]s on join.
pub struct Isolated {
    plugin: String,
    handler: String,
    task: JoinHandle<Result<(), HandlerError>>,
}

impl Isolated {
    pub fn spawn(
        plugin: impl Into<String>,
        handler: impl Into<String>,
        fut: HandlerFuture,
        timeout: Option<Duration>,
    ) -> Self {
        let task = tokio::spawn(async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .unwrap_or(Err(HandlerError::TimedOut(limit))),
                None => fut.await,
            }
        });
        Self {
            plugin: plugin.into(),
            handler: handler.into(),
            task,
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Wait for the handler and log a failure against its plugin
    pub async fn join(self) -> HandlerOutcome {
        let result = match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(HandlerError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(HandlerError::Failed(e.to_string())),
        };
        match &result {
            Ok(()) => {}
            Err(e @ HandlerError::InvalidArgs(_)) => {
                tracing::warn!(plugin = %self.plugin, handler = %self.handler, "Rejected: {}", e)
            }
            Err(e) => tracing::error!(plugin = %self.plugin, handler = %self.handler, "Handler failed: {}", e),
        }
        HandlerOutcome {
            plugin: self.plugin,
            handler: self.handler,
            result,
        }
    }

    /// Let the handler finish on its own; failures are still logged
    pub fn detach(self) {
        tokio::spawn(async move {
            self.join().await;
        });
    }
}

pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
