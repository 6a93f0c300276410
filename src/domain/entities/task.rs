use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use super::HandlerFuture;
use crate::application::errors::HandlerError;
use crate::domain::traits::Transport;

/// Run task handler function type
pub type TaskHandler = Arc<dyn Fn(TaskContext) -> HandlerFuture + Send + Sync>;

/// Passed to a run task on every firing
#[derive(Clone)]
pub struct TaskContext {
    pub plugin: String,
    pub task: String,
    pub transport: Arc<dyn Transport>,
}

/// What makes a run task fire. A cron expression wins over an interval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskTrigger {
    pub cron: Option<String>,
    pub interval: Option<Duration>,
    pub immediate: bool,
}

/// A named background job declared by a plugin
#[derive(Clone)]
pub struct RunTaskDefinition {
    pub name: String,
    pub description: String,
    pub trigger: TaskTrigger,
    pub handler: TaskHandler,
}

impl RunTaskDefinition {
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            trigger: TaskTrigger::default(),
            handler: Arc::new(move |ctx| handler(ctx).boxed()),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn cron(mut self, expr: impl Into<String>) -> Self {
        self.trigger.cron = Some(expr.into());
        self
    }

    pub fn every(mut self, interval: Duration) -> Self {
        self.trigger.interval = Some(interval);
        self
    }

    pub fn every_millis(self, millis: u64) -> Self {
        self.every(Duration::from_millis(millis))
    }

    pub fn immediate(mut self) -> Self {
        self.trigger.immediate = true;
        self
    }
}

impl fmt::Debug for RunTaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunTaskDefinition")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}
