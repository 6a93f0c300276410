use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;

use super::{HandlerFuture, Update, UpdateKind};
use crate::application::errors::HandlerError;
use crate::domain::traits::Transport;

/// Generic event handler function type
pub type UpdateHandler = Arc<dyn Fn(UpdateContext) -> HandlerFuture + Send + Sync>;

#[derive(Clone)]
pub struct UpdateContext {
    pub plugin: String,
    pub update: Update,
    pub transport: Arc<dyn Transport>,
}

/// A plugin's handler for one kind of platform event
#[derive(Clone)]
pub struct UpdateHandlerDefinition {
    pub kind: UpdateKind,
    pub handler: UpdateHandler,
}

impl UpdateHandlerDefinition {
    pub fn new<F, Fut>(kind: UpdateKind, handler: F) -> Self
    where
        F: Fn(UpdateContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self {
            kind,
            handler: Arc::new(move |ctx| handler(ctx).boxed()),
        }
    }
}

impl fmt::Debug for UpdateHandlerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateHandlerDefinition")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
