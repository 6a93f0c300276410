//! Domain entities - Core business objects

pub mod command;
pub mod message;
pub mod task;
pub mod update;
pub mod user;

pub use command::{
    CommandContext, CommandDefinition, CommandHandler, CommandInfo, CommandScope,
    HandlerFuture, Permission, ScopeClass,
};
pub use message::{ChatKind, Message, Update, UpdateKind};
pub use task::{RunTaskDefinition, TaskContext, TaskHandler, TaskTrigger};
pub use update::{UpdateContext, UpdateHandler, UpdateHandlerDefinition};
pub use user::User;
