//! Domain layer - Core business objects and the seams to the outside world
//!
//! This layer contains:
//! - Entities: messages, updates, command/task/update-handler definitions
//! - Traits: abstractions for the chat transport and the config store

pub mod entities;
pub mod traits;
