//! Domain traits - Abstractions for infrastructure implementations

pub mod bot;
pub mod store;

pub use bot::{BotInfo, Transport};
pub use store::{ConfigStore, DocumentUpdate};
