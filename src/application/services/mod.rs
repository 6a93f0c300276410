//! Application services - Business logic orchestration

pub mod access_service;
pub mod command_service;
pub mod settings_service;

pub use access_service::{AccessRequest, AccessResolver, Tier};
pub use command_service::{CommandRouter, RoutedCommand};
pub use settings_service::{AccessOverride, AccountMode, AdminDocument, RuntimeSettings};
