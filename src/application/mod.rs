//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Services: settings, access control, command routing
//! - Errors: Domain-specific errors
//! - Messaging: command parsing, isolated handler execution, update fan-out

pub mod errors;
pub mod messaging;
pub mod services;
