//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Bootstrap configuration loading
//! - Storage: JSON document store for persisted runtime state
//! - Adapters: Transports (console, in-memory)

pub mod adapters;
pub mod config;
pub mod storage;
