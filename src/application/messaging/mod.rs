//! Message handling - Event-driven message processing

pub mod dispatcher;
pub mod isolation;
pub mod parser;

pub use dispatcher::{DispatchReport, UpdateDispatcher};
pub use isolation::{HandlerOutcome, Isolated};
pub use parser::{CommandParser, ParsedCommand};
