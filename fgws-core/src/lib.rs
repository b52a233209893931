//! Foreground WebSocket Core - errors, configuration, and logging.
//!
//! Shared foundation for the session and CLI crates:
//! - Connection targets and persisted application configuration
//! - A single error type covering caller, transport and config failures
//! - Structured logging with tracing
//! - Config and data directories, constants

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod platform;

// Re-export commonly used items at the crate root
pub use config::{AppConfig, ConnectionConfig, Presentation};
pub use error::{FwsError, FwsResult};
pub use logging::init_logging;
