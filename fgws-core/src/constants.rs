//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "ForegroundWebSocket";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Notification title used when the caller does not supply one.
pub const DEFAULT_PRESENTATION_TITLE: &str = "Foreground WebSocket Service";

/// Notification text used when the caller does not supply one.
pub const DEFAULT_PRESENTATION_DESCRIPTION: &str = "Running...";

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "fgws.log";

/// WebSocket close codes (RFC 6455 section 7.4.1).
pub mod close_code {
    /// Normal closure; the purpose of the connection has been fulfilled.
    pub const NORMAL_CLOSURE: u16 = 1000;
    /// A close frame arrived without a status code.
    pub const NO_STATUS: u16 = 1005;
    /// The connection dropped without a close frame.
    pub const ABNORMAL_CLOSURE: u16 = 1006;
}
