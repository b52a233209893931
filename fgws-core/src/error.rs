//! Global error types for the foreground WebSocket client.
//!
//! Argument, connection and transport errors share a single `FwsError`
//! enum with conversions from the underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using FwsError.
pub type FwsResult<T> = Result<T, FwsError>;

/// Unified error type for the session core and its collaborators.
#[derive(Error, Debug)]
pub enum FwsError {
    // -- Caller errors --
    /// A required start/send parameter is missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `send` was called without an open session.
    #[error("not connected")]
    NotConnected,

    // -- Transport errors --
    /// The platform could not allocate the socket or keep-alive resource.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The transport reported a failure. Carries the transport's own description.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    // -- Configuration errors --
    /// Failed to load or parse configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Presentation errors --
    /// Desktop notification failed.
    #[error("notification error: {0}")]
    Notification(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FwsError {
    /// Stable machine-readable code for this error, used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotConnected => "not_connected",
            Self::TransportUnavailable(_) => "transport_unavailable",
            Self::TransportFailure(_) => "transport_failure",
            Self::Config(_) => "config",
            Self::MissingConfig(_) => "missing_config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Notification(_) => "notification",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for FwsError {
    fn from(e: serde_json::Error) -> Self {
        FwsError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for FwsError {
    fn from(e: toml::de::Error) -> Self {
        FwsError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(FwsError::NotConnected.to_string(), "not connected");
        assert_eq!(
            FwsError::InvalidArgument("host is required".into()).to_string(),
            "invalid argument: host is required"
        );
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(FwsError::NotConnected.kind(), "not_connected");
        assert_eq!(
            FwsError::TransportFailure("reset".into()).kind(),
            "transport_failure"
        );
    }

    #[test]
    fn test_toml_error_maps_to_config() {
        let err: FwsError = toml::from_str::<toml::Value>("not = [valid")
            .unwrap_err()
            .into();
        assert!(matches!(err, FwsError::Config(_)));
    }
}
