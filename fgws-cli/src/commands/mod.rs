//! CLI command implementations.

pub mod config;
pub mod connect;
pub mod send;

use std::sync::Arc;

use clap::Args;
use console::style;

use fgws_core::config::{AppConfig, ConfigHandle, ConnectionConfig};
use fgws_core::error::{FwsError, FwsResult};
use fgws_socket::{
    DesktopNotifier, KeepAlivePresenter, NoopPresenter, SessionEvent, SessionManager,
    TungsteniteTransport,
};

use crate::OutputFormat;

/// Connection target flags shared by `connect` and `send`.
///
/// Each flag overrides the matching `[connection]` value from the config file.
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Host name or IP address.
    #[arg(long)]
    pub host: Option<String>,
    /// TCP port.
    #[arg(short, long)]
    pub port: Option<u32>,
    /// Use wss:// instead of ws://.
    #[arg(long)]
    pub wss: bool,
    /// Keep-alive notification title.
    #[arg(long)]
    pub title: Option<String>,
    /// Keep-alive notification description.
    #[arg(long)]
    pub description: Option<String>,
}

impl TargetArgs {
    /// Merge the flags over the persisted connection settings.
    pub fn apply(&self, cfg: &mut AppConfig) {
        let conn = &mut cfg.connection;
        if let Some(host) = &self.host {
            conn.host = host.trim().to_string();
        }
        if let Some(port) = self.port {
            conn.port = port;
        }
        if self.wss {
            conn.secure = true;
        }
        if let Some(title) = &self.title {
            conn.title = title.clone();
        }
        if let Some(description) = &self.description {
            conn.description = description.clone();
        }
    }
}

/// Apply `target` to the shared config and return the resulting connection target.
pub async fn resolve_target(config: &ConfigHandle, target: &TargetArgs) -> FwsResult<ConnectionConfig> {
    let mut cfg = config.write().await;
    target.apply(&mut cfg);
    if !cfg.connection.is_configured() {
        return Err(FwsError::MissingConfig(
            "connection host and port (use --host/--port or set [connection] in config)".into(),
        ));
    }
    Ok(cfg.connection.to_connection_config())
}

/// Build a session manager over the tungstenite transport.
///
/// Desktop notifications are used as the keep-alive presenter when enabled.
pub async fn create_session_manager(config: &ConfigHandle) -> SessionManager {
    let presentation = config.read().await.presentation.clone();
    let presenter: Arc<dyn KeepAlivePresenter> = if presentation.desktop_notifications {
        Arc::new(DesktopNotifier::new(presentation.wake_on_message))
    } else {
        Arc::new(NoopPresenter)
    };
    SessionManager::with_presenter(Arc::new(TungsteniteTransport::new()), presenter)
}

/// Print one session event in the requested format.
pub fn print_event(event: &SessionEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("failed to encode event: {e}"),
        },
        OutputFormat::Text => {
            let tag = format!("[{}]", event_name(event));
            match event {
                SessionEvent::Open { protocol } if protocol.is_empty() => {
                    println!("  {}", style(tag).green());
                }
                SessionEvent::Open { protocol } => {
                    println!("  {} protocol={protocol}", style(tag).green());
                }
                SessionEvent::Message { message } => {
                    println!("  {} {message}", style(tag).cyan());
                }
                SessionEvent::Close { code, reason } if reason.is_empty() => {
                    println!("  {} code={code}", style(tag).yellow());
                }
                SessionEvent::Close { code, reason } => {
                    println!("  {} code={code} reason={reason}", style(tag).yellow());
                }
                SessionEvent::Error { error } => {
                    println!("  {} {error}", style(tag).red().bold());
                }
            }
        }
    }
}

fn event_name(event: &SessionEvent) -> &'static str {
    use fgws_socket::events::Event;
    event.kind().as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_args_override_config() {
        let mut cfg = AppConfig::default();
        cfg.connection.host = "old.example.com".into();
        cfg.connection.port = 80;

        let args = TargetArgs {
            host: Some(" 10.0.0.5 ".into()),
            port: Some(8080),
            wss: true,
            title: None,
            description: Some("Listening".into()),
        };
        args.apply(&mut cfg);

        let target = cfg.connection.to_connection_config();
        assert_eq!(target.url(), "wss://10.0.0.5:8080");
        assert_eq!(target.presentation.title, "Foreground WebSocket Service");
        assert_eq!(target.presentation.description, "Listening");
    }

    #[test]
    fn test_empty_args_keep_config() {
        let mut cfg = AppConfig::default();
        cfg.connection.host = "relay.local".into();
        cfg.connection.port = 7000;
        cfg.connection.secure = true;

        TargetArgs::default().apply(&mut cfg);
        assert_eq!(cfg.connection.to_connection_config().url(), "wss://relay.local:7000");
    }

    #[tokio::test]
    async fn test_resolve_target_requires_host_and_port() {
        let config = ConfigHandle::new(AppConfig::default());
        let err = resolve_target(&config, &TargetArgs::default()).await.unwrap_err();
        assert!(matches!(err, FwsError::MissingConfig(_)));

        let args = TargetArgs {
            host: Some("127.0.0.1".into()),
            port: Some(9000),
            ..Default::default()
        };
        let target = resolve_target(&config, &args).await.unwrap();
        assert_eq!(target.url(), "ws://127.0.0.1:9000");
    }
}
