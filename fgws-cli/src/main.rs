//! Foreground WebSocket CLI - drive a persistent WebSocket session from the terminal.
//!
//! Useful for headless operation, scripting, and checking a server before
//! wiring the session manager into a host application.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use fgws_core::config::{AppConfig, ConfigHandle};
use fgws_core::error::FwsResult;
use fgws_core::logging;

/// Foreground WebSocket - keep one WebSocket session alive and talk to it.
#[derive(Parser)]
#[command(
    name = "fgws",
    version,
    about = "Foreground WebSocket session CLI",
    long_about = "A command-line interface for the foreground WebSocket session manager.\n\
                   Open a ws:// or wss:// session, print every event, and send text frames."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a session, print its events and send stdin lines as text frames.
    Connect {
        #[command(flatten)]
        target: commands::TargetArgs,
        /// Save the connection target to the config file after it opens.
        #[arg(long)]
        save: bool,
    },
    /// Connect, send one message, optionally wait for a reply, then stop.
    Send {
        #[command(flatten)]
        target: commands::TargetArgs,
        /// Text frame to send.
        #[arg(short, long)]
        message: String,
        /// Print the first message received after sending.
        #[arg(long)]
        wait_reply: bool,
        /// Seconds to wait for the session to open and for a reply.
        #[arg(long, default_value = "10")]
        timeout_secs: u64,
    },
    /// View and initialize the configuration file.
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> FwsResult<()> {
    let cli = Cli::parse();

    let config_path = match cli.config.as_deref() {
        Some(path) => PathBuf::from(path),
        None => AppConfig::default_config_path()
            .unwrap_or_else(|_| PathBuf::from("config.toml")),
    };
    let config = if config_path.exists() {
        AppConfig::load_from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    // Initialize logging
    let log_dir = config
        .effective_log_dir()
        .unwrap_or_else(|_| PathBuf::from("logs"));
    let _guard = logging::init_logging(&config.logging, &log_dir, cli.verbose)?;

    let config_handle = ConfigHandle::new(config);

    info!("fgws v{}", fgws_core::constants::APP_VERSION);

    // Dispatch to command handlers
    let result = match cli.command {
        Commands::Connect { target, save } => {
            commands::connect::run(config_handle, target, save, &config_path, cli.format).await
        }
        Commands::Send {
            target,
            message,
            wait_reply,
            timeout_secs,
        } => {
            commands::send::run(
                config_handle,
                target,
                message,
                wait_reply,
                timeout_secs,
                cli.format,
            )
            .await
        }
        Commands::Config { action } => {
            commands::config::run(config_handle, action, &config_path, cli.format).await
        }
    };

    if let (Err(e), OutputFormat::Json) = (&result, cli.format) {
        println!(
            "{}",
            serde_json::json!({ "error": e.kind(), "message": e.to_string() })
        );
    }
    result
}
