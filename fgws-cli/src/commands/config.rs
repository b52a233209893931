//! Config commands.

use std::path::Path;

use clap::Subcommand;
use console::style;

use fgws_core::config::{AppConfig, ConfigHandle};
use fgws_core::error::FwsResult;

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration.
    Show,
    /// Print the configuration file path.
    Path,
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub async fn run(
    config: ConfigHandle,
    action: ConfigAction,
    config_path: &Path,
    format: OutputFormat,
) -> FwsResult<()> {
    match action {
        ConfigAction::Show => {
            let cfg = config.read().await;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&*cfg)?),
                OutputFormat::Text => print_config_text(&cfg),
            }
        }
        ConfigAction::Path => match format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({
                    "path": config_path.display().to_string(),
                    "exists": config_path.exists(),
                })
            ),
            OutputFormat::Text => println!("{}", config_path.display()),
        },
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                println!(
                    "  {} {} already exists (use --force to overwrite)",
                    style("SKIP").yellow(),
                    config_path.display()
                );
                return Ok(());
            }
            AppConfig::default().save_to_file(config_path)?;
            println!(
                "  {} Wrote {}",
                style("OK").green().bold(),
                config_path.display()
            );
        }
    }
    Ok(())
}

fn print_config_text(cfg: &AppConfig) {
    let conn = &cfg.connection;
    println!("{}", style("Connection").bold().underlined());
    if conn.is_configured() {
        println!("  url                      {}", conn.to_connection_config().url());
    } else {
        println!("  url                      {}", style("(not configured)").dim());
    }
    println!("  title                    {}", conn.title);
    println!("  description              {}", conn.description);

    println!();
    println!("{}", style("Logging").bold().underlined());
    println!("  level                    {}", cfg.logging.level);
    println!(
        "  directory                {}",
        if cfg.logging.directory.is_empty() {
            "(default)"
        } else {
            cfg.logging.directory.as_str()
        }
    );
    println!("  json_output              {}", cfg.logging.json_output);

    println!();
    println!("{}", style("Presentation").bold().underlined());
    println!(
        "  desktop_notifications    {}",
        cfg.presentation.desktop_notifications
    );
    println!("  wake_on_message          {}", cfg.presentation.wake_on_message);
}
