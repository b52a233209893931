//! Connect command - hold a session open and bridge it to the terminal.

use std::path::Path;
use std::time::Duration;

use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use fgws_core::config::ConfigHandle;
use fgws_core::error::{FwsError, FwsResult};
use fgws_socket::{SessionEvent, SessionEventType, SessionManager};

use super::TargetArgs;
use crate::OutputFormat;

/// How long to wait for the server to answer our close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Forward every session event into a channel the command loop can await.
pub fn subscribe_all(manager: &SessionManager) -> mpsc::UnboundedReceiver<SessionEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    for kind in SessionEventType::all() {
        let tx = tx.clone();
        manager.add_listener(*kind, move |event| {
            let _ = tx.send(event.clone());
        });
    }
    rx
}

/// Run the connect command.
pub async fn run(
    config: ConfigHandle,
    target: TargetArgs,
    save_config: bool,
    config_path: &Path,
    format: OutputFormat,
) -> FwsResult<()> {
    let connection = super::resolve_target(&config, &target).await?;
    let text = matches!(format, OutputFormat::Text);

    if text {
        println!(
            "{} Connecting to {}...",
            style("[1/2]").bold().dim(),
            connection.url()
        );
    }

    let manager = super::create_session_manager(&config).await;
    let mut events = subscribe_all(&manager);
    manager.start(connection)?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut stopping = false;
    let mut failure = None;
    let close_deadline = tokio::time::sleep(CLOSE_GRACE);
    tokio::pin!(close_deadline);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                super::print_event(&event, format);
                match event {
                    SessionEvent::Open { .. } => {
                        if text {
                            println!(
                                "{} Session open. Type lines to send them (Ctrl+C to stop)",
                                style("[2/2]").bold().dim(),
                            );
                        }
                        if save_config {
                            config.read().await.save_to_file(config_path)?;
                            if text {
                                println!(
                                    "  {} Config saved to {}",
                                    style("OK").green(),
                                    config_path.display()
                                );
                            }
                        }
                    }
                    SessionEvent::Close { .. } => break,
                    SessionEvent::Error { error } => {
                        failure = Some(error);
                        break;
                    }
                    SessionEvent::Message { .. } => {}
                }
            }
            line = stdin.next_line(), if stdin_open && !stopping => {
                match line {
                    Ok(Some(line)) => {
                        if let Err(e) = manager.send(&line) {
                            warn!("message not sent: {e}");
                            if text {
                                println!("  {} {e}", style("WARN").yellow());
                            }
                        }
                    }
                    Ok(None) => {
                        info!("stdin closed, stopping session");
                        stdin_open = false;
                        stopping = true;
                        manager.stop()?;
                        close_deadline.as_mut().reset(tokio::time::Instant::now() + CLOSE_GRACE);
                    }
                    Err(e) => {
                        warn!("stdin read failed: {e}");
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c(), if !stopping => {
                if text {
                    println!("\n  Disconnecting...");
                }
                stopping = true;
                manager.stop()?;
                close_deadline.as_mut().reset(tokio::time::Instant::now() + CLOSE_GRACE);
            }
            _ = &mut close_deadline, if stopping => {
                warn!("server did not complete the close handshake");
                break;
            }
        }
    }

    // Releases the presenter even if the close never completed.
    manager.stop()?;
    match failure {
        Some(error) => Err(FwsError::TransportFailure(error)),
        None => Ok(()),
    }
}
