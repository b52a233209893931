//! Send command - one-shot connect, send, optional reply, stop.

use std::time::Duration;

use console::style;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info};

use fgws_core::config::ConfigHandle;
use fgws_core::error::{FwsError, FwsResult};
use fgws_socket::SessionEvent;

use super::TargetArgs;
use crate::OutputFormat;

/// Run the send command.
pub async fn run(
    config: ConfigHandle,
    target: TargetArgs,
    message: String,
    wait_reply: bool,
    timeout_secs: u64,
    format: OutputFormat,
) -> FwsResult<()> {
    let connection = super::resolve_target(&config, &target).await?;
    let limit = Duration::from_secs(timeout_secs.max(1));

    let manager = super::create_session_manager(&config).await;
    let mut events = super::connect::subscribe_all(&manager);
    manager.start(connection)?;

    let result = exchange(&manager, &mut events, &message, wait_reply, limit).await;
    manager.stop()?;

    let reply = result?;
    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "sent": message,
                "reply": reply,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("  {} Sent {} bytes", style("OK").green().bold(), message.len());
            if let Some(reply) = reply {
                println!("  {} {reply}", style("[onmessage]").cyan());
            }
        }
    }

    // Give the close handshake a moment so the server sees a clean close.
    let _ = timeout(Duration::from_secs(2), async {
        while let Some(event) = events.recv().await {
            if matches!(event, SessionEvent::Close { .. } | SessionEvent::Error { .. }) {
                break;
            }
        }
    })
    .await;
    debug!("session state after send: {}", manager.state());
    Ok(())
}

/// Wait for `onopen`, send `message`, then optionally wait for the first reply.
async fn exchange(
    manager: &fgws_socket::SessionManager,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    message: &str,
    wait_reply: bool,
    limit: Duration,
) -> FwsResult<Option<String>> {
    timeout(limit, wait_for_open(events))
        .await
        .map_err(|_| FwsError::TransportFailure("timed out waiting for onopen".into()))??;

    let skipped = discard_pending_messages(events)?;
    if skipped > 0 {
        debug!("ignoring {skipped} message(s) received before sending");
    }
    manager.send(message)?;
    info!("sent {} bytes", message.len());

    if !wait_reply {
        return Ok(None);
    }

    let reply = timeout(limit, wait_for_message(events))
        .await
        .map_err(|_| FwsError::TransportFailure("timed out waiting for a reply".into()))??;
    Ok(Some(reply))
}

/// Drop messages already queued, such as a server greeting, so they are not
/// mistaken for the reply. A queued close or error ends the exchange.
fn discard_pending_messages(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> FwsResult<usize> {
    let mut skipped = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::Message { .. } => skipped += 1,
            SessionEvent::Error { error } => return Err(FwsError::TransportFailure(error)),
            SessionEvent::Close { code, .. } => {
                return Err(FwsError::TransportFailure(format!(
                    "closed before sending (code {code})"
                )))
            }
            SessionEvent::Open { .. } => {}
        }
    }
    Ok(skipped)
}

async fn wait_for_open(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> FwsResult<()> {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Open { .. } => return Ok(()),
            SessionEvent::Error { error } => return Err(FwsError::TransportFailure(error)),
            SessionEvent::Close { code, .. } => {
                return Err(FwsError::TransportFailure(format!(
                    "closed before opening (code {code})"
                )))
            }
            SessionEvent::Message { .. } => {}
        }
    }
    Err(FwsError::Internal("event channel closed".into()))
}

async fn wait_for_message(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> FwsResult<String> {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Message { message } => return Ok(message),
            SessionEvent::Error { error } => return Err(FwsError::TransportFailure(error)),
            SessionEvent::Close { code, .. } => {
                return Err(FwsError::TransportFailure(format!(
                    "closed before a reply arrived (code {code})"
                )))
            }
            SessionEvent::Open { .. } => {}
        }
    }
    Err(FwsError::Internal("event channel closed".into()))
}
