//! Transport backed by tokio-tungstenite.
//!
//! Each session runs in one spawned task that owns the socket. Outgoing
//! frames and close requests reach it through an unbounded queue, so
//! `send_text` and `close` never wait on the network.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use fgws_core::constants::close_code;
use fgws_core::error::{FwsError, FwsResult};

use crate::transport::{Transport, TransportEvents, TransportHandle};

enum Command {
    Text(String),
    Close { code: u16, reason: Option<String> },
}

/// WebSocket transport for native targets.
///
/// Requires a running tokio runtime at connect time. No read timeout is
/// applied; an idle connection stays open until either side closes it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for TungsteniteTransport {
    fn connect(&self, url: &str, events: TransportEvents) -> FwsResult<Arc<dyn TransportHandle>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| FwsError::TransportUnavailable(format!("no async runtime: {e}")))?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        runtime.spawn(run_connection(url.to_string(), events, commands_rx));

        Ok(Arc::new(TungsteniteHandle {
            commands: commands_tx,
        }))
    }
}

struct TungsteniteHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl TransportHandle for TungsteniteHandle {
    fn send_text(&self, text: String) -> FwsResult<()> {
        self.commands
            .send(Command::Text(text))
            .map_err(|_| FwsError::TransportFailure("connection task has exited".into()))
    }

    fn close(&self, code: u16, reason: Option<String>) {
        if self.commands.send(Command::Close { code, reason }).is_err() {
            debug!("close requested after connection task exited");
        }
    }
}

/// Drive one connection until it closes or fails.
async fn run_connection(
    url: String,
    events: TransportEvents,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let session = events.session();
    let (stream, response) = match connect_async(url.as_str()).await {
        Ok(connected) => connected,
        Err(e) => {
            warn!("session {session}: connect to {url} failed: {e}");
            events.failed(e.to_string());
            return;
        }
    };

    let protocol = response
        .headers()
        .get("sec-websocket-protocol")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    info!("session {session}: connected to {url}");
    events.opened(protocol);

    let (mut write, mut read) = stream.split();
    let mut close_sent = false;

    loop {
        tokio::select! {
            command = commands.recv(), if !close_sent => match command {
                Some(Command::Text(text)) => {
                    if let Err(e) = write.send(Message::text(text)).await {
                        events.failed(e.to_string());
                        return;
                    }
                }
                Some(Command::Close { code, reason }) => {
                    close_sent = true;
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.unwrap_or_default().into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        debug!("session {session}: close frame not sent: {e}");
                        events.closed(close_code::ABNORMAL_CLOSURE, String::new());
                        return;
                    }
                }
                None => {
                    // Every handle is gone; close quietly.
                    close_sent = true;
                    let _ = write.send(Message::Close(None)).await;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => events.message_received(text.as_str().to_owned()),
                Some(Ok(Message::Binary(data))) => {
                    debug!("session {session}: dropping binary frame ({} bytes)", data.len());
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                        .unwrap_or((close_code::NO_STATUS, String::new()));
                    debug!("session {session}: close frame {code}");
                    events.closed(code, reason);
                    // Completes the handshake if we have not replied yet.
                    let _ = write.close().await;
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    events.failed(e.to_string());
                    return;
                }
                None => {
                    events.closed(close_code::ABNORMAL_CLOSURE, String::new());
                    return;
                }
            },
        }
    }
}
