//! Session manager over the real tungstenite transport.
//!
//! Runs an in-process echo server on 127.0.0.1 and checks the full
//! open -> send -> receive -> stop -> close flow over a real socket.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use fgws_core::config::ConnectionConfig;
use fgws_socket::{
    ConnectionState, SessionEvent, SessionEventType, SessionManager, TungsteniteTransport,
};

const WAIT: Duration = Duration::from_secs(5);

/// Accept one client and echo text frames back with an `echo:` prefix.
///
/// The text `binary-please` is answered with a binary frame followed by
/// the text `after-binary`.
async fn spawn_echo_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                if text.as_str() == "binary-please" {
                    ws.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
                    ws.send(Message::text("after-binary")).await.unwrap();
                } else {
                    ws.send(Message::text(format!("echo:{}", text.as_str())))
                        .await
                        .unwrap();
                }
            }
        }
    });

    port
}

fn forward_events(manager: &SessionManager) -> mpsc::UnboundedReceiver<SessionEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    for kind in SessionEventType::all() {
        let tx = tx.clone();
        manager.add_listener(*kind, move |event| {
            let _ = tx.send(event.clone());
        });
    }
    rx
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn echo_round_trip_then_graceful_close() {
    let port = spawn_echo_server().await;
    let manager = SessionManager::new(Arc::new(TungsteniteTransport::new()));
    let mut rx = forward_events(&manager);

    manager
        .start(ConnectionConfig::new("127.0.0.1", u32::from(port), false))
        .unwrap();

    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::Open {
            protocol: String::new()
        }
    );
    assert_eq!(manager.state(), ConnectionState::Open);

    manager.send("ping").unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::Message {
            message: "echo:ping".into()
        }
    );

    manager.stop().unwrap();
    assert_eq!(manager.state(), ConnectionState::Closing);
    match next_event(&mut rx).await {
        SessionEvent::Close { code, .. } => assert_eq!(code, 1000),
        other => panic!("expected onclose, got {other:?}"),
    }
    assert_eq!(manager.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn binary_frames_are_dropped() {
    let port = spawn_echo_server().await;
    let manager = SessionManager::new(Arc::new(TungsteniteTransport::new()));
    let mut rx = forward_events(&manager);

    manager
        .start(ConnectionConfig::new("127.0.0.1", u32::from(port), false))
        .unwrap();
    assert!(matches!(next_event(&mut rx).await, SessionEvent::Open { .. }));

    manager.send("binary-please").unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::Message {
            message: "after-binary".into()
        }
    );

    manager.stop().unwrap();
}

#[tokio::test]
async fn refused_connection_reports_onerror() {
    // Reserve a port, then free it so nothing is listening there.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let manager = SessionManager::new(Arc::new(TungsteniteTransport::new()));
    let mut rx = forward_events(&manager);

    // The connect is dispatched, so start itself succeeds.
    manager
        .start(ConnectionConfig::new("127.0.0.1", u32::from(port), false))
        .unwrap();

    assert!(matches!(next_event(&mut rx).await, SessionEvent::Error { .. }));
    assert_eq!(manager.state(), ConnectionState::Closed);
}
