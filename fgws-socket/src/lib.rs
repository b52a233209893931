//! Foreground WebSocket Socket - persistent WebSocket session manager.
//!
//! This crate provides:
//! - A session manager that owns at most one logical WebSocket connection
//! - Ordered listener fan-out for `onopen`, `onmessage`, `onclose`, `onerror`
//! - The transport capability plus a tokio-tungstenite implementation
//! - A keep-alive presentation hook for platforms that need one
//! - A separate push notification channel (`onpush`, `onpushToken`)

pub mod events;
pub mod manager;
pub mod presentation;
pub mod push;
pub mod transport;
pub mod tungstenite;

// Re-export key types
pub use events::{ConnectionState, ListenerHandle, ListenerRegistry, SessionEvent, SessionEventType};
pub use manager::{SessionManager, SessionSnapshot};
pub use presentation::{DesktopNotifier, KeepAlivePresenter, NoopPresenter};
pub use push::{PushChannel, PushEvent, PushEventType};
pub use transport::{SessionId, Transport, TransportEvent, TransportEvents, TransportHandle};
pub use tungstenite::TungsteniteTransport;
