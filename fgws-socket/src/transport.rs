//! Transport capability.
//!
//! A transport performs the actual network connect/send/close. It reports
//! back through [`TransportEvents`], the single ingress into the session
//! manager. Each `TransportEvents` is bound to the session it was created
//! for, so callbacks from a replaced session can be recognised and dropped.

use std::sync::{Arc, Weak};

use serde::Serialize;
use tracing::debug;

use fgws_core::error::FwsResult;

/// Identifier of one session, unique per manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A callback delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened { protocol: Option<String> },
    MessageReceived(String),
    Closed { code: u16, reason: String },
    Failed(String),
}

/// Receiver side of the transport callbacks.
pub trait TransportIngress: Send + Sync {
    fn ingest(&self, session: SessionId, event: TransportEvent);
}

/// Callback sink handed to a transport on connect.
///
/// Holds the manager weakly: callbacks arriving after the manager is gone
/// are discarded.
#[derive(Clone)]
pub struct TransportEvents {
    session: SessionId,
    ingress: Weak<dyn TransportIngress>,
}

impl TransportEvents {
    pub fn new(session: SessionId, ingress: Weak<dyn TransportIngress>) -> Self {
        Self { session, ingress }
    }

    /// The session these callbacks belong to.
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn opened(&self, protocol: Option<String>) {
        self.emit(TransportEvent::Opened { protocol });
    }

    pub fn message_received(&self, text: String) {
        self.emit(TransportEvent::MessageReceived(text));
    }

    pub fn closed(&self, code: u16, reason: String) {
        self.emit(TransportEvent::Closed { code, reason });
    }

    pub fn failed(&self, error: impl Into<String>) {
        self.emit(TransportEvent::Failed(error.into()));
    }

    fn emit(&self, event: TransportEvent) {
        match self.ingress.upgrade() {
            Some(ingress) => ingress.ingest(self.session, event),
            None => debug!("session {} has no manager, discarding {event:?}", self.session),
        }
    }
}

/// Platform capability that opens WebSocket connections.
pub trait Transport: Send + Sync {
    /// Dispatch a connect to `url` and return immediately.
    ///
    /// The handshake outcome is reported through `events`. Callbacks may
    /// fire from any thread, even before this call returns; the manager
    /// holds them back until the returned handle is stored. An `Err` means
    /// the underlying resource could not be created at all.
    fn connect(&self, url: &str, events: TransportEvents) -> FwsResult<Arc<dyn TransportHandle>>;
}

/// A live connection created by a [`Transport`].
pub trait TransportHandle: Send + Sync {
    /// Queue one text frame. Must not wait for the write to complete.
    fn send_text(&self, text: String) -> FwsResult<()>;

    /// Request a close handshake. Completion is reported as `closed`.
    fn close(&self, code: u16, reason: Option<String>);
}
