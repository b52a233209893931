//! WebSocket session manager.
//!
//! Owns at most one logical session, issues connect/send/close against a
//! [`Transport`], and republishes transport callbacks to listeners.
//!
//! Session state lives behind a single mutex. Transport calls and listener
//! callbacks always run with that mutex released, so a listener may call
//! `send`, `stop` or `start` from inside a callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use fgws_core::config::ConnectionConfig;
use fgws_core::constants::close_code;
use fgws_core::error::{FwsError, FwsResult};

use crate::events::{ConnectionState, ListenerHandle, ListenerRegistry, SessionEvent, SessionEventType};
use crate::presentation::{KeepAlivePresenter, NoopPresenter};
use crate::transport::{
    SessionId, Transport, TransportEvent, TransportEvents, TransportHandle, TransportIngress,
};

/// Diagnostic view of the current session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub state: ConnectionState,
    pub config: ConnectionConfig,
    /// When the transport reported the connection open.
    pub opened_at: Option<DateTime<Utc>>,
    /// Negotiated subprotocol, if any.
    pub protocol: Option<String>,
}

/// The single stateful entity: one logical connection.
struct Session {
    id: SessionId,
    config: ConnectionConfig,
    state: ConnectionState,
    /// Owned exclusively by the session; `None` once released.
    handle: Option<Arc<dyn TransportHandle>>,
    /// Whether the presenter is held for this session.
    presenting: bool,
    opened_at: Option<DateTime<Utc>>,
    protocol: Option<String>,
    /// False until `start` has stored the handle. Callbacks arriving
    /// earlier are parked in `pending` and replayed in order.
    attached: bool,
    pending: Vec<TransportEvent>,
}

impl Session {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            state: self.state,
            config: self.config.clone(),
            opened_at: self.opened_at,
            protocol: self.protocol.clone(),
        }
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    presenter: Arc<dyn KeepAlivePresenter>,
    session: Mutex<Option<Session>>,
    /// Serializes `start` and `stop` against each other.
    control: Mutex<()>,
    listeners: ListenerRegistry<SessionEvent>,
    state_tx: watch::Sender<ConnectionState>,
    next_id: AtomicU64,
}

/// Manages one persistent WebSocket session.
///
/// Cloning is cheap; clones share the same session and listeners.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a manager without a keep-alive presenter.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_presenter(transport, Arc::new(NoopPresenter))
    }

    /// Create a manager that holds `presenter` while a session runs.
    pub fn with_presenter(
        transport: Arc<dyn Transport>,
        presenter: Arc<dyn KeepAlivePresenter>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Closed);

        Self {
            inner: Arc::new(Inner {
                transport,
                presenter,
                session: Mutex::new(None),
                control: Mutex::new(()),
                listeners: ListenerRegistry::new(),
                state_tx,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Start a session, replacing any existing one.
    ///
    /// Returns once the connect has been dispatched. Listen for `onopen`
    /// to learn when the connection is live.
    pub fn start(&self, config: ConnectionConfig) -> FwsResult<()> {
        config.validate()?;
        let url = config.url();

        let control = self.inner.control();

        let previous = self.inner.lock().take();
        if let Some(previous) = previous {
            self.inner.teardown(previous);
        }

        self.inner
            .presenter
            .acquire(&config.presentation)
            .map_err(into_unavailable)?;

        let id = SessionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        info!("session {id}: connecting to {url}");
        {
            let mut slot = self.inner.lock();
            *slot = Some(Session {
                id,
                config,
                state: ConnectionState::Connecting,
                handle: None,
                presenting: true,
                opened_at: None,
                protocol: None,
                attached: false,
                pending: Vec::new(),
            });
            self.inner.state_tx.send_replace(ConnectionState::Connecting);
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let events = TransportEvents::new(id, weak);

        match self.inner.transport.connect(&url, events) {
            Ok(handle) => {
                // Nothing can replace or stop the session while `control` is held.
                if let Some(session) = self.inner.lock().as_mut().filter(|s| s.id == id) {
                    session.handle = Some(handle);
                }
                drop(control);
                self.inner.flush_pending(id);
                Ok(())
            }
            Err(e) => {
                warn!("session {id}: transport unavailable: {e}");
                let removed = {
                    let mut slot = self.inner.lock();
                    if slot.as_ref().is_some_and(|s| s.id == id) {
                        self.inner.state_tx.send_replace(ConnectionState::Closed);
                        slot.take()
                    } else {
                        None
                    }
                };
                if removed.is_some_and(|s| s.presenting) {
                    self.inner.presenter.release();
                }
                Err(into_unavailable(e))
            }
        }
    }

    /// Request a graceful close and release the session's handle.
    ///
    /// Does not wait for the close handshake; completion is surfaced as
    /// `onclose`. Calling `stop` without a session, or twice, is a no-op.
    pub fn stop(&self) -> FwsResult<()> {
        let _control = self.inner.control();

        let (id, handle, release) = {
            let mut slot = self.inner.lock();
            let Some(session) = slot.as_mut() else {
                debug!("stop: no session");
                return Ok(());
            };
            let id = session.id;
            let release = std::mem::take(&mut session.presenting);
            let handle = session.handle.take();

            let state = session.state;
            match state {
                ConnectionState::Connecting | ConnectionState::Open => {
                    self.inner.transition(session, ConnectionState::Closing);
                }
                ConnectionState::Closing => {
                    debug!("stop: session {id} already closing");
                }
                ConnectionState::Closed => {
                    *slot = None;
                }
            }
            (id, handle, release)
        };

        if let Some(handle) = handle {
            info!("session {id}: closing");
            handle.close(close_code::NORMAL_CLOSURE, None);
        }
        if release {
            self.inner.presenter.release();
        }
        Ok(())
    }

    /// Queue one text frame on the open session.
    pub fn send(&self, message: &str) -> FwsResult<()> {
        let handle = {
            let slot = self.inner.lock();
            match slot.as_ref() {
                Some(session) if session.state == ConnectionState::Open => session.handle.clone(),
                _ => None,
            }
        };

        let handle = handle.ok_or(FwsError::NotConnected)?;
        debug!("sending text frame ({} bytes)", message.len());
        handle.send_text(message.to_string())
    }

    /// Current lifecycle state. `Closed` when there is no session.
    pub fn state(&self) -> ConnectionState {
        self.inner
            .lock()
            .as_ref()
            .map_or(ConnectionState::Closed, |s| s.state)
    }

    /// Subscribe to lifecycle state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Diagnostic view of the current session, if any.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.inner.lock().as_ref().map(Session::snapshot)
    }

    /// Register a callback for one event kind.
    pub fn add_listener(
        &self,
        kind: SessionEventType,
        listener: impl Fn(&SessionEvent) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.inner.listeners.add(kind, listener)
    }

    /// Remove one registration. Returns false if it was already removed.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        self.inner.listeners.remove(handle)
    }

    /// Remove every registered listener.
    pub fn remove_all_listeners(&self) {
        self.inner.listeners.clear();
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: SessionEventType) -> usize {
        self.inner.listeners.count(kind)
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn control(&self) -> MutexGuard<'_, ()> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Update a session's state and notify watchers. Caller holds the lock.
    fn transition(&self, session: &mut Session, new_state: ConnectionState) {
        if session.state != new_state {
            info!("session {}: {} -> {}", session.id, session.state, new_state);
            session.state = new_state;
            self.state_tx.send_replace(new_state);
        }
    }

    /// Close a replaced session. Its later callbacks are dropped as stale.
    fn teardown(&self, previous: Session) {
        info!("session {}: replaced by a new start", previous.id);
        self.state_tx.send_replace(ConnectionState::Closed);
        if let Some(handle) = previous.handle {
            handle.close(close_code::NORMAL_CLOSURE, None);
        }
        if previous.presenting {
            self.presenter.release();
        }
    }
}

impl TransportIngress for Inner {
    fn ingest(&self, id: SessionId, event: TransportEvent) {
        self.apply(id, event, false);
    }
}

impl Inner {
    /// Replay callbacks that arrived before the handle was stored, then
    /// mark the session attached.
    fn flush_pending(&self, id: SessionId) {
        loop {
            let batch = {
                let mut slot = self.lock();
                let Some(session) = slot.as_mut().filter(|s| s.id == id) else {
                    return;
                };
                if session.pending.is_empty() {
                    session.attached = true;
                    return;
                }
                std::mem::take(&mut session.pending)
            };
            debug!("session {id}: replaying {} early callback(s)", batch.len());
            for event in batch {
                self.apply(id, event, true);
            }
        }
    }

    /// Update session state for one callback and fan the result out.
    fn apply(&self, id: SessionId, event: TransportEvent, replaying: bool) {
        let outgoing = {
            let mut slot = self.lock();
            let Some(session) = slot.as_mut().filter(|s| s.id == id) else {
                debug!("dropping {event:?} from stale session {id}");
                return;
            };
            if !replaying && !session.attached {
                session.pending.push(event);
                return;
            }

            match event {
                TransportEvent::Opened { protocol } => match session.state {
                    ConnectionState::Connecting | ConnectionState::Open => {
                        session.opened_at = Some(Utc::now());
                        session.protocol = protocol.clone();
                        self.transition(session, ConnectionState::Open);
                        Some(SessionEvent::Open {
                            protocol: protocol.unwrap_or_default(),
                        })
                    }
                    state => {
                        debug!("session {id}: ignoring open while {state}");
                        None
                    }
                },
                TransportEvent::MessageReceived(message) => match session.state {
                    ConnectionState::Connecting | ConnectionState::Open => {
                        Some(SessionEvent::Message { message })
                    }
                    state => {
                        debug!("session {id}: dropping message while {state}");
                        None
                    }
                },
                TransportEvent::Closed { code, reason } => {
                    if session.state == ConnectionState::Closed {
                        debug!("session {id}: duplicate close ({code})");
                        None
                    } else {
                        session.handle = None;
                        self.transition(session, ConnectionState::Closed);
                        Some(SessionEvent::Close { code, reason })
                    }
                }
                TransportEvent::Failed(error) => {
                    if session.state == ConnectionState::Closed {
                        debug!("session {id}: failure after close: {error}");
                        None
                    } else {
                        warn!("session {id}: transport failed: {error}");
                        session.handle = None;
                        self.transition(session, ConnectionState::Closed);
                        Some(SessionEvent::Error { error })
                    }
                }
            }
        };

        let Some(event) = outgoing else {
            return;
        };
        if let SessionEvent::Message { message } = &event {
            self.presenter.wake(message);
        }
        self.listeners.dispatch(&event);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = session {
            if let Some(handle) = session.handle {
                handle.close(close_code::NORMAL_CLOSURE, Some("session manager dropped".into()));
            }
            if session.presenting {
                self.presenter.release();
            }
        }
    }
}

fn into_unavailable(e: FwsError) -> FwsError {
    match e {
        FwsError::TransportUnavailable(_) => e,
        other => FwsError::TransportUnavailable(other.to_string()),
    }
}
