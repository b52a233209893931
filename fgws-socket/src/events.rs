//! Session event types, connection state, and the listener registry.
//!
//! Listeners are plain callbacks bound to one event name. The registry is
//! copy-on-read: dispatch clones the listener list under the lock and
//! invokes the callbacks with the lock released, so a listener may register
//! more listeners or call back into the session manager.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::debug;

/// Event kinds published by the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionEventType {
    /// Connection established (`onopen`).
    Open,
    /// Text message received (`onmessage`).
    Message,
    /// Connection closed (`onclose`).
    Close,
    /// Transport failure (`onerror`).
    Error,
}

impl SessionEventType {
    /// Parse a host-facing event name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "onopen" => Some(Self::Open),
            "onmessage" => Some(Self::Message),
            "onclose" => Some(Self::Close),
            "onerror" => Some(Self::Error),
            _ => None,
        }
    }

    /// Host-facing event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "onopen",
            Self::Message => "onmessage",
            Self::Close => "onclose",
            Self::Error => "onerror",
        }
    }

    /// All event names a host can listen for.
    pub fn all() -> &'static [SessionEventType] {
        &[Self::Open, Self::Message, Self::Close, Self::Error]
    }
}

impl std::fmt::Display for SessionEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event delivered to session listeners.
///
/// Serializes as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum SessionEvent {
    /// The protocol is empty when the server negotiated none.
    #[serde(rename = "onopen")]
    Open { protocol: String },
    #[serde(rename = "onmessage")]
    Message { message: String },
    #[serde(rename = "onclose")]
    Close {
        code: u16,
        #[serde(skip_serializing_if = "String::is_empty")]
        reason: String,
    },
    #[serde(rename = "onerror")]
    Error { error: String },
}

/// Anything that can be fanned out through a [`ListenerRegistry`].
pub trait Event: Send + Sync + 'static {
    type Kind: Copy + Eq + Hash + std::fmt::Display + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

impl Event for SessionEvent {
    type Kind = SessionEventType;

    fn kind(&self) -> SessionEventType {
        match self {
            Self::Open { .. } => SessionEventType::Open,
            Self::Message { .. } => SessionEventType::Message,
            Self::Close { .. } => SessionEventType::Close,
            Self::Error { .. } => SessionEventType::Error,
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Connect dispatched, waiting for the transport to open.
    Connecting,
    /// Transport reported the connection open.
    Open,
    /// Close requested by `stop`, waiting for the transport.
    Closing,
    /// Terminal. A new `start` is required.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Token returned by `add_listener`, used to remove that listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Mapping from event kind to an ordered list of callbacks.
///
/// Insertion order is dispatch order. The same callback may be registered
/// more than once and is then invoked once per registration.
pub struct ListenerRegistry<E: Event> {
    listeners: RwLock<HashMap<E::Kind, Vec<(ListenerHandle, Listener<E>)>>>,
    next_id: AtomicU64,
}

impl<E: Event> ListenerRegistry<E> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback for one event kind.
    pub fn add(&self, kind: E::Kind, listener: impl Fn(&E) + Send + Sync + 'static) -> ListenerHandle {
        let handle = ListenerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push((handle, Arc::new(listener)));
        debug!("registered listener {} for {kind}", handle.0);
        handle
    }

    /// Remove a single registration. Returns false if it was already gone.
    pub fn remove(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        for entries in listeners.values_mut() {
            if let Some(pos) = entries.iter().position(|(h, _)| *h == handle) {
                entries.remove(pos);
                return true;
            }
        }
        false
    }

    /// Remove every registration.
    pub fn clear(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of callbacks registered for `kind`.
    pub fn count(&self, kind: E::Kind) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Invoke every callback registered for the event's kind, in order.
    ///
    /// Returns the number of callbacks invoked.
    pub fn dispatch(&self, event: &E) -> usize {
        let kind = event.kind();
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        for listener in &snapshot {
            listener(event);
        }

        if snapshot.is_empty() {
            debug!("no listeners for {kind}");
        } else {
            debug!("dispatched {kind} to {} listener(s)", snapshot.len());
        }
        snapshot.len()
    }
}

impl<E: Event> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn message(text: &str) -> SessionEvent {
        SessionEvent::Message {
            message: text.to_string(),
        }
    }

    #[test]
    fn test_event_name_parsing() {
        for kind in SessionEventType::all() {
            assert_eq!(SessionEventType::parse(kind.as_str()), Some(*kind));
        }
        assert_eq!(SessionEventType::parse("onpush"), None);
        assert_eq!(SessionEventType::parse("message"), None);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(SessionEvent::Open {
            protocol: String::new(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"event": "onopen", "data": {"protocol": ""}}));

        let json = serde_json::to_value(SessionEvent::Close {
            code: 1000,
            reason: String::new(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"event": "onclose", "data": {"code": 1000}}));

        let json = serde_json::to_value(message("hi")).unwrap();
        assert_eq!(json["data"]["message"], "hi");
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Closing.to_string(), "closing");
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let registry = ListenerRegistry::<SessionEvent>::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let c1 = calls.clone();
        registry.add(SessionEventType::Message, move |_| c1.lock().unwrap().push("L1"));
        let c2 = calls.clone();
        registry.add(SessionEventType::Message, move |_| c2.lock().unwrap().push("L2"));

        assert_eq!(registry.dispatch(&message("x")), 2);
        assert_eq!(*calls.lock().unwrap(), vec!["L1", "L2"]);
    }

    #[test]
    fn test_dispatch_only_matching_kind() {
        let registry = ListenerRegistry::<SessionEvent>::new();
        let hits = Arc::new(AtomicU64::new(0));
        let h = hits.clone();
        registry.add(SessionEventType::Close, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(registry.dispatch(&message("x")), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicate_callbacks_each_invoked() {
        let registry = ListenerRegistry::<SessionEvent>::new();
        let hits = Arc::new(AtomicU64::new(0));
        let callback = {
            let hits = hits.clone();
            move |_: &SessionEvent| {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        };
        registry.add(SessionEventType::Message, callback.clone());
        registry.add(SessionEventType::Message, callback);

        registry.dispatch(&message("x"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remove_listener() {
        let registry = ListenerRegistry::<SessionEvent>::new();
        let handle = registry.add(SessionEventType::Message, |_| {});
        registry.add(SessionEventType::Message, |_| {});

        assert!(registry.remove(handle));
        assert!(!registry.remove(handle));
        assert_eq!(registry.count(SessionEventType::Message), 1);

        registry.clear();
        assert_eq!(registry.count(SessionEventType::Message), 0);
    }

    #[test]
    fn test_listener_can_register_during_dispatch() {
        let registry = Arc::new(ListenerRegistry::<SessionEvent>::new());
        let inner = registry.clone();
        registry.add(SessionEventType::Message, move |_| {
            inner.add(SessionEventType::Message, |_| {});
        });

        assert_eq!(registry.dispatch(&message("x")), 1);
        assert_eq!(registry.count(SessionEventType::Message), 2);
    }
}
