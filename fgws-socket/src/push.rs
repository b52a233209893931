//! Push notification channel.
//!
//! VoIP-style push delivery is separate from the WebSocket session: the OS
//! push registry hands payloads and device tokens to this channel, which
//! fans them out to its own listeners (`onpush`, `onpushToken`).

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::events::{Event, ListenerHandle, ListenerRegistry};

/// Event kinds published by the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushEventType {
    /// Incoming push payload (`onpush`).
    Push,
    /// Device token changed (`onpushToken`).
    PushToken,
}

impl PushEventType {
    /// Parse a host-facing event name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "onpush" => Some(Self::Push),
            "onpushToken" => Some(Self::PushToken),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "onpush",
            Self::PushToken => "onpushToken",
        }
    }
}

impl std::fmt::Display for PushEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event delivered to push listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum PushEvent {
    /// Opaque key-value payload, passed through unchanged.
    #[serde(rename = "onpush")]
    Push { payload: Map<String, Value> },
    /// Lower-case hex device token.
    #[serde(rename = "onpushToken")]
    PushToken { token: String },
}

impl Event for PushEvent {
    type Kind = PushEventType;

    fn kind(&self) -> PushEventType {
        match self {
            Self::Push { .. } => PushEventType::Push,
            Self::PushToken { .. } => PushEventType::PushToken,
        }
    }
}

/// Fan-out point for push registry callbacks.
#[derive(Default)]
pub struct PushChannel {
    listeners: ListenerRegistry<PushEvent>,
    token: Mutex<Option<String>>,
}

impl PushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(
        &self,
        kind: PushEventType,
        listener: impl Fn(&PushEvent) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.listeners.add(kind, listener)
    }

    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        self.listeners.remove(handle)
    }

    pub fn remove_all_listeners(&self) {
        self.listeners.clear();
    }

    /// Deliver an incoming push payload. Returns the number of listeners invoked.
    pub fn deliver(&self, payload: Map<String, Value>) -> usize {
        debug!("push payload with {} key(s)", payload.len());
        self.listeners.dispatch(&PushEvent::Push { payload })
    }

    /// Record new device token credentials and publish them hex-encoded.
    pub fn update_token(&self, credentials: &[u8]) -> String {
        let token = hex::encode(credentials);
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        info!("push token updated ({} bytes)", credentials.len());
        self.listeners.dispatch(&PushEvent::PushToken {
            token: token.clone(),
        });
        token
    }

    /// The most recent device token, if one is valid.
    pub fn current_token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the device token after the push registry invalidates it.
    pub fn invalidate_token(&self) {
        if self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            info!("push token invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_event_names() {
        assert_eq!(PushEventType::parse("onpush"), Some(PushEventType::Push));
        assert_eq!(PushEventType::parse("onpushToken"), Some(PushEventType::PushToken));
        assert_eq!(PushEventType::parse("onpushtoken"), None);
    }

    #[test]
    fn test_update_token_hex_encodes() {
        let channel = PushChannel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        channel.add_listener(PushEventType::PushToken, move |event| {
            if let PushEvent::PushToken { token } = event {
                s.lock().unwrap().push(token.clone());
            }
        });

        let token = channel.update_token(&[0x00, 0x0f, 0xab, 0xff]);
        assert_eq!(token, "000fabff");
        assert_eq!(*seen.lock().unwrap(), vec!["000fabff".to_string()]);
        assert_eq!(channel.current_token().as_deref(), Some("000fabff"));

        channel.invalidate_token();
        assert_eq!(channel.current_token(), None);
    }

    #[test]
    fn test_deliver_passes_payload_through() {
        let channel = PushChannel::new();
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        channel.add_listener(PushEventType::Push, move |event| {
            *s.lock().unwrap() = Some(event.clone());
        });

        let mut payload = Map::new();
        payload.insert("caller".into(), Value::String("+15551234".into()));
        payload.insert("aps".into(), serde_json::json!({"alert": "ring"}));

        assert_eq!(channel.deliver(payload.clone()), 1);
        assert_eq!(*seen.lock().unwrap(), Some(PushEvent::Push { payload }));
    }

    #[test]
    fn test_push_listeners_do_not_see_token_events() {
        let channel = PushChannel::new();
        let handle = channel.add_listener(PushEventType::Push, |_| panic!("wrong kind"));
        channel.update_token(&[1, 2, 3]);
        assert!(channel.remove_listener(handle));
    }

    #[test]
    fn test_push_event_serialization() {
        let json = serde_json::to_value(PushEvent::PushToken {
            token: "beef".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event": "onpushToken", "data": {"token": "beef"}})
        );
    }
}
