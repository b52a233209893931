//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fgws_core::config::Presentation;
use fgws_core::error::{FwsError, FwsResult};
use fgws_socket::{
    KeepAlivePresenter, SessionEvent, SessionEventType, SessionManager, Transport,
    TransportEvents, TransportHandle,
};

/// Handle that records every frame and close request.
#[derive(Default)]
pub struct MockHandle {
    pub frames: Mutex<Vec<String>>,
    pub closes: Mutex<Vec<(u16, Option<String>)>>,
}

impl TransportHandle for MockHandle {
    fn send_text(&self, text: String) -> FwsResult<()> {
        self.frames.lock().unwrap().push(text);
        Ok(())
    }

    fn close(&self, code: u16, reason: Option<String>) {
        self.closes.lock().unwrap().push((code, reason));
    }
}

impl MockHandle {
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.lock().unwrap().len()
    }
}

/// One connect call seen by the mock transport.
#[derive(Clone)]
pub struct MockConnection {
    pub url: String,
    pub events: TransportEvents,
    pub handle: Arc<MockHandle>,
}

/// Transport that never touches the network.
///
/// Tests drive the session by calling the captured `TransportEvents`.
#[derive(Default)]
pub struct MockTransport {
    connections: Mutex<Vec<MockConnection>>,
    pub fail_connect: AtomicBool,
    /// Report `opened` from another thread before `connect` returns.
    pub open_during_connect: AtomicBool,
}

impl Transport for MockTransport {
    fn connect(&self, url: &str, events: TransportEvents) -> FwsResult<Arc<dyn TransportHandle>> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(FwsError::TransportUnavailable("socket limit reached".into()));
        }
        let handle = Arc::new(MockHandle::default());
        self.connections.lock().unwrap().push(MockConnection {
            url: url.to_string(),
            events: events.clone(),
            handle: handle.clone(),
        });
        if self.open_during_connect.load(Ordering::SeqCst) {
            std::thread::spawn(move || events.opened(None))
                .join()
                .unwrap();
        }
        Ok(handle as Arc<dyn TransportHandle>)
    }
}

impl MockTransport {
    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub fn connection(&self, index: usize) -> MockConnection {
        self.connections.lock().unwrap()[index].clone()
    }

    pub fn last(&self) -> MockConnection {
        self.connections
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no connect call recorded")
    }
}

/// Presenter that counts calls and can be told to refuse.
#[derive(Default)]
pub struct RecordingPresenter {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub woken: Mutex<Vec<String>>,
    pub refuse: AtomicBool,
}

impl KeepAlivePresenter for RecordingPresenter {
    fn acquire(&self, _presentation: &Presentation) -> FwsResult<()> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(FwsError::Notification("foreground service not permitted".into()));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    fn wake(&self, message: &str) {
        self.woken.lock().unwrap().push(message.to_string());
    }
}

/// Create a manager over a fresh mock transport and presenter.
pub fn create_test_manager() -> (SessionManager, Arc<MockTransport>, Arc<RecordingPresenter>) {
    let transport = Arc::new(MockTransport::default());
    let presenter = Arc::new(RecordingPresenter::default());
    let manager = SessionManager::with_presenter(transport.clone(), presenter.clone());
    (manager, transport, presenter)
}

/// Record every session event the manager publishes, in delivery order.
pub fn record_events(manager: &SessionManager) -> Arc<Mutex<Vec<SessionEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for kind in SessionEventType::all() {
        let log = log.clone();
        manager.add_listener(*kind, move |event| log.lock().unwrap().push(event.clone()));
    }
    log
}
