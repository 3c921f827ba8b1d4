//! In-memory transport for driving a `Client` without a server.

#![allow(dead_code)]

use narrator_client::ws::{ConnectionState, EventSink, Socket, SocketEvent, Transport, TransportError};
use narrator_client::LoadingIndicator;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct FakeSocket {
    pub url: String,
    state: Mutex<ConnectionState>,
    sent: Mutex<Vec<String>>,
    sink: Arc<dyn EventSink>,
}

impl FakeSocket {
    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    pub fn emit(&self, event: SocketEvent) {
        (self.sink)(event);
    }

    pub fn receive(&self, frame: Value) {
        self.emit(SocketEvent::Text(frame.to_string()));
    }

    /// The server went away.
    pub fn drop_connection(&self) {
        *self.state.lock().unwrap() = ConnectionState::Closed;
        self.emit(SocketEvent::Closed(json!({"code": 1006, "reason": ""})));
    }
}

struct FakeHandle(Arc<FakeSocket>);

impl Socket for FakeHandle {
    fn state(&self) -> ConnectionState {
        self.0.state()
    }

    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        if !self.0.state().is_open() {
            return Err(TransportError::Send("socket is not open".to_string()));
        }
        self.0.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    // Close events are emitted by the tests so they can be delivered late
    fn close(&self) {
        *self.0.state.lock().unwrap() = ConnectionState::Closed;
    }
}

/// Opens sockets that are immediately open, or immediately refused.
#[derive(Default)]
pub struct FakeTransport {
    sockets: Mutex<Vec<Arc<FakeSocket>>>,
    refuse: AtomicBool,
}

impl FakeTransport {
    pub fn refusing() -> Self {
        let transport = Self::default();
        transport.refuse.store(true, Ordering::SeqCst);
        transport
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn sockets(&self) -> Vec<Arc<FakeSocket>> {
        self.sockets.lock().unwrap().clone()
    }

    pub fn socket(&self, index: usize) -> Arc<FakeSocket> {
        self.sockets()[index].clone()
    }

    pub fn last(&self) -> Arc<FakeSocket> {
        self.sockets().last().cloned().expect("no socket was opened")
    }
}

impl Transport for FakeTransport {
    fn open(
        &self,
        url: &str,
        on_event: Arc<dyn EventSink>,
    ) -> Result<Box<dyn Socket>, TransportError> {
        let socket = Arc::new(FakeSocket {
            url: url.to_string(),
            state: Mutex::new(ConnectionState::Connecting),
            sent: Mutex::new(Vec::new()),
            sink: on_event,
        });
        self.sockets.lock().unwrap().push(socket.clone());

        if self.refuse.load(Ordering::SeqCst) {
            *socket.state.lock().unwrap() = ConnectionState::Closed;
            socket.emit(SocketEvent::Error(json!({"error_message": "connection refused"})));
            socket.emit(SocketEvent::Closed(json!({})));
        } else {
            *socket.state.lock().unwrap() = ConnectionState::Open;
            socket.emit(SocketEvent::Open(json!({})));
        }

        Ok(Box::new(FakeHandle(socket)))
    }
}

#[derive(Default)]
pub struct CountingIndicator {
    pub shown: AtomicUsize,
    pub hidden: AtomicUsize,
}

impl CountingIndicator {
    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn hidden(&self) -> usize {
        self.hidden.load(Ordering::SeqCst)
    }
}

impl LoadingIndicator for CountingIndicator {
    fn show(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hidden.fetch_add(1, Ordering::SeqCst);
    }
}
