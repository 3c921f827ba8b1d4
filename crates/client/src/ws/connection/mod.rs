//! Socket abstraction shared by the platform transports.
//!
//! A [`Transport`] opens sockets; a [`Socket`] reports its readiness, sends
//! text frames and closes. Everything the socket observes comes back through
//! the [`EventSink`] given to `open`.

use serde_json::Value;
use thiserror::Error;

/// Connection state of a socket (mirrors the websocket ready states).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Connecting => 0,
            ConnectionState::Open => 1,
            ConnectionState::Closing => 2,
            ConnectionState::Closed => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// Something a socket observed.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Open(Value),
    Text(String),
    Binary(Vec<u8>),
    Closed(Value),
    Error(Value),
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Failed to create WebSocket: {0}")]
    Create(String),
    #[error("Send failed: {0}")]
    Send(String),
    #[error("no async runtime is available to drive the socket")]
    NoRuntime,
}

// Native sockets and callbacks cross threads; browser ones never do.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

/// Receives every event of one socket.
pub trait EventSink: Fn(SocketEvent) + MaybeSendSync {}
impl<F: Fn(SocketEvent) + MaybeSendSync> EventSink for F {}

pub trait Socket: MaybeSendSync {
    fn state(&self) -> ConnectionState;

    /// Hand a text frame to the transport. Fails unless the socket is open.
    fn send_text(&self, text: &str) -> Result<(), TransportError>;

    /// Start closing. Idempotent.
    fn close(&self);
}

pub trait Transport: MaybeSendSync {
    /// Start opening a socket to `url`. The returned socket is `Connecting`;
    /// `on_event` later receives `Open`, or `Error` and `Closed` on failure.
    fn open(
        &self,
        url: &str,
        on_event: std::sync::Arc<dyn EventSink>,
    ) -> Result<Box<dyn Socket>, TransportError>;
}

// Include platform-specific implementation
#[cfg(target_arch = "wasm32")]
mod connection_wasm;
#[cfg(target_arch = "wasm32")]
pub use connection_wasm::BrowserTransport as PlatformTransport;

#[cfg(not(target_arch = "wasm32"))]
mod connection_native;
#[cfg(not(target_arch = "wasm32"))]
pub use connection_native::TungsteniteTransport as PlatformTransport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_u8() {
        for state in [
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Closing,
            ConnectionState::Closed,
        ] {
            assert_eq!(ConnectionState::from_u8(state.as_u8()), state);
        }
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Closing.is_open());
    }
}
