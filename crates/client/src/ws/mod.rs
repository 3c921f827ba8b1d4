//! WebSocket messaging with the narrator server.
//!
//! This module provides:
//! - A connection manager that opens, replaces and reopens the socket
//! - Request correlation through generated message ids
//! - Per-operation dispatch of decoded responses, plus a binary channel
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Client                         │
//! │   connect(path) · send(request) · add_handler(op)   │
//! └─────────────────────────────────────────────────────┘
//!                │                         ▲
//!                ▼                         │ SocketEvent
//!   ┌─────────────────────────┐   ┌────────────────────┐
//!   │  Transport / Socket     │──▶│     Dispatcher     │
//!   │ (tungstenite / browser) │   │ registry → handlers│
//!   └─────────────────────────┘   └────────────────────┘
//!                                          │
//!                       ┌──────────────────┼──────────────────┐
//!                       ▼                  ▼                  ▼
//!                ┌────────────┐     ┌────────────┐     ┌────────────┐
//!                │ "load"     │     │ "error"    │     │  binary    │
//!                │ handlers   │     │ handlers   │     │  handlers  │
//!                └────────────┘     └────────────┘     └────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let client = Client::new(ClientConfig::from_env()?, PayloadRegistry::narrator());
//! client.add_handler(Operation::TransferComplete, |response: &Response| {
//!     log_info!("done: {:?}", response.message_id());
//! });
//! client.connect("ws").await?;
//! client.send(Request::load("/books/moby-dick.txt"), true).await?;
//! ```

mod client;
mod connection;
mod dispatcher;

pub use client::{Client, ClientError};
pub use connection::{
    ConnectionState, EventSink, MaybeSendSync, PlatformTransport, Socket, SocketEvent, Transport,
    TransportError,
};
pub use dispatcher::{BinaryHandler, Dispatcher, ResponseHandler};
