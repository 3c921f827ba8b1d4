//! Native/Desktop WebSocket transport using tokio-tungstenite.

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{ConnectionState, EventSink, Socket, SocketEvent, Transport, TransportError};

enum Outbound {
    Text(String),
    Close,
}

/// Opens sockets on the current tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteTransport;

impl Transport for TungsteniteTransport {
    fn open(
        &self,
        url: &str,
        on_event: Arc<dyn EventSink>,
    ) -> Result<Box<dyn Socket>, TransportError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let state = Arc::new(AtomicU8::new(ConnectionState::Connecting.as_u8()));
        let (sender, receiver) = unbounded();

        runtime.spawn(run_socket(
            url.to_string(),
            state.clone(),
            receiver,
            on_event,
        ));

        Ok(Box::new(TungsteniteSocket {
            url: url.to_string(),
            state,
            sender,
        }))
    }
}

struct TungsteniteSocket {
    url: String,
    state: Arc<AtomicU8>,
    /// Frames for the socket task; dropping it closes the socket
    sender: UnboundedSender<Outbound>,
}

impl Socket for TungsteniteSocket {
    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        if !self.state().is_open() {
            return Err(TransportError::Send(format!(
                "socket to {} is {:?}",
                self.url,
                self.state()
            )));
        }
        self.sender
            .unbounded_send(Outbound::Text(text.to_string()))
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn close(&self) {
        if matches!(
            self.state(),
            ConnectionState::Closing | ConnectionState::Closed
        ) {
            return;
        }
        self.state
            .store(ConnectionState::Closing.as_u8(), Ordering::SeqCst);
        let _ = self.sender.unbounded_send(Outbound::Close);
    }
}

fn set_state(state: &AtomicU8, value: ConnectionState) {
    state.store(value.as_u8(), Ordering::SeqCst);
}

fn empty() -> Value {
    Value::Object(Map::new())
}

/// Drive one socket from handshake to close, reporting everything to `on_event`.
async fn run_socket(
    url: String,
    state: Arc<AtomicU8>,
    mut receiver: UnboundedReceiver<Outbound>,
    on_event: Arc<dyn EventSink>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            crate::log_error!("WebSocket error for {}: {}", url, e);
            set_state(&state, ConnectionState::Closed);
            on_event(SocketEvent::Error(json!({
                "message_type": "connect",
                "error_message": e.to_string(),
            })));
            on_event(SocketEvent::Closed(empty()));
            return;
        }
    };

    let (mut write, mut read) = stream.split();

    // close() was called while the handshake was in flight
    if ConnectionState::from_u8(state.load(Ordering::SeqCst)) == ConnectionState::Closing {
        let _ = write.send(Message::Close(None)).await;
        set_state(&state, ConnectionState::Closed);
        on_event(SocketEvent::Closed(empty()));
        return;
    }

    set_state(&state, ConnectionState::Open);
    crate::log_info!("WebSocket connected to {}", url);
    on_event(SocketEvent::Open(empty()));

    let mut close_data = empty();

    loop {
        tokio::select! {
            outbound = receiver.next() => match outbound {
                Some(Outbound::Text(text)) => {
                    crate::log_debug!("Sending to {}: {}", url, text);
                    if let Err(e) = write.send(Message::text(text)).await {
                        crate::log_error!("Send failed: {}", e);
                        on_event(SocketEvent::Error(json!({ "error_message": e.to_string() })));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    set_state(&state, ConnectionState::Closing);
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => on_event(SocketEvent::Text(text.as_str().to_string())),
                Some(Ok(Message::Binary(data))) => on_event(SocketEvent::Binary(data.to_vec())),
                Some(Ok(Message::Close(frame))) => {
                    if let Some(frame) = frame {
                        close_data = json!({
                            "code": u16::from(frame.code),
                            "reason": &*frame.reason,
                        });
                    }
                    crate::log_info!("WebSocket to {} received close frame", url);
                    break;
                }
                // Pong is handled automatically by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    crate::log_error!("WebSocket read error: {}", e);
                    on_event(SocketEvent::Error(json!({ "error_message": e.to_string() })));
                    break;
                }
                None => break,
            },
        }
    }

    set_state(&state, ConnectionState::Closed);
    crate::log_info!("WebSocket to {} closed", url);
    on_event(SocketEvent::Closed(close_data));
}
