//! Connection manager: owns the socket, correlates requests by message id and
//! feeds everything the socket observes into the [`Dispatcher`].

use futures_channel::oneshot;
use narrator_shared::{
    generate_id, Decoder, Operation, Outgoing, PayloadRegistry, DEFAULT_ID_LENGTH, MESSAGE_ID_KEY,
};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use super::connection::{
    ConnectionState, PlatformTransport, Socket, SocketEvent, Transport, TransportError,
};
use super::dispatcher::{BinaryHandler, Dispatcher, ResponseHandler};
use crate::config::{ClientConfig, ConfigError, ReconnectPolicy};
use crate::loading::{LoadingIndicator, LogIndicator};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Cannot send message through client '{client_id}' - please connect first.")]
    NotConnected { client_id: String },
    #[error("the connection is closed and reconnecting is disabled")]
    Disconnected,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("could not serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The current socket, tagged with the generation it was opened under.
/// Events from sockets of older generations are ignored.
#[derive(Default)]
struct SocketSlot {
    generation: AtomicU64,
    socket: Mutex<Option<Box<dyn Socket>>>,
}

impl SocketSlot {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

pub struct Client {
    id: String,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    dispatcher: Arc<Dispatcher>,
    slot: Arc<SocketSlot>,
    current_path: Mutex<Option<String>>,
    loading: Arc<dyn LoadingIndicator>,
}

impl Client {
    /// A client on the platform's websocket transport.
    pub fn new(config: ClientConfig, registry: PayloadRegistry) -> Self {
        Self::with_transport(config, registry, Arc::new(PlatformTransport::default()))
    }

    pub fn with_transport(
        config: ClientConfig,
        registry: PayloadRegistry,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            id: generate_id(DEFAULT_ID_LENGTH),
            config,
            transport,
            dispatcher: Arc::new(Dispatcher::new(registry)),
            slot: Arc::new(SocketSlot::default()),
            current_path: Mutex::new(None),
            loading: Arc::new(LogIndicator),
        }
    }

    /// Replace the indicator signalled by `send(.., true)` and binary frames.
    pub fn with_loading_indicator(mut self, loading: Arc<dyn LoadingIndicator>) -> Self {
        self.loading = loading;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Path of the last `connect`, used to reconnect.
    pub fn current_path(&self) -> Option<String> {
        lock(&self.current_path).clone()
    }

    /// Open a socket at `path`, replacing any existing one, and wait until it
    /// is open or has failed. Returns the state the socket settled in.
    pub async fn connect(&self, path: &str) -> Result<ConnectionState, ClientError> {
        let url = self.config.ws_url(path)?;

        let previous = lock(&self.slot.socket).take();
        let generation = self.slot.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = previous {
            crate::log_debug!("Closing previous socket before connecting to {}", url);
            previous.close();
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let on_event = self.event_sink(generation, ready_tx);

        crate::log_info!("Client {} connecting to {}", self.id, url);
        let socket = self.transport.open(url.as_str(), on_event)?;
        if self.slot.is_current(generation) {
            *lock(&self.slot.socket) = Some(socket);
        } else {
            // Another connect started while this one was opening
            socket.close();
        }

        match ready_rx.await {
            Ok(state) => crate::log_debug!("Socket to {} settled as {:?}", url, state),
            // The socket went away without reporting open or closed
            Err(_) => crate::log_warn!("Socket to {} dropped before settling", url),
        }
        *lock(&self.current_path) = Some(path.to_string());

        Ok(self.state())
    }

    fn event_sink(
        &self,
        generation: u64,
        ready: oneshot::Sender<ConnectionState>,
    ) -> Arc<dyn super::connection::EventSink> {
        let dispatcher = self.dispatcher.clone();
        let slot = self.slot.clone();
        let loading = self.loading.clone();
        let ready = Mutex::new(Some(ready));

        Arc::new(move |event: SocketEvent| {
            let settled = match &event {
                SocketEvent::Open(_) => Some(ConnectionState::Open),
                SocketEvent::Closed(_) => Some(ConnectionState::Closed),
                _ => None,
            };
            if let Some(state) = settled {
                if let Some(ready) = lock(&ready).take() {
                    let _ = ready.send(state);
                }
            }

            if !slot.is_current(generation) {
                crate::log_debug!("Ignoring event from a replaced socket");
                return;
            }

            match event {
                SocketEvent::Open(data) => {
                    crate::log_info!("Connection opened");
                    dispatcher.dispatch(&Operation::Open, data);
                }
                SocketEvent::Text(text) => {
                    dispatcher.dispatch_text(&text);
                }
                SocketEvent::Binary(data) => {
                    dispatcher.dispatch_binary(&data);
                    loading.hide();
                }
                SocketEvent::Closed(data) => {
                    crate::log_info!("Connection closed");
                    lock(&slot.socket).take();
                    dispatcher.dispatch(&Operation::Closed, data);
                }
                SocketEvent::Error(data) => {
                    dispatcher.dispatch(&Operation::Error, data);
                }
            }
        })
    }

    /// Send a request or raw payload. Returns the `message_id` it was sent with.
    ///
    /// Reconnects first when the socket is not open and the policy allows it.
    /// A request's send callbacks run only after the frame reached the transport.
    pub async fn send(
        &self,
        outgoing: impl Into<Outgoing>,
        show_loading: bool,
    ) -> Result<String, ClientError> {
        let outgoing = outgoing.into();
        let path = self.current_path().ok_or_else(|| ClientError::NotConnected {
            client_id: self.id.clone(),
        })?;

        let payload = outgoing.payload()?;
        let message_id = match payload.get(MESSAGE_ID_KEY) {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let text = serde_json::to_string(&payload)?;

        if !self.is_connected() {
            match self.config.reconnect {
                ReconnectPolicy::OnSend => {
                    crate::log_info!("Reconnecting to '{}' before sending {}", path, message_id);
                    self.connect(&path).await?;
                }
                ReconnectPolicy::Manual => return Err(ClientError::Disconnected),
            }
        }

        crate::log_debug!("Sending request: {}", text);
        self.transmit(&text)?;

        if show_loading {
            self.loading.show();
        }
        outgoing.sent();

        Ok(message_id)
    }

    /// Send `{message_id, message}` on the open socket without reconnecting.
    pub fn send_raw_message(&self, message: &str) -> Result<String, ClientError> {
        let message_id = generate_id(DEFAULT_ID_LENGTH);
        let mut payload = Map::new();
        payload.insert(MESSAGE_ID_KEY.to_string(), Value::String(message_id.clone()));
        payload.insert("message".to_string(), Value::String(message.to_string()));

        self.transmit(&serde_json::to_string(&payload)?)?;
        Ok(message_id)
    }

    fn transmit(&self, text: &str) -> Result<(), ClientError> {
        match lock(&self.slot.socket).as_ref() {
            Some(socket) => Ok(socket.send_text(text)?),
            None => Err(ClientError::Disconnected),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// State of the current socket; `Closed` when there is none.
    pub fn state(&self) -> ConnectionState {
        lock(&self.slot.socket)
            .as_ref()
            .map_or(ConnectionState::Closed, |socket| socket.state())
    }

    /// Close the current socket. The `closed` handlers run once it has closed.
    pub fn close(&self) {
        let socket = lock(&self.slot.socket).take();
        if let Some(socket) = socket {
            socket.close();
        }
    }

    pub fn add_handler(&self, operation: impl Into<Operation>, handler: impl ResponseHandler + 'static) {
        self.dispatcher.add_handler(operation, handler);
    }

    pub fn add_binary_handler(&self, handler: impl BinaryHandler + 'static) {
        self.dispatcher.add_binary_handler(handler);
    }

    pub fn clear_binary_handlers(&self) {
        self.dispatcher.clear_binary_handlers();
    }

    pub fn register_payload_type(&self, operation: impl Into<Operation>, decoder: Decoder) {
        self.dispatcher.register_payload_type(operation, decoder);
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("origin", &self.config.origin.as_str())
            .field("current_path", &self.current_path())
            .field("state", &self.state())
            .finish()
    }
}
