//! Application context for one front-end session.
//!
//! [`NarratorApp`] is built once at startup and handed around by reference.
//! It owns the websocket client, the pending-load set, the HTTP client and
//! the saved preferences, and wires the client's handlers to them.

use narrator_shared::{
    ApiError, ModelCatalog, NarrationConfig, Operation, PayloadRegistry, Request, Response,
    DEFAULT_MODEL,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::api_client::ApiClient;
use crate::config::ClientConfig;
use crate::loading::{Completion, LoadingIndicator, LogIndicator, PendingLoads};
use crate::preferences::Preferences;
use crate::ws::{BinaryHandler, Client, ClientError, ConnectionState, MaybeSendSync};

/// Which front-end the session serves. Decides the payload registry and the
/// shape of `load` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frontend {
    #[default]
    Narrator,
    Appearance,
}

impl Frontend {
    pub fn registry(&self) -> PayloadRegistry {
        match self {
            Frontend::Narrator => PayloadRegistry::narrator(),
            Frontend::Appearance => PayloadRegistry::appearance(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid narration configuration: {0}")]
    InvalidConfiguration(String),
}

pub struct NarratorApp {
    frontend: Frontend,
    client: Arc<Client>,
    pending: Arc<PendingLoads>,
    api: ApiClient,
    preferences: Preferences,
    connected: Arc<AtomicBool>,
}

impl NarratorApp {
    /// A session on the platform transport with default storage and an
    /// indicator that only logs.
    pub fn new(config: ClientConfig, frontend: Frontend) -> Self {
        let client = Client::new(config, frontend.registry());
        Self::from_client(client, frontend, Preferences::default(), Arc::new(LogIndicator))
    }

    pub fn from_client(
        client: Client,
        frontend: Frontend,
        preferences: Preferences,
        indicator: Arc<dyn LoadingIndicator>,
    ) -> Self {
        let api = ApiClient::new().with_base_url(client.config().http_base());
        let client = Arc::new(client.with_loading_indicator(indicator.clone()));
        let pending = Arc::new(PendingLoads::new(indicator.clone()));
        let connected = Arc::new(AtomicBool::new(false));

        // The narrator server announces itself; a bare socket open is enough for appearance
        for operation in [Operation::ConnectionOpened, Operation::Open] {
            let connected = connected.clone();
            client.add_handler(operation, move |_: &Response| {
                connected.store(true, Ordering::SeqCst);
            });
        }

        let flag = connected.clone();
        client.add_handler(Operation::Closed, move |_: &Response| {
            flag.store(false, Ordering::SeqCst);
        });

        let completed = pending.clone();
        client.add_handler(Operation::TransferComplete, move |response: &Response| {
            match response.message_id() {
                Some(id) => {
                    completed.complete(id);
                }
                None => crate::log_warn!("transfer_complete without a message_id"),
            }
        });

        let loading = indicator;
        client.add_handler(Operation::Load, move |response: &Response| {
            if let Response::Load(load) = response {
                crate::log_info!(
                    "{} ({}/{})",
                    load.message,
                    load.count_complete,
                    load.item_count.map_or_else(|| "?".to_string(), |count| count.to_string())
                );
            }
            loading.show();
        });

        client.add_handler(Operation::Error, |response: &Response| {
            if let Response::Error(notice) = response {
                crate::log_error!(
                    "{} failed for message {}: {}",
                    notice.message_type(),
                    notice.message_id(),
                    notice.error_message()
                );
            }
        });

        client.add_handler(Operation::NoHandler, |response: &Response| {
            if let Response::NoHandler(reply) = response {
                crate::log_warn!("{}", reply.message);
            }
        });

        Self {
            frontend,
            client,
            pending,
            api,
            preferences,
            connected,
        }
    }

    pub fn frontend(&self) -> Frontend {
        self.frontend
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    pub fn pending(&self) -> &Arc<PendingLoads> {
        &self.pending
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Connect to the configured websocket path.
    pub async fn start(&self) -> Result<ConnectionState, AppError> {
        self.connected.store(false, Ordering::SeqCst);
        let path = self.client.config().ws_path.clone();
        Ok(self.client.connect(&path).await?)
    }

    /// Whether the server has reported the connection as open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Run `handler` when the server asks the application to shut down.
    pub fn on_kill(&self, handler: impl Fn() + MaybeSendSync + 'static) {
        self.client
            .add_handler(Operation::Kill, move |_: &Response| handler());
    }

    /// Receive narrated audio, one binary frame per call.
    pub fn on_audio(&self, handler: impl BinaryHandler + 'static) {
        self.client.add_binary_handler(handler);
    }

    /// Ask the server to open `path` and remember it for next time.
    pub async fn load_path(&self, path: &str) -> Result<String, AppError> {
        let request = match self.frontend {
            Frontend::Narrator => Request::load(path),
            Frontend::Appearance => Request::load_rows(path, None),
        };
        crate::log_info!("Loading {}", path);
        let message_id = self.client.send(request, true).await?;
        self.preferences.set_previous_path(path);
        Ok(message_id)
    }

    /// Narrate `text`. Returns the message id the audio will be tagged with.
    pub async fn read_text(
        &self,
        text: &str,
        configuration: NarrationConfig,
    ) -> Result<String, AppError> {
        self.read_text_then(text, configuration, |_: &str| {}).await
    }

    /// Narrate `text` and run `on_complete` once the server reports the
    /// transfer complete.
    pub async fn read_text_then(
        &self,
        text: &str,
        configuration: NarrationConfig,
        on_complete: impl Completion + 'static,
    ) -> Result<String, AppError> {
        configuration
            .validate()
            .map_err(AppError::InvalidConfiguration)?;
        self.preferences.set_text(text);

        let request = Request::read(text, configuration);
        let message_id = request.message_id().to_string();
        self.pending.push(message_id.clone());
        self.pending.on_complete(message_id.clone(), on_complete);

        match self.client.send(request, true).await {
            Ok(sent) => Ok(sent),
            Err(e) => {
                self.pending.discard(&message_id);
                Err(e.into())
            }
        }
    }

    /// Ask the server to shut down.
    pub async fn kill(&self) -> Result<String, AppError> {
        Ok(self.client.send(Request::kill(), false).await?)
    }

    /// Configuration for the saved model selection, falling back to the
    /// default model. Speaker and language are only kept when the model
    /// supports them.
    pub fn selected_configuration(&self, catalog: &ModelCatalog, speed: f32) -> NarrationConfig {
        let model = self
            .preferences
            .selected_model()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        NarrationConfig::for_selection(
            &model,
            catalog.get(&model),
            speed,
            self.preferences.selected_speaker().as_deref(),
            self.preferences.selected_language().as_deref(),
        )
    }

    pub async fn model_parameters(&self) -> Result<ModelCatalog, AppError> {
        Ok(self.api.model_parameters().await?)
    }
}

impl std::fmt::Debug for NarratorApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarratorApp")
            .field("frontend", &self.frontend)
            .field("client", &self.client)
            .field("pending", &self.pending.ids())
            .field("connected", &self.is_connected())
            .finish()
    }
}
