//! Client configuration from environment variables or the page location.

use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Origin used when nothing else is configured.
pub const DEFAULT_ORIGIN: &str = "http://localhost:10324";

/// Relative path of the websocket endpoint.
pub const DEFAULT_WS_PATH: &str = "ws";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid origin '{origin}': {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: url::ParseError,
    },
    #[error("origin scheme '{0}' cannot be used for a websocket")]
    UnsupportedScheme(String),
    #[error("invalid websocket path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unknown reconnect policy '{0}' (expected 'on-send' or 'manual')")]
    UnknownReconnectPolicy(String),
}

/// What `send` does when the socket is not open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectPolicy {
    /// Reconnect to the last connected path, then send.
    #[default]
    OnSend,
    /// Fail with `ClientError::Disconnected`; the caller decides when to reconnect.
    Manual,
}

impl FromStr for ReconnectPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "on-send" | "on_send" | "auto" => Ok(ReconnectPolicy::OnSend),
            "manual" => Ok(ReconnectPolicy::Manual),
            other => Err(ConfigError::UnknownReconnectPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin of the page/server, e.g. `http://localhost:10324`.
    pub origin: Url,
    /// Path of the websocket endpoint relative to the origin.
    pub ws_path: String,
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse(DEFAULT_ORIGIN).expect("default origin is a valid URL"),
            ws_path: DEFAULT_WS_PATH.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(origin: &str) -> Result<Self, ConfigError> {
        let origin = Url::parse(origin).map_err(|source| ConfigError::InvalidOrigin {
            origin: origin.to_string(),
            source,
        })?;
        Ok(Self {
            origin,
            ..Self::default()
        })
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_ws_path(mut self, ws_path: impl Into<String>) -> Self {
        self.ws_path = ws_path.into();
        self
    }

    /// Read configuration from environment variables.
    ///
    /// Environment variables:
    /// - `NARRATOR_ORIGIN`: server origin (default: "http://localhost:10324")
    /// - `NARRATOR_WS_PATH`: websocket path (default: "ws")
    /// - `NARRATOR_RECONNECT`: "on-send" | "manual" (default: "on-send")
    pub fn from_env() -> Result<Self, ConfigError> {
        let origin =
            std::env::var("NARRATOR_ORIGIN").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string());
        let mut config = Self::new(&origin)?;

        if let Ok(ws_path) = std::env::var("NARRATOR_WS_PATH") {
            config.ws_path = ws_path;
        }
        if let Ok(reconnect) = std::env::var("NARRATOR_RECONNECT") {
            config.reconnect = reconnect.parse()?;
        }

        Ok(config)
    }

    /// Configuration for the page the client is running in.
    #[cfg(target_arch = "wasm32")]
    pub fn from_page() -> Option<Self> {
        let origin = web_sys::window()?.location().origin().ok()?;
        Self::new(&origin).ok()
    }

    /// Websocket URL for `/{path}` on the configured host, keeping TLS if the
    /// origin uses it. Any path, query or fragment of the origin is dropped.
    pub fn ws_url(&self, path: &str) -> Result<Url, ConfigError> {
        let mut url = self.origin.clone();
        url.set_path("/");
        url.set_query(None);
        url.set_fragment(None);
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|_| ConfigError::UnsupportedScheme(scheme.to_string()))?;
        url.join(path.trim_start_matches('/'))
            .map_err(|source| ConfigError::InvalidPath {
                path: path.to_string(),
                source,
            })
    }

    /// Plain HTTP base URL for the auxiliary endpoints.
    pub fn http_base(&self) -> String {
        self.origin.as_str().trim_end_matches('/').to_string()
    }
}
