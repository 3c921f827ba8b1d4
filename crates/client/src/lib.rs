//! Narrator Client - websocket messaging for the narrator and appearance front-ends
//!
//! This crate contains the client side of the narrator server protocol:
//! a websocket connection manager with request correlation and per-operation
//! dispatch, the HTTP client for the model and sample endpoints, and the
//! preferences a front-end keeps between sessions. It builds for the browser
//! (wasm32) and for native targets.

pub mod logging;

pub mod api_client;
pub mod app;
pub mod config;
pub mod loading;
pub mod preferences;
pub mod storage;
pub mod ws;

pub use api_client::ApiClient;
pub use app::{AppError, Frontend, NarratorApp};
pub use config::{ClientConfig, ReconnectPolicy};
pub use loading::{LoadingIndicator, PendingLoads};
pub use preferences::Preferences;
pub use storage::Storage;
pub use ws::{Client, ClientError, ConnectionState};
