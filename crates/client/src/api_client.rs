//! HTTP client for the narrator's auxiliary endpoints (model catalog and samples).

use narrator_shared::{ApiError, ModelCatalog, SampleCatalog, SampleRequest};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const MODEL_PARAMETERS_PATH: &str = "/models/parameters";
pub const SAMPLE_LIST_PATH: &str = "/sample/list";
pub const SAMPLE_PATH: &str = "/sample";

/// HTTP client for the server the websocket client talks to.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: String::new(),
        }
    }

    /// Set the base URL for API requests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if self.base_url.is_empty() {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            }
        } else {
            let base = self.base_url.trim_end_matches('/');
            let path = path.trim_start_matches('/');
            format!("{base}/{path}")
        }
    }

    /// Fail with the body text on non-2xx responses.
    async fn check(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;
        Err(ApiError::Http {
            status: status.as_u16(),
            body,
        })
    }

    /// Make a GET request and decode the JSON body
    pub async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let text = Self::check(resp)
            .await?
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

        serde_json::from_str(&text).map_err(|e| ApiError::Deserialize(e.to_string()))
    }

    /// Make a POST request with JSON body and return the raw reply bytes
    pub async fn post_for_bytes<TReq: Serialize>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<Vec<u8>, ApiError> {
        let resp = self.post(path, body).await?;
        let bytes = resp.bytes().await.map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn post<TReq: Serialize>(&self, path: &str, body: &TReq) -> Result<Response, ApiError> {
        let body_bytes =
            serde_json::to_vec(body).map_err(|e| ApiError::Deserialize(e.to_string()))?;

        let resp = self
            .client
            .post(self.url(path))
            .body(body_bytes)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Self::check(resp).await
    }

    // --- Narrator endpoints ---

    /// Every model the server can narrate with, keyed by model name
    pub async fn model_parameters(&self) -> Result<ModelCatalog, ApiError> {
        self.get_json(MODEL_PARAMETERS_PATH).await
    }

    /// Datasets and models that have pre-generated samples
    pub async fn sample_list(&self) -> Result<SampleCatalog, ApiError> {
        self.get_json(SAMPLE_LIST_PATH).await
    }

    /// Audio of one sample
    pub async fn sample(&self, request: &SampleRequest) -> Result<Vec<u8>, ApiError> {
        self.post_for_bytes(SAMPLE_PATH, request).await
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}
