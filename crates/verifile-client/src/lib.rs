//! HTTP client for the Verifile API and the upload wizard built on it.
//!
//! `ApiClient` is a thin JSON client over the server's contracts. The wizard talks to
//! a `VerificationBackend`, which is either that client or a simulated stand-in.

pub mod api;
pub mod backend;
pub mod wizard;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:4000";

/// Non-success answer from the API, carrying the server's user-facing message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ApiFailure {
    pub status: u16,
    pub message: String,
}

impl ApiFailure {
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// HTTP client for the Verifile API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create client from VERIFILE_API_URL, falling back to the local default.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("VERIFILE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET request. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.build_url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request")?;

        parse_json(ensure_success(response).await?).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.post_json_raw(path, body).await?;
        parse_json(ensure_success(response).await?).await
    }

    /// POST JSON body and hand back the response whatever its status.
    pub async fn post_json_raw<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<Response> {
        let url = self.build_url(path);
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")
    }

    /// Raw client for requests outside the base URL (e.g. presigned targets).
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Turn a non-success response into an `ApiFailure`, preferring the `error` field
/// of the server's JSON error body.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|body| {
            body.get("error")
                .or_else(|| body.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or(text);

    Err(ApiFailure {
        status: status.as_u16(),
        message,
    }
    .into())
}

pub(crate) async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .context("Failed to parse response as JSON")
}

pub use backend::{
    BackendError, HttpBackend, SimulatedBackend, SimulatedOperation, VerificationBackend,
};
pub use wizard::Wizard;
