//! Shared HTTP transport for Hugging Face style inference endpoints.
//!
//! Both pretrained capabilities (extractive QA and abstractive summarization) are served as
//! `POST {base_url}/models/{model}` with a JSON body and an optional bearer token. The
//! transport maps connection failures, non-success statuses and undecodable bodies into
//! [`InferenceError`]; each capability converts that into its own error type.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Failures raised by the inference transport.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Endpoint could not be reached or reported the model as unavailable.
    #[error("{0}")]
    Unavailable(String),
    /// Endpoint answered with an error status.
    #[error("endpoint returned {status}: {body}")]
    Failed {
        /// HTTP status returned by the endpoint.
        status: StatusCode,
        /// Response body, usually a JSON error document.
        body: String,
    },
    /// Response body could not be decoded.
    #[error("{0}")]
    InvalidResponse(String),
}

/// One model hosted behind an inference endpoint.
#[derive(Debug, Clone)]
pub struct InferenceEndpoint {
    http: Client,
    url: String,
    token: Option<String>,
}

impl InferenceEndpoint {
    /// Build an endpoint for `model` under `base_url`.
    pub fn new(
        base_url: &str,
        model: &str,
        token: Option<String>,
        user_agent: &str,
    ) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|error| {
                InferenceError::Unavailable(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self {
            http,
            url: format!("{}/models/{}", base_url.trim_end_matches('/'), model),
            token,
        })
    }

    /// Fully qualified model URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send `payload` to the model and decode the JSON response.
    pub async fn post<T: DeserializeOwned>(&self, payload: &Value) -> Result<T, InferenceError> {
        let mut request = self.http.post(&self.url).json(payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|error| {
            InferenceError::Unavailable(format!("failed to reach {}: {error}", self.url))
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Unavailable(format!(
                "model at {} unavailable ({status}): {body}",
                self.url
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Failed { status, body });
        }

        response.json::<T>().await.map_err(|error| {
            InferenceError::InvalidResponse(format!("failed to decode response: {error}"))
        })
    }
}
