//! Abstractive summarization clients.
//!
//! The default provider calls a Hugging Face style inference endpoint, which takes the same
//! `max_length` / `min_length` / `do_sample` parameters as a local transformers pipeline. The
//! Ollama-backed client is an alternative for fully local deployments; it can only bound the
//! output length from above (`num_predict`), so `min_length` is passed as a prompt hint.

use std::sync::Arc;

use crate::config::{Config, SummarizationProvider};
use crate::inference::{InferenceEndpoint, InferenceError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced while attempting abstractive summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable or the model is not loaded.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl From<InferenceError> for SummarizationClientError {
    fn from(error: InferenceError) -> Self {
        match error {
            InferenceError::Unavailable(message) => Self::ProviderUnavailable(message),
            InferenceError::Failed { .. } => Self::GenerationFailed(error.to_string()),
            InferenceError::InvalidResponse(message) => Self::InvalidResponse(message),
        }
    }
}

/// Parameters for summarizing one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizationRequest {
    /// Text to summarize.
    pub text: String,
    /// Maximum output length in model tokens.
    pub max_length: usize,
    /// Minimum output length in model tokens.
    pub min_length: usize,
    /// Whether to sample; `false` requests deterministic decoding.
    pub do_sample: bool,
}

/// Interface implemented by abstractive summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Produce a summary of `request.text` within the requested length bounds.
    async fn summarize(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Build the summarization client selected by configuration.
pub fn build_summarization_client(
    config: &Config,
) -> Result<Arc<dyn SummarizationClient>, SummarizationClientError> {
    match config.summarization_provider {
        SummarizationProvider::HuggingFace => Ok(Arc::new(HuggingFaceSummarizationClient::new(
            &config.inference_base_url,
            &config.summarization_model,
            config.inference_api_token.clone(),
        )?)),
        SummarizationProvider::Ollama => Ok(Arc::new(OllamaSummarizationClient::new(
            config.ollama_url.clone(),
            config.summarization_model.clone(),
        )?)),
    }
}

/// Summarization through a Hugging Face style inference endpoint.
pub struct HuggingFaceSummarizationClient {
    endpoint: InferenceEndpoint,
}

impl HuggingFaceSummarizationClient {
    /// Create a client for `model` hosted under `base_url`.
    pub fn new(
        base_url: &str,
        model: &str,
        token: Option<String>,
    ) -> Result<Self, SummarizationClientError> {
        let endpoint = InferenceEndpoint::new(base_url, model, token, "medsum/summary")?;
        Ok(Self { endpoint })
    }
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary_text: String,
}

#[async_trait]
impl SummarizationClient for HuggingFaceSummarizationClient {
    async fn summarize(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "inputs": request.text,
            "parameters": {
                "max_length": request.max_length,
                "min_length": request.min_length,
                "do_sample": request.do_sample,
            }
        });

        let outputs: Vec<SummaryOutput> = self.endpoint.post(&payload).await?;
        outputs
            .into_iter()
            .next()
            .map(|output| output.summary_text)
            .ok_or_else(|| {
                SummarizationClientError::InvalidResponse("endpoint returned no summaries".into())
            })
    }
}

/// Summarization through a local Ollama runtime.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaSummarizationClient {
    /// Create a client for `model` served by the Ollama runtime at `base_url`.
    pub fn new(base_url: String, model: String) -> Result<Self, SummarizationClientError> {
        let http = Client::builder()
            .user_agent("medsum/summary")
            .build()
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to build HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

fn build_ollama_prompt(request: &SummarizationRequest) -> String {
    format!(
        "Summarize the following document excerpt in a single factual paragraph of roughly {} to {} words. \
         Do not add information that is not in the excerpt.\n\n{}",
        request.min_length, request.max_length, request.text
    )
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn summarize(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let temperature = if request.do_sample { 0.7 } else { 0.0 };
        let payload = json!({
            "model": self.model,
            "prompt": build_ollama_prompt(&request),
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": request.max_length,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}
