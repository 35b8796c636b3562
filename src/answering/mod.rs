//! Extractive question-answering clients.

use std::sync::Arc;

use crate::config::Config;
use crate::inference::{InferenceEndpoint, InferenceError};
use crate::processing::Answer;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the question-answering provider.
#[derive(Debug, Error)]
pub enum QuestionAnsweringError {
    /// Provider was unreachable or the model is not loaded.
    #[error("Question-answering provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to answer question: {0}")]
    InferenceFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl From<InferenceError> for QuestionAnsweringError {
    fn from(error: InferenceError) -> Self {
        match error {
            InferenceError::Unavailable(message) => Self::ProviderUnavailable(message),
            InferenceError::Failed { .. } => Self::InferenceFailed(error.to_string()),
            InferenceError::InvalidResponse(message) => Self::InvalidResponse(message),
        }
    }
}

/// Interface implemented by extractive QA providers.
#[async_trait]
pub trait QuestionAnsweringClient: Send + Sync {
    /// Select the best answer span for `question` within `context`.
    ///
    /// Returns `Ok(None)` when the model response carries no answer.
    async fn answer(
        &self,
        question: &str,
        context: &str,
    ) -> Result<Option<Answer>, QuestionAnsweringError>;
}

/// Build the QA client described by configuration.
pub fn build_qa_client(
    config: &Config,
) -> Result<Arc<dyn QuestionAnsweringClient>, QuestionAnsweringError> {
    Ok(Arc::new(HuggingFaceQaClient::new(
        &config.inference_base_url,
        &config.qa_model,
        config.inference_api_token.clone(),
    )?))
}

/// Question answering through a Hugging Face style inference endpoint.
pub struct HuggingFaceQaClient {
    endpoint: InferenceEndpoint,
}

impl HuggingFaceQaClient {
    /// Create a client for `model` hosted under `base_url`.
    pub fn new(
        base_url: &str,
        model: &str,
        token: Option<String>,
    ) -> Result<Self, QuestionAnsweringError> {
        let endpoint = InferenceEndpoint::new(base_url, model, token, "medsum/qa")?;
        Ok(Self { endpoint })
    }
}

/// Raw QA output. Every field is optional: a response without `answer` means no answer.
#[derive(Debug, Default, Deserialize)]
struct RawAnswer {
    answer: Option<String>,
    score: Option<f64>,
    start: Option<usize>,
    end: Option<usize>,
}

/// Endpoints return a single object, or a ranked list when asked for several candidates.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QaOutput {
    One(RawAnswer),
    Ranked(Vec<RawAnswer>),
}

impl QaOutput {
    fn into_best(self) -> Option<Answer> {
        let raw = match self {
            Self::One(raw) => raw,
            Self::Ranked(candidates) => candidates.into_iter().next()?,
        };
        raw.answer.map(|text| Answer {
            text,
            score: raw.score,
            start: raw.start,
            end: raw.end,
        })
    }
}

#[async_trait]
impl QuestionAnsweringClient for HuggingFaceQaClient {
    async fn answer(
        &self,
        question: &str,
        context: &str,
    ) -> Result<Option<Answer>, QuestionAnsweringError> {
        let payload = json!({
            "inputs": {
                "question": question,
                "context": context,
            }
        });
        let output: QaOutput = self.endpoint.post(&payload).await?;
        Ok(output.into_best())
    }
}
