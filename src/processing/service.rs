//! Processing service running the user actions against a session.

use crate::{
    answering::{QuestionAnsweringClient, build_qa_client},
    config::Config,
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        answer::answer_question,
        extraction::extract_document,
        summarize::{LengthBounds, summarize_document},
        types::{
            AnswerOutcome, Document, DocumentFormat, ExtractionOutcome, ProcessingError,
            ServiceInitError, Summary,
        },
    },
    session::Session,
    summarization::{SummarizationClient, build_summarization_client},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Tunables for the summarization pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Window size, in characters, used to chunk documents.
    pub window: usize,
    /// Length bounds applied to every chunk summary.
    pub bounds: LengthBounds,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            window: super::chunking::SUMMARY_WINDOW_CHARS,
            bounds: LengthBounds::default(),
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            window: config.summary_chunk_size,
            bounds: LengthBounds {
                max_length: config.summary_max_length,
                min_length: config.summary_min_length,
                clamp_min_length: config.summary_clamp_min_length,
            },
        }
    }
}

/// Runs extraction, question answering and summarization for interactive surfaces.
///
/// The service owns long-lived handles to both inference clients so that every session reuses
/// the same warmed-up connections. Construct it once near process start and share it through
/// an `Arc`; session state is passed into each action rather than held here.
pub struct ProcessingService {
    qa_client: Arc<dyn QuestionAnsweringClient>,
    summarization_client: Arc<dyn SummarizationClient>,
    settings: PipelineSettings,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the processing pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Extract text from a new upload and make it the session's current document.
    async fn ingest(
        &self,
        session: &mut Session,
        document: Document,
    ) -> Result<ExtractionOutcome, ProcessingError>;

    /// Answer a question against the session's extracted text.
    async fn ask(&self, session: &Session, question: &str)
    -> Result<AnswerOutcome, ProcessingError>;

    /// Summarize the session's extracted text and cache the result.
    async fn summarize(&self, session: &mut Session) -> Result<Summary, ProcessingError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ProcessingService {
    /// Build the service and its inference clients from configuration.
    pub fn new(config: &Config) -> Result<Self, ServiceInitError> {
        tracing::info!(model = %config.qa_model, "Initializing question-answering client");
        let qa_client = build_qa_client(config)?;
        tracing::info!(
            provider = ?config.summarization_provider,
            model = %config.summarization_model,
            "Initializing summarization client"
        );
        let summarization_client = build_summarization_client(config)?;
        Ok(Self::with_clients(
            qa_client,
            summarization_client,
            PipelineSettings::from(config),
        ))
    }

    /// Assemble a service from pre-built clients.
    pub fn with_clients(
        qa_client: Arc<dyn QuestionAnsweringClient>,
        summarization_client: Arc<dyn SummarizationClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            qa_client,
            summarization_client,
            settings,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Extract text from `document` unless it is already the session's current document.
    ///
    /// A different document replaces the session state wholesale, including any cached
    /// summary. Extraction failures leave the session untouched. Parsing runs on the blocking
    /// pool so large PDFs do not stall other sessions.
    pub async fn ingest(
        &self,
        session: &mut Session,
        document: Document,
    ) -> Result<ExtractionOutcome, ProcessingError> {
        if session.holds(&document) {
            tracing::debug!(
                session_id = %session.id(),
                filename = document.filename(),
                "Document already extracted; reusing cached text"
            );
            return Ok(match session.extracted_text() {
                Some(text) => ExtractionOutcome::AlreadyExtracted {
                    characters: text.chars().count(),
                },
                None => textless_outcome(&document),
            });
        }

        let (document, text) = tokio::task::spawn_blocking(move || {
            let text = extract_document(&document);
            (document, text)
        })
        .await
        .map_err(|error| ProcessingError::ExtractionTask(error.to_string()))?;
        let text = text?;
        let outcome = if text.trim().is_empty() {
            session.load_document(&document, None);
            textless_outcome(&document)
        } else {
            let characters = text.chars().count();
            session.load_document(&document, Some(text));
            self.metrics.record_extraction();
            ExtractionOutcome::Extracted {
                format: document.format(),
                characters,
            }
        };

        match outcome.warning() {
            Some(warning) => tracing::warn!(
                session_id = %session.id(),
                filename = document.filename(),
                "{warning}"
            ),
            None => tracing::info!(
                session_id = %session.id(),
                filename = document.filename(),
                format = ?document.format(),
                "Text extracted"
            ),
        }
        Ok(outcome)
    }

    /// Answer `question` against the session's extracted text. Answers are never cached.
    pub async fn ask(
        &self,
        session: &Session,
        question: &str,
    ) -> Result<AnswerOutcome, ProcessingError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ProcessingError::EmptyQuestion);
        }
        let context = current_text(session)?;

        let outcome = answer_question(self.qa_client.as_ref(), question, context).await?;
        self.metrics.record_question();
        tracing::info!(
            session_id = %session.id(),
            found = matches!(outcome, AnswerOutcome::Found(_)),
            "Question answered"
        );
        Ok(outcome)
    }

    /// Summarize the session's extracted text, caching the result on success.
    ///
    /// On failure the previously cached summary and text are left as they were.
    pub async fn summarize(&self, session: &mut Session) -> Result<Summary, ProcessingError> {
        let text = current_text(session)?;
        let summary = summarize_document(
            self.summarization_client.as_ref(),
            text,
            self.settings.window,
            &self.settings.bounds,
        )
        .await?;

        self.metrics.record_summary(summary.summarized_chunks as u64);
        tracing::info!(
            session_id = %session.id(),
            chunks = summary.chunk_count,
            summarized_chunks = summary.summarized_chunks,
            "Summary generated"
        );
        session.store_summary(summary.clone());
        Ok(summary)
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn current_text(session: &Session) -> Result<&str, ProcessingError> {
    session
        .extracted_text()
        .filter(|text| !text.trim().is_empty())
        .ok_or(ProcessingError::MissingDocument)
}

fn textless_outcome(document: &Document) -> ExtractionOutcome {
    match document.format() {
        DocumentFormat::Unsupported => ExtractionOutcome::Unsupported {
            filename: document.filename().to_string(),
        },
        format => ExtractionOutcome::Empty { format },
    }
}

#[async_trait]
impl ProcessingApi for ProcessingService {
    async fn ingest(
        &self,
        session: &mut Session,
        document: Document,
    ) -> Result<ExtractionOutcome, ProcessingError> {
        ProcessingService::ingest(self, session, document).await
    }

    async fn ask(
        &self,
        session: &Session,
        question: &str,
    ) -> Result<AnswerOutcome, ProcessingError> {
        ProcessingService::ask(self, session, question).await
    }

    async fn summarize(&self, session: &mut Session) -> Result<Summary, ProcessingError> {
        ProcessingService::summarize(self, session).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ProcessingService::metrics_snapshot(self)
    }
}
