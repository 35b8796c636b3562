//! Core data types and error definitions for the processing pipeline.

use crate::answering::QuestionAnsweringError;
use crate::summarization::SummarizationClientError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Sentinel rendered when the QA model produces no answer span.
pub const NO_ANSWER_FOUND: &str = "No answer found.";

/// Message shown when an action needs extracted text that is not available.
pub const MISSING_DOCUMENT_MESSAGE: &str = "Please upload a file and extract text first.";

/// Input format resolved once from the uploaded filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Paginated PDF document (`.pdf`).
    Pdf,
    /// UTF-8 text (`.txt`, `.data`).
    PlainText,
    /// Comma-separated table with a header row (`.csv`).
    Tabular,
    /// Any other suffix.
    Unsupported,
}

impl DocumentFormat {
    /// Resolve the format from a filename using an exact, case-sensitive suffix match.
    pub fn from_filename(filename: &str) -> Self {
        if filename.ends_with(".pdf") {
            Self::Pdf
        } else if filename.ends_with(".txt") || filename.ends_with(".data") {
            Self::PlainText
        } else if filename.ends_with(".csv") {
            Self::Tabular
        } else {
            Self::Unsupported
        }
    }
}

/// An uploaded artifact. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Document {
    filename: String,
    bytes: Vec<u8>,
    format: DocumentFormat,
    fingerprint: String,
}

impl Document {
    /// Wrap uploaded bytes, resolving the format and fingerprint up front.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let format = DocumentFormat::from_filename(&filename);
        let fingerprint = compute_fingerprint(&filename, &bytes);
        Self {
            filename,
            bytes,
            format,
            fingerprint,
        }
    }

    /// Original filename supplied with the upload.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Raw uploaded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Format inferred from the filename.
    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Hex SHA-256 digest over the filename and contents.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn compute_fingerprint(filename: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Errors raised while turning uploaded bytes into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Text or data file was not valid UTF-8.
    #[error("File is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
    /// PDF byte stream could not be opened.
    #[error("Failed to open PDF: {0}")]
    Pdf(#[from] lopdf::Error),
    /// CSV content could not be parsed as a table.
    #[error("Failed to parse CSV: {0}")]
    Tabular(String),
}

impl From<csv::Error> for ExtractionError {
    fn from(error: csv::Error) -> Self {
        Self::Tabular(error.to_string())
    }
}

/// Errors produced while splitting text into summarization windows.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// A zero-width window can never make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Result of running the extractor for an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Text was extracted and cached in the session.
    Extracted {
        /// Format the document was parsed as.
        format: DocumentFormat,
        /// Number of characters extracted.
        characters: usize,
    },
    /// The same document is already cached; the extractor was not invoked.
    AlreadyExtracted {
        /// Number of characters in the cached text.
        characters: usize,
    },
    /// The filename suffix is not one of the supported formats.
    Unsupported {
        /// Filename that failed to match.
        filename: String,
    },
    /// Extraction succeeded but produced blank text.
    Empty {
        /// Format the document was parsed as.
        format: DocumentFormat,
    },
}

impl ExtractionOutcome {
    /// Whether the session now holds usable text.
    pub fn has_text(&self) -> bool {
        matches!(self, Self::Extracted { .. } | Self::AlreadyExtracted { .. })
    }

    /// User-facing warning for outcomes that leave the session without text.
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Unsupported { filename } => Some(format!(
                "Unsupported file type: {filename}. Upload a PDF, TXT, DATA or CSV file."
            )),
            Self::Empty { .. } => Some("No readable text found.".to_string()),
            Self::Extracted { .. } | Self::AlreadyExtracted { .. } => None,
        }
    }
}

/// Best answer span returned by the QA model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// Answer text selected from the context.
    pub text: String,
    /// Model confidence, when reported.
    pub score: Option<f64>,
    /// Character offset where the span starts in the context.
    pub start: Option<usize>,
    /// Character offset where the span ends in the context.
    pub end: Option<usize>,
}

/// Result of one question-answering invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// The model selected a span.
    Found(Answer),
    /// The model response carried no answer.
    NotFound,
}

impl AnswerOutcome {
    /// Text shown to the user: the answer span or the [`NO_ANSWER_FOUND`] sentinel.
    pub fn display_text(&self) -> &str {
        match self {
            Self::Found(answer) => &answer.text,
            Self::NotFound => NO_ANSWER_FOUND,
        }
    }
}

/// Report-level summary produced by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Chunk summaries joined by single spaces.
    pub text: String,
    /// Number of chunks the document was split into.
    pub chunk_count: usize,
    /// Number of chunks actually sent to the summarization model.
    pub summarized_chunks: usize,
}

/// Errors emitted by the user actions of the processing service.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The session holds no extracted text to work on.
    #[error("Please upload a file and extract text first.")]
    MissingDocument,
    /// A question was requested without any question text.
    #[error("Please enter a question.")]
    EmptyQuestion,
    /// The uploaded document could not be read.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractionError),
    /// The blocking extraction task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    ExtractionTask(String),
    /// The document could not be split for summarization.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// The summarization model failed on one of the chunks.
    #[error("Summarization failed: {0}")]
    Summarization(#[from] SummarizationClientError),
    /// The question-answering model failed.
    #[error("Question answering failed: {0}")]
    QuestionAnswering(#[from] QuestionAnsweringError),
}

impl ProcessingError {
    /// Expected conditions reported to the user as warnings rather than failures.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::MissingDocument | Self::EmptyQuestion)
    }
}

/// Errors raised while constructing the processing service.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// The question-answering client could not be built.
    #[error("Failed to initialize question-answering client: {0}")]
    QuestionAnswering(#[from] QuestionAnsweringError),
    /// The summarization client could not be built.
    #[error("Failed to initialize summarization client: {0}")]
    Summarization(#[from] SummarizationClientError),
}
