//! Document processing pipeline: extraction, question answering, and chunked summarization.

pub mod answer;
pub mod chunking;
pub mod extraction;
mod service;
pub mod summarize;
pub mod types;

pub use chunking::SUMMARY_WINDOW_CHARS;
pub use service::{PipelineSettings, ProcessingApi, ProcessingService};
pub use summarize::LengthBounds;
pub use types::{
    Answer, AnswerOutcome, ChunkingError, Document, DocumentFormat, ExtractionError,
    ExtractionOutcome, MISSING_DOCUMENT_MESSAGE, NO_ANSWER_FOUND, ProcessingError,
    ServiceInitError, Summary,
};
