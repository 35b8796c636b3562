//! Chunked summarization of a whole document.
//!
//! Each chunk is summarized independently (no cross-chunk context) and the partial summaries
//! are joined in chunk order. A failure on any chunk aborts the whole run.

use crate::summarization::{SummarizationClient, SummarizationClientError, SummarizationRequest};

use super::chunking::chunk_text;
use super::types::{ProcessingError, Summary};

/// Length constraints applied to every chunk summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBounds {
    /// Maximum output length in model tokens.
    pub max_length: usize,
    /// Minimum output length in model tokens.
    pub min_length: usize,
    /// Lower `min_length` to the chunk's word count and skip blank chunks.
    pub clamp_min_length: bool,
}

impl Default for LengthBounds {
    fn default() -> Self {
        Self {
            max_length: 130,
            min_length: 30,
            clamp_min_length: true,
        }
    }
}

impl LengthBounds {
    /// Build the request for one chunk, or `None` when a clamped run should skip it.
    fn request_for(&self, chunk: &str) -> Option<SummarizationRequest> {
        let mut min_length = self.min_length;
        if self.clamp_min_length {
            let words = chunk.split_whitespace().count();
            if words == 0 {
                return None;
            }
            min_length = min_length.min(words);
        }
        Some(SummarizationRequest {
            text: chunk.to_string(),
            max_length: self.max_length,
            min_length,
            do_sample: false,
        })
    }
}

/// Summarize every chunk and join the results with single spaces, trailing whitespace trimmed.
///
/// Returns the joined text and the number of chunks sent to the model.
pub async fn summarize_chunks(
    client: &dyn SummarizationClient,
    chunks: &[String],
    bounds: &LengthBounds,
) -> Result<(String, usize), SummarizationClientError> {
    let mut joined = String::new();
    let mut summarized = 0;

    for (index, chunk) in chunks.iter().enumerate() {
        let Some(request) = bounds.request_for(chunk) else {
            tracing::debug!(chunk = index, "Skipping blank chunk");
            continue;
        };
        tracing::debug!(
            chunk = index,
            characters = chunk.chars().count(),
            min_length = request.min_length,
            max_length = request.max_length,
            "Summarizing chunk"
        );
        let partial = client.summarize(request).await?;
        joined.push_str(&partial);
        joined.push(' ');
        summarized += 1;
    }

    let trimmed_len = joined.trim_end().len();
    joined.truncate(trimmed_len);
    Ok((joined, summarized))
}

/// Split `text` into `window`-character chunks and summarize them.
///
/// Blank text is refused with [`ProcessingError::MissingDocument`] before any model call.
pub async fn summarize_document(
    client: &dyn SummarizationClient,
    text: &str,
    window: usize,
    bounds: &LengthBounds,
) -> Result<Summary, ProcessingError> {
    if text.trim().is_empty() {
        return Err(ProcessingError::MissingDocument);
    }

    let chunks = chunk_text(text, window)?;
    let (summary, summarized_chunks) = summarize_chunks(client, &chunks, bounds).await?;
    Ok(Summary {
        text: summary,
        chunk_count: chunks.len(),
        summarized_chunks,
    })
}
