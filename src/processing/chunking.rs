//! Fixed-window chunking for the summarization pipeline.
//!
//! Summarization models accept a bounded input, so documents are split into non-overlapping
//! windows of [`SUMMARY_WINDOW_CHARS`] characters (Unicode scalar values, not bytes), taken left
//! to right. The split is a plain character count: it ignores word and sentence boundaries, so a
//! chunk may end mid-word. The last window may be shorter; nothing is padded.

use super::types::ChunkingError;

/// Default window size, in characters, used before summarization.
pub const SUMMARY_WINDOW_CHARS: usize = 1000;

/// Split `text` into consecutive windows of at most `window` characters.
///
/// Concatenating the result reproduces `text` exactly. Empty input yields no chunks.
pub fn chunk_text(text: &str, window: usize) -> Result<Vec<String>, ChunkingError> {
    if window == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (offset, _) in text.char_indices() {
        if count == window {
            chunks.push(text[start..offset].to_string());
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(text[start..].to_string());
    }

    Ok(chunks)
}
