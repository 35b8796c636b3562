use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_extracted: AtomicU64,
    questions_answered: AtomicU64,
    summaries_generated: AtomicU64,
    chunks_summarized: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document whose text was extracted.
    pub fn record_extraction(&self) {
        self.documents_extracted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed question-answering call.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed summary and the number of chunks sent to the model for it.
    pub fn record_summary(&self, chunk_count: u64) {
        self.summaries_generated.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_extracted: self.documents_extracted.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents whose text has been extracted since startup.
    pub documents_extracted: u64,
    /// Questions answered since startup.
    pub questions_answered: u64,
    /// Summaries generated since startup.
    pub summaries_generated: u64,
    /// Chunks sent to the summarization model across all summaries.
    pub chunks_summarized: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_summaries_and_chunks() {
        let metrics = PipelineMetrics::new();
        metrics.record_summary(2);
        metrics.record_summary(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.summaries_generated, 2);
        assert_eq!(snapshot.chunks_summarized, 5);
    }

    #[test]
    fn snapshot_is_consistent() {
        let metrics = PipelineMetrics::new();
        metrics.record_extraction();
        metrics.record_question();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_extracted, 1);
        assert_eq!(snapshot.questions_answered, 1);
        assert_eq!(snapshot.summaries_generated, 0);
    }
}
