//! Per-session document state.
//!
//! A [`Session`] caches the current document's extracted text and its last summary. It is
//! replaced wholesale when a different document is uploaded and is never shared between
//! sessions. [`SessionStore`] keeps one session per id for the HTTP surface and hands out a
//! per-session lock so that actions on the same session run one at a time.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use ::time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::processing::{Document, DocumentFormat, Summary};

#[derive(Debug, Clone)]
struct LoadedDocument {
    filename: String,
    format: DocumentFormat,
    fingerprint: String,
    loaded_at: OffsetDateTime,
    extracted_text: Option<String>,
    summary: Option<Summary>,
}

/// One user's interaction state with one uploaded document.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    document: Option<LoadedDocument>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create an empty session with a fresh identifier.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            document: None,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether `document` is the one currently loaded (same filename and bytes).
    pub fn holds(&self, document: &Document) -> bool {
        self.document
            .as_ref()
            .is_some_and(|loaded| loaded.fingerprint == document.fingerprint())
    }

    /// Cached extracted text, if the current document produced any.
    pub fn extracted_text(&self) -> Option<&str> {
        self.document
            .as_ref()
            .and_then(|loaded| loaded.extracted_text.as_deref())
    }

    /// Last summary computed for the current document.
    pub fn summary(&self) -> Option<&Summary> {
        self.document
            .as_ref()
            .and_then(|loaded| loaded.summary.as_ref())
    }

    /// Filename of the current document.
    pub fn filename(&self) -> Option<&str> {
        self.document.as_ref().map(|loaded| loaded.filename.as_str())
    }

    /// Replace the loaded document and everything cached for the previous one.
    ///
    /// `extracted_text` is `None` when extraction produced no usable text.
    pub fn load_document(&mut self, document: &Document, extracted_text: Option<String>) {
        self.document = Some(LoadedDocument {
            filename: document.filename().to_string(),
            format: document.format(),
            fingerprint: document.fingerprint().to_string(),
            loaded_at: OffsetDateTime::now_utc(),
            extracted_text,
            summary: None,
        });
    }

    /// Cache a summary for the current document. Ignored when no document is loaded.
    pub fn store_summary(&mut self, summary: Summary) {
        if let Some(loaded) = self.document.as_mut() {
            loaded.summary = Some(summary);
        }
    }

    /// Serializable view used by the interactive surfaces.
    pub fn snapshot(&self) -> SessionSnapshot {
        let document = self.document.as_ref().map(|loaded| DocumentSnapshot {
            filename: loaded.filename.clone(),
            format: loaded.format,
            loaded_at: loaded
                .loaded_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| loaded.loaded_at.unix_timestamp().to_string()),
            extracted_text: loaded.extracted_text.clone(),
            summary: loaded.summary.as_ref().map(|summary| summary.text.clone()),
        });
        SessionSnapshot {
            session_id: self.id,
            document,
        }
    }
}

/// Serializable session view.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub session_id: Uuid,
    /// Currently loaded document, if any.
    pub document: Option<DocumentSnapshot>,
}

/// Serializable view of the loaded document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSnapshot {
    /// Uploaded filename.
    pub filename: String,
    /// Format resolved from the filename.
    pub format: DocumentFormat,
    /// RFC 3339 timestamp of the upload.
    pub loaded_at: String,
    /// Extracted text, absent when extraction produced nothing.
    pub extracted_text: Option<String>,
    /// Last computed summary.
    pub summary: Option<String>,
}

/// Shared handle to one session; hold the lock for the duration of an action.
pub type SessionHandle = Arc<Mutex<Session>>;

struct StoredSession {
    handle: SessionHandle,
    last_used: Instant,
}

/// In-memory registry of active sessions.
///
/// Every lookup refreshes the session's last-used time. [`SessionStore::evict_idle`] ends
/// sessions that have not been used for the idle timeout; [`SessionStore::spawn_sweeper`] runs it
/// periodically.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, StoredSession>>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session and return its identifier.
    pub async fn create(&self) -> Uuid {
        let session = Session::new();
        let id = session.id();
        self.sessions.write().await.insert(
            id,
            StoredSession {
                handle: Arc::new(Mutex::new(session)),
                last_used: Instant::now(),
            },
        );
        tracing::debug!(session_id = %id, "Session created");
        id
    }

    /// Look up a session by id, marking it as used.
    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions.get_mut(&id)?;
        stored.last_used = Instant::now();
        Some(Arc::clone(&stored.handle))
    }

    /// End a session, dropping its cached document. Returns `false` for unknown ids.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "Session ended");
        }
        removed
    }

    /// End every session unused for at least `idle`. Sessions with an action in flight are kept.
    ///
    /// Returns the number of sessions evicted.
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, stored| {
            let expired = now.duration_since(stored.last_used) >= idle
                && stored.handle.try_lock().is_ok();
            if expired {
                tracing::debug!(session_id = %id, "Session expired");
            }
            !expired
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    /// Spawn a background task that evicts sessions idle for longer than `idle`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_sweeper(&self, idle: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let period = (idle / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.evict_idle(idle).await;
            }
        })
    }

    /// Number of active sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is active.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(text: &str) -> Summary {
        Summary {
            text: text.into(),
            chunk_count: 1,
            summarized_chunks: 1,
        }
    }

    #[test]
    fn loading_a_document_resets_the_summary() {
        let mut session = Session::new();
        let first = Document::new("a.txt", b"first".to_vec());
        session.load_document(&first, Some("first".into()));
        session.store_summary(summary("first summary"));
        assert_eq!(session.summary().map(|s| s.text.as_str()), Some("first summary"));

        let second = Document::new("b.txt", b"second".to_vec());
        session.load_document(&second, Some("second".into()));
        assert_eq!(session.extracted_text(), Some("second"));
        assert!(session.summary().is_none());
        assert!(session.holds(&second));
        assert!(!session.holds(&first));
    }

    #[test]
    fn summary_without_document_is_ignored() {
        let mut session = Session::new();
        session.store_summary(summary("orphan"));
        assert!(session.summary().is_none());
    }

    #[test]
    fn snapshot_exposes_cached_state() {
        let mut session = Session::new();
        let document = Document::new("labs.csv", b"a\n1\n".to_vec());
        session.load_document(&document, Some("a\n1".into()));
        let snapshot = session.snapshot();
        let loaded = snapshot.document.expect("document");
        assert_eq!(loaded.filename, "labs.csv");
        assert_eq!(loaded.format, DocumentFormat::Tabular);
        assert_eq!(loaded.extracted_text.as_deref(), Some("a\n1"));
        assert!(loaded.loaded_at.contains('T'));
    }

    #[tokio::test]
    async fn store_creates_and_removes_sessions() {
        let store = SessionStore::new();
        let id = store.create().await;
        assert_eq!(store.len().await, 1);

        let handle = store.get(id).await.expect("session");
        assert_eq!(handle.lock().await.id(), id);

        assert!(store.remove(id).await);
        assert!(!store.remove(id).await);
        assert!(store.get(id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_evicted() {
        let store = SessionStore::new();
        let idle = Duration::from_secs(60);
        let abandoned = store.create().await;
        let active = store.create().await;
        {
            let handle = store.get(abandoned).await.expect("session");
            let document = Document::new("a.txt", b"text".to_vec());
            handle.lock().await.load_document(&document, Some("text".into()));
        }

        time::advance(Duration::from_secs(45)).await;
        assert!(store.get(active).await.is_some());
        assert_eq!(store.evict_idle(idle).await, 0);

        time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.evict_idle(idle).await, 1);
        assert!(store.get(abandoned).await.is_none());
        assert!(store.get(active).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn busy_sessions_survive_eviction() {
        let store = SessionStore::new();
        let id = store.create().await;
        let handle = store.get(id).await.expect("session");
        let _guard = handle.lock().await;

        time::advance(Duration::from_secs(120)).await;
        assert_eq!(store.evict_idle(Duration::from_secs(60)).await, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_abandoned_sessions() {
        let store = SessionStore::new();
        for _ in 0..3 {
            store.create().await;
        }
        let sweeper = store.spawn_sweeper(Duration::from_secs(60));

        time::sleep(Duration::from_secs(120)).await;
        assert!(store.is_empty().await);
        sweeper.abort();
    }
}
