#![deny(missing_docs)]

//! Core library for medsum: medical report extraction, question answering, and summarization.

/// Question-answering client abstraction and adapters.
pub mod answering;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Shared HTTP plumbing for hosted inference endpoints.
pub mod inference;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Document processing pipeline utilities.
pub mod processing;
/// Per-session document state.
pub mod session;
/// Summarization client abstraction and adapters.
pub mod summarization;
