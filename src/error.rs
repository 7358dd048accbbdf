//! Error types for the verified BRD pipeline.
//!
//! Per-domain `thiserror` enums, composed with `#[source]` where one
//! component wraps another's failure. Per-claim and per-section failures
//! (graph/filesystem lookups, LLM timeouts, JSON parse failures) are never
//! propagated as `Err` out of the orchestrator loop — they degrade in
//! place, per the policy table in SPEC_FULL.md §7. These error types exist
//! for genuinely unrecoverable setup failures and for the external service
//! trait boundaries.

use thiserror::Error;

/// Failure from the Code Graph Service boundary.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph query failed: {0}")]
    Query(String),
    #[error("graph service unavailable")]
    Unavailable,
}

/// Failure from the Filesystem Service boundary.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("path escapes workspace root: {0}")]
    PathEscape(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("read failed for {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure from the LLM Session boundary.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm call timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("llm session error: {0}")]
    Session(String),
}

/// Setup-time failures that genuinely prevent a run from starting.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no sections configured for this run")]
    NoSections,
    #[error("aggregation failed before any section could start: {0}")]
    Aggregation(#[from] AggregationError),
}

/// Aggregation-time failures that are unrecoverable (as opposed to the
/// per-file/per-component failures the aggregator swallows internally).
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("empty request string")]
    EmptyRequest,
}
