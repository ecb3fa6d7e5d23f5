//! Error kinds for the query-time knowledge engine.

use thiserror::Error;

/// Error surfaced by construction, ingestion, or query-time failures.
///
/// Configuration errors are fatal at construction. Input errors are recoverable
/// (skip the offending chunk, keep ingesting). Transient external and invariant
/// violations never propagate out of the pipeline orchestrator — they are folded
/// into an error-flagged `EnhancedAnswer` instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("transient external failure: {0}")]
    TransientExternal(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientExternal(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
