// src/core/errors.rs

//! Defines the primary error type for the entire application.

use thiserror::Error;

/// The main error enum, representing all possible failures within the orchestrator.
/// Using `thiserror` allows for clean error definitions and automatic `From` trait
/// implementations. Variants mirror the error-kind taxonomy of the domain
/// rather than any particular library's error shape.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("SQL error: {0}")]
    Sql(String),

    #[error("proxy write failed: {0}")]
    ProxyWrite(String),

    #[error("split-brain: proxy writer group has {rows} row(s), expected exactly one")]
    SplitBrain { rows: usize },

    #[error("election is ambiguous: no single candidate dominates all others")]
    ElectionAmbiguous,

    #[error("quorum not met: {online}/{quorum} nodes online")]
    QuorumLoss { online: usize, quorum: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not initialize the auxiliary KV table: {0}")]
    KvInitFailed(String),

    #[error("notification delivery failed: {0}")]
    Notify(String),

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl From<std::io::Error> for OrchestratorError {
    fn from(e: std::io::Error) -> Self {
        OrchestratorError::Io(e.to_string())
    }
}

impl From<sqlx::Error> for OrchestratorError {
    fn from(e: sqlx::Error) -> Self {
        OrchestratorError::Sql(e.to_string())
    }
}

impl From<reqwest::Error> for OrchestratorError {
    fn from(e: reqwest::Error) -> Self {
        OrchestratorError::Http(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
