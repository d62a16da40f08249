//! Error types for the orchestration core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire-level error codes surfaced in terminal `error` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The named agent has no registered configuration
    ConfigNotFound,
    /// The agent's model provider could not be resolved
    ModelUnavailable,
    /// The underlying token/tool stream raised, or a timeout elapsed
    StreamError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ConfigNotFound => write!(f, "CONFIG_NOT_FOUND"),
            ErrorCode::ModelUnavailable => write!(f, "MODEL_UNAVAILABLE"),
            ErrorCode::StreamError => write!(f, "STREAM_ERROR"),
        }
    }
}

/// Errors that can occur during agent operations
///
/// Inside an event stream these are converted to terminal `error` events
/// before they would escape the component boundary; the `Result` form only
/// appears at construction seams (registry, session store, tools).
#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent not found in the directory
    #[error("Agent not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Model provider error
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Tool execution error
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Session context error
    #[error("Session context error: {0}")]
    Session(String),

    /// Step cap reached without completion
    #[error("Step cap ({0}) reached without completion")]
    StepCap(u32),

    /// Timeout
    #[error("Agent invocation timed out after {0}s")]
    Timeout(u64),

    /// Cancelled
    #[error("Operation was cancelled")]
    Cancelled,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Map to the wire-level code carried by a terminal `error` event
    pub fn code(&self) -> ErrorCode {
        match self {
            AgentError::NotFound(_) | AgentError::Configuration(_) => ErrorCode::ConfigNotFound,
            AgentError::Model(ModelError::ProviderUnavailable(_))
            | AgentError::Model(ModelError::ModelNotFound(_)) => ErrorCode::ModelUnavailable,
            _ => ErrorCode::StreamError,
        }
    }
}

/// Errors specific to model provider operations
#[derive(Debug, Error)]
pub enum ModelError {
    /// Provider is down or has no credentials
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// API error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited
    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Streaming error
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Serialization(err.to_string())
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;
