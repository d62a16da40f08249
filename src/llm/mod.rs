//! Model seam for the orchestration core
//!
//! The core never talks to a provider SDK directly. It depends on the
//! [`AgentExecutor`] interface; concrete adapters (Cerebras, Groq, Mistral,
//! Gemini, ...) live outside this crate. Model resolution consumes an
//! explicitly injected [`ProviderStatus`] snapshot so runs are independently
//! testable and reproducible.

mod stream;

pub use stream::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::LlmTarget;
use crate::domain::{Message, ToolDefinition};
use crate::error::ModelResult;

/// Interface to a model backend
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Complete a request (non-streaming)
    async fn generate(&self, request: CompletionRequest) -> ModelResult<CompletionResponse>;

    /// Complete a request with streaming
    fn stream(&self, request: CompletionRequest) -> ModelStream;
}

/// Request for model completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// Model to use (overrides provider default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Tools available for calling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            model: None,
            tools: None,
            stream: false,
        }
    }
}

/// Response from model completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated message
    pub message: Message,
    /// Reason the completion stopped
    pub finish_reason: FinishReason,
}

/// Reason completion stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop
    Stop,
    /// Hit max tokens
    Length,
    /// Tool call requested
    ToolCalls,
    /// Content filtered
    ContentFilter,
}

/// Point-in-time availability snapshot per provider
///
/// Built by the caller (e.g. from `checkProviderStatus`) and handed to the
/// resolver; never read from global state.
#[derive(Debug, Clone, Default)]
pub struct ProviderStatus {
    providers: HashMap<String, bool>,
}

impl ProviderStatus {
    /// Create an empty snapshot (every provider unknown, treated as down)
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a provider's availability
    pub fn set(mut self, provider: impl Into<String>, available: bool) -> Self {
        self.providers.insert(provider.into(), available);
        self
    }

    /// Whether the named provider is known to be available
    pub fn is_available(&self, provider: &str) -> bool {
        self.providers.get(provider).copied().unwrap_or(false)
    }
}

/// A model resolved for one agent invocation
#[derive(Clone)]
pub struct ResolvedModel {
    /// Opaque backend handle
    pub executor: Arc<dyn AgentExecutor>,
    /// Provider that serves the model
    pub provider: String,
    /// Model identifier
    pub model_id: String,
}

impl std::fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .finish()
    }
}

/// Resolves an agent's model target against a provider status snapshot
///
/// Returning `None` is a first-class, expected outcome (provider down), not
/// an exceptional one.
pub trait ModelResolver: Send + Sync {
    /// Resolve a target, or `None` when no backend can serve it
    fn resolve(&self, target: &LlmTarget, status: &ProviderStatus) -> Option<ResolvedModel>;
}

/// Resolver over a fixed set of registered executors, keyed by provider name
#[derive(Default)]
pub struct StaticResolver {
    executors: HashMap<String, Arc<dyn AgentExecutor>>,
}

impl StaticResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor for a provider
    pub fn with_executor(
        mut self,
        provider: impl Into<String>,
        executor: Arc<dyn AgentExecutor>,
    ) -> Self {
        self.executors.insert(provider.into(), executor);
        self
    }
}

impl ModelResolver for StaticResolver {
    fn resolve(&self, target: &LlmTarget, status: &ProviderStatus) -> Option<ResolvedModel> {
        if !status.is_available(&target.provider) {
            return None;
        }

        self.executors
            .get(&target.provider)
            .map(|executor| ResolvedModel {
                executor: executor.clone(),
                provider: target.provider.clone(),
                model_id: target.model.clone(),
            })
    }
}
