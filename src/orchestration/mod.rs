//! Multi-agent stream executor
//!
//! Composes the pre-filter, the task decomposer, agent execution, and the
//! result unifier into one orchestration run: pre-filter short-circuit ->
//! decomposition -> one-or-more agent executions -> chunked streaming ->
//! unification -> terminal event. Every intermediate event is forwarded to
//! the caller live.

mod chunk;
mod decompose;
mod prefilter;
mod unify;

pub use chunk::stream_text_in_chunks;
pub use decompose::decompose_task;
pub use prefilter::{pre_filter_query, PreFilterOutcome};
pub use unify::{unify_results, EMPTY_RESULT_FALLBACK};

#[cfg(test)]
mod unify_test;

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::core::{done_response, BaseAgent};
use crate::domain::{
    AgentOutput, Clarification, EventSender, EventStream, Message, Query, Role, RunMetadata,
    StreamEvent, Task,
};
use crate::error::ErrorCode;
use crate::llm::{ModelResolver, ProviderStatus};
use crate::registry::AgentDirectory;
use crate::session::SessionContext;
use crate::tools::{CapabilitySet, ToolSet};

/// Name used for events emitted by the orchestrator itself
const ORCHESTRATOR: &str = "Orchestrator";

/// Agent name reported when the pre-filter answers directly
const PRE_FILTER: &str = "Pre-Filter";

/// Input to one orchestration run
#[derive(Debug, Clone)]
pub struct OrchestrationRequest {
    /// Conversation so far; the latest user message is the query
    pub messages: Vec<Message>,
    /// Session this run belongs to
    pub session_id: String,
}

/// The orchestrator: routes queries across the specialized agents
pub struct MultiAgentExecutor {
    settings: Settings,
    directory: Arc<dyn AgentDirectory>,
    resolver: Arc<dyn ModelResolver>,
    tools: ToolSet,
    capabilities: CapabilitySet,
    session: Arc<dyn SessionContext>,
}

impl MultiAgentExecutor {
    /// Create an executor over the given collaborators
    pub fn new(
        settings: Settings,
        directory: Arc<dyn AgentDirectory>,
        resolver: Arc<dyn ModelResolver>,
        tools: ToolSet,
        capabilities: CapabilitySet,
        session: Arc<dyn SessionContext>,
    ) -> Self {
        Self {
            settings,
            directory,
            resolver,
            tools,
            capabilities,
            session,
        }
    }

    /// Run one orchestration, yielding events as they are produced
    ///
    /// The returned stream always terminates: either in exactly one final
    /// `done`, or in exactly one `error` after which no further tasks run.
    pub fn execute_stream(
        &self,
        request: OrchestrationRequest,
        provider_status: ProviderStatus,
        cancel: CancellationToken,
    ) -> EventStream {
        let (sender, stream) = EventStream::channel(self.settings.runtime.stream_buffer);

        let settings = self.settings.clone();
        let directory = self.directory.clone();
        let resolver = self.resolver.clone();
        let tools = self.tools.clone();
        let capabilities = self.capabilities.clone();
        let session = self.session.clone();

        tokio::spawn(async move {
            Self::execute_internal(
                settings,
                directory,
                resolver,
                tools,
                capabilities,
                session,
                request,
                provider_status,
                cancel,
                sender,
            )
            .await;
        });

        stream
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_internal(
        settings: Settings,
        directory: Arc<dyn AgentDirectory>,
        resolver: Arc<dyn ModelResolver>,
        tools: ToolSet,
        capabilities: CapabilitySet,
        session: Arc<dyn SessionContext>,
        request: OrchestrationRequest,
        provider_status: ProviderStatus,
        cancel: CancellationToken,
        sender: EventSender,
    ) {
        let start = Instant::now();
        let chunk_size = settings.runtime.chunk_size;

        let Some(query_text) = latest_user_query(&request.messages) else {
            let _ = sender
                .send(StreamEvent::error(
                    ErrorCode::StreamError,
                    "request contains no user message",
                ))
                .await;
            return;
        };
        let history = history_before_query(&request.messages);

        let outcome = pre_filter_query(&query_text, &settings.route);
        tracing::debug!(
            confidence = outcome.confidence,
            suggested = ?outcome.suggested_agent,
            "pre-filter outcome"
        );

        // Trivial query: answer directly, no agent runs
        if let Some(direct) = &outcome.direct_response {
            for event in stream_text_in_chunks(direct, chunk_size) {
                if !sender.send(event).await {
                    return;
                }
            }
            let _ = sender
                .send(overall_done(PRE_FILTER, Vec::new(), "none", "pre-filter", &start))
                .await;
            return;
        }

        let tasks = match decompose_task(&query_text, &settings.route) {
            Some(tasks) => tasks,
            None => {
                if outcome.suggested_agent.is_none()
                    && settings.runtime.clarify_on_ambiguity
                    && outcome.confidence <= settings.route.composite_confidence
                {
                    Self::stream_clarification(&query_text, &directory, chunk_size, &start, &sender)
                        .await;
                    return;
                }

                let target = outcome
                    .suggested_agent
                    .clone()
                    .unwrap_or_else(|| directory.default_agent());
                vec![Task {
                    sub_query: query_text.clone(),
                    target_agent: target,
                    order: 0,
                }]
            }
        };

        let mut outputs: Vec<AgentOutput> = Vec::new();
        let mut tools_called: Vec<String> = Vec::new();
        let mut last_metadata: Option<RunMetadata> = None;
        let mut previous = ORCHESTRATOR.to_string();

        for task in &tasks {
            if cancel.is_cancelled() {
                let _ = sender
                    .send(StreamEvent::error(ErrorCode::StreamError, "run cancelled"))
                    .await;
                return;
            }

            if !sender
                .send(StreamEvent::handoff(
                    previous.clone(),
                    task.target_agent.clone(),
                    Some(format!("subtask {} of {}", task.order + 1, tasks.len())),
                ))
                .await
            {
                return;
            }

            let agent = BaseAgent::new(
                task.target_agent.clone(),
                directory.clone(),
                resolver.clone(),
                tools.clone(),
                capabilities.clone(),
                provider_status.clone(),
            );

            let query = Query {
                text: task.sub_query.clone(),
                session_id: request.session_id.clone(),
                history: history.clone(),
            };

            let mut agent_stream = agent.stream(query, cancel.clone());
            let mut completed = false;

            while let Some(event) = agent_stream.next().await {
                if let Some((response, agent_tools, metadata)) = done_response(&event) {
                    // Absorb the agent's terminal; its answer becomes an
                    // AgentOutput for the unifier
                    outputs.push(AgentOutput::new(task.target_agent.clone(), response.clone()));
                    tools_called.extend(agent_tools);
                    last_metadata = Some(metadata);
                    completed = true;

                    let note = json!({
                        "last_agent": task.target_agent,
                        "last_response": response,
                    });
                    if let Err(e) = session
                        .update_session_context(&request.session_id, note)
                        .await
                    {
                        tracing::warn!("Failed to update session context: {}", e);
                    }

                    continue;
                }

                let failed = matches!(event, StreamEvent::Error { .. });
                if !sender.send(event).await {
                    return;
                }
                // Fail fast: a forwarded error terminates the whole run
                if failed {
                    return;
                }
            }

            if !completed {
                // Agent stream ended without a terminal; surface it rather
                // than leaving the caller with an unterminated run
                let _ = sender
                    .send(StreamEvent::error(
                        ErrorCode::StreamError,
                        format!("agent '{}' ended without a terminal event", task.target_agent),
                    ))
                    .await;
                return;
            }

            previous = task.target_agent.clone();
        }

        let unified = unify_results(&outputs);
        for event in stream_text_in_chunks(&unified, chunk_size) {
            if !sender.send(event).await {
                return;
            }
        }

        let final_agent = outputs
            .last()
            .map(|o| o.agent.clone())
            .unwrap_or_else(|| directory.default_agent());
        let (provider, model_id) = last_metadata
            .map(|m| (m.provider, m.model_id))
            .unwrap_or_else(|| ("none".to_string(), "unknown".to_string()));

        let _ = sender
            .send(overall_done(
                &final_agent,
                tools_called,
                &provider,
                &model_id,
                &start,
            ))
            .await;
    }

    /// Ask a clarifying question instead of guessing; terminal for the turn
    async fn stream_clarification(
        query: &str,
        directory: &Arc<dyn AgentDirectory>,
        chunk_size: usize,
        start: &Instant,
        sender: &EventSender,
    ) {
        let clarification = Clarification::for_ambiguous(query, &directory.agent_names());

        let mut text = clarification.reason.clone();
        for option in &clarification.options {
            text.push_str(&format!("\n- {}", option));
        }

        for event in stream_text_in_chunks(&text, chunk_size) {
            if !sender.send(event).await {
                return;
            }
        }
        let _ = sender
            .send(overall_done(ORCHESTRATOR, Vec::new(), "none", "pre-filter", start))
            .await;
    }
}

fn overall_done(
    final_agent: &str,
    tools_called: Vec<String>,
    provider: &str,
    model_id: &str,
    start: &Instant,
) -> StreamEvent {
    StreamEvent::Done {
        success: true,
        final_agent: final_agent.to_string(),
        tools_called,
        metadata: RunMetadata {
            provider: provider.to_string(),
            model_id: model_id.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        },
        response: None,
    }
}

/// Latest user message in the conversation, if any
fn latest_user_query(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.clone())
}

/// Conversation history up to (excluding) the latest user message
fn history_before_query(messages: &[Message]) -> Vec<Message> {
    match messages.iter().rposition(|m| m.role == Role::User) {
        Some(idx) => messages[..idx].to_vec(),
        None => Vec::new(),
    }
}
