//! Base agent: the bounded tool-calling loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::render_instructions;
use crate::config::AgentConfig;
use crate::domain::{
    EventSender, EventStream, Message, Query, RunMetadata, StreamEvent, ToolCallResult,
};
use crate::error::ErrorCode;
use crate::llm::{
    CompletionRequest, FinishReason, ModelResolver, ProviderStatus, ResolvedModel,
    ToolCallAccumulator,
};
use crate::registry::AgentDirectory;
use crate::tools::{final_answer_text, CapabilitySet, ToolSet, FINAL_ANSWER_TOOL};

enum LoopOutcome {
    Completed {
        answer: String,
        tools_called: Vec<String>,
    },
    /// A terminal error event was already emitted inside the loop
    Failed,
}

/// Drives one agent invocation through its tool-calling loop
///
/// `stream()` never fails past the event channel: every failure inside the
/// invocation becomes a terminal `error` event, so the caller always receives
/// a well-formed, terminated sequence.
pub struct BaseAgent {
    name: String,
    directory: Arc<dyn AgentDirectory>,
    resolver: Arc<dyn ModelResolver>,
    tools: ToolSet,
    capabilities: CapabilitySet,
    provider_status: ProviderStatus,
    buffer: usize,
}

impl BaseAgent {
    /// Create an agent bound to a name in the directory
    pub fn new(
        name: impl Into<String>,
        directory: Arc<dyn AgentDirectory>,
        resolver: Arc<dyn ModelResolver>,
        tools: ToolSet,
        capabilities: CapabilitySet,
        provider_status: ProviderStatus,
    ) -> Self {
        Self {
            name: name.into(),
            directory,
            resolver,
            tools,
            capabilities,
            provider_status,
            buffer: 64,
        }
    }

    /// Agent name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute the agent, yielding events as they are produced
    pub fn stream(&self, query: Query, cancel: CancellationToken) -> EventStream {
        let (sender, stream) = EventStream::channel(self.buffer);

        let name = self.name.clone();
        let directory = self.directory.clone();
        let resolver = self.resolver.clone();
        let tools = self.tools.clone();
        let capabilities = self.capabilities.clone();
        let provider_status = self.provider_status.clone();

        tokio::spawn(async move {
            Self::execute_internal(
                name,
                directory,
                resolver,
                tools,
                capabilities,
                provider_status,
                query,
                cancel,
                sender,
            )
            .await;
        });

        stream
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_internal(
        name: String,
        directory: Arc<dyn AgentDirectory>,
        resolver: Arc<dyn ModelResolver>,
        tools: ToolSet,
        capabilities: CapabilitySet,
        provider_status: ProviderStatus,
        query: Query,
        cancel: CancellationToken,
        sender: EventSender,
    ) {
        let start = Instant::now();

        let config = match directory.get_config(&name) {
            Some(config) => config,
            None => {
                let _ = sender
                    .send(StreamEvent::error(
                        ErrorCode::ConfigNotFound,
                        format!("no configuration registered for agent '{}'", name),
                    ))
                    .await;
                return;
            }
        };

        let model = match resolver.resolve(&config.llm, &provider_status) {
            Some(model) => model,
            None => {
                let _ = sender
                    .send(StreamEvent::error(
                        ErrorCode::ModelUnavailable,
                        format!(
                            "provider '{}' could not serve model '{}'",
                            config.llm.provider, config.llm.model
                        ),
                    ))
                    .await;
                return;
            }
        };

        if !sender
            .send(StreamEvent::agent_status(&name, "starting"))
            .await
        {
            return;
        }

        let tools = tools.filtered(&config.tools, &capabilities);

        let instructions = render_instructions(&config.instructions, &query);
        let mut messages = vec![Message::system(instructions)];
        messages.extend(query.history.clone());
        messages.push(Message::user(&query.text));

        let budget = Duration::from_secs(config.timeout_seconds);
        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sender
                    .send(StreamEvent::error(ErrorCode::StreamError, "invocation cancelled"))
                    .await;
                return;
            }
            result = tokio::time::timeout(
                budget,
                Self::run_loop(&config, &model, &tools, messages, &sender),
            ) => result,
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(_) => {
                let _ = sender
                    .send(StreamEvent::error(
                        ErrorCode::StreamError,
                        format!("agent '{}' timed out after {}s", name, config.timeout_seconds),
                    ))
                    .await;
                return;
            }
        };

        match outcome {
            LoopOutcome::Failed => {}
            LoopOutcome::Completed {
                answer,
                tools_called,
            } => {
                let _ = sender
                    .send(StreamEvent::agent_status(&name, "completed"))
                    .await;
                let _ = sender
                    .send(StreamEvent::Done {
                        success: true,
                        final_agent: name,
                        tools_called,
                        metadata: RunMetadata {
                            provider: model.provider.clone(),
                            model_id: model.model_id.clone(),
                            duration_ms: start.elapsed().as_millis() as u64,
                        },
                        response: Some(answer),
                    })
                    .await;
            }
        }
    }

    async fn run_loop(
        config: &AgentConfig,
        model: &ResolvedModel,
        tools: &ToolSet,
        mut messages: Vec<Message>,
        sender: &EventSender,
    ) -> LoopOutcome {
        let mut tools_called: Vec<String> = Vec::new();
        let mut last_text = String::new();

        for _step in 0..config.max_steps {
            if !sender
                .send(StreamEvent::agent_status(&config.name, "thinking"))
                .await
            {
                return LoopOutcome::Failed;
            }

            let request = CompletionRequest {
                messages: messages.clone(),
                model: Some(model.model_id.clone()),
                tools: if tools.is_empty() {
                    None
                } else {
                    Some(tools.definitions())
                },
                stream: true,
            };

            let mut stream = model.executor.stream(request);
            let mut content = String::new();
            let mut accumulator = ToolCallAccumulator::new();
            let mut finish_reason = FinishReason::Stop;

            while let Some(result) = stream.next().await {
                match result {
                    Ok(chunk) => {
                        if !chunk.content.is_empty() {
                            content.push_str(&chunk.content);
                            if !sender.send(StreamEvent::text_delta(&chunk.content)).await {
                                return LoopOutcome::Failed;
                            }
                        }

                        for delta in &chunk.tool_calls {
                            accumulator.apply_delta(delta);
                        }

                        if let Some(reason) = chunk.finish_reason {
                            finish_reason = reason;
                        }
                    }
                    Err(e) => {
                        let _ = sender
                            .send(StreamEvent::error(ErrorCode::StreamError, e.to_string()))
                            .await;
                        return LoopOutcome::Failed;
                    }
                }
            }

            let tool_calls = accumulator.build();

            if !content.is_empty() {
                last_text = content.clone();
            }

            // Text-only step: the model is done talking
            if tool_calls.is_empty() {
                let _ = sender
                    .send(StreamEvent::StepFinish {
                        finish_reason,
                        tool_calls: Vec::new(),
                        tool_results: Vec::new(),
                    })
                    .await;
                return LoopOutcome::Completed {
                    answer: last_text,
                    tools_called,
                };
            }

            // finalAnswer terminates the loop and supplies the answer payload
            if let Some(final_call) = tool_calls.iter().find(|c| c.name == FINAL_ANSWER_TOOL) {
                let answer = final_answer_text(&final_call.arguments).unwrap_or(last_text);
                let _ = sender
                    .send(StreamEvent::StepFinish {
                        finish_reason,
                        tool_calls: tool_calls.clone(),
                        tool_results: Vec::new(),
                    })
                    .await;
                return LoopOutcome::Completed {
                    answer,
                    tools_called,
                };
            }

            messages.push(Message::assistant_with_tools(&content, tool_calls.clone()));

            let mut tool_results = Vec::new();

            for call in &tool_calls {
                if !sender.send(StreamEvent::tool_call(call)).await {
                    return LoopOutcome::Failed;
                }

                let result = match tools.get(&call.name) {
                    Some(tool) => tool.execute(call.arguments.clone()).await,
                    None => Err(crate::error::AgentError::ToolExecution(format!(
                        "unknown tool: {}",
                        call.name
                    ))),
                };

                let tool_result = match result {
                    Ok(output) => ToolCallResult::succeeded(call, output),
                    Err(e) => ToolCallResult::failed(call, e.to_string()),
                };

                if !sender.send(StreamEvent::tool_result(&tool_result)).await {
                    return LoopOutcome::Failed;
                }

                messages.push(Message::tool_result(&call.id, &tool_result.output));
                tools_called.push(call.name.clone());
                tool_results.push(tool_result);
            }

            let _ = sender
                .send(StreamEvent::StepFinish {
                    finish_reason,
                    tool_calls,
                    tool_results,
                })
                .await;
        }

        // Step cap reached: success path, last produced text stands as answer
        tracing::debug!(
            agent = %config.name,
            steps = config.max_steps,
            "step cap reached, using last text as answer"
        );
        LoopOutcome::Completed {
            answer: last_text,
            tools_called,
        }
    }
}

/// Convenience accessor for the answer payload in an absorbed `done` event
pub(crate) fn done_response(event: &StreamEvent) -> Option<(String, Vec<String>, RunMetadata)> {
    match event {
        StreamEvent::Done {
            response,
            tools_called,
            metadata,
            ..
        } => Some((
            response.clone().unwrap_or_default(),
            tools_called.clone(),
            metadata.clone(),
        )),
        _ => None,
    }
}
