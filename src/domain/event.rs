//! Event protocol and streaming types
//!
//! Every event on the wire is `{ "type": ..., "data": ... }`. Within one agent
//! invocation events are strictly ordered as produced, ending in exactly one
//! terminal event (`done` or `error`).

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use super::{ToolCall, ToolCallResult};
use crate::error::ErrorCode;
use crate::llm::FinishReason;

/// Metadata carried by a terminal `done` event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    /// Provider that served the run
    pub provider: String,
    /// Model identifier
    pub model_id: String,
    /// Wall-clock duration of the invocation, always >= 0
    pub duration_ms: u64,
}

/// A typed event emitted during an orchestration run
///
/// Consumers must treat unknown future event types as ignorable; the
/// `Unknown` variant absorbs them on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Agent lifecycle status update
    AgentStatus { agent: String, status: String },
    /// Control transfer between agents, informational only
    #[serde(rename_all = "camelCase")]
    Handoff {
        from: String,
        to: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Tool invocation initiated
    ToolCall { name: String, args: Value },
    /// Tool invocation completed
    ToolResult { name: String, result: Value },
    /// Streamed text content
    TextDelta { text: String },
    /// One loop step completed
    #[serde(rename_all = "camelCase")]
    StepFinish {
        finish_reason: FinishReason,
        tool_calls: Vec<ToolCall>,
        tool_results: Vec<ToolCallResult>,
    },
    /// Terminal success event
    #[serde(rename_all = "camelCase")]
    Done {
        success: bool,
        final_agent: String,
        tools_called: Vec<String>,
        metadata: RunMetadata,
        /// Answer payload; present on per-agent terminals so the executor can
        /// absorb them, omitted from the overall run terminal
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<String>,
    },
    /// Terminal failure event
    Error {
        code: ErrorCode,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Forward-compatible catch-all for event kinds this version does not know
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Create an agent status event
    pub fn agent_status(agent: impl Into<String>, status: impl Into<String>) -> Self {
        Self::AgentStatus {
            agent: agent.into(),
            status: status.into(),
        }
    }

    /// Create a handoff event
    pub fn handoff(
        from: impl Into<String>,
        to: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self::Handoff {
            from: from.into(),
            to: to.into(),
            reason,
        }
    }

    /// Create a tool call event
    pub fn tool_call(call: &ToolCall) -> Self {
        Self::ToolCall {
            name: call.name.clone(),
            args: call.arguments.clone(),
        }
    }

    /// Create a tool result event
    pub fn tool_result(result: &ToolCallResult) -> Self {
        Self::ToolResult {
            name: result.tool_name.clone(),
            result: result.output.clone(),
        }
    }

    /// Create a text delta event
    pub fn text_delta(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    /// Create a terminal error event
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: Some(message.into()),
        }
    }

    /// Whether this event terminates an agent invocation
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }
}

/// Streaming sequence of events from an agent or orchestration run
///
/// Backed by an mpsc channel; the producer suspends when the buffer is full,
/// so the caller pulls events one at a time.
pub struct EventStream {
    receiver: mpsc::Receiver<StreamEvent>,
}

impl EventStream {
    /// Create an event stream from a channel receiver
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Create a channel pair for building an event stream
    pub fn channel(buffer: usize) -> (EventSender, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (EventSender { sender: tx }, Self { receiver: rx })
    }

    /// Drain the stream, returning every event in emission order
    pub async fn collect_all(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.receiver.recv().await {
            events.push(event);
        }
        events
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

/// Sender half for building an event stream
#[derive(Clone)]
pub struct EventSender {
    sender: mpsc::Sender<StreamEvent>,
}

impl EventSender {
    /// Send an event; returns false when the receiver has hung up
    pub async fn send(&self, event: StreamEvent) -> bool {
        self.sender.send(event).await.is_ok()
    }

    /// Check if the receiver is closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
