//! Orchestration run types: queries, tasks, agent outputs

use serde::{Deserialize, Serialize};

use super::Message;

/// Immutable input to one orchestration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// The natural-language question
    pub text: String,
    /// Session this query belongs to
    pub session_id: String,
    /// Prior conversation turns
    #[serde(default)]
    pub history: Vec<Message>,
}

impl Query {
    /// Create a query with no history
    pub fn new(text: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            session_id: session_id.into(),
            history: Vec::new(),
        }
    }
}

/// One single-agent subtask produced by the task decomposer
///
/// Tasks execute strictly in `order`; later subtasks may depend on session
/// context written by earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Sub-query text sent verbatim to the target agent
    pub sub_query: String,
    /// Name of the agent that handles this subtask
    pub target_agent: String,
    /// Execution sequence position
    pub order: usize,
}

/// Answer produced by one completed agent invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Agent that produced the answer
    pub agent: String,
    /// Answer text
    pub response: String,
}

impl AgentOutput {
    /// Create an agent output
    pub fn new(agent: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            response: response.into(),
        }
    }
}

/// Request for a clarifying question when routing cannot proceed confidently
///
/// Terminal for the turn: no agent runs until the caller resubmits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clarification {
    /// The query that could not be routed
    pub original_query: String,
    /// Why routing could not proceed
    pub reason: String,
    /// Suggested rephrasings or choices for the caller
    pub options: Vec<String>,
}

impl Clarification {
    /// Build a clarification for an ambiguous composite query, offering the
    /// candidate agents' focus areas as options
    pub fn for_ambiguous(query: &str, candidates: &[String]) -> Self {
        Self {
            original_query: query.to_string(),
            reason: "질문에 여러 의도가 섞여 있어 하나의 담당 영역을 고르기 어렵습니다."
                .to_string(),
            options: candidates.to_vec(),
        }
    }
}
