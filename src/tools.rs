//! Tool port and tool-set construction
//!
//! Concrete monitoring tools (metrics queries, anomaly detection, RAG search,
//! web search) are external collaborators; the core only depends on their
//! call/result shape. The one tool the core owns is `finalAnswer`, which
//! terminates an agent's loop and supplies the answer payload.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::ToolDefinition;
use crate::error::{AgentError, AgentResult};

/// Name of the distinguished loop-terminating tool
pub const FINAL_ANSWER_TOOL: &str = "finalAnswer";

/// Runtime capability flags gating tool visibility
///
/// Passed into tool-set filtering at invocation time, never read from global
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Vision-capable tool calling
    VisionToolCalling,
    /// Outbound web search
    WebSearch,
    /// Knowledge-base (RAG) retrieval
    KnowledgeSearch,
}

/// Set of capabilities enabled for one invocation
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    enabled: HashSet<Capability>,
}

impl CapabilitySet {
    /// No optional capabilities enabled
    pub fn none() -> Self {
        Self::default()
    }

    /// All known capabilities enabled
    pub fn all() -> Self {
        let mut enabled = HashSet::new();
        enabled.insert(Capability::VisionToolCalling);
        enabled.insert(Capability::WebSearch);
        enabled.insert(Capability::KnowledgeSearch);
        Self { enabled }
    }

    /// Enable a capability
    pub fn with(mut self, capability: Capability) -> Self {
        self.enabled.insert(capability);
        self
    }

    /// Whether a capability is enabled
    pub fn has(&self, capability: Capability) -> bool {
        self.enabled.contains(&capability)
    }
}

/// An executable tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as advertised to the model
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str {
        ""
    }

    /// JSON Schema for the tool's arguments
    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    /// Capability this tool requires, if any
    fn required_capability(&self) -> Option<Capability> {
        None
    }

    /// Execute the tool
    async fn execute(&self, args: Value) -> AgentResult<Value>;
}

/// Named collection of tools shared across agents
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    /// Create an empty tool set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tool set seeded with the `finalAnswer` tool
    pub fn with_final_answer() -> Self {
        let mut set = Self::new();
        set.insert(Arc::new(FinalAnswerTool));
        set
    }

    /// Register a tool
    pub fn insert(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Build the subset visible to one agent invocation
    ///
    /// Keeps tools named in `allowed` whose required capability is enabled.
    /// The `finalAnswer` tool is always retained regardless of filters.
    pub fn filtered(&self, allowed: &[String], capabilities: &CapabilitySet) -> ToolSet {
        let mut filtered = ToolSet::new();

        for (name, tool) in &self.tools {
            if name == FINAL_ANSWER_TOOL {
                filtered.insert(tool.clone());
                continue;
            }

            if !allowed.is_empty() && !allowed.contains(name) {
                continue;
            }

            if let Some(required) = tool.required_capability() {
                if !capabilities.has(required) {
                    tracing::debug!(tool = %name, "tool hidden: capability disabled");
                    continue;
                }
            }

            filtered.insert(tool.clone());
        }

        filtered
    }

    /// Tool definitions to advertise to the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition::new(t.name(), t.description(), t.parameters()))
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }
}

/// The loop-terminating answer tool
///
/// Calling it ends the agent's tool loop; its `answer` argument becomes the
/// agent's final response.
pub struct FinalAnswerTool;

#[async_trait]
impl Tool for FinalAnswerTool {
    fn name(&self) -> &str {
        FINAL_ANSWER_TOOL
    }

    fn description(&self) -> &str {
        "Provide the final answer to the user and finish the task"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "answer": {
                    "type": "string",
                    "description": "The complete final answer"
                }
            },
            "required": ["answer"]
        })
    }

    async fn execute(&self, args: Value) -> AgentResult<Value> {
        let answer = args
            .get("answer")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AgentError::ToolExecution("finalAnswer requires an 'answer' string".to_string())
            })?;
        Ok(json!({ "answer": answer }))
    }
}

/// Extract the answer payload from a `finalAnswer` call's arguments
pub fn final_answer_text(args: &Value) -> Option<String> {
    args.get("answer")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
