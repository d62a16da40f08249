//! Agent registry
//!
//! Owns the agent configurations; read-only to the orchestrator. The
//! directory port mirrors the external registry interface
//! (`getConfig(agentName) -> AgentConfig | null`).

use std::collections::HashMap;

use crate::config::{AgentConfig, LlmTarget, Settings};

/// Port for agent configuration lookup
pub trait AgentDirectory: Send + Sync {
    /// Look up an agent's configuration by name
    fn get_config(&self, name: &str) -> Option<AgentConfig>;

    /// Agent used when routing produces no suggestion
    fn default_agent(&self) -> String;

    /// Names of all registered agents
    fn agent_names(&self) -> Vec<String>;
}

/// Static directory over a fixed agent map
pub struct StaticDirectory {
    agents: HashMap<String, AgentConfig>,
    default_agent: String,
}

impl StaticDirectory {
    /// Build the directory from settings: the built-in monitoring agents,
    /// with any configured agents merged over them by name
    pub fn from_settings(settings: &Settings) -> Self {
        let mut agents: HashMap<String, AgentConfig> = built_in_agents()
            .into_iter()
            .map(|a| (a.name.clone(), a))
            .collect();

        for agent in &settings.agents {
            agents.insert(agent.name.clone(), agent.clone());
        }

        Self {
            agents,
            default_agent: settings.route.default_agent.clone(),
        }
    }

    /// Build a directory over an explicit agent list
    pub fn new(configs: Vec<AgentConfig>, default_agent: impl Into<String>) -> Self {
        Self {
            agents: configs.into_iter().map(|a| (a.name.clone(), a)).collect(),
            default_agent: default_agent.into(),
        }
    }
}

impl AgentDirectory for StaticDirectory {
    fn get_config(&self, name: &str) -> Option<AgentConfig> {
        self.agents.get(name).cloned()
    }

    fn default_agent(&self) -> String {
        self.default_agent.clone()
    }

    fn agent_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }
}

/// The four built-in monitoring agents
pub fn built_in_agents() -> Vec<AgentConfig> {
    vec![
        AgentConfig {
            name: "NLQ Agent".to_string(),
            description: "Answers natural-language questions about current server metrics"
                .to_string(),
            instructions: "You are a server monitoring assistant. Answer the user's question \
                           about server status and metrics using the available tools. Query: \
                           {{ query }}"
                .to_string(),
            tools: vec!["queryMetrics".to_string(), "finalAnswer".to_string()],
            match_patterns: vec!["상태".to_string(), "metric".to_string(), "status".to_string()],
            llm: LlmTarget {
                provider: "cerebras".to_string(),
                model: "llama-3.3-70b".to_string(),
            },
            max_steps: 6,
            timeout_seconds: 60,
        },
        AgentConfig {
            name: "Analyst Agent".to_string(),
            description: "Detects anomalies and analyzes root causes".to_string(),
            instructions: "You are an anomaly analyst. Detect anomalies relevant to the \
                           question and explain their most likely root cause. Query: {{ query }}"
                .to_string(),
            tools: vec![
                "detectAnomalies".to_string(),
                "queryMetrics".to_string(),
                "finalAnswer".to_string(),
            ],
            match_patterns: vec!["원인".to_string(), "분석".to_string(), "anomaly".to_string()],
            llm: LlmTarget {
                provider: "groq".to_string(),
                model: "llama-3.1-8b-instant".to_string(),
            },
            max_steps: 6,
            timeout_seconds: 60,
        },
        AgentConfig {
            name: "Reporter Agent".to_string(),
            description: "Writes incident summaries and reports".to_string(),
            instructions: "You are an incident reporter. Produce a concise report for the \
                           requested period or incident. Query: {{ query }}"
                .to_string(),
            tools: vec![
                "queryMetrics".to_string(),
                "searchKnowledge".to_string(),
                "finalAnswer".to_string(),
            ],
            match_patterns: vec!["보고서".to_string(), "리포트".to_string(), "report".to_string()],
            llm: LlmTarget {
                provider: "mistral".to_string(),
                model: "mistral-small-latest".to_string(),
            },
            max_steps: 6,
            timeout_seconds: 60,
        },
        AgentConfig {
            name: "Advisor Agent".to_string(),
            description: "Recommends remediation steps and best practices".to_string(),
            instructions: "You are a remediation advisor. Recommend concrete, safe steps to \
                           resolve the reported problem. Query: {{ query }}"
                .to_string(),
            tools: vec![
                "searchKnowledge".to_string(),
                "webSearch".to_string(),
                "finalAnswer".to_string(),
            ],
            match_patterns: vec!["해결".to_string(), "조치".to_string(), "fix".to_string()],
            llm: LlmTarget {
                provider: "gemini".to_string(),
                model: "gemini-2.0-flash".to_string(),
            },
            max_steps: 6,
            timeout_seconds: 60,
        },
    ]
}
