//! Configuration for the orchestration core
//!
//! All empirically tuned routing constants (confidence values, keyword
//! families) are policy data with defaults, overridable from an `argus.toml`
//! file or `ARGUS_`-prefixed environment variables.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Top-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Runtime knobs for the executor and agent loop
    #[serde(default)]
    pub runtime: RuntimeSettings,
    /// Routing policy for the pre-filter and decomposer
    #[serde(default)]
    pub route: RoutePolicy,
    /// Additional agent configurations merged over the built-in set
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

impl Settings {
    /// Load settings from `argus.toml` (optional) plus environment overrides
    pub fn new() -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(File::with_name("argus").required(false))
            .add_source(Environment::with_prefix("ARGUS").separator("__"))
            .build()?
            .try_deserialize()
    }
}

/// Runtime knobs for the executor and agent loop
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeSettings {
    /// Maximum characters per streamed text chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Buffer size for event channels
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
    /// When set, an ambiguous query that cannot be decomposed asks a
    /// clarifying question instead of falling back to the default agent
    #[serde(default)]
    pub clarify_on_ambiguity: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            stream_buffer: default_stream_buffer(),
            clarify_on_ambiguity: false,
        }
    }
}

fn default_chunk_size() -> usize {
    50
}

fn default_stream_buffer() -> usize {
    64
}

/// Configuration for one specialized agent
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Unique agent name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// System instructions; may contain Tera placeholders such as
    /// `{{ query }}` and `{{ session_id }}`
    pub instructions: String,
    /// Tool names this agent may call (from the shared tool set)
    #[serde(default)]
    pub tools: Vec<String>,
    /// Patterns the registry uses to describe what the agent covers
    #[serde(default)]
    pub match_patterns: Vec<String>,
    /// Model target for this agent
    pub llm: LlmTarget,
    /// Step cap for the tool-calling loop
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Wall-clock budget per invocation, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_max_steps() -> u32 {
    6
}

fn default_timeout() -> u64 {
    60
}

/// Model target: which provider/model an agent wants
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmTarget {
    /// Provider name (e.g. "cerebras", "groq", "mistral", "gemini")
    pub provider: String,
    /// Model identifier
    pub model: String,
}

/// One intent keyword family mapping to a single specialized agent
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntentFamily {
    /// Family name, for logs and clarification options
    pub name: String,
    /// Agent that handles this family
    pub agent: String,
    /// Keywords whose presence signals this intent
    pub keywords: Vec<String>,
    /// Agent-specific families score above the generic metric-query family
    #[serde(default)]
    pub specific: bool,
}

/// Routing policy: tuned confidence constants and keyword families
///
/// The relative ordering (greeting > specific intent > generic metric query >
/// composite) and the no-suggestion-on-ambiguity behavior are contractual;
/// the literal values are asserted on by the test suite.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutePolicy {
    /// Confidence for greeting/small-talk direct answers
    #[serde(default = "default_greeting_confidence")]
    pub greeting_confidence: f64,
    /// Confidence for agent-specific single-intent matches
    #[serde(default = "default_specific_confidence")]
    pub specific_confidence: f64,
    /// Confidence for the generic/ambiguous metric-query case
    #[serde(default = "default_metric_confidence")]
    pub metric_confidence: f64,
    /// Confidence for composite queries (deliberately under-confident,
    /// with no suggested agent)
    #[serde(default = "default_composite_confidence")]
    pub composite_confidence: f64,
    /// Confidence when no family matches at all
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,
    /// Prefixes that mark a greeting/small-talk query
    #[serde(default = "default_greeting_patterns")]
    pub greeting_patterns: Vec<String>,
    /// Canned identity response for greetings
    #[serde(default = "default_identity_response")]
    pub identity_response: String,
    /// Intent keyword families, in canonical pipeline order
    /// (data -> analysis -> report -> advice)
    #[serde(default = "default_families")]
    pub families: Vec<IntentFamily>,
    /// Agent used when routing produces no suggestion
    #[serde(default = "default_agent_name")]
    pub default_agent: String,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            greeting_confidence: default_greeting_confidence(),
            specific_confidence: default_specific_confidence(),
            metric_confidence: default_metric_confidence(),
            composite_confidence: default_composite_confidence(),
            fallback_confidence: default_fallback_confidence(),
            greeting_patterns: default_greeting_patterns(),
            identity_response: default_identity_response(),
            families: default_families(),
            default_agent: default_agent_name(),
        }
    }
}

fn default_greeting_confidence() -> f64 {
    0.92
}

fn default_specific_confidence() -> f64 {
    0.88
}

fn default_metric_confidence() -> f64 {
    0.86
}

fn default_composite_confidence() -> f64 {
    0.68
}

fn default_fallback_confidence() -> f64 {
    0.5
}

fn default_agent_name() -> String {
    "NLQ Agent".to_string()
}

fn default_greeting_patterns() -> Vec<String> {
    [
        "안녕", "하이", "반가워", "반갑습니다", "누구야", "누구세요", "고마워", "감사합니다",
        "hello", "hi", "hey", "who are you", "thanks", "thank you",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_identity_response() -> String {
    "안녕하세요! 저는 서버 모니터링 AI 어시스턴트입니다. 서버 상태 조회, 이상 탐지 및 원인 분석, \
     장애 보고서 작성, 조치 방안 안내를 도와드릴 수 있어요. 무엇을 도와드릴까요?"
        .to_string()
}

fn default_families() -> Vec<IntentFamily> {
    vec![
        IntentFamily {
            name: "metric-query".to_string(),
            agent: "NLQ Agent".to_string(),
            keywords: [
                "상태", "지표", "메트릭", "사용량", "트래픽", "cpu", "메모리", "디스크",
                "네트워크", "status", "metric", "memory", "disk", "usage", "traffic",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            specific: false,
        },
        IntentFamily {
            name: "anomaly-analysis".to_string(),
            agent: "Analyst Agent".to_string(),
            keywords: [
                "이상", "원인", "분석", "스파이크", "급증", "왜", "anomaly", "root cause",
                "analy", "spike",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            specific: true,
        },
        IntentFamily {
            name: "incident-report".to_string(),
            agent: "Reporter Agent".to_string(),
            keywords: [
                "보고서", "리포트", "요약", "정리해", "장애 보고", "report", "summary",
                "incident",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            specific: true,
        },
        IntentFamily {
            name: "remediation".to_string(),
            agent: "Advisor Agent".to_string(),
            keywords: [
                "해결", "조치", "방법", "어떻게", "권장", "개선", "튜닝", "how to", "fix",
                "remediat", "recommend",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            specific: true,
        },
    ]
}
