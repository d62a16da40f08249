//! End-to-end orchestration runs against scripted model backends.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use argus::config::{AgentConfig, LlmTarget, Settings};
use argus::core::BaseAgent;
use argus::domain::{Message, Query, StreamEvent};
use argus::error::{AgentResult, ErrorCode, ModelError, ModelResult};
use argus::llm::{
    AgentExecutor, CompletionRequest, CompletionResponse, FinishReason, ModelStream,
    ProviderStatus, StaticResolver, ToolCallDelta,
};
use argus::orchestration::{MultiAgentExecutor, OrchestrationRequest};
use argus::registry::StaticDirectory;
use argus::session::{InMemorySessionContext, SessionContext};
use argus::tools::{Capability, CapabilitySet, Tool, ToolSet};

/// One scripted model turn: what the backend does for one completion call.
#[derive(Clone)]
enum Turn {
    /// Stream text, then stop
    Text(&'static str),
    /// Request a tool call alongside some text
    CallTool {
        name: &'static str,
        args: Value,
        text: &'static str,
    },
    /// Call finalAnswer with the given answer
    Final(&'static str),
    /// Fail mid-stream
    Fail(&'static str),
}

#[derive(Clone)]
struct ScriptedModel {
    turns: Arc<Mutex<VecDeque<Turn>>>,
}

impl ScriptedModel {
    fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns: Arc::new(Mutex::new(turns.into_iter().collect())),
        }
    }

    fn next_turn(&self) -> Turn {
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Turn::Text(""))
    }
}

#[async_trait]
impl AgentExecutor for ScriptedModel {
    async fn generate(&self, _request: CompletionRequest) -> ModelResult<CompletionResponse> {
        match self.next_turn() {
            Turn::Text(text) | Turn::CallTool { text, .. } => Ok(CompletionResponse {
                message: Message::assistant(text),
                finish_reason: FinishReason::Stop,
            }),
            Turn::Final(answer) => Ok(CompletionResponse {
                message: Message::assistant(answer),
                finish_reason: FinishReason::Stop,
            }),
            Turn::Fail(msg) => Err(ModelError::Streaming(msg.to_string())),
        }
    }

    fn stream(&self, _request: CompletionRequest) -> ModelStream {
        let (sender, stream) = ModelStream::channel(16);
        let turn = self.next_turn();

        tokio::spawn(async move {
            match turn {
                Turn::Text(text) => {
                    sender.send_text(text).await;
                    sender.send_finish(FinishReason::Stop).await;
                }
                Turn::CallTool { name, args, text } => {
                    if !text.is_empty() {
                        sender.send_text(text).await;
                    }
                    let delta = ToolCallDelta::new(0)
                        .with_id("call_test")
                        .with_name(name)
                        .with_arguments(args.to_string());
                    sender
                        .send(argus::llm::StreamChunk::tool_call(delta))
                        .await;
                    sender.send_finish(FinishReason::ToolCalls).await;
                }
                Turn::Final(answer) => {
                    let delta = ToolCallDelta::new(0)
                        .with_id("call_final")
                        .with_name("finalAnswer")
                        .with_arguments(json!({ "answer": answer }).to_string());
                    sender
                        .send(argus::llm::StreamChunk::tool_call(delta))
                        .await;
                    sender.send_finish(FinishReason::ToolCalls).await;
                }
                Turn::Fail(msg) => {
                    sender.send_text("partial ").await;
                    sender.send_error(ModelError::Streaming(msg.to_string())).await;
                }
            }
        });

        stream
    }
}

struct EchoTool {
    name: &'static str,
    capability: Option<Capability>,
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        self.name
    }

    fn required_capability(&self) -> Option<Capability> {
        self.capability
    }

    async fn execute(&self, args: Value) -> AgentResult<Value> {
        Ok(json!({ "tool": self.name, "echo": args }))
    }
}

/// Backend that never produces a chunk; used to drive the timeout path.
struct StallingModel;

#[async_trait]
impl AgentExecutor for StallingModel {
    async fn generate(&self, _request: CompletionRequest) -> ModelResult<CompletionResponse> {
        std::future::pending().await
    }

    fn stream(&self, _request: CompletionRequest) -> ModelStream {
        let (sender, stream) = ModelStream::channel(1);
        tokio::spawn(async move {
            let _keep_open = sender;
            std::future::pending::<()>().await;
        });
        stream
    }
}

/// Tool double that records investigation state through the session store.
struct MetricsRecorder {
    session: Arc<InMemorySessionContext>,
    session_id: String,
}

#[async_trait]
impl Tool for MetricsRecorder {
    fn name(&self) -> &str {
        "queryMetrics"
    }

    async fn execute(&self, args: Value) -> AgentResult<Value> {
        let server = args
            .get("server")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        self.session
            .append_affected_servers(&self.session_id, vec![server.clone()])
            .await?;
        self.session
            .append_metrics(&self.session_id, vec![json!({ "server": server, "cpu": 92 })])
            .await?;
        self.session
            .append_anomalies(
                &self.session_id,
                vec![json!({ "server": server, "kind": "cpu_spike" })],
            )
            .await?;

        Ok(json!({ "server": server, "cpu": 92 }))
    }
}

fn test_tools() -> ToolSet {
    let mut tools = ToolSet::with_final_answer();
    tools.insert(Arc::new(EchoTool {
        name: "queryMetrics",
        capability: None,
    }));
    tools.insert(Arc::new(EchoTool {
        name: "detectAnomalies",
        capability: None,
    }));
    tools.insert(Arc::new(EchoTool {
        name: "searchKnowledge",
        capability: Some(Capability::KnowledgeSearch),
    }));
    tools.insert(Arc::new(EchoTool {
        name: "webSearch",
        capability: Some(Capability::WebSearch),
    }));
    tools
}

fn resolver_for(model: &ScriptedModel) -> Arc<StaticResolver> {
    let executor: Arc<dyn AgentExecutor> = Arc::new(model.clone());
    Arc::new(
        StaticResolver::new()
            .with_executor("cerebras", executor.clone())
            .with_executor("groq", executor.clone())
            .with_executor("mistral", executor.clone())
            .with_executor("gemini", executor),
    )
}

fn all_providers_up() -> ProviderStatus {
    ProviderStatus::new()
        .set("cerebras", true)
        .set("groq", true)
        .set("mistral", true)
        .set("gemini", true)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn directory() -> Arc<StaticDirectory> {
    Arc::new(StaticDirectory::from_settings(&Settings::default()))
}

fn executor_with(model: &ScriptedModel, session: Arc<InMemorySessionContext>) -> MultiAgentExecutor {
    MultiAgentExecutor::new(
        Settings::default(),
        directory(),
        resolver_for(model),
        test_tools(),
        CapabilitySet::all(),
        session,
    )
}

fn terminal_events(events: &[StreamEvent]) -> Vec<&StreamEvent> {
    events.iter().filter(|e| e.is_terminal()).collect()
}

fn collected_text(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::TextDelta { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn run_request(query: &str) -> OrchestrationRequest {
    OrchestrationRequest {
        messages: vec![Message::user(query)],
        session_id: "session-1".to_string(),
    }
}

// --- BaseAgent terminal-event invariant -----------------------------------

#[tokio::test]
async fn test_agent_missing_config_yields_single_error_terminal() {
    let model = ScriptedModel::new(vec![]);
    let agent = BaseAgent::new(
        "Ghost Agent",
        directory(),
        resolver_for(&model),
        test_tools(),
        CapabilitySet::all(),
        all_providers_up(),
    );

    let events = agent
        .stream(Query::new("서버 상태", "s"), CancellationToken::new())
        .collect_all()
        .await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error { code, .. } => assert_eq!(*code, ErrorCode::ConfigNotFound),
        other => panic!("expected error terminal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_agent_unresolvable_model_yields_model_unavailable() {
    let model = ScriptedModel::new(vec![Turn::Final("unused")]);
    let agent = BaseAgent::new(
        "NLQ Agent",
        directory(),
        resolver_for(&model),
        test_tools(),
        CapabilitySet::all(),
        ProviderStatus::new(), // every provider down
    );

    let events = agent
        .stream(Query::new("서버 상태", "s"), CancellationToken::new())
        .collect_all()
        .await;

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1);
    match terminals[0] {
        StreamEvent::Error { code, .. } => assert_eq!(*code, ErrorCode::ModelUnavailable),
        other => panic!("expected error terminal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_agent_stream_failure_yields_stream_error() {
    let model = ScriptedModel::new(vec![Turn::Fail("connection reset")]);
    let agent = BaseAgent::new(
        "NLQ Agent",
        directory(),
        resolver_for(&model),
        test_tools(),
        CapabilitySet::all(),
        all_providers_up(),
    );

    let events = agent
        .stream(Query::new("서버 상태", "s"), CancellationToken::new())
        .collect_all()
        .await;

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1);
    match terminals[0] {
        StreamEvent::Error { code, message } => {
            assert_eq!(*code, ErrorCode::StreamError);
            assert!(message.as_deref().unwrap_or("").contains("connection reset"));
        }
        other => panic!("expected error terminal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_agent_normal_completion_yields_single_done() {
    let model = ScriptedModel::new(vec![
        Turn::CallTool {
            name: "queryMetrics",
            args: json!({ "server": "web-01" }),
            text: "checking",
        },
        Turn::Final("web-01은 정상입니다"),
    ]);
    let agent = BaseAgent::new(
        "NLQ Agent",
        directory(),
        resolver_for(&model),
        test_tools(),
        CapabilitySet::all(),
        all_providers_up(),
    );

    let events = agent
        .stream(Query::new("web-01 상태", "s"), CancellationToken::new())
        .collect_all()
        .await;

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1, "exactly one terminal event");
    match terminals[0] {
        StreamEvent::Done {
            success,
            final_agent,
            tools_called,
            metadata,
            response,
        } => {
            assert!(success);
            assert_eq!(final_agent, "NLQ Agent");
            assert_eq!(tools_called, &vec!["queryMetrics".to_string()]);
            assert_eq!(metadata.provider, "cerebras");
            assert_eq!(metadata.model_id, "llama-3.3-70b");
            assert_eq!(response.as_deref(), Some("web-01은 정상입니다"));
        }
        other => panic!("expected done terminal, got {:?}", other),
    }

    // tool_call then tool_result were forwarded before the terminal
    assert!(events
        .iter()
        .any(|e| matches!(e, StreamEvent::ToolCall { name, .. } if name == "queryMetrics")));
    assert!(events
        .iter()
        .any(|e| matches!(e, StreamEvent::ToolResult { name, .. } if name == "queryMetrics")));
}

#[tokio::test]
async fn test_agent_step_cap_uses_last_text_as_answer() {
    // Every turn calls a tool and never finalAnswer; the loop must stop at
    // the step cap and succeed with the last produced text.
    let turns: Vec<Turn> = (0..10)
        .map(|_| Turn::CallTool {
            name: "queryMetrics",
            args: json!({}),
            text: "아직 조사 중입니다",
        })
        .collect();
    let model = ScriptedModel::new(turns);
    let agent = BaseAgent::new(
        "NLQ Agent",
        directory(),
        resolver_for(&model),
        test_tools(),
        CapabilitySet::all(),
        all_providers_up(),
    );

    let events = agent
        .stream(Query::new("서버 상태", "s"), CancellationToken::new())
        .collect_all()
        .await;

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1);
    match terminals[0] {
        StreamEvent::Done {
            success, response, ..
        } => {
            assert!(success);
            assert_eq!(response.as_deref(), Some("아직 조사 중입니다"));
        }
        other => panic!("expected done terminal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_agent_cancellation_produces_terminal_event() {
    let model = ScriptedModel::new(vec![Turn::Final("unused")]);
    let agent = BaseAgent::new(
        "NLQ Agent",
        directory(),
        resolver_for(&model),
        test_tools(),
        CapabilitySet::all(),
        all_providers_up(),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    let events = agent
        .stream(Query::new("서버 상태", "s"), cancel)
        .collect_all()
        .await;

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1, "cancellation must still terminate the stream");
}

#[tokio::test(start_paused = true)]
async fn test_agent_wall_clock_timeout_surfaces_stream_error() {
    let executor: Arc<dyn AgentExecutor> = Arc::new(StallingModel);
    let resolver = Arc::new(StaticResolver::new().with_executor("cerebras", executor));

    let config = AgentConfig {
        name: "NLQ Agent".to_string(),
        description: "metrics".to_string(),
        instructions: "Answer the user's question about server status.".to_string(),
        tools: vec!["queryMetrics".to_string(), "finalAnswer".to_string()],
        match_patterns: Vec::new(),
        llm: LlmTarget {
            provider: "cerebras".to_string(),
            model: "llama-3.3-70b".to_string(),
        },
        max_steps: 6,
        timeout_seconds: 1,
    };
    let directory = Arc::new(StaticDirectory::new(vec![config], "NLQ Agent"));

    let agent = BaseAgent::new(
        "NLQ Agent",
        directory,
        resolver,
        test_tools(),
        CapabilitySet::all(),
        all_providers_up(),
    );

    let events = agent
        .stream(Query::new("서버 상태", "s"), CancellationToken::new())
        .collect_all()
        .await;

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1);
    match terminals[0] {
        StreamEvent::Error { code, message } => {
            assert_eq!(*code, ErrorCode::StreamError);
            assert!(message.as_deref().unwrap_or("").contains("timed out"));
        }
        other => panic!("expected timeout error, got {:?}", other),
    }
}

#[test]
fn test_capability_gating_hides_tools_but_keeps_final_answer() {
    let tools = test_tools();
    let allowed = vec![
        "queryMetrics".to_string(),
        "searchKnowledge".to_string(),
        "webSearch".to_string(),
    ];

    let filtered = tools.filtered(&allowed, &CapabilitySet::none());
    assert!(filtered.get("queryMetrics").is_some());
    assert!(filtered.get("searchKnowledge").is_none());
    assert!(filtered.get("webSearch").is_none());
    assert!(
        filtered.get("finalAnswer").is_some(),
        "finalAnswer survives every filter"
    );

    let filtered = tools.filtered(&allowed, &CapabilitySet::none().with(Capability::WebSearch));
    assert!(filtered.get("webSearch").is_some());
    assert!(filtered.get("searchKnowledge").is_none());

    // finalAnswer is retained even when the allowed list omits it
    let filtered = tools.filtered(&["queryMetrics".to_string()], &CapabilitySet::all());
    assert!(filtered.get("finalAnswer").is_some());
    assert!(filtered.get("webSearch").is_none());
}

#[tokio::test]
async fn test_tools_write_investigation_state_through_session_store() {
    let session = Arc::new(InMemorySessionContext::new());
    let mut tools = ToolSet::with_final_answer();
    tools.insert(Arc::new(MetricsRecorder {
        session: session.clone(),
        session_id: "session-1".to_string(),
    }));

    let model = ScriptedModel::new(vec![
        Turn::CallTool {
            name: "queryMetrics",
            args: json!({ "server": "web-01" }),
            text: "",
        },
        Turn::CallTool {
            name: "queryMetrics",
            args: json!({ "server": "web-01" }),
            text: "",
        },
        Turn::Final("web-01에서 CPU 스파이크가 감지되었습니다"),
    ]);
    let agent = BaseAgent::new(
        "NLQ Agent",
        directory(),
        resolver_for(&model),
        tools,
        CapabilitySet::all(),
        all_providers_up(),
    );

    let events = agent
        .stream(Query::new("web-01 상태", "session-1"), CancellationToken::new())
        .collect_all()
        .await;
    assert_eq!(terminal_events(&events).len(), 1);

    let state = session.state("session-1").await.expect("session written");
    assert_eq!(state.affected_servers, vec!["web-01"]); // deduplicated across calls
    assert_eq!(state.metrics.len(), 2);
    assert_eq!(state.anomalies.len(), 2);
    assert!(state.updated_at.is_some());
}

// --- Multi-agent stream executor ------------------------------------------

#[tokio::test]
async fn test_executor_greeting_short_circuits_without_agents() {
    let model = ScriptedModel::new(vec![]);
    let session = Arc::new(InMemorySessionContext::new());
    let executor = executor_with(&model, session);

    let events = executor
        .execute_stream(
            run_request("안녕하세요"),
            all_providers_up(),
            CancellationToken::new(),
        )
        .collect_all()
        .await;

    assert!(
        !events.iter().any(|e| matches!(e, StreamEvent::Handoff { .. })),
        "no agent may be invoked for a greeting"
    );

    let text = collected_text(&events);
    assert!(text.contains("모니터링"));

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1);
    match terminals[0] {
        StreamEvent::Done { final_agent, .. } => assert_eq!(final_agent, "Pre-Filter"),
        other => panic!("expected done terminal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_executor_single_intent_routes_to_one_agent() {
    init_tracing();
    let model = ScriptedModel::new(vec![Turn::Final("모든 서버가 정상입니다")]);
    let session = Arc::new(InMemorySessionContext::new());
    let executor = executor_with(&model, session.clone());

    let events = executor
        .execute_stream(
            run_request("서버 상태 알려줘"),
            all_providers_up(),
            CancellationToken::new(),
        )
        .collect_all()
        .await;

    let handoffs: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Handoff { from, to, .. } => Some((from.as_str(), to.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(handoffs, vec![("Orchestrator", "NLQ Agent")]);

    // Single result: the unified text is the agent's answer verbatim
    let text = collected_text(&events);
    assert!(text.contains("모든 서버가 정상입니다"));

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1, "agent terminals are absorbed");
    match terminals[0] {
        StreamEvent::Done {
            success,
            final_agent,
            response,
            ..
        } => {
            assert!(success);
            assert_eq!(final_agent, "NLQ Agent");
            assert!(response.is_none(), "overall terminal carries no payload");
        }
        other => panic!("expected done terminal, got {:?}", other),
    }

    // The executor recorded the completed task in the session context
    let state = session.state("session-1").await.expect("session written");
    assert_eq!(
        state.context.get("last_agent").and_then(|v| v.as_str()),
        Some("NLQ Agent")
    );
}

#[tokio::test]
async fn test_executor_composite_runs_tasks_sequentially() {
    init_tracing();
    let model = ScriptedModel::new(vec![
        Turn::Final("상태: web-01 CPU 92%"),
        Turn::Final("원인: 배포 후 커넥션 풀 고갈"),
        Turn::Final("조치: 풀 크기 상향 후 재시작"),
    ]);
    let session = Arc::new(InMemorySessionContext::new());
    let executor = executor_with(&model, session);

    let events = executor
        .execute_stream(
            run_request("서버 상태와 원인 분석을 비교하고 해결 방법도 알려줘"),
            all_providers_up(),
            CancellationToken::new(),
        )
        .collect_all()
        .await;

    let handoffs: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Handoff { from, to, .. } => Some((from.as_str(), to.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(
        handoffs,
        vec![
            ("Orchestrator", "NLQ Agent"),
            ("NLQ Agent", "Analyst Agent"),
            ("Analyst Agent", "Advisor Agent"),
        ]
    );

    // All three agent answers survive, merged in order under headings
    let text = collected_text(&events);
    assert!(text.contains("## NLQ Agent"));
    assert!(text.contains("## Analyst Agent"));
    assert!(text.contains("## Advisor Agent"));
    assert!(text.contains("상태: web-01 CPU 92%"));
    assert!(text.contains("원인: 배포 후 커넥션 풀 고갈"));
    assert!(text.contains("조치: 풀 크기 상향 후 재시작"));

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1, "per-agent terminals are absorbed");
    match terminals[0] {
        StreamEvent::Done { final_agent, .. } => assert_eq!(final_agent, "Advisor Agent"),
        other => panic!("expected done terminal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_executor_fails_fast_on_agent_error() {
    // First task succeeds, second fails mid-stream; the third must not run.
    let model = ScriptedModel::new(vec![
        Turn::Final("상태: 정상"),
        Turn::Fail("provider 5xx"),
        Turn::Final("unreachable"),
    ]);
    let session = Arc::new(InMemorySessionContext::new());
    let executor = executor_with(&model, session);

    let events = executor
        .execute_stream(
            run_request("서버 상태와 원인 분석을 비교하고 해결 방법도 알려줘"),
            all_providers_up(),
            CancellationToken::new(),
        )
        .collect_all()
        .await;

    let handoffs: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::Handoff { .. }))
        .collect();
    assert_eq!(handoffs.len(), 2, "third task must not start");

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1);
    match terminals[0] {
        StreamEvent::Error { code, .. } => assert_eq!(*code, ErrorCode::StreamError),
        other => panic!("expected forwarded error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_executor_unmatched_query_falls_back_to_default_agent() {
    let model = ScriptedModel::new(vec![Turn::Final("무엇을 도와드릴까요?")]);
    let session = Arc::new(InMemorySessionContext::new());
    let executor = executor_with(&model, session);

    let events = executor
        .execute_stream(
            run_request("음... 그게 말이지"),
            all_providers_up(),
            CancellationToken::new(),
        )
        .collect_all()
        .await;

    let handoffs: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Handoff { to, .. } => Some(to.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(handoffs, vec!["NLQ Agent"], "default routing, never an error");

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1);
    assert!(matches!(terminals[0], StreamEvent::Done { .. }));
}

#[tokio::test]
async fn test_executor_cancelled_run_still_terminates() {
    let model = ScriptedModel::new(vec![Turn::Final("unused")]);
    let session = Arc::new(InMemorySessionContext::new());
    let executor = executor_with(&model, session);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let events = executor
        .execute_stream(run_request("서버 상태 알려줘"), all_providers_up(), cancel)
        .collect_all()
        .await;

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1, "cancelled run must not leave the caller hanging");
}
