//! Session context port
//!
//! Cross-turn state (affected servers, anomalies, metrics) lives in an
//! external store. The orchestration core treats it as append-only: it calls
//! the `append*`/`update*` operations fire-and-forget and never
//! reads-then-writes with invariants of its own. Concurrency control is the
//! store's responsibility.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AgentResult;

/// Port for the external session context store
#[async_trait]
pub trait SessionContext: Send + Sync {
    /// Record servers affected by the current investigation
    async fn append_affected_servers(
        &self,
        session_id: &str,
        server_ids: Vec<String>,
    ) -> AgentResult<()>;

    /// Record detected anomalies
    async fn append_anomalies(&self, session_id: &str, anomalies: Vec<Value>) -> AgentResult<()>;

    /// Record metric samples referenced in answers
    async fn append_metrics(&self, session_id: &str, metrics: Vec<Value>) -> AgentResult<()>;

    /// Merge an arbitrary patch into the session's context object
    async fn update_session_context(&self, session_id: &str, patch: Value) -> AgentResult<()>;
}

/// Accumulated context for one session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Servers touched so far
    pub affected_servers: Vec<String>,
    /// Anomalies recorded so far
    pub anomalies: Vec<Value>,
    /// Metric samples recorded so far
    pub metrics: Vec<Value>,
    /// Free-form context patched by the orchestrator and tools
    pub context: HashMap<String, Value>,
    /// Last update timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

/// In-memory session context store
///
/// Reference implementation used by tests and single-process deployments.
pub struct InMemorySessionContext {
    sessions: Arc<RwLock<HashMap<String, SessionState>>>,
}

impl InMemorySessionContext {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Snapshot a session's accumulated state
    pub async fn state(&self, session_id: &str) -> Option<SessionState> {
        self.sessions.read().await.get(session_id).cloned()
    }
}

impl Default for InMemorySessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionContext for InMemorySessionContext {
    async fn append_affected_servers(
        &self,
        session_id: &str,
        server_ids: Vec<String>,
    ) -> AgentResult<()> {
        let mut sessions = self.sessions.write().await;
        let state = sessions.entry(session_id.to_string()).or_default();
        for id in server_ids {
            if !state.affected_servers.contains(&id) {
                state.affected_servers.push(id);
            }
        }
        state.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn append_anomalies(&self, session_id: &str, anomalies: Vec<Value>) -> AgentResult<()> {
        let mut sessions = self.sessions.write().await;
        let state = sessions.entry(session_id.to_string()).or_default();
        state.anomalies.extend(anomalies);
        state.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn append_metrics(&self, session_id: &str, metrics: Vec<Value>) -> AgentResult<()> {
        let mut sessions = self.sessions.write().await;
        let state = sessions.entry(session_id.to_string()).or_default();
        state.metrics.extend(metrics);
        state.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn update_session_context(&self, session_id: &str, patch: Value) -> AgentResult<()> {
        let mut sessions = self.sessions.write().await;
        let state = sessions.entry(session_id.to_string()).or_default();
        if let Some(obj) = patch.as_object() {
            for (key, value) in obj {
                state.context.insert(key.clone(), value.clone());
            }
        }
        state.updated_at = Some(Utc::now());
        Ok(())
    }
}
