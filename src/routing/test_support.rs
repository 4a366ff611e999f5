//! In-crate doubles for the external collaborators.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};

use super::analyzer::IntentService;
use super::directory::AgentDirectory;
use super::message::{Completion, CompletionRequest, TokenUsage};
use super::provider::LlmProvider;
use super::transport::{AgentTransport, TaskRequest};
use crate::core::{Agent, AgentEndpoint, AgentSearchCriteria, Provider, QueryAnalysis};
use crate::error::RoutingError;

/// Agent `id` supporting `caps`, reachable at a fake URL.
pub fn agent(id: &str, caps: &[&str]) -> Agent {
    Agent {
        agent_id: id.to_string(),
        name: format!("Agent {id}"),
        description: format!("test agent {id}"),
        url: format!("http://agents.test/{id}"),
        provider: Provider {
            organization: "Test Org".to_string(),
            url: None,
        },
        capabilities: caps.iter().map(|c| ((*c).to_string(), true)).collect(),
        skills: Vec::new(),
        category: None,
        tags: Vec::new(),
        cost: None,
        reliability: None,
    }
}

/// Provider answering every request with the same text.
pub struct ScriptedProvider {
    reply: String,
    last: Mutex<Option<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            last: Mutex::new(None),
        }
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RoutingError> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(request.clone());
        Ok(Completion {
            text: self.reply.clone(),
            usage: Some(TokenUsage::default()),
            truncated: false,
        })
    }
}

/// Intent service returning a fixed analysis.
pub struct ScriptedIntentService(pub QueryAnalysis);

#[async_trait]
impl IntentService for ScriptedIntentService {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn analyze_intent(&self, _query: &str) -> Result<QueryAnalysis, RoutingError> {
        Ok(self.0.clone())
    }
}

/// Intent service that is always down.
pub struct FailingIntentService;

#[async_trait]
impl IntentService for FailingIntentService {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn analyze_intent(&self, _query: &str) -> Result<QueryAnalysis, RoutingError> {
        Err(RoutingError::ApiRequest {
            message: "service unavailable".to_string(),
            status: Some(503),
        })
    }
}

/// Directory that is always down.
pub struct FailingDirectory;

#[async_trait]
impl AgentDirectory for FailingDirectory {
    async fn find_agents_by_capability(
        &self,
        _capabilities: &BTreeSet<String>,
    ) -> Result<Vec<Agent>, RoutingError> {
        Err(RoutingError::Directory {
            message: "connection refused".to_string(),
        })
    }

    async fn search_agents(
        &self,
        _criteria: &AgentSearchCriteria,
    ) -> Result<Vec<Agent>, RoutingError> {
        Err(RoutingError::Directory {
            message: "connection refused".to_string(),
        })
    }

    async fn get_agent(&self, _agent_id: &str) -> Result<Option<Agent>, RoutingError> {
        Err(RoutingError::Directory {
            message: "connection refused".to_string(),
        })
    }
}

/// Scripted behaviour of one agent.
#[derive(Debug, Clone)]
pub struct Step {
    delay: Duration,
    outcome: Result<Value, String>,
}

impl Step {
    pub const fn reply(content: Value, delay: Duration) -> Self {
        Self {
            delay,
            outcome: Ok(content),
        }
    }

    pub fn fail(message: &str, delay: Duration) -> Self {
        Self {
            delay,
            outcome: Err(message.to_string()),
        }
    }
}

/// Transport with per-agent delay and outcome.
///
/// Unscripted agents echo the query immediately.
#[derive(Default)]
pub struct ScriptedTransport {
    steps: HashMap<String, Step>,
    requests: Mutex<Vec<TaskRequest>>,
    completed: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, agent_id: &str, step: Step) -> Self {
        self.steps.insert(agent_id.to_string(), step);
        self
    }

    pub fn requests(&self) -> Vec<TaskRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Time from `start` until `agent_id` finished, if it did.
    pub fn completed_after(&self, agent_id: &str, start: Instant) -> Option<Duration> {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(id, _)| id == agent_id)
            .map(|(_, at)| at.saturating_duration_since(start))
    }
}

#[async_trait]
impl AgentTransport for ScriptedTransport {
    async fn invoke(
        &self,
        endpoint: &AgentEndpoint,
        request: &TaskRequest,
    ) -> Result<Value, RoutingError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let step = self.steps.get(&endpoint.agent_id).cloned().unwrap_or_else(|| {
            Step::reply(json!({"echo": request.query()}), Duration::ZERO)
        });

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }

        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((endpoint.agent_id.clone(), Instant::now()));

        step.outcome.map_err(|message| RoutingError::Transport {
            agent_id: endpoint.agent_id.clone(),
            message,
        })
    }
}
