//! Concurrent fan-out to ranked agents.
//!
//! Every selected agent gets its own task in a [`JoinSet`] guarded by its
//! own timeout. Dropping the dispatch aborts whatever is still running. Results are reassembled in ranking order, and every dispatched
//! agent yields exactly one [`AgentResponse`], successful or not.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::transport::{AgentTransport, TaskRequest};
use crate::core::{AgentResponse, RankedAgent};
use crate::error::RoutingError;

/// Agents dispatched to and what each returned, in ranking order.
#[derive(Debug, Clone, Default)]
pub struct Dispatch {
    /// Dispatched agent ids.
    pub agents_used: Vec<String>,
    /// One response per dispatched agent, same order.
    pub raw_responses: Vec<AgentResponse>,
}

/// Third pipeline stage: ranked agents → per-agent responses.
#[derive(Clone)]
pub struct Router {
    transport: Arc<dyn AgentTransport>,
    timeout: Duration,
    requester_id: String,
}

impl Router {
    /// Creates a router sending tasks through `transport`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn AgentTransport>,
        timeout: Duration,
        requester_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            timeout,
            requester_id: requester_id.into(),
        }
    }

    /// Returns a copy of this router with a different per-agent timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The per-agent timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `query` to the first `max_agents` of `agents`, all at once.
    ///
    /// Never fails. A failing or slow agent is recorded as a failed
    /// response and does not hold up the others; the call returns once the
    /// slowest surviving dispatch finishes or times out.
    pub async fn dispatch(
        &self,
        agents: &[RankedAgent],
        query: &str,
        context: Option<&Value>,
        max_agents: usize,
    ) -> Dispatch {
        let selected = &agents[..agents.len().min(max_agents)];
        if selected.is_empty() {
            debug!("no agents selected, nothing to dispatch");
            return Dispatch::default();
        }

        let timeout = self.timeout;
        let mut tasks = JoinSet::new();

        for (index, agent) in selected.iter().enumerate() {
            let transport = Arc::clone(&self.transport);
            let endpoint = agent.endpoint();
            let request = TaskRequest::new(&self.requester_id, &endpoint, query, context.cloned());

            tasks.spawn(async move {
                let start = Instant::now();
                let outcome =
                    tokio::time::timeout(timeout, transport.invoke(&endpoint, &request)).await;
                let elapsed = start.elapsed();

                let response = match outcome {
                    Ok(Ok(content)) => {
                        info!(agent_id = %endpoint.agent_id, ?elapsed, "agent responded");
                        AgentResponse::success(endpoint.agent_id, content)
                    }
                    Ok(Err(e)) => {
                        warn!(agent_id = %endpoint.agent_id, ?elapsed, error = %e, "agent dispatch failed");
                        AgentResponse::failure(endpoint.agent_id, e.to_string())
                    }
                    Err(_) => {
                        let e = RoutingError::Timeout {
                            agent_id: endpoint.agent_id.clone(),
                            timeout_ms: timeout.as_millis(),
                        };
                        warn!(agent_id = %endpoint.agent_id, error = %e, "agent dispatch timed out");
                        AgentResponse::failure(endpoint.agent_id, e.to_string())
                    }
                };
                (index, response)
            });
        }

        let agents_used: Vec<String> = selected.iter().map(|a| a.agent_id.clone()).collect();

        // Dropping `tasks` aborts every dispatch still in flight.
        let mut responses: Vec<Option<AgentResponse>> = vec![None; selected.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, response)) => responses[index] = Some(response),
                Err(e) => warn!(error = %e, "dispatch task did not complete"),
            }
        }

        let raw_responses: Vec<AgentResponse> = responses
            .into_iter()
            .zip(&agents_used)
            .map(|(response, agent_id)| {
                response.unwrap_or_else(|| {
                    AgentResponse::failure(agent_id.clone(), "dispatch task did not complete")
                })
            })
            .collect();

        debug_assert_eq!(agents_used.len(), raw_responses.len());

        Dispatch {
            agents_used,
            raw_responses,
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("timeout", &self.timeout)
            .field("requester_id", &self.requester_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::RelevanceScore;
    use crate::routing::test_support::{ScriptedTransport, Step, agent};

    fn ranked(ids: &[&str]) -> Vec<RankedAgent> {
        ids.iter()
            .map(|id| RankedAgent::from_agent(&agent(id, &[]), RelevanceScore::new(0.7)))
            .collect()
    }

    fn ids(dispatch: &Dispatch) -> Vec<&str> {
        dispatch
            .raw_responses
            .iter()
            .map(|r| r.agent_id.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_failing_middle_agent_is_isolated() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with("a1", Step::reply(json!("first"), Duration::from_millis(20)))
                .with("a2", Step::fail("connection reset", Duration::ZERO))
                .with("a3", Step::reply(json!("third"), Duration::from_millis(20))),
        );
        let router = Router::new(transport.clone(), Duration::from_secs(5), "test");

        let dispatch = router.dispatch(&ranked(&["a1", "a2", "a3"]), "q", None, 3).await;

        assert_eq!(dispatch.agents_used, vec!["a1", "a2", "a3"]);
        assert_eq!(ids(&dispatch), vec!["a1", "a2", "a3"]);
        assert_eq!(dispatch.raw_responses[0].content(), Some(&json!("first")));
        assert!(
            dispatch.raw_responses[1]
                .error()
                .is_some_and(|e| e.contains("connection reset"))
        );
        assert_eq!(dispatch.raw_responses[2].content(), Some(&json!("third")));
    }

    #[tokio::test]
    async fn test_hanging_middle_agent_times_out_alone() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with("a1", Step::reply(json!("first"), Duration::from_millis(10)))
                .with("a2", Step::reply(json!("late"), Duration::from_secs(30)))
                .with("a3", Step::reply(json!("third"), Duration::from_millis(10))),
        );
        let router = Router::new(transport.clone(), Duration::from_millis(300), "test");

        let start = Instant::now();
        let dispatch = router.dispatch(&ranked(&["a1", "a2", "a3"]), "q", None, 3).await;
        let total = start.elapsed();

        assert!(total < Duration::from_secs(5), "took {total:?}");
        assert!(dispatch.raw_responses[0].is_success());
        assert!(
            dispatch.raw_responses[1]
                .error()
                .is_some_and(|e| e.contains("timed out after 300 ms"))
        );
        assert!(dispatch.raw_responses[2].is_success());

        // The healthy agents finished well before the slow one timed out.
        for id in ["a1", "a3"] {
            let done = transport
                .completed_after(id, start)
                .unwrap_or(Duration::MAX);
            assert!(done < Duration::from_millis(250), "{id} took {done:?}");
        }
    }

    #[tokio::test]
    async fn test_dropped_dispatch_aborts_in_flight_agents() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with("fast", Step::reply(json!("f"), Duration::ZERO))
                .with("slow", Step::reply(json!("s"), Duration::from_millis(300))),
        );
        let router = Router::new(transport.clone(), Duration::from_secs(5), "test");
        let agents = ranked(&["fast", "slow"]);

        let start = Instant::now();
        let outer = tokio::time::timeout(
            Duration::from_millis(50),
            router.dispatch(&agents, "q", None, 2),
        )
        .await;
        assert!(outer.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(transport.completed_after("fast", start).is_some());
        assert!(transport.completed_after("slow", start).is_none());
    }

    #[tokio::test]
    async fn test_dispatch_is_concurrent() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with("a1", Step::reply(json!(1), Duration::from_millis(200)))
                .with("a2", Step::reply(json!(2), Duration::from_millis(200)))
                .with("a3", Step::reply(json!(3), Duration::from_millis(200))),
        );
        let router = Router::new(transport, Duration::from_secs(5), "test");

        let start = Instant::now();
        let dispatch = router.dispatch(&ranked(&["a1", "a2", "a3"]), "q", None, 3).await;

        assert_eq!(dispatch.raw_responses.len(), 3);
        assert!(start.elapsed() < Duration::from_millis(550));
    }

    #[tokio::test]
    async fn test_ranking_order_survives_reverse_completion() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with("slow", Step::reply(json!("s"), Duration::from_millis(150)))
                .with("medium", Step::reply(json!("m"), Duration::from_millis(75)))
                .with("fast", Step::reply(json!("f"), Duration::ZERO)),
        );
        let router = Router::new(transport, Duration::from_secs(5), "test");

        let dispatch = router
            .dispatch(&ranked(&["slow", "medium", "fast"]), "q", None, 3)
            .await;

        assert_eq!(dispatch.agents_used, vec!["slow", "medium", "fast"]);
        assert_eq!(ids(&dispatch), vec!["slow", "medium", "fast"]);
    }

    #[tokio::test]
    async fn test_response_count_is_min_of_agents_and_limit() {
        let router = Router::new(Arc::new(ScriptedTransport::new()), Duration::from_secs(1), "t");
        let five = ranked(&["a", "b", "c", "d", "e"]);

        for (max, expected) in [(0, 0), (1, 1), (3, 3), (5, 5), (9, 5)] {
            let dispatch = router.dispatch(&five, "q", None, max).await;
            assert_eq!(dispatch.agents_used.len(), expected);
            assert_eq!(dispatch.raw_responses.len(), expected);
        }
    }

    #[tokio::test]
    async fn test_every_failure_still_reported() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with("a", Step::fail("down", Duration::ZERO))
                .with("b", Step::fail("down", Duration::ZERO)),
        );
        let router = Router::new(transport, Duration::from_secs(1), "t");
        let dispatch = router.dispatch(&ranked(&["a", "b"]), "q", None, 3).await;
        assert_eq!(dispatch.raw_responses.len(), 2);
        assert!(dispatch.raw_responses.iter().all(|r| !r.is_success()));
    }

    #[tokio::test]
    async fn test_task_request_carries_query_and_context() {
        let transport = Arc::new(ScriptedTransport::new());
        let router = Router::new(transport.clone(), Duration::from_secs(1), "compass-test");
        let context = json!({"locale": "en"});

        router
            .dispatch(&ranked(&["a"]), "summarize this", Some(&context), 1)
            .await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].requester_id, "compass-test");
        assert_eq!(requests[0].target_agent_id, "a");
        assert_eq!(requests[0].query(), "summarize this");
        assert_eq!(requests[0].context, Some(context));
    }
}
