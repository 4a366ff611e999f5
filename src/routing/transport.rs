//! Agent invocation transport.
//!
//! A dispatch sends one [`TaskRequest`] to one agent and gets back either an
//! opaque JSON payload or an error. Timeouts are imposed by the router, so a
//! transport only has to be cancel-safe: dropping the future abandons the
//! request.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::AgentEndpoint;
use crate::error::RoutingError;

/// One part of a task message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPart {
    /// Part type; queries are always `text`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Part payload.
    pub content: String,
}

/// Message opening a task on a remote agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Sender role.
    pub role: String,
    /// Message parts.
    pub parts: Vec<TaskPart>,
}

impl TaskMessage {
    /// A user message carrying `text` as a single text part.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![TaskPart {
                kind: "text".to_string(),
                content: text.into(),
            }],
        }
    }
}

/// Payload sent to an agent on dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Identity of the router sending the task.
    pub requester_id: String,
    /// Agent the task is addressed to.
    pub target_agent_id: String,
    /// Opening message.
    pub message: TaskMessage,
    /// Caller-supplied context, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl TaskRequest {
    /// Builds the request for sending `query` to `target`.
    #[must_use]
    pub fn new(
        requester_id: impl Into<String>,
        target: &AgentEndpoint,
        query: &str,
        context: Option<Value>,
    ) -> Self {
        Self {
            requester_id: requester_id.into(),
            target_agent_id: target.agent_id.clone(),
            message: TaskMessage::user_text(query),
            context,
        }
    }

    /// Text of the opening message.
    #[must_use]
    pub fn query(&self) -> &str {
        self.message
            .parts
            .first()
            .map_or("", |part| part.content.as_str())
    }
}

/// Sends tasks to remote agents.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Invokes `endpoint` with `request` and returns the agent's payload.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Transport`] if the agent is unreachable or
    /// reports a failure.
    async fn invoke(
        &self,
        endpoint: &AgentEndpoint,
        request: &TaskRequest,
    ) -> Result<Value, RoutingError>;
}

/// JSON-over-HTTP transport.
///
/// Posts the [`TaskRequest`] to the agent URL. A non-2xx status or a body
/// with an `error` member is a failure; otherwise the `result` member, or
/// the whole body when there is none, is the content.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpTransport {
    /// Creates a transport that gives up on connecting after
    /// `connect_timeout`.
    ///
    /// No overall request deadline is set here: the router bounds each
    /// dispatch with its own timeout, which may be longer than any
    /// client-wide default.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidConfig`] if the HTTP client cannot be built.
    pub fn new(token: Option<String>, connect_timeout: Duration) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| RoutingError::InvalidConfig {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client, token })
    }

    /// Extracts the content from an agent's response body.
    fn interpret_body(agent_id: &str, body: Value) -> Result<Value, RoutingError> {
        if let Value::Object(mut map) = body {
            if let Some(error) = map.remove("error").filter(|e| !e.is_null()) {
                let message = match error {
                    Value::String(s) => s,
                    Value::Object(ref obj) => obj
                        .get("message")
                        .and_then(Value::as_str)
                        .map_or_else(|| error.to_string(), str::to_string),
                    other => other.to_string(),
                };
                return Err(RoutingError::Transport {
                    agent_id: agent_id.to_string(),
                    message,
                });
            }
            return Ok(map
                .remove("result")
                .unwrap_or(Value::Object(map)));
        }
        Ok(body)
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AgentTransport for HttpTransport {
    async fn invoke(
        &self,
        endpoint: &AgentEndpoint,
        request: &TaskRequest,
    ) -> Result<Value, RoutingError> {
        let failure = |message: String| RoutingError::Transport {
            agent_id: endpoint.agent_id.clone(),
            message,
        };

        debug!(agent_id = %endpoint.agent_id, url = %endpoint.url, "dispatching task");

        let mut builder = self.client.post(&endpoint.url).json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure(format!("agent returned HTTP {status}")));
        }

        let text = response.text().await.map_err(|e| failure(e.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Self::interpret_body(&endpoint.agent_id, body)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    use serde_json::json;

    use super::*;

    fn endpoint() -> AgentEndpoint {
        AgentEndpoint {
            agent_id: "img".to_string(),
            url: "http://127.0.0.1:9/tasks".to_string(),
        }
    }

    #[test]
    fn test_task_request_shape() {
        let request = TaskRequest::new(
            "compass-rs",
            &endpoint(),
            "draw a lighthouse",
            Some(json!({"style": "ink"})),
        );
        let value = serde_json::to_value(&request).unwrap_or_default();
        assert_eq!(value["requester_id"], "compass-rs");
        assert_eq!(value["target_agent_id"], "img");
        assert_eq!(value["message"]["role"], "user");
        assert_eq!(value["message"]["parts"][0]["type"], "text");
        assert_eq!(value["message"]["parts"][0]["content"], "draw a lighthouse");
        assert_eq!(value["context"]["style"], "ink");
        assert_eq!(request.query(), "draw a lighthouse");
    }

    #[test]
    fn test_context_omitted_when_absent() {
        let request = TaskRequest::new("r", &endpoint(), "q", None);
        let value = serde_json::to_value(&request).unwrap_or_default();
        assert!(value.get("context").is_none());
    }

    #[test]
    fn test_interpret_body_result_member() {
        let content = HttpTransport::interpret_body("a", json!({"result": "done", "task_id": "t1"}));
        assert_eq!(content.ok(), Some(json!("done")));
    }

    #[test]
    fn test_interpret_body_whole_body() {
        let content = HttpTransport::interpret_body("a", json!({"answer": 42}));
        assert_eq!(content.ok(), Some(json!({"answer": 42})));
        let plain = HttpTransport::interpret_body("a", json!("plain text"));
        assert_eq!(plain.ok(), Some(json!("plain text")));
    }

    #[test]
    fn test_interpret_body_error_member() {
        let err = HttpTransport::interpret_body("a", json!({"error": {"message": "quota exceeded"}}));
        match err {
            Err(RoutingError::Transport { agent_id, message }) => {
                assert_eq!(agent_id, "a");
                assert_eq!(message, "quota exceeded");
            }
            other => unreachable!("unexpected: {other:?}"),
        }
        let null_error = HttpTransport::interpret_body("a", json!({"error": null, "result": 1}));
        assert_eq!(null_error.ok(), Some(json!(1)));
    }

    /// Serves one request, answering `body` after `delay`.
    fn slow_agent(delay: Duration, body: &'static str) -> AgentEndpoint {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap_or_else(|_| unreachable!());
        let addr = listener.local_addr().unwrap_or_else(|_| unreachable!());

        std::thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut received = Vec::new();
            let mut buf = [0_u8; 4096];
            while let Ok(n) = stream.read(&mut buf) {
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if received.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            std::thread::sleep(delay);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        });

        AgentEndpoint {
            agent_id: "slow".to_string(),
            url: format!("http://{addr}/tasks"),
        }
    }

    #[tokio::test]
    async fn test_slow_agent_is_not_cut_off_by_connect_timeout() {
        let endpoint = slow_agent(Duration::from_millis(400), r#"{"result": "done"}"#);
        let transport = HttpTransport::new(None, Duration::from_millis(100))
            .unwrap_or_else(|_| unreachable!());
        let request = TaskRequest::new("r", &endpoint, "q", None);

        let result = transport.invoke(&endpoint, &request).await;
        assert_eq!(result.ok(), Some(json!("done")));
    }

    #[tokio::test]
    async fn test_unreachable_agent_is_transport_error() {
        let transport = HttpTransport::new(None, Duration::from_millis(500))
            .unwrap_or_else(|_| unreachable!());
        let request = TaskRequest::new("r", &endpoint(), "q", None);
        let result = transport.invoke(&endpoint(), &request).await;
        assert!(matches!(result, Err(RoutingError::Transport { .. })));
    }
}
