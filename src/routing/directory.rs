//! Agent directory (ledger) clients.
//!
//! The directory owns agent records. The pipeline only reads them, once per
//! call, through the [`AgentDirectory`] trait.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::core::{Agent, AgentSearchCriteria};
use crate::error::RoutingError;

/// Read access to a registry of agents.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// Agents supporting every capability in `capabilities`, in directory order.
    ///
    /// An empty set matches every agent. Nothing matching is an empty list,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Directory`] if the directory is unavailable.
    async fn find_agents_by_capability(
        &self,
        capabilities: &BTreeSet<String>,
    ) -> Result<Vec<Agent>, RoutingError>;

    /// Agents satisfying `criteria`, in directory order.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Directory`] if the directory is unavailable.
    async fn search_agents(
        &self,
        criteria: &AgentSearchCriteria,
    ) -> Result<Vec<Agent>, RoutingError>;

    /// A single agent by id, or `None` if unknown.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Directory`] if the directory is unavailable.
    async fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>, RoutingError>;
}

/// Directory payloads come either as a bare array or wrapped in `agents`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AgentList {
    Bare(Vec<Agent>),
    Wrapped { agents: Vec<Agent> },
}

impl AgentList {
    fn into_agents(self) -> Vec<Agent> {
        match self {
            Self::Bare(agents) | Self::Wrapped { agents } => agents,
        }
    }
}

/// Directory over a fixed list of agents.
///
/// Backs the CLI's `--agents` fixture and the test suite.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    agents: Vec<Agent>,
}

impl InMemoryDirectory {
    /// Creates a directory holding `agents` in the given order.
    #[must_use]
    pub const fn new(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    /// Parses a JSON array of agents, or an object with an `agents` array.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Directory`] if the JSON does not describe agents.
    pub fn from_json_str(json: &str) -> Result<Self, RoutingError> {
        let list: AgentList = serde_json::from_str(json).map_err(|e| RoutingError::Directory {
            message: format!("invalid agent list: {e}"),
        })?;
        Ok(Self::new(list.into_agents()))
    }

    /// Loads agents from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Directory`] if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, RoutingError> {
        let json = std::fs::read_to_string(path).map_err(|e| RoutingError::Directory {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let directory = Self::from_json_str(&json)?;
        debug!(path = %path.display(), agents = directory.len(), "loaded agent fixture");
        Ok(directory)
    }

    /// Number of agents held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns `true` if the directory holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[async_trait]
impl AgentDirectory for InMemoryDirectory {
    async fn find_agents_by_capability(
        &self,
        capabilities: &BTreeSet<String>,
    ) -> Result<Vec<Agent>, RoutingError> {
        Ok(self
            .agents
            .iter()
            .filter(|a| a.supports_all(capabilities))
            .cloned()
            .collect())
    }

    async fn search_agents(
        &self,
        criteria: &AgentSearchCriteria,
    ) -> Result<Vec<Agent>, RoutingError> {
        let matching = self.agents.iter().filter(|a| criteria.matches(a)).cloned();
        Ok(match criteria.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>, RoutingError> {
        Ok(self.agents.iter().find(|a| a.agent_id == agent_id).cloned())
    }
}

/// Directory served by a ledger over HTTP.
///
/// `POST {base}/agents/search` with [`AgentSearchCriteria`] as the body, and
/// `GET {base}/agents/{id}` for single records.
#[derive(Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpDirectory {
    /// Creates a client for the ledger at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidConfig`] if the URL is blank, is not
    /// an absolute base URL, or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RoutingError> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(RoutingError::InvalidConfig {
                message: "ledger URL cannot be empty".to_string(),
            });
        }
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| RoutingError::InvalidConfig {
                message: format!("invalid ledger URL: {base_url}"),
            })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RoutingError::InvalidConfig {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// `{base}/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RoutingError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RoutingError::Directory {
                message: format!("ledger URL cannot take a path: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn unavailable(e: &reqwest::Error) -> RoutingError {
        RoutingError::Directory {
            message: e.to_string(),
        }
    }

    fn status_error(status: StatusCode) -> RoutingError {
        RoutingError::Directory {
            message: format!("ledger returned HTTP {status}"),
        }
    }
}

impl std::fmt::Debug for HttpDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDirectory")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AgentDirectory for HttpDirectory {
    async fn find_agents_by_capability(
        &self,
        capabilities: &BTreeSet<String>,
    ) -> Result<Vec<Agent>, RoutingError> {
        self.search_agents(&AgentSearchCriteria::with_capabilities(
            capabilities.iter().cloned(),
        ))
        .await
    }

    async fn search_agents(
        &self,
        criteria: &AgentSearchCriteria,
    ) -> Result<Vec<Agent>, RoutingError> {
        let url = self.endpoint(&["agents", "search"])?;
        debug!(%url, "searching ledger");

        let response = self
            .authorize(self.client.post(url).json(criteria))
            .send()
            .await
            .map_err(|e| Self::unavailable(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status));
        }

        let list: AgentList = response.json().await.map_err(|e| RoutingError::Directory {
            message: format!("invalid ledger response: {e}"),
        })?;
        Ok(list.into_agents())
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>, RoutingError> {
        let url = self.endpoint(&["agents", agent_id])?;
        debug!(%url, "fetching agent from ledger");

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| Self::unavailable(&e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::status_error(status));
        }

        let agent: Agent = response.json().await.map_err(|e| RoutingError::Directory {
            message: format!("invalid ledger response: {e}"),
        })?;
        Ok(Some(agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "agents": [
            {"agentId": "a", "name": "A", "url": "http://a", "capabilities": {"image_processing": true}},
            {"agentId": "b", "name": "B", "url": "http://b", "capabilities": {"text_processing": true}},
            {"agentId": "c", "name": "C", "url": "http://c",
             "capabilities": {"image_processing": true, "text_processing": true},
             "category": "creative", "cost": 3.0}
        ]
    }"#;

    fn caps(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn ids(agents: &[Agent]) -> Vec<&str> {
        agents.iter().map(|a| a.agent_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_find_by_capability_keeps_directory_order() {
        let dir = InMemoryDirectory::from_json_str(FIXTURE).unwrap_or_default();
        let found = dir
            .find_agents_by_capability(&caps(&["image_processing"]))
            .await
            .unwrap_or_default();
        assert_eq!(ids(&found), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_empty_capabilities_match_all() {
        let dir = InMemoryDirectory::from_json_str(FIXTURE).unwrap_or_default();
        let found = dir
            .find_agents_by_capability(&BTreeSet::new())
            .await
            .unwrap_or_default();
        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let dir = InMemoryDirectory::from_json_str(FIXTURE).unwrap_or_default();
        let found = dir.find_agents_by_capability(&caps(&["translation"])).await;
        assert!(found.is_ok_and(|f| f.is_empty()));
    }

    #[tokio::test]
    async fn test_search_agents_with_criteria_and_limit() {
        let dir = InMemoryDirectory::from_json_str(FIXTURE).unwrap_or_default();
        let criteria = AgentSearchCriteria {
            category: Some("Creative".to_string()),
            ..AgentSearchCriteria::default()
        };
        let found = dir.search_agents(&criteria).await.unwrap_or_default();
        assert_eq!(ids(&found), vec!["c"]);

        let limited = AgentSearchCriteria {
            limit: Some(2),
            ..AgentSearchCriteria::default()
        };
        let found = dir.search_agents(&limited).await.unwrap_or_default();
        assert_eq!(ids(&found), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_get_agent() {
        let dir = InMemoryDirectory::from_json_str(FIXTURE).unwrap_or_default();
        let found = dir.get_agent("b").await.unwrap_or_default();
        assert_eq!(found.map(|a| a.name), Some("B".to_string()));
        assert!(dir.get_agent("zzz").await.unwrap_or_default().is_none());
    }

    #[test]
    fn test_bare_array_fixture() {
        let dir = InMemoryDirectory::from_json_str(
            r#"[{"agent_id": "x", "name": "X", "url": "http://x"}]"#,
        )
        .unwrap_or_default();
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_invalid_fixture() {
        let result = InMemoryDirectory::from_json_str(r#"{"nope": true}"#);
        assert!(matches!(result, Err(RoutingError::Directory { .. })));
    }

    #[test]
    fn test_fixture_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("agents.json");
        std::fs::write(&path, FIXTURE).unwrap_or_else(|_| unreachable!());
        let directory = InMemoryDirectory::from_json_file(&path).unwrap_or_default();
        assert_eq!(directory.len(), 3);
        assert!(InMemoryDirectory::from_json_file(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_http_directory_rejects_blank_url() {
        let result = HttpDirectory::new("  ", None, Duration::from_secs(1));
        assert!(matches!(result, Err(RoutingError::InvalidConfig { .. })));
    }

    #[test]
    fn test_http_directory_rejects_relative_url() {
        let result = HttpDirectory::new("ledger.local/api", None, Duration::from_secs(1));
        assert!(matches!(result, Err(RoutingError::InvalidConfig { .. })));
    }

    #[test]
    fn test_agent_ids_are_path_encoded() {
        let dir = HttpDirectory::new("http://ledger.local/api/", None, Duration::from_secs(1))
            .unwrap_or_else(|_| unreachable!());

        let url = dir
            .endpoint(&["agents", "a/b?c#d"])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(url.as_str(), "http://ledger.local/api/agents/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);

        let search = dir
            .endpoint(&["agents", "search"])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(search.as_str(), "http://ledger.local/api/agents/search");
    }

    #[tokio::test]
    async fn test_http_directory_unreachable_is_directory_error() {
        let dir = HttpDirectory::new("http://127.0.0.1:9/", None, Duration::from_millis(500))
            .unwrap_or_else(|_| unreachable!());
        let result = dir.search_agents(&AgentSearchCriteria::default()).await;
        assert!(matches!(result, Err(RoutingError::Directory { .. })));
    }
}
