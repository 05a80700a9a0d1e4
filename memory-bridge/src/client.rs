//! Knowledge-graph capability and its HTTP bridge implementation.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Method};
use serde_json::{Value, json};
use std::time::Duration;

use crate::error::{MemoryError, Result};
use crate::types::{Entity, ObservationAddition, ObservationDeletion, Relation};

/// Header that makes ngrok tunnels skip their browser interstitial.
pub const NGROK_SKIP_HEADER: &str = "ngrok-skip-browser-warning";

/// Persistent knowledge graph the research agent can read and extend.
///
/// Every operation returns the bridge's JSON answer verbatim.
#[async_trait]
pub trait KnowledgeGraph: Send + Sync {
    /// Creates entities, ignoring names that already exist.
    async fn create_entities(&self, entities: &[Entity]) -> Result<Value>;
    /// Deletes entities and their relations.
    async fn delete_entities(&self, names: &[String]) -> Result<Value>;
    /// Creates relations, skipping duplicates.
    async fn create_relations(&self, relations: &[Relation]) -> Result<Value>;
    /// Deletes relations.
    async fn delete_relations(&self, relations: &[Relation]) -> Result<Value>;
    /// Adds observations to existing entities.
    async fn add_observations(&self, observations: &[ObservationAddition]) -> Result<Value>;
    /// Removes observations from entities.
    async fn delete_observations(&self, deletions: &[ObservationDeletion]) -> Result<Value>;
    /// Reads the whole graph.
    async fn read_graph(&self) -> Result<Value>;
    /// Searches names, types and observations.
    async fn search_nodes(&self, query: &str) -> Result<Value>;
    /// Fetches entities by name.
    async fn open_nodes(&self, names: &[String]) -> Result<Value>;
    /// Bridge status.
    async fn status(&self) -> Result<Value>;
    /// Empties the graph.
    async fn reset(&self) -> Result<Value>;
    /// Liveness probe.
    async fn health(&self) -> Result<Value>;
}

/// Configuration of the HTTP bridge client.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bridge base URL; a trailing slash is ignored.
    pub url: String,
    /// Per-request timeout (default: 30 s).
    pub timeout: Duration,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl BridgeConfig {
    /// Configuration for the bridge at `url` with default settings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("autologue/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP client for the knowledge-graph bridge.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: Client,
    base_url: String,
}

impl BridgeClient {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns `MemoryError::Config` if the user agent is not a valid header
    /// value or the HTTP client cannot be built.
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(NGROK_SKIP_HEADER),
            HeaderValue::from_static("true"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|e| MemoryError::Config(e.to_string()))?,
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| MemoryError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    /// Bridge base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, method: Method, endpoint: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{endpoint}", self.base_url);
        tracing::debug!(%method, %url, "Bridge request");

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::error!(%url, "Bridge request timed out");
            } else if e.is_connect() {
                tracing::error!(%url, "Failed to connect to bridge. Is it running?");
            }
            MemoryError::Network(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| MemoryError::Network(e.to_string()))?;

        if !status.is_success() {
            tracing::error!(%url, status = status.as_u16(), "Bridge request failed");
            return Err(MemoryError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| MemoryError::Parse(e.to_string()))
    }
}

#[async_trait]
impl KnowledgeGraph for BridgeClient {
    async fn create_entities(&self, entities: &[Entity]) -> Result<Value> {
        self.request(Method::POST, "/entities", Some(json!({ "entities": entities })))
            .await
    }

    async fn delete_entities(&self, names: &[String]) -> Result<Value> {
        self.request(Method::DELETE, "/entities", Some(json!({ "entityNames": names })))
            .await
    }

    async fn create_relations(&self, relations: &[Relation]) -> Result<Value> {
        self.request(Method::POST, "/relations", Some(json!({ "relations": relations })))
            .await
    }

    async fn delete_relations(&self, relations: &[Relation]) -> Result<Value> {
        self.request(Method::DELETE, "/relations", Some(json!({ "relations": relations })))
            .await
    }

    async fn add_observations(&self, observations: &[ObservationAddition]) -> Result<Value> {
        self.request(
            Method::POST,
            "/observations",
            Some(json!({ "observations": observations })),
        )
        .await
    }

    async fn delete_observations(&self, deletions: &[ObservationDeletion]) -> Result<Value> {
        self.request(
            Method::DELETE,
            "/observations",
            Some(json!({ "deletions": deletions })),
        )
        .await
    }

    async fn read_graph(&self) -> Result<Value> {
        self.request(Method::GET, "/graph", None).await
    }

    async fn search_nodes(&self, query: &str) -> Result<Value> {
        self.request(Method::POST, "/nodes/search", Some(json!({ "query": query })))
            .await
    }

    async fn open_nodes(&self, names: &[String]) -> Result<Value> {
        self.request(Method::POST, "/nodes/open", Some(json!({ "names": names })))
            .await
    }

    async fn status(&self) -> Result<Value> {
        self.request(Method::GET, "/status", None).await
    }

    async fn reset(&self) -> Result<Value> {
        self.request(Method::POST, "/reset", None).await
    }

    async fn health(&self) -> Result<Value> {
        self.request(Method::GET, "/health", None).await
    }
}
