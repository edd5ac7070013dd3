use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use fl_core::config::{CacheConfig, GitHubSettings};

use super::cache::{ConditionalFetchCache, Fetched};
use super::transport::{HttpRequest, HttpTransport, TransportError};

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("GitHub returned status {status}")]
    Status { status: u16 },

    #[error("GraphQL query failed: {0}")]
    Query(String),

    #[error("invalid GitHub token header: {0}")]
    InvalidToken(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GitHubError>;

/// Entry point for every forge call: REST reads go through the conditional
/// fetch cache, GraphQL queries go straight to the transport.
#[derive(Clone)]
pub struct GitHubClient {
    pub(crate) cache: Arc<ConditionalFetchCache>,
    transport: Arc<dyn HttpTransport>,
    api_base: String,
    graphql_url: String,
    headers: HeaderMap,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("graphql_url", &self.graphql_url)
            .field("cache", &self.cache)
            .finish()
    }
}

impl GitHubClient {
    /// Create a client from explicit settings and an optional token.
    pub fn new(
        settings: &GitHubSettings,
        cache_config: &CacheConfig,
        token: Option<&str>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        match token {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                    .map_err(|e| GitHubError::InvalidToken(e.to_string()))?;
                headers.insert(AUTHORIZATION, value);
            }
            None => warn!("no GitHub token configured; unauthenticated rate limits apply"),
        }

        Ok(Self {
            cache: Arc::new(ConditionalFetchCache::new(transport.clone(), cache_config)),
            transport,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            graphql_url: settings.graphql_url.clone(),
            headers,
        })
    }

    /// Create a client whose token is read from `settings.token_env`.
    pub fn from_env(
        settings: &GitHubSettings,
        cache_config: &CacheConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let token = settings.token_from_env();
        Self::new(settings, cache_config, token.as_deref(), transport)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn cache(&self) -> &ConditionalFetchCache {
        &self.cache
    }

    /// GET through the conditional fetch cache.
    pub async fn get(&self, url: &str) -> std::result::Result<Fetched, TransportError> {
        self.cache.fetch(Method::GET, url, self.headers.clone()).await
    }

    /// Run a GraphQL query and return its `data` object.
    pub async fn graphql(&self, query: &str, variables: Value) -> Result<Value> {
        let payload = json!({ "query": query, "variables": variables });
        let mut headers = self.headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .transport
            .request(HttpRequest {
                method: Method::POST,
                url: self.graphql_url.clone(),
                headers,
                body: Some(serde_json::to_vec(&payload)?),
            })
            .await?;

        if !response.is_success() {
            return Err(GitHubError::Status {
                status: response.status,
            });
        }

        let mut body: Value = serde_json::from_slice(&response.body)?;
        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let message = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(GitHubError::Query(message));
            }
        }
        Ok(body.get_mut("data").map(Value::take).unwrap_or(Value::Null))
    }
}
