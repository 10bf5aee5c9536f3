//! Prismic REST API client

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{ContentStore, Query, SearchResponse, StoreError};

/// How long a resolved master ref is reused before asking the API again
pub const MASTER_REF_TTL: Duration = Duration::from_secs(5);

/// Client for a Prismic repository's v2 API
///
/// Clones share the HTTP connection pool and the cached master ref.
#[derive(Clone)]
pub struct PrismicClient {
    client: Client,
    endpoint: String,
    access_token: Option<String>,
    master: Arc<RwLock<Option<(String, Instant)>>>,
    ref_ttl: Duration,
}

#[derive(Debug, Deserialize)]
struct ApiInfo {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

impl PrismicClient {
    /// Create a client for an API endpoint such as
    /// `https://my-repo.cdn.prismic.io/api/v2`
    pub fn new(endpoint: &str, access_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token: access_token.filter(|t| !t.is_empty()),
            master: Arc::default(),
            ref_ttl: MASTER_REF_TTL,
        }
    }

    /// Set how long the master ref is cached
    pub fn with_ref_ttl(mut self, ttl: Duration) -> Self {
        self.ref_ttl = ttl;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Resolve the ref of the currently published content
    pub async fn master_ref(&self) -> Result<String, StoreError> {
        if let Some((reference, fetched_at)) = self.master.read().await.as_ref() {
            if fetched_at.elapsed() < self.ref_ttl {
                return Ok(reference.clone());
            }
        }

        let info: ApiInfo = self.get_json(&self.endpoint, &[]).await?;
        let reference = info
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(StoreError::NoMasterRef)?;
        tracing::debug!("Master ref is {}", reference);

        *self.master.write().await = Some((reference.clone(), Instant::now()));
        Ok(reference)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, StoreError> {
        let mut request = self.client.get(url).query(params);
        if let Some(token) = &self.access_token {
            if !url.contains("access_token=") {
                request = request.query(&[("access_token", token)]);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ContentStore for PrismicClient {
    async fn query(&self, query: &Query) -> Result<SearchResponse, StoreError> {
        let master = self.master_ref().await?;
        let mut params = vec![("ref", master)];
        params.extend(query.to_params());

        let url = format!("{}/documents/search", self.endpoint);
        tracing::debug!("Querying {} with {:?}", url, params);
        self.get_json(&url, &params).await
    }

    async fn follow(&self, cursor: &str) -> Result<SearchResponse, StoreError> {
        if !(cursor.starts_with("http://") || cursor.starts_with("https://")) {
            return Err(StoreError::InvalidCursor(cursor.to_string()));
        }
        tracing::debug!("Following cursor {}", cursor);
        self.get_json(cursor, &[]).await
    }
}
