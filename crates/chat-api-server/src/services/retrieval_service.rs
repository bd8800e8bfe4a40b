use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::services::chat_service::RetrievalProvider;
use crate::utils::error::ApiError;

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
    query: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    documents: Vec<String>,
}

/// HTTP client for the nearest-neighbor document index. The index itself
/// (embedding, chunking, storage) lives behind this boundary; this core only
/// asks it for snippets.
#[derive(Clone)]
pub struct RetrievalService {
    client: Client,
    config: RetrievalConfig,
}

impl RetrievalService {
    pub fn new(config: RetrievalConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_seconds))
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }
}

#[async_trait]
impl RetrievalProvider for RetrievalService {
    async fn query(
        &self,
        domain: Option<String>,
        text: &str,
        limit: usize,
    ) -> Result<Vec<String>, ApiError> {
        debug!("Querying retrieval index: domain={:?}, limit={}", domain, limit);

        let request = QueryRequest {
            domain: domain.as_deref(),
            query: text,
            limit,
        };

        let response = self
            .client
            .post(format!("{}/query", self.config.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::RetrievalError(format!("Failed to reach index: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::RetrievalError(format!(
                "Index query failed: {} - {}",
                status, body
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| ApiError::RetrievalError(format!("Invalid index response: {}", e)))?;

        debug!("Index returned {} documents", parsed.documents.len());
        Ok(parsed.documents)
    }
}
