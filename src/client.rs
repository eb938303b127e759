//! GraphQL query execution against the indexer endpoint.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;

use crate::config::Settings;

/// Reply envelope of a GraphQL POST: `data` and/or `errors`.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlReply {
    /// Result payload, absent when the whole query failed.
    #[serde(default)]
    pub data: Option<Value>,
    /// Query-level errors reported by the endpoint.
    #[serde(default)]
    pub errors: Option<Vec<Value>>,
}

/// Failure modes of a single query cycle. Neither is retried here; the
/// pagination loop decides what a failure means.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Network or HTTP-level failure.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// Response body was not valid JSON.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client owning one connection pool and the default headers.
#[derive(Debug, Clone)]
pub struct GraphQlClient {
    endpoint: String,
    http: reqwest::Client,
}

impl GraphQlClient {
    /// Build a client from immutable [`Settings`].
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &settings.auth_token {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            endpoint: settings.endpoint.clone(),
            http,
        })
    }

    /// Execute one query and decode the reply envelope.
    pub async fn execute(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<GraphQlReply, QueryError> {
        let payload = serde_json::json!({ "query": query, "variables": variables });
        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
