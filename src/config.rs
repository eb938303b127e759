//! Configuration loading from `.env` files.

use std::env;

/// Endpoint used when `APTOS_GRAPHQL_ENDPOINT` is not set.
pub const DEFAULT_ENDPOINT: &str = "https://api.mainnet.aptoslabs.com/v1/graphql";

/// Connection settings handed to the query client at construction.
///
/// Immutable once loaded; there is no process-wide session state.
#[derive(Debug, Clone)]
pub struct Settings {
    /// GraphQL endpoint URL.
    pub endpoint: String,
    /// Optional bearer token sent with every request.
    pub auth_token: Option<String>,
}

impl Settings {
    /// Load settings from the specified `.env` file.
    ///
    /// A missing file is not an error: requests then run against the
    /// default endpoint, unauthenticated, which the indexer may rate-limit.
    pub fn from_env(path: &str) -> Self {
        let _ = dotenvy::from_filename(path);
        let endpoint =
            env::var("APTOS_GRAPHQL_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.into());
        let auth_token = env::var("APTOS_AUTH_TOKEN").ok().filter(|s| !s.is_empty());
        if auth_token.is_none() {
            log::warn!("APTOS_AUTH_TOKEN not set; requests may fail or be rate-limited");
        }
        Self {
            endpoint,
            auth_token,
        }
    }
}

/// Serializes tests that read or write process environment variables.
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
