use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::gateway::provider::{DEFAULT_MODEL, DEFAULT_PROVIDER_BASE_URL};
use crate::gateway::{GatewayRoute, ProviderEndpoint, DEFAULT_TIMEOUT};

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Sessions are kept in memory when unset.
    pub database_url: Option<String>,
    /// Provider credential; the relay answers 500 without it.
    pub api_key: Option<String>,
    pub provider_base_url: String,
    pub provider_model: String,
    pub request_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            api_key: optional_env("API_KEY").or_else(|| optional_env("GEMINI_API_KEY")),
            provider_base_url: optional_env("PROVIDER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PROVIDER_BASE_URL.to_string()),
            provider_model: optional_env("PROVIDER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            request_timeout: timeout_from_env()?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn provider_endpoint(&self) -> Option<ProviderEndpoint> {
        self.api_key.clone().map(|key| {
            ProviderEndpoint::new(&self.provider_base_url, &self.provider_model, key)
        })
    }
}

/// Settings for a screening client (CLI or embedding application).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full URL of the relay, e.g. `http://localhost:8080/api/proxy`.
    pub relay_url: String,
    /// Full URL of the session store API, e.g. `http://localhost:8080/api/sessions`.
    pub session_store_url: String,
    /// Development only: call the provider directly with this key instead of the relay.
    pub direct_api_key: Option<String>,
    pub provider_base_url: String,
    pub provider_model: String,
    pub history_dir: PathBuf,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(ClientConfig {
            relay_url: require_env("RELAY_URL")?,
            session_store_url: require_env("SESSION_STORE_URL")?,
            direct_api_key: optional_env("DIRECT_API_KEY"),
            provider_base_url: optional_env("PROVIDER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PROVIDER_BASE_URL.to_string()),
            provider_model: optional_env("PROVIDER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            history_dir: optional_env("HISTORY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".screener")),
            request_timeout: timeout_from_env()?,
        })
    }

    /// Direct to the provider when a development key is set, otherwise via the relay.
    pub fn gateway_route(&self) -> GatewayRoute {
        match &self.direct_api_key {
            Some(key) => GatewayRoute::Direct(ProviderEndpoint::new(
                &self.provider_base_url,
                &self.provider_model,
                key.clone(),
            )),
            None => GatewayRoute::Relay {
                url: self.relay_url.clone(),
            },
        }
    }
}

fn timeout_from_env() -> Result<Duration> {
    match optional_env("REQUEST_TIMEOUT_SECS") {
        Some(secs) => Ok(Duration::from_secs(
            secs.parse::<u64>()
                .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?,
        )),
        None => Ok(DEFAULT_TIMEOUT),
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank are treated the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_config(direct_api_key: Option<&str>) -> ClientConfig {
        ClientConfig {
            relay_url: "http://localhost:8080/api/proxy".into(),
            session_store_url: "http://localhost:8080/api/sessions".into(),
            direct_api_key: direct_api_key.map(str::to_string),
            provider_base_url: DEFAULT_PROVIDER_BASE_URL.into(),
            provider_model: DEFAULT_MODEL.into(),
            history_dir: PathBuf::from(".screener"),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    #[test]
    fn test_relay_route_without_direct_key() {
        match client_config(None).gateway_route() {
            GatewayRoute::Relay { url } => assert_eq!(url, "http://localhost:8080/api/proxy"),
            other => panic!("expected relay route, got {other:?}"),
        }
    }

    #[test]
    fn test_direct_route_with_key() {
        match client_config(Some("dev-key")).gateway_route() {
            GatewayRoute::Direct(endpoint) => assert_eq!(endpoint.model, DEFAULT_MODEL),
            other => panic!("expected direct route, got {other:?}"),
        }
    }

    #[test]
    fn test_server_endpoint_requires_key() {
        let config = Config {
            database_url: None,
            api_key: None,
            provider_base_url: DEFAULT_PROVIDER_BASE_URL.into(),
            provider_model: DEFAULT_MODEL.into(),
            request_timeout: DEFAULT_TIMEOUT,
            port: 8080,
            rust_log: "info".into(),
        };
        assert!(config.provider_endpoint().is_none());

        let config = Config {
            api_key: Some("k".into()),
            ..config
        };
        assert!(config
            .provider_endpoint()
            .unwrap()
            .url(false)
            .ends_with("gemini-2.5-flash:generateContent"));
    }
}
