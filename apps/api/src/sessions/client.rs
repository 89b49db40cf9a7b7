//! HTTP client for the session store API.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::models::HistoryEntry;
use crate::sessions::models::{
    Pagination, SaveSessionRequest, SessionDetail, SessionPage, SessionStatistics, StoredResume,
    StoredSession,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Session store error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Unexpected session store response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Remote session persistence as seen by the orchestration layer.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(&self, request: &SaveSessionRequest) -> Result<String, StoreError>;
    async fn list_sessions(&self, page: u32, limit: u32) -> Result<SessionPage, StoreError>;
    async fn get_session(&self, id: &str) -> Result<SessionDetail, StoreError>;
    async fn delete_session(&self, id: &str) -> Result<(), StoreError>;
    async fn get_session_statistics(&self, id: &str) -> Result<SessionStatistics, StoreError>;

    /// One page of stored sessions, each rendered as a history entry.
    async fn history_page(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<HistoryEntry>, Pagination), StoreError> {
        let page = self.list_sessions(page, limit).await?;
        let entries = page.sessions.iter().map(StoredSession::to_history_entry).collect();
        Ok((entries, page.pagination))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedResponse {
    session_id: String,
}

#[derive(Deserialize)]
struct DetailResponse {
    session: StoredSession,
    resumes: Vec<StoredResume>,
}

#[derive(Deserialize)]
struct StatsResponse {
    stats: SessionStatistics,
}

#[derive(Clone)]
pub struct SessionStoreClient {
    client: Client,
    base_url: String,
}

impl SessionStoreClient {
    /// `base_url` is the full store endpoint, e.g. `http://localhost:8080/api/sessions`.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Query values are percent-encoded by reqwest.
    fn session_request(&self, method: Method, action: &str, id: &str) -> RequestBuilder {
        self.client
            .request(method, &self.base_url)
            .query(&[("action", action), ("sessionId", id)])
    }

    /// Sends the request and unwraps the `{success, ...}` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        let body: Value = match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(e) if status.is_success() => return Err(StoreError::Decode(e)),
            Err(_) => Value::Null,
        };

        let succeeded = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        if !status.is_success() || !succeeded {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string();
            error!("Session store call failed ({status}): {message}");
            return Err(if status.as_u16() == 404 {
                StoreError::NotFound(message)
            } else {
                StoreError::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl SessionStore for SessionStoreClient {
    async fn save_session(&self, request: &SaveSessionRequest) -> Result<String, StoreError> {
        let saved: SavedResponse = self
            .call(
                self.client
                    .post(&self.base_url)
                    .query(&[("action", "saveSession")])
                    .json(request),
                "Failed to save session",
            )
            .await?;
        info!("Session saved remotely as {}", saved.session_id);
        Ok(saved.session_id)
    }

    async fn list_sessions(&self, page: u32, limit: u32) -> Result<SessionPage, StoreError> {
        let request = self.client.get(&self.base_url).query(&[
            ("action", "getSessions".to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ]);
        self.call(request, "Failed to fetch sessions").await
    }

    async fn get_session(&self, id: &str) -> Result<SessionDetail, StoreError> {
        let detail: DetailResponse = self
            .call(
                self.session_request(Method::GET, "getSession", id),
                "Failed to fetch session",
            )
            .await?;
        Ok(SessionDetail {
            session: detail.session,
            resumes: detail.resumes,
        })
    }

    async fn delete_session(&self, id: &str) -> Result<(), StoreError> {
        let _: Value = self
            .call(
                self.session_request(Method::DELETE, "deleteSession", id),
                "Failed to delete session",
            )
            .await?;
        Ok(())
    }

    async fn get_session_statistics(&self, id: &str) -> Result<SessionStatistics, StoreError> {
        let stats: StatsResponse = self
            .call(
                self.session_request(Method::GET, "getStats", id),
                "Failed to fetch statistics",
            )
            .await?;
        Ok(stats.stats)
    }
}
