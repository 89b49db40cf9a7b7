pub mod health;

use axum::{
    routing::{any, get},
    Router,
};

use crate::relay::handle_proxy;
use crate::sessions::api::handle_sessions;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Relay and store handlers check the method themselves to answer in their own envelopes.
        .route("/api/proxy", any(handle_proxy))
        .route("/api/sessions", any(handle_sessions))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::gateway::provider::{DEFAULT_MODEL, DEFAULT_PROVIDER_BASE_URL};
    use crate::relay::Relay;
    use crate::sessions::{MemorySessionRepository, SessionService};

    fn state() -> AppState {
        let config = Config {
            database_url: None,
            api_key: None,
            provider_base_url: DEFAULT_PROVIDER_BASE_URL.into(),
            provider_model: DEFAULT_MODEL.into(),
            request_timeout: Duration::from_secs(5),
            port: 0,
            rust_log: "info".into(),
        };
        AppState {
            sessions: SessionService::new(Arc::new(MemorySessionRepository::new())),
            relay: Relay::new(config.provider_endpoint(), config.request_timeout).unwrap(),
            config,
        }
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = build_router(state()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_configuration() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["relayConfigured"], false);
        assert_eq!(body["persistence"], "memory");
    }

    #[tokio::test]
    async fn test_routes_are_mounted() {
        let (status, body) = get_json("/api/sessions?action=getSessions").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = get_json("/api/proxy").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
