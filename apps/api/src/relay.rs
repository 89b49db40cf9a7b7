//! Credential-holding relay between clients and the LLM provider.
//!
//! `POST /api/proxy` with `{ "payload": <provider request>, "stream": bool }`.
//! The payload is forwarded untouched; buffered answers come back as the provider's
//! JSON, streamed answers are piped through chunk by chunk as they arrive.

use std::time::Duration;

use anyhow::{anyhow, Context};
use axum::{
    body::Body,
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::gateway::{ProviderEndpoint, RelayRequest};

#[derive(Clone)]
pub struct Relay {
    client: Client,
    /// `None` when no credential is configured; every call then fails with 500.
    endpoint: Option<ProviderEndpoint>,
}

impl Relay {
    pub fn new(endpoint: Option<ProviderEndpoint>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build relay HTTP client")?;
        Ok(Self { client, endpoint })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}

/// POST /api/proxy
pub async fn handle_proxy(
    State(relay): State<Relay>,
    method: Method,
    body: Bytes,
) -> Result<Response, AppError> {
    if method != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }

    let request: RelayRequest = serde_json::from_slice(&body).unwrap_or(RelayRequest {
        payload: None,
        stream: false,
    });
    let payload = request
        .payload
        .filter(|p| !p.is_null())
        .ok_or_else(|| AppError::BadRequest("Request body payload is required".to_string()))?;

    let endpoint = relay
        .endpoint
        .as_ref()
        .ok_or_else(|| anyhow!("API_KEY is not set in the server environment."))?;

    debug!("Relaying {} request to {}", if request.stream { "streamed" } else { "buffered" }, endpoint.model);
    let upstream = endpoint
        .request(&relay.client, &payload, request.stream)
        .send()
        .await?;

    let status = upstream.status();
    if !status.is_success() {
        let body = upstream.bytes().await?;
        let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        return Err(AppError::Upstream { status, body });
    }

    if request.stream {
        info!("Streaming provider response");
        let body = Body::from_stream(upstream.bytes_stream());
        return Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response());
    }

    let bytes = upstream.bytes().await?;
    let data: Value = serde_json::from_slice(&bytes).context("Provider returned invalid JSON")?;
    Ok(Json(data).into_response())
}
