//! Model gateway: the single point through which prompts reach the LLM provider.
//!
//! No other module talks to the provider. A gateway either calls the provider
//! directly (development only, needs a local credential) or relays through the
//! `/api/proxy` service that holds the real credential. Both routes share the same
//! response handling and error type.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub mod provider;
pub mod stream;

pub use provider::ProviderEndpoint;
use stream::StreamAssembler;

/// Used when no timeout is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Model request timed out")]
    Timeout,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider response was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Http(e)
        }
    }
}

/// What a model call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// Full provider envelope from a buffered call.
    Json(Value),
    /// Reassembled text from a streamed call.
    Text(String),
}

impl ModelOutput {
    pub fn into_text(self) -> Option<String> {
        match self {
            ModelOutput::Text(text) => Some(text),
            ModelOutput::Json(_) => None,
        }
    }
}

/// Anything that can execute a model call. [`ModelGateway`] is the production
/// implementation; the orchestration layer only sees this trait.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn call_model(&self, payload: &Value, streaming: bool)
        -> Result<ModelOutput, GatewayError>;
}

/// How the gateway reaches the provider.
#[derive(Debug, Clone)]
pub enum GatewayRoute {
    Direct(ProviderEndpoint),
    Relay { url: String },
}

/// Body sent to the relay.
#[derive(Debug, Serialize, Deserialize)]
pub struct RelayRequest {
    pub payload: Option<Value>,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Clone)]
pub struct ModelGateway {
    client: Client,
    route: GatewayRoute,
}

impl ModelGateway {
    pub fn new(route: GatewayRoute, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, route })
    }

    async fn send(&self, payload: &Value, streaming: bool) -> Result<Response, GatewayError> {
        let request = match &self.route {
            GatewayRoute::Direct(endpoint) => endpoint.request(&self.client, payload, streaming),
            GatewayRoute::Relay { url } => self.client.post(url).json(&RelayRequest {
                payload: Some(payload.clone()),
                stream: streaming,
            }),
        };
        Ok(request.send().await?)
    }
}

#[async_trait]
impl ModelBackend for ModelGateway {
    async fn call_model(
        &self,
        payload: &Value,
        streaming: bool,
    ) -> Result<ModelOutput, GatewayError> {
        let response = self.send(payload, streaming).await?;
        read_response(response, streaming).await
    }
}

/// Turns a provider or relay response into a [`ModelOutput`].
async fn read_response(response: Response, streaming: bool) -> Result<ModelOutput, GatewayError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("Model call failed with {status}: {body}");
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    if streaming {
        let mut chunks = response.bytes_stream();
        let mut assembler = StreamAssembler::default();
        while let Some(chunk) = chunks.next().await {
            assembler.push(&chunk?);
        }
        debug!("Reassembled streamed response from {} chunks", assembler.chunks());
        Ok(ModelOutput::Text(assembler.finish()))
    } else {
        let body = response.bytes().await?;
        Ok(ModelOutput::Json(serde_json::from_slice(&body)?))
    }
}

/// Pulls `error.message` (plus `details`, if any) out of a JSON error body,
/// falling back to the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorBody {
                message,
                details: Some(details),
            },
        }) => format!("{message}: {details}"),
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "An unknown HTTP error occurred.".to_string(),
        Err(_) => body.to_string(),
    }
}
