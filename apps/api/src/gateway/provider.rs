use reqwest::{Client, RequestBuilder};
use serde_json::Value;

pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Where and how to reach the LLM provider. Holds the real credential, so only the
/// relay (or a development client in direct mode) ever builds one.
#[derive(Clone)]
pub struct ProviderEndpoint {
    pub base_url: String,
    pub model: String,
    api_key: String,
}

impl ProviderEndpoint {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: String) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }

    /// `generateContent` for buffered calls, `streamGenerateContent` for streamed ones.
    pub fn url(&self, streaming: bool) -> String {
        let method = if streaming {
            "streamGenerateContent"
        } else {
            "generateContent"
        };
        format!(
            "{}/v1beta/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            self.model,
            method
        )
    }

    /// Builds the provider request for `payload`. The payload is forwarded untouched.
    pub fn request(&self, client: &Client, payload: &Value, streaming: bool) -> RequestBuilder {
        client
            .post(self.url(streaming))
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
    }
}

impl std::fmt::Debug for ProviderEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEndpoint")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
