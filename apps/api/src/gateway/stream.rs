//! Streamed-response reassembly.
//!
//! The provider streams JSON wrappers whose `"text": "..."` fields carry the answer.
//! Each received chunk is scanned on its own: a fragment whose closing quote lands
//! in a later chunk is extracted from neither chunk.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

fn text_field() -> &'static Regex {
    static TEXT_FIELD: OnceLock<Regex> = OnceLock::new();
    TEXT_FIELD.get_or_init(|| Regex::new(r#""text"\s*:\s*"([^"]*)""#).expect("valid regex"))
}

/// Returns every complete, decodable `"text"` fragment in one chunk, in order.
/// Fragments that are not valid JSON string contents are skipped with a warning.
pub fn extract_fragments(chunk: &str) -> Vec<String> {
    text_field()
        .captures_iter(chunk)
        .filter_map(|caps| {
            let raw = caps.get(1)?.as_str();
            match serde_json::from_str::<String>(&format!("\"{raw}\"")) {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!("Skipping undecodable stream fragment {raw:?}: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Accumulates fragments from successive chunks into one string.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    text: String,
    chunks: usize,
}

impl StreamAssembler {
    pub fn push(&mut self, chunk: &[u8]) {
        self.chunks += 1;
        let chunk = String::from_utf8_lossy(chunk);
        for fragment in extract_fragments(&chunk) {
            self.text.push_str(&fragment);
        }
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn finish(self) -> String {
        self.text
    }
}
