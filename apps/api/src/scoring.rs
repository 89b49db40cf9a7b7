//! Turns the buffered scoring response into validated candidates.
//!
//! All-or-nothing: one malformed element rejects the whole response.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{Candidate, Resume};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Model response did not contain any text content")]
    MissingContent,

    #[error("Model response was not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Model response did not match the candidate schema: {0}")]
    Schema(String),

    #[error("matchScore {score} for resume {id} is outside 1..=10")]
    ScoreOutOfRange { id: String, score: f64 },

    #[error("Model returned a candidate for unknown resume id {0}")]
    UnknownId(String),

    #[error("Model returned more than one candidate for resume id {0}")]
    DuplicateId(String),

    #[error("Model returned no candidate for resume id {0}")]
    MissingId(String),
}

/// Candidate as the model writes it, before range and id checks.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCandidate {
    id: String,
    name: String,
    match_score: f64,
    justification: String,
    extracted_skills: Vec<String>,
    extracted_experience_summary: String,
}

/// Extracts, parses and validates the scoring output for `resumes`.
///
/// The returned candidates keep the model's order; each resume id appears exactly once.
pub fn parse_scoring_output(raw: &Value, resumes: &[Resume]) -> Result<Vec<Candidate>, ParseError> {
    let text = envelope_text(raw).ok_or(ParseError::MissingContent)?;
    let text = strip_json_fences(text);

    let parsed: Value = serde_json::from_str(text).map_err(ParseError::InvalidJson)?;
    let items = parsed
        .as_array()
        .ok_or_else(|| ParseError::Schema("expected a JSON array".to_string()))?;

    let candidates = items
        .iter()
        .enumerate()
        .map(|(index, item)| validate_item(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    check_id_correspondence(&candidates, resumes)?;
    Ok(candidates)
}

/// `candidates[0].content.parts[0].text` from the provider envelope.
fn envelope_text(raw: &Value) -> Option<&str> {
    raw.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
}

fn validate_item(index: usize, item: &Value) -> Result<Candidate, ParseError> {
    let raw = RawCandidate::deserialize(item)
        .map_err(|e| ParseError::Schema(format!("element {index}: {e}")))?;

    let score = raw.match_score;
    if score.fract() != 0.0 || score < f64::from(MIN_SCORE) || score > f64::from(MAX_SCORE) {
        return Err(ParseError::ScoreOutOfRange { id: raw.id, score });
    }

    Ok(Candidate {
        id: raw.id,
        name: raw.name,
        match_score: score as u8,
        justification: raw.justification,
        extracted_skills: raw.extracted_skills,
        extracted_experience_summary: raw.extracted_experience_summary,
    })
}

/// The candidate id multiset must equal the resume id multiset.
fn check_id_correspondence(candidates: &[Candidate], resumes: &[Resume]) -> Result<(), ParseError> {
    let mut expected: HashMap<&str, usize> = HashMap::new();
    for resume in resumes {
        *expected.entry(resume.id.as_str()).or_default() += 1;
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for candidate in candidates {
        let id = candidate.id.as_str();
        let Some(limit) = expected.get(id) else {
            return Err(ParseError::UnknownId(candidate.id.clone()));
        };
        let count = seen.entry(id).or_default();
        *count += 1;
        if *count > *limit {
            return Err(ParseError::DuplicateId(candidate.id.clone()));
        }
    }

    for resume in resumes {
        let id = resume.id.as_str();
        if seen.get(id).copied().unwrap_or(0) < expected[id] {
            return Err(ParseError::MissingId(resume.id.clone()));
        }
    }
    Ok(())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}
