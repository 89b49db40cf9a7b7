//! Prompt builders: pure functions that embed structured inputs into model prompts.
//!
//! Every builder returns a [`Prompt`] that knows whether the caller expects a
//! structured JSON answer (always fetched buffered) or free text (always streamed).
//! Nothing here touches the network.

use serde_json::{json, Value};

use crate::models::{ConsultantMessage, Resume, ResumeBuilderData};

pub mod templates;

use templates::{
    CONSULTANT_PROMPT, EDUCATION_BLOCK, EXPERIENCE_BLOCK, RESUME_BLOCK,
    RESUME_GENERATION_PROMPT, RESUME_QUESTION_PROMPT, SCORING_PROMPT,
};

/// The kind of answer a prompt asks the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// A JSON document, fetched in buffered mode.
    Json,
    /// Free text, fetched in streamed mode.
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub format: ResponseFormat,
}

impl Prompt {
    fn json(text: String) -> Self {
        Self {
            text,
            format: ResponseFormat::Json,
        }
    }

    fn text(text: String) -> Self {
        Self {
            text,
            format: ResponseFormat::Text,
        }
    }

    /// Whether the gateway should be called in streamed mode for this prompt.
    pub fn streaming(&self) -> bool {
        self.format == ResponseFormat::Text
    }

    /// Provider request body (`generateContent` shape).
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "contents": [{ "parts": [{ "text": self.text }] }]
        });
        if self.format == ResponseFormat::Json {
            payload["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }
        payload
    }
}

/// Scoring prompt for a whole batch of resumes.
pub fn build_scoring_prompt(job_description: &str, resumes: &[Resume]) -> Prompt {
    let blocks = resumes
        .iter()
        .map(|r| {
            render(
                RESUME_BLOCK,
                &[("id", &r.id), ("file_name", &r.file_name), ("text", &r.text)],
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Prompt::json(render(
        SCORING_PROMPT,
        &[("job_description", job_description), ("resumes", &blocks)],
    ))
}

pub fn build_resume_question_prompt(
    resume_text: &str,
    question: &str,
    job_description: &str,
) -> Prompt {
    Prompt::text(render(
        RESUME_QUESTION_PROMPT,
        &[
            ("job_description", job_description),
            ("resume_text", resume_text),
            ("question", question),
        ],
    ))
}

/// Consultant chat prompt. The gateway is stateless, so the whole history is
/// replayed on every call.
pub fn build_consultant_prompt(
    job_description: &str,
    resume_file_names: &[String],
    history: &[ConsultantMessage],
) -> Prompt {
    let job_description = if job_description.trim().is_empty() {
        "Not provided yet."
    } else {
        job_description
    };
    let file_names = if resume_file_names.is_empty() {
        "None".to_string()
    } else {
        resume_file_names.join(", ")
    };
    let history = history
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n");

    Prompt::text(render(
        CONSULTANT_PROMPT,
        &[
            ("job_description", job_description),
            ("resume_file_names", &file_names),
            ("history", &history),
        ],
    ))
}

pub fn build_resume_generation_prompt(details: &ResumeBuilderData) -> Prompt {
    let experience = details
        .work_experience
        .iter()
        .map(|exp| {
            render(
                EXPERIENCE_BLOCK,
                &[
                    ("company", &exp.company),
                    ("job_title", &exp.job_title),
                    ("start_date", &exp.start_date),
                    ("end_date", &exp.end_date),
                    ("responsibilities", &exp.responsibilities),
                ],
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let education = details
        .education
        .iter()
        .map(|edu| {
            render(
                EDUCATION_BLOCK,
                &[
                    ("school", &edu.school),
                    ("degree", &edu.degree),
                    ("start_date", &edu.start_date),
                    ("end_date", &edu.end_date),
                ],
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Prompt::text(render(
        RESUME_GENERATION_PROMPT,
        &[
            ("full_name", &details.full_name),
            ("email", &details.email),
            ("phone_number", &details.phone_number),
            ("address", &details.address),
            ("summary", &details.summary),
            ("experience", &experience),
            ("education", &education),
            ("skills", &details.skills),
        ],
    ))
}

/// Fills `{key}` placeholders in a single left-to-right pass. Unknown placeholders
/// are left untouched and inserted values are never re-scanned.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let replaced = after.find('}').and_then(|end| {
            let key = &after[..end];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, end))
        });
        match replaced {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
