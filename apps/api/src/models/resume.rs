use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One candidate's extracted resume text plus identifying metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    /// Unique within one screening run.
    pub id: String,
    pub text: String,
    pub file_name: String,
}

impl Resume {
    pub fn new(text: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            id: new_resume_id(),
            text: text.into(),
            file_name: file_name.into(),
        }
    }
}

/// Generates a fresh resume id (`resume_<uuid>`).
pub fn new_resume_id() -> String {
    format!("resume_{}", Uuid::new_v4().simple())
}

/// The model-derived evaluation of one resume against a job description.
///
/// `id` always equals the originating [`Resume::id`]; `match_score` is within 1..=10.
/// Both are enforced by [`crate::scoring::parse_scoring_output`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub match_score: u8,
    pub justification: String,
    pub extracted_skills: Vec<String>,
    pub extracted_experience_summary: String,
}

/// Sorts candidates by descending match score. Ties keep their relative order.
pub fn sort_by_score(candidates: &mut [Candidate]) {
    // slice::sort_by is stable
    candidates.sort_by(|a, b| b.match_score.cmp(&a.match_score));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of the consultant conversation. Held in memory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultantMessage {
    pub role: Role,
    pub content: String,
}

impl ConsultantMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, score: u8) -> Candidate {
        Candidate {
            id: id.to_string(),
            name: format!("Candidate {id}"),
            match_score: score,
            justification: String::new(),
            extracted_skills: vec![],
            extracted_experience_summary: String::new(),
        }
    }

    #[test]
    fn test_sort_by_score_is_descending_and_stable() {
        let mut candidates = vec![
            candidate("a", 3),
            candidate("b", 9),
            candidate("c", 9),
            candidate("d", 1),
        ];
        sort_by_score(&mut candidates);

        let scores: Vec<u8> = candidates.iter().map(|c| c.match_score).collect();
        assert_eq!(scores, vec![9, 9, 3, 1]);
        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_candidate_uses_camel_case_wire_names() {
        let json = serde_json::to_value(candidate("r1", 7)).unwrap();
        assert_eq!(json["matchScore"], 7);
        assert!(json.get("extractedSkills").is_some());
        assert!(json.get("extractedExperienceSummary").is_some());
    }

    #[test]
    fn test_new_resume_ids_are_unique() {
        let a = Resume::new("text", "a.txt");
        let b = Resume::new("text", "a.txt");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("resume_"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ConsultantMessage::assistant("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
