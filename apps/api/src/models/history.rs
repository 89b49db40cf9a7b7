use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::resume::{Candidate, Resume};

const TITLE_MAX_CHARS: usize = 50;
const UNTITLED: &str = "Untitled Screening";

/// One completed screening run: the job description, its resumes and the candidates
/// the model produced for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: String,
    pub title: String,
    pub job_description: String,
    #[serde(default)]
    pub jd_file_name: Option<String>,
    #[serde(default)]
    pub jd_preset_name: Option<String>,
    pub resumes: Vec<Resume>,
    pub analysis_results: Vec<Candidate>,
}

/// The inputs and outputs of one analysis, before it is stamped into a [`HistoryEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSnapshot {
    pub job_description: String,
    pub jd_file_name: Option<String>,
    pub jd_preset_name: Option<String>,
    pub resumes: Vec<Resume>,
    pub analysis_results: Vec<Candidate>,
}

impl HistoryEntry {
    /// Stamps a snapshot with a `hist_<millis>` id, the current time and a derived title.
    pub fn from_snapshot(snapshot: AnalysisSnapshot) -> Self {
        let now = Utc::now();
        Self {
            id: format!("hist_{}", now.timestamp_millis()),
            timestamp: now.to_rfc3339(),
            title: derive_title(&snapshot.job_description),
            job_description: snapshot.job_description,
            jd_file_name: snapshot.jd_file_name,
            jd_preset_name: snapshot.jd_preset_name,
            resumes: snapshot.resumes,
            analysis_results: snapshot.analysis_results,
        }
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        AnalysisSnapshot {
            job_description: self.job_description.clone(),
            jd_file_name: self.jd_file_name.clone(),
            jd_preset_name: self.jd_preset_name.clone(),
            resumes: self.resumes.clone(),
            analysis_results: self.analysis_results.clone(),
        }
    }
}

/// First non-blank line of the job description, trimmed and capped at 50 characters
/// (with a trailing `...` when cut).
pub fn derive_title(job_description: &str) -> String {
    let Some(line) = job_description
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
    else {
        return UNTITLED.to_string();
    };

    if line.chars().count() > TITLE_MAX_CHARS {
        let cut: String = line.chars().take(TITLE_MAX_CHARS).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_skips_leading_blank_lines() {
        assert_eq!(
            derive_title("\n\nSenior Engineer\nmore text"),
            "Senior Engineer"
        );
    }

    #[test]
    fn test_title_truncates_long_first_line() {
        let line = "x".repeat(60);
        let title = derive_title(&line);
        assert_eq!(title, format!("{}...", "x".repeat(50)));
    }

    #[test]
    fn test_title_exactly_fifty_chars_is_kept() {
        let line = "y".repeat(50);
        assert_eq!(derive_title(&line), line);
    }

    #[test]
    fn test_title_of_blank_description_is_untitled() {
        assert_eq!(derive_title("   \n\t\n"), "Untitled Screening");
        assert_eq!(derive_title(""), "Untitled Screening");
    }

    #[test]
    fn test_title_truncation_respects_char_boundaries() {
        let line = "é".repeat(55);
        let title = derive_title(&line);
        assert_eq!(title.chars().count(), 53);
    }

    #[test]
    fn test_from_snapshot_stamps_entry() {
        let entry = HistoryEntry::from_snapshot(AnalysisSnapshot {
            job_description: "Rust Developer\nWe need one".to_string(),
            ..Default::default()
        });
        assert!(entry.id.starts_with("hist_"));
        assert_eq!(entry.title, "Rust Developer");
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
    }

    #[test]
    fn test_entry_tolerates_missing_optional_names() {
        let json = r#"{
            "id": "hist_1",
            "timestamp": "2024-01-01T00:00:00Z",
            "title": "t",
            "jobDescription": "jd",
            "resumes": [],
            "analysisResults": []
        }"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.jd_file_name, None);
        assert_eq!(entry.jd_preset_name, None);
    }
}
