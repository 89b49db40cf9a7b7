use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{derive_title, Candidate, HistoryEntry, Resume};

/// Scores at or above this are stored as accepted.
pub const ACCEPT_THRESHOLD: u8 = 6;
const TOP_SKILLS: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// Wire request
// ────────────────────────────────────────────────────────────────────────────

/// Body of `saveSession`: one completed run in the client's shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSessionRequest {
    pub job_description: String,
    #[serde(default)]
    pub jd_file_name: Option<String>,
    #[serde(default)]
    pub jd_preset_name: Option<String>,
    pub resumes: Vec<Resume>,
    pub analysis_results: Vec<Candidate>,
}

// ────────────────────────────────────────────────────────────────────────────
// Stored shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Accepted,
    Rejected,
}

impl CandidateStatus {
    pub fn from_score(score: u8) -> Self {
        if score >= ACCEPT_THRESHOLD {
            CandidateStatus::Accepted
        } else {
            CandidateStatus::Rejected
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JdSourceKind {
    Text,
    File,
    Preset,
}

impl JdSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JdSourceKind::Text => "text",
            JdSourceKind::File => "file",
            JdSourceKind::Preset => "preset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(JdSourceKind::Text),
            "file" => Some(JdSourceKind::File),
            "preset" => Some(JdSourceKind::Preset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JdSource {
    #[serde(rename = "type")]
    pub kind: JdSourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_name: Option<String>,
}

impl JdSource {
    /// A file name wins over a preset name; neither means typed text.
    pub fn new(file_name: Option<String>, preset_name: Option<String>) -> Self {
        let kind = if file_name.is_some() {
            JdSourceKind::File
        } else if preset_name.is_some() {
            JdSourceKind::Preset
        } else {
            JdSourceKind::Text
        };
        Self {
            kind,
            file_name,
            preset_name,
        }
    }
}

/// One candidate as stored inside a session. `status` is frozen at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedResume {
    /// Stored resume record this evaluation belongs to.
    pub resume_id: Uuid,
    pub candidate_name: String,
    pub match_score: u8,
    pub justification: String,
    pub extracted_skills: Vec<String>,
    pub extracted_experience_summary: String,
    pub status: CandidateStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub id: Uuid,
    pub session_key: String,
    pub job_description: String,
    pub job_description_source: JdSource,
    pub created_at: DateTime<Utc>,
    pub total_resumes: u32,
    pub analyzed_resumes: Vec<AnalyzedResume>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoredResume {
    pub id: Uuid,
    /// The client-side resume id.
    pub resume_id: String,
    pub file_name: String,
    pub raw_text: String,
    pub parsed_data: Value,
    pub uploaded_at: DateTime<Utc>,
    pub search_id: Option<Uuid>,
}

/// Everything a save writes, built before the first write happens.
#[derive(Debug, Clone)]
pub struct SessionRecords {
    pub resumes: Vec<StoredResume>,
    pub session: StoredSession,
}

/// Translates a save request into stored records.
///
/// Fails with the offending id if an analysis result references no resume in the request.
pub fn build_records(request: &SaveSessionRequest, now: DateTime<Utc>) -> Result<SessionRecords, String> {
    let resumes: Vec<StoredResume> = request
        .resumes
        .iter()
        .map(|r| StoredResume {
            id: Uuid::new_v4(),
            resume_id: r.id.clone(),
            file_name: r.file_name.clone(),
            raw_text: r.text.clone(),
            parsed_data: Value::Object(Default::default()),
            uploaded_at: now,
            search_id: None,
        })
        .collect();

    let by_client_id: HashMap<&str, Uuid> = resumes
        .iter()
        .map(|r| (r.resume_id.as_str(), r.id))
        .collect();

    let analyzed_resumes = request
        .analysis_results
        .iter()
        .map(|c| -> Result<AnalyzedResume, String> {
            let resume_id = by_client_id
                .get(c.id.as_str())
                .copied()
                .ok_or_else(|| c.id.clone())?;
            Ok(AnalyzedResume {
                resume_id,
                candidate_name: c.name.clone(),
                match_score: c.match_score,
                justification: c.justification.clone(),
                extracted_skills: c.extracted_skills.clone(),
                extracted_experience_summary: c.extracted_experience_summary.clone(),
                status: CandidateStatus::from_score(c.match_score),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let session = StoredSession {
        id: Uuid::new_v4(),
        session_key: format!("session_{}", now.timestamp_millis()),
        job_description: request.job_description.clone(),
        job_description_source: JdSource::new(
            request.jd_file_name.clone(),
            request.jd_preset_name.clone(),
        ),
        created_at: now,
        total_resumes: request.resumes.len() as u32,
        analyzed_resumes,
    };

    Ok(SessionRecords { resumes, session })
}

// ────────────────────────────────────────────────────────────────────────────
// Read models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(u64::from(limit.max(1)));
        Self {
            page,
            limit,
            total_count,
            total_pages,
            has_next_page: u64::from(page) < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPage {
    pub sessions: Vec<StoredSession>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub session: StoredSession,
    pub resumes: Vec<StoredResume>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCount {
    pub skill: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatistics {
    pub total_resumes: u32,
    pub accepted_count: u32,
    pub rejected_count: u32,
    pub average_score: f64,
    pub top_skills: Vec<SkillCount>,
}

/// Summarizes a stored session. Counts use the stored status, not the current threshold.
pub fn compute_statistics(session: &StoredSession) -> SessionStatistics {
    let analyzed = &session.analyzed_resumes;
    let accepted_count = analyzed
        .iter()
        .filter(|r| r.status == CandidateStatus::Accepted)
        .count() as u32;
    let rejected_count = analyzed.len() as u32 - accepted_count;

    let average_score = if analyzed.is_empty() {
        0.0
    } else {
        analyzed.iter().map(|r| f64::from(r.match_score)).sum::<f64>() / analyzed.len() as f64
    };

    // First-seen order is kept so the stable sort breaks ties by it.
    let mut top_skills: Vec<SkillCount> = Vec::new();
    for skill in analyzed.iter().flat_map(|r| r.extracted_skills.iter()) {
        match top_skills.iter_mut().find(|s| &s.skill == skill) {
            Some(entry) => entry.count += 1,
            None => top_skills.push(SkillCount {
                skill: skill.clone(),
                count: 1,
            }),
        }
    }
    top_skills.sort_by(|a, b| b.count.cmp(&a.count));
    top_skills.truncate(TOP_SKILLS);

    SessionStatistics {
        total_resumes: session.total_resumes,
        accepted_count,
        rejected_count,
        average_score,
        top_skills,
    }
}

impl StoredSession {
    /// History view of a listed session. Resume text is not part of a listing, so
    /// resumes are id-only placeholders keyed by the stored resume id.
    pub fn to_history_entry(&self) -> HistoryEntry {
        let analysis_results = self
            .analyzed_resumes
            .iter()
            .map(|ar| candidate_from(ar, ar.resume_id.to_string()))
            .collect();
        let resumes = self
            .analyzed_resumes
            .iter()
            .map(|ar| Resume {
                id: ar.resume_id.to_string(),
                text: String::new(),
                file_name: String::new(),
            })
            .collect();
        self.history_entry(resumes, analysis_results)
    }

    fn history_entry(&self, resumes: Vec<Resume>, analysis_results: Vec<Candidate>) -> HistoryEntry {
        HistoryEntry {
            id: self.id.to_string(),
            timestamp: self.created_at.to_rfc3339(),
            title: derive_title(&self.job_description),
            job_description: self.job_description.clone(),
            jd_file_name: self.job_description_source.file_name.clone(),
            jd_preset_name: self.job_description_source.preset_name.clone(),
            resumes,
            analysis_results,
        }
    }
}

impl SessionDetail {
    /// Full history view with the original client ids and resume text restored.
    /// Candidates whose resume record is gone fall back to the stored resume id.
    pub fn to_history_entry(&self) -> HistoryEntry {
        let by_id: HashMap<Uuid, &StoredResume> =
            self.resumes.iter().map(|r| (r.id, r)).collect();

        let analysis_results = self
            .session
            .analyzed_resumes
            .iter()
            .map(|ar| {
                let id = by_id
                    .get(&ar.resume_id)
                    .map(|r| r.resume_id.clone())
                    .unwrap_or_else(|| ar.resume_id.to_string());
                candidate_from(ar, id)
            })
            .collect();

        let resumes = self
            .session
            .analyzed_resumes
            .iter()
            .filter_map(|ar| by_id.get(&ar.resume_id))
            .map(|r| Resume {
                id: r.resume_id.clone(),
                text: r.raw_text.clone(),
                file_name: r.file_name.clone(),
            })
            .collect();

        self.session.history_entry(resumes, analysis_results)
    }
}

fn candidate_from(ar: &AnalyzedResume, id: String) -> Candidate {
    Candidate {
        id,
        name: ar.candidate_name.clone(),
        match_score: ar.match_score,
        justification: ar.justification.clone(),
        extracted_skills: ar.extracted_skills.clone(),
        extracted_experience_summary: ar.extracted_experience_summary.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, score: u8, skills: &[&str]) -> Candidate {
        Candidate {
            id: id.to_string(),
            name: format!("Name {id}"),
            match_score: score,
            justification: "because".to_string(),
            extracted_skills: skills.iter().map(|s| s.to_string()).collect(),
            extracted_experience_summary: "summary".to_string(),
        }
    }

    fn resume(id: &str) -> Resume {
        Resume {
            id: id.to_string(),
            text: format!("text {id}"),
            file_name: format!("{id}.pdf"),
        }
    }

    fn request(results: Vec<Candidate>) -> SaveSessionRequest {
        SaveSessionRequest {
            job_description: "\nStaff Engineer\nRust".to_string(),
            jd_file_name: None,
            jd_preset_name: Some("Backend".to_string()),
            resumes: vec![resume("r1"), resume("r2")],
            analysis_results: results,
        }
    }

    #[test]
    fn test_status_threshold() {
        assert_eq!(CandidateStatus::from_score(6), CandidateStatus::Accepted);
        assert_eq!(CandidateStatus::from_score(5), CandidateStatus::Rejected);
        assert_eq!(CandidateStatus::from_score(10), CandidateStatus::Accepted);
        assert_eq!(CandidateStatus::from_score(1), CandidateStatus::Rejected);
    }

    #[test]
    fn test_jd_source_kind_precedence() {
        assert_eq!(JdSource::new(Some("jd.pdf".into()), Some("p".into())).kind, JdSourceKind::File);
        assert_eq!(JdSource::new(None, Some("p".into())).kind, JdSourceKind::Preset);
        assert_eq!(JdSource::new(None, None).kind, JdSourceKind::Text);
    }

    #[test]
    fn test_build_records_links_candidates_to_stored_resumes() {
        let now = Utc::now();
        let records = build_records(
            &request(vec![candidate("r1", 6, &[]), candidate("r2", 5, &[])]),
            now,
        )
        .unwrap();

        assert_eq!(records.resumes.len(), 2);
        assert!(records.resumes.iter().all(|r| r.search_id.is_none()));
        assert_eq!(records.session.total_resumes, 2);
        assert_eq!(records.session.job_description_source.kind, JdSourceKind::Preset);
        assert_eq!(records.session.session_key, format!("session_{}", now.timestamp_millis()));

        let first = &records.session.analyzed_resumes[0];
        assert_eq!(first.resume_id, records.resumes[0].id);
        assert_eq!(first.status, CandidateStatus::Accepted);
        assert_eq!(records.session.analyzed_resumes[1].status, CandidateStatus::Rejected);
    }

    #[test]
    fn test_build_records_rejects_unknown_candidate_id() {
        let err = build_records(&request(vec![candidate("ghost", 7, &[])]), Utc::now()).unwrap_err();
        assert_eq!(err, "ghost");
    }

    #[test]
    fn test_pagination_middle_page() {
        let p = Pagination::new(2, 5, 12);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next_page);
        assert!(p.has_prev_page);
    }

    #[test]
    fn test_pagination_edges() {
        let last = Pagination::new(3, 5, 12);
        assert!(!last.has_next_page);
        assert!(last.has_prev_page);

        let empty = Pagination::new(1, 5, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_prev_page);

        let exact = Pagination::new(1, 5, 10);
        assert_eq!(exact.total_pages, 2);
    }

    #[test]
    fn test_pagination_serializes_camel_case() {
        let json = serde_json::to_value(Pagination::new(2, 5, 12)).unwrap();
        assert_eq!(json["hasNextPage"], true);
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["totalCount"], 12);
    }

    #[test]
    fn test_statistics_counts_and_top_skills() {
        let records = build_records(
            &request(vec![
                candidate("r1", 8, &["Go", "Rust", "SQL"]),
                candidate("r2", 3, &["Rust", "Docker", "Go"]),
            ]),
            Utc::now(),
        )
        .unwrap();
        let stats = compute_statistics(&records.session);

        assert_eq!(stats.total_resumes, 2);
        assert_eq!(stats.accepted_count, 1);
        assert_eq!(stats.rejected_count, 1);
        assert!((stats.average_score - 5.5).abs() < f64::EPSILON);

        let skills: Vec<(&str, u32)> = stats
            .top_skills
            .iter()
            .map(|s| (s.skill.as_str(), s.count))
            .collect();
        // Go and Rust tie at 2; Go was seen first.
        assert_eq!(skills, vec![("Go", 2), ("Rust", 2), ("SQL", 1), ("Docker", 1)]);
    }

    #[test]
    fn test_statistics_use_frozen_status() {
        let mut records = build_records(&request(vec![candidate("r1", 9, &[])]), Utc::now()).unwrap();
        // A later threshold change must not reclassify stored rows.
        records.session.analyzed_resumes[0].status = CandidateStatus::Rejected;
        let stats = compute_statistics(&records.session);
        assert_eq!(stats.accepted_count, 0);
        assert_eq!(stats.rejected_count, 1);
    }

    #[test]
    fn test_statistics_top_skills_capped_at_ten() {
        let skills: Vec<String> = (0..15).map(|i| format!("skill-{i}")).collect();
        let skill_refs: Vec<&str> = skills.iter().map(String::as_str).collect();
        let records = build_records(&request(vec![candidate("r1", 7, &skill_refs)]), Utc::now()).unwrap();
        let stats = compute_statistics(&records.session);
        assert_eq!(stats.top_skills.len(), 10);
        assert_eq!(stats.top_skills[0].skill, "skill-0");
    }

    #[test]
    fn test_statistics_of_empty_session() {
        let records = build_records(
            &SaveSessionRequest {
                resumes: vec![],
                ..request(vec![])
            },
            Utc::now(),
        )
        .unwrap();
        let stats = compute_statistics(&records.session);
        assert_eq!(stats.average_score, 0.0);
        assert!(stats.top_skills.is_empty());
    }

    #[test]
    fn test_listing_history_entry_uses_placeholders() {
        let records = build_records(&request(vec![candidate("r2", 7, &["Rust"])]), Utc::now()).unwrap();
        let entry = records.session.to_history_entry();

        assert_eq!(entry.id, records.session.id.to_string());
        assert_eq!(entry.title, "Staff Engineer");
        assert_eq!(entry.jd_preset_name.as_deref(), Some("Backend"));
        assert_eq!(entry.analysis_results[0].id, records.resumes[1].id.to_string());
        assert_eq!(entry.resumes[0].id, entry.analysis_results[0].id);
        assert!(entry.resumes[0].text.is_empty());
    }

    #[test]
    fn test_detail_history_entry_restores_client_ids() {
        let records = build_records(
            &request(vec![candidate("r1", 7, &[]), candidate("r2", 4, &[])]),
            Utc::now(),
        )
        .unwrap();
        let detail = SessionDetail {
            session: records.session.clone(),
            resumes: records.resumes.clone(),
        };
        let entry = detail.to_history_entry();

        let ids: Vec<&str> = entry.analysis_results.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
        assert_eq!(entry.resumes[1].text, "text r2");
        assert_eq!(entry.resumes[1].file_name, "r2.pdf");
    }
}
