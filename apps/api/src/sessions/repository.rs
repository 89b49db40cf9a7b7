//! Session persistence: the repository seam, its in-process backend, and the
//! service that composes repository calls into the store's operations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::sessions::models::{
    build_records, compute_statistics, Pagination, SaveSessionRequest, SessionDetail, SessionPage,
    SessionStatistics, StoredResume, StoredSession,
};

pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Primitive document operations. Each call is one independent write or read;
/// nothing here is transactional across calls.
///
/// Carried in `AppState` as `Arc<dyn SessionRepository>` (through [`SessionService`]).
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_resumes(&self, resumes: &[StoredResume]) -> Result<(), RepositoryError>;
    async fn insert_session(&self, session: &StoredSession) -> Result<(), RepositoryError>;
    /// Back-fills `search_id` on the given resume records.
    async fn link_resumes(&self, session_id: Uuid, resume_ids: &[Uuid]) -> Result<(), RepositoryError>;
    /// Newest first.
    async fn list_sessions(&self, offset: u64, limit: u32) -> Result<Vec<StoredSession>, RepositoryError>;
    async fn count_sessions(&self) -> Result<u64, RepositoryError>;
    async fn find_session(&self, id: Uuid) -> Result<Option<StoredSession>, RepositoryError>;
    async fn find_resumes(&self, ids: &[Uuid]) -> Result<Vec<StoredResume>, RepositoryError>;
    async fn delete_resumes(&self, ids: &[Uuid]) -> Result<(), RepositoryError>;
    async fn delete_session(&self, id: Uuid) -> Result<(), RepositoryError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Service
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct SessionService {
    repo: Arc<dyn SessionRepository>,
}

impl SessionService {
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self { repo }
    }

    /// Three-step write: resumes, then the session, then the resume back-references.
    ///
    /// A failure after step one leaves orphaned resume records behind. They are not
    /// cleaned up and the save is not retried.
    pub async fn save(&self, request: &SaveSessionRequest) -> Result<Uuid, RepositoryError> {
        let records = build_records(request, Utc::now()).map_err(|id| {
            RepositoryError::Validation(format!("Resume ID {id} not found in request resumes"))
        })?;
        let session_id = records.session.id;
        let resume_ids: Vec<Uuid> = records.resumes.iter().map(|r| r.id).collect();

        self.repo.insert_resumes(&records.resumes).await?;
        self.repo.insert_session(&records.session).await?;
        self.repo.link_resumes(session_id, &resume_ids).await?;

        info!(
            "Saved session {session_id} ({}) with {} resumes",
            records.session.session_key,
            resume_ids.len()
        );
        Ok(session_id)
    }

    pub async fn list(&self, page: u32, limit: u32) -> Result<SessionPage, RepositoryError> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = u64::from(page - 1) * u64::from(limit);

        let total_count = self.repo.count_sessions().await?;
        let sessions = self.repo.list_sessions(offset, limit).await?;

        Ok(SessionPage {
            sessions,
            pagination: Pagination::new(page, limit, total_count),
        })
    }

    pub async fn get(&self, id: &str) -> Result<SessionDetail, RepositoryError> {
        let session = self.find(id).await?;
        let resume_ids: Vec<Uuid> = session.analyzed_resumes.iter().map(|ar| ar.resume_id).collect();
        let resumes = self.repo.find_resumes(&resume_ids).await?;
        Ok(SessionDetail { session, resumes })
    }

    /// Cascading delete. Unknown or malformed ids succeed without doing anything.
    pub async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let session = match self.find(id).await {
            Ok(session) => session,
            Err(RepositoryError::NotFound(_)) => {
                info!("Delete of absent session {id} ignored");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let resume_ids: Vec<Uuid> = session.analyzed_resumes.iter().map(|ar| ar.resume_id).collect();
        self.repo.delete_resumes(&resume_ids).await?;
        self.repo.delete_session(session.id).await?;
        info!("Deleted session {} and {} resumes", session.id, resume_ids.len());
        Ok(())
    }

    pub async fn statistics(&self, id: &str) -> Result<SessionStatistics, RepositoryError> {
        let session = self.find(id).await?;
        Ok(compute_statistics(&session))
    }

    async fn find(&self, id: &str) -> Result<StoredSession, RepositoryError> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            warn!("Malformed session id {id:?}");
            return Err(RepositoryError::NotFound(id.to_string()));
        };
        self.repo
            .find_session(uuid)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-process backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryState {
    sessions: Vec<StoredSession>,
    resumes: Vec<StoredResume>,
}

/// Keeps sessions in process memory. Used when no `DATABASE_URL` is configured;
/// everything is lost on restart.
#[derive(Default)]
pub struct MemorySessionRepository {
    state: RwLock<MemoryState>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resume_count(&self) -> usize {
        self.state.read().await.resumes.len()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn insert_resumes(&self, resumes: &[StoredResume]) -> Result<(), RepositoryError> {
        self.state.write().await.resumes.extend_from_slice(resumes);
        Ok(())
    }

    async fn insert_session(&self, session: &StoredSession) -> Result<(), RepositoryError> {
        self.state.write().await.sessions.push(session.clone());
        Ok(())
    }

    async fn link_resumes(&self, session_id: Uuid, resume_ids: &[Uuid]) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        for resume in state.resumes.iter_mut().filter(|r| resume_ids.contains(&r.id)) {
            resume.search_id = Some(session_id);
        }
        Ok(())
    }

    async fn list_sessions(&self, offset: u64, limit: u32) -> Result<Vec<StoredSession>, RepositoryError> {
        let state = self.state.read().await;
        // Reverse insertion order first so equal timestamps still list newest first.
        let mut sessions: Vec<StoredSession> = state.sessions.iter().rev().cloned().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_sessions(&self) -> Result<u64, RepositoryError> {
        Ok(self.state.read().await.sessions.len() as u64)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<StoredSession>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn find_resumes(&self, ids: &[Uuid]) -> Result<Vec<StoredResume>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .resumes
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn delete_resumes(&self, ids: &[Uuid]) -> Result<(), RepositoryError> {
        self.state.write().await.resumes.retain(|r| !ids.contains(&r.id));
        Ok(())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.state.write().await.sessions.retain(|s| s.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, Resume};

    fn request(n: usize) -> SaveSessionRequest {
        let resumes: Vec<Resume> = (0..n)
            .map(|i| Resume {
                id: format!("r{i}"),
                text: format!("resume {i}"),
                file_name: format!("r{i}.txt"),
            })
            .collect();
        let analysis_results = resumes
            .iter()
            .enumerate()
            .map(|(i, r)| Candidate {
                id: r.id.clone(),
                name: format!("Candidate {i}"),
                match_score: (i % 10 + 1) as u8,
                justification: "j".into(),
                extracted_skills: vec!["Rust".into()],
                extracted_experience_summary: "s".into(),
            })
            .collect();
        SaveSessionRequest {
            job_description: "Platform Engineer".into(),
            jd_file_name: Some("jd.pdf".into()),
            jd_preset_name: None,
            resumes,
            analysis_results,
        }
    }

    fn service() -> (SessionService, Arc<MemorySessionRepository>) {
        let repo = Arc::new(MemorySessionRepository::new());
        (SessionService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_save_links_resumes_to_session() {
        let (service, _) = service();
        let id = service.save(&request(2)).await.unwrap();

        let detail = service.get(&id.to_string()).await.unwrap();
        assert_eq!(detail.session.id, id);
        assert_eq!(detail.resumes.len(), 2);
        assert!(detail.resumes.iter().all(|r| r.search_id == Some(id)));
    }

    #[tokio::test]
    async fn test_save_with_unknown_candidate_writes_nothing() {
        let (service, repo) = service();
        let mut req = request(1);
        req.analysis_results[0].id = "ghost".into();

        let err = service.save(&req).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
        assert_eq!(repo.resume_count().await, 0);
        assert_eq!(repo.count_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_unknown_and_malformed_ids_are_not_found() {
        let (service, _) = service();
        let err = service.get(&Uuid::new_v4().to_string()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
        let err = service.get("not-a-uuid").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_and_is_idempotent() {
        let (service, repo) = service();
        let keep = service.save(&request(1)).await.unwrap();
        let id = service.save(&request(3)).await.unwrap().to_string();
        assert_eq!(repo.resume_count().await, 4);

        service.delete(&id).await.unwrap();
        service.delete(&id).await.unwrap();
        service.delete("garbage").await.unwrap();

        assert_eq!(repo.resume_count().await, 1);
        assert!(matches!(service.get(&id).await, Err(RepositoryError::NotFound(_))));
        assert!(service.get(&keep.to_string()).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_pages_newest_first() {
        let (service, _) = service();
        let mut ids = Vec::new();
        for _ in 0..12 {
            ids.push(service.save(&request(1)).await.unwrap());
        }

        let page = service.list(2, 5).await.unwrap();
        assert_eq!(page.pagination, Pagination::new(2, 5, 12));
        assert!(page.pagination.has_next_page);
        assert!(page.pagination.has_prev_page);
        assert_eq!(page.pagination.total_pages, 3);

        let listed: Vec<Uuid> = page.sessions.iter().map(|s| s.id).collect();
        let expected: Vec<Uuid> = ids.iter().rev().skip(5).take(5).copied().collect();
        assert_eq!(listed, expected);

        let last = service.list(3, 5).await.unwrap();
        assert_eq!(last.sessions.len(), 2);
    }

    #[tokio::test]
    async fn test_list_normalizes_page_and_limit() {
        let (service, _) = service();
        service.save(&request(1)).await.unwrap();

        let page = service.list(0, 500).await.unwrap();
        assert_eq!(page.pagination.page, 1);
        assert_eq!(page.pagination.limit, MAX_PAGE_SIZE);
        assert_eq!(page.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_statistics_for_saved_session() {
        let (service, _) = service();
        // scores 1..=7
        let id = service.save(&request(7)).await.unwrap().to_string();
        let stats = service.statistics(&id).await.unwrap();

        assert_eq!(stats.total_resumes, 7);
        assert_eq!(stats.accepted_count, 2);
        assert_eq!(stats.rejected_count, 5);
        assert!((stats.average_score - 4.0).abs() < f64::EPSILON);
        assert_eq!(stats.top_skills[0].skill, "Rust");
        assert_eq!(stats.top_skills[0].count, 7);
    }

    /// Fails the session insert so the partial-write behaviour can be observed.
    struct FailingSessionInsert(MemorySessionRepository);

    #[async_trait]
    impl SessionRepository for FailingSessionInsert {
        async fn insert_resumes(&self, resumes: &[StoredResume]) -> Result<(), RepositoryError> {
            self.0.insert_resumes(resumes).await
        }
        async fn insert_session(&self, _session: &StoredSession) -> Result<(), RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn link_resumes(&self, session_id: Uuid, ids: &[Uuid]) -> Result<(), RepositoryError> {
            self.0.link_resumes(session_id, ids).await
        }
        async fn list_sessions(&self, offset: u64, limit: u32) -> Result<Vec<StoredSession>, RepositoryError> {
            self.0.list_sessions(offset, limit).await
        }
        async fn count_sessions(&self) -> Result<u64, RepositoryError> {
            self.0.count_sessions().await
        }
        async fn find_session(&self, id: Uuid) -> Result<Option<StoredSession>, RepositoryError> {
            self.0.find_session(id).await
        }
        async fn find_resumes(&self, ids: &[Uuid]) -> Result<Vec<StoredResume>, RepositoryError> {
            self.0.find_resumes(ids).await
        }
        async fn delete_resumes(&self, ids: &[Uuid]) -> Result<(), RepositoryError> {
            self.0.delete_resumes(ids).await
        }
        async fn delete_session(&self, id: Uuid) -> Result<(), RepositoryError> {
            self.0.delete_session(id).await
        }
    }

    #[tokio::test]
    async fn test_failed_session_insert_leaves_orphaned_resumes() {
        let repo = Arc::new(FailingSessionInsert(MemorySessionRepository::new()));
        let service = SessionService::new(repo.clone());

        let err = service.save(&request(2)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Database(_)));
        assert_eq!(repo.0.resume_count().await, 2);
        assert_eq!(repo.0.count_sessions().await.unwrap(), 0);
    }
}
