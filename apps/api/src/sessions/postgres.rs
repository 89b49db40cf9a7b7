use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::sessions::models::{AnalyzedResume, JdSource, JdSourceKind, StoredResume, StoredSession};
use crate::sessions::repository::{RepositoryError, SessionRepository};

/// Raw row from `search_sessions`.
#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    session_key: String,
    job_description: String,
    jd_source_type: String,
    jd_file_name: Option<String>,
    jd_preset_name: Option<String>,
    created_at: DateTime<Utc>,
    total_resumes: i32,
    analyzed_resumes: Json<Vec<AnalyzedResume>>,
}

impl From<SessionRow> for StoredSession {
    fn from(row: SessionRow) -> Self {
        let kind = JdSourceKind::parse(&row.jd_source_type).unwrap_or_else(|| {
            warn!("Session {} has unknown source type {:?}", row.id, row.jd_source_type);
            JdSourceKind::Text
        });
        StoredSession {
            id: row.id,
            session_key: row.session_key,
            job_description: row.job_description,
            job_description_source: JdSource {
                kind,
                file_name: row.jd_file_name,
                preset_name: row.jd_preset_name,
            },
            created_at: row.created_at,
            total_resumes: u32::try_from(row.total_resumes).unwrap_or(0),
            analyzed_resumes: row.analyzed_resumes.0,
        }
    }
}

/// PostgreSQL-backed sessions. Each trait call is its own statement; nothing
/// spans a transaction.
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn insert_resumes(&self, resumes: &[StoredResume]) -> Result<(), RepositoryError> {
        for resume in resumes {
            sqlx::query(
                r#"
                INSERT INTO resumes
                    (id, resume_id, file_name, raw_text, parsed_data, uploaded_at, search_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(resume.id)
            .bind(&resume.resume_id)
            .bind(&resume.file_name)
            .bind(&resume.raw_text)
            .bind(&resume.parsed_data)
            .bind(resume.uploaded_at)
            .bind(resume.search_id)
            .execute(&self.pool)
            .await?;
        }
        info!("Inserted {} resume records", resumes.len());
        Ok(())
    }

    async fn insert_session(&self, session: &StoredSession) -> Result<(), RepositoryError> {
        let source = &session.job_description_source;
        sqlx::query(
            r#"
            INSERT INTO search_sessions
                (id, session_key, job_description, jd_source_type, jd_file_name,
                 jd_preset_name, created_at, total_resumes, analyzed_resumes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.id)
        .bind(&session.session_key)
        .bind(&session.job_description)
        .bind(source.kind.as_str())
        .bind(&source.file_name)
        .bind(&source.preset_name)
        .bind(session.created_at)
        .bind(i32::try_from(session.total_resumes).unwrap_or(i32::MAX))
        .bind(Json(&session.analyzed_resumes))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn link_resumes(&self, session_id: Uuid, resume_ids: &[Uuid]) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE resumes SET search_id = $1 WHERE id = ANY($2)")
            .bind(session_id)
            .bind(resume_ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_sessions(&self, offset: u64, limit: u32) -> Result<Vec<StoredSession>, RepositoryError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, session_key, job_description, jd_source_type, jd_file_name,
                   jd_preset_name, created_at, total_resumes, analyzed_resumes
            FROM search_sessions
            ORDER BY created_at DESC
            OFFSET $1
            LIMIT $2
            "#,
        )
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(StoredSession::from).collect())
    }

    async fn count_sessions(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search_sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<StoredSession>, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, session_key, job_description, jd_source_type, jd_file_name,
                   jd_preset_name, created_at, total_resumes, analyzed_resumes
            FROM search_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(StoredSession::from))
    }

    async fn find_resumes(&self, ids: &[Uuid]) -> Result<Vec<StoredResume>, RepositoryError> {
        Ok(sqlx::query_as::<_, StoredResume>(
            r#"
            SELECT id, resume_id, file_name, raw_text, parsed_data, uploaded_at, search_id
            FROM resumes
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete_resumes(&self, ids: &[Uuid]) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM resumes WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM search_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::models::CandidateStatus;

    fn row(source_type: &str) -> SessionRow {
        SessionRow {
            id: Uuid::new_v4(),
            session_key: "session_1".into(),
            job_description: "Data Engineer".into(),
            jd_source_type: source_type.into(),
            jd_file_name: None,
            jd_preset_name: Some("Data Engineer".into()),
            created_at: Utc::now(),
            total_resumes: 1,
            analyzed_resumes: Json(vec![AnalyzedResume {
                resume_id: Uuid::new_v4(),
                candidate_name: "Ada".into(),
                match_score: 8,
                justification: "j".into(),
                extracted_skills: vec!["Spark".into()],
                extracted_experience_summary: "s".into(),
                status: CandidateStatus::Accepted,
            }]),
        }
    }

    #[test]
    fn test_row_maps_to_stored_session() {
        let session = StoredSession::from(row("preset"));
        assert_eq!(session.job_description_source.kind, JdSourceKind::Preset);
        assert_eq!(session.total_resumes, 1);
        assert_eq!(session.analyzed_resumes[0].candidate_name, "Ada");
    }

    #[test]
    fn test_unknown_source_type_reads_as_text() {
        let session = StoredSession::from(row("fax"));
        assert_eq!(session.job_description_source.kind, JdSourceKind::Text);
    }
}
