use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::sessions::models::SaveSessionRequest;
use crate::sessions::repository::{RepositoryError, SessionService, DEFAULT_PAGE_SIZE};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    pub action: Option<String>,
    pub session_id: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Failure body of the store API: `{ "success": false, "error": "..." }`.
#[derive(Debug)]
pub struct StoreApiError {
    status: StatusCode,
    message: String,
}

impl StoreApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<RepositoryError> for StoreApiError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Validation(msg) => Self::bad_request(msg),
            RepositoryError::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: "Session not found".to_string(),
            },
            RepositoryError::Database(e) => {
                error!("Session store database error: {e}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "A database error occurred".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for StoreApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}

/// /api/sessions?action=...
///
/// The action and the HTTP method must both match; anything else is `Invalid action`.
pub async fn handle_sessions(
    State(service): State<SessionService>,
    method: Method,
    Query(query): Query<SessionQuery>,
    body: Bytes,
) -> Result<Response, StoreApiError> {
    let action = query.action.as_deref().unwrap_or_default();

    let body = match (action, method.as_str()) {
        ("saveSession", "POST") => {
            let request: SaveSessionRequest = serde_json::from_slice(&body)
                .map_err(|e| StoreApiError::bad_request(format!("Invalid session payload: {e}")))?;
            let session_id = service.save(&request).await?;
            json!({ "success": true, "sessionId": session_id })
        }
        ("getSessions", "GET") => {
            let page = parse_number(query.page.as_deref()).unwrap_or(1);
            let limit = parse_number(query.limit.as_deref()).unwrap_or(i64::from(DEFAULT_PAGE_SIZE));
            let page = service.list(to_u32(page), to_u32(limit)).await?;
            json!({ "success": true, "sessions": page.sessions, "pagination": page.pagination })
        }
        ("getSession", "GET") => {
            let detail = service.get(require_session_id(&query)?).await?;
            json!({ "success": true, "session": detail.session, "resumes": detail.resumes })
        }
        ("deleteSession", "DELETE") => {
            service.delete(require_session_id(&query)?).await?;
            json!({ "success": true })
        }
        ("getStats", "GET") => {
            let stats = service.statistics(require_session_id(&query)?).await?;
            json!({ "success": true, "stats": stats })
        }
        _ => return Err(StoreApiError::bad_request("Invalid action")),
    };

    Ok(Json(body).into_response())
}

fn require_session_id(query: &SessionQuery) -> Result<&str, StoreApiError> {
    query
        .session_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| StoreApiError::bad_request("sessionId is required"))
}

/// Lenient numeric query parameter: anything unparseable falls back to the default.
fn parse_number(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

/// Negative and zero values become 0; the service normalizes from there.
fn to_u32(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}
