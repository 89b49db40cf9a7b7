//! Remote session persistence: stored shapes, the server-side repository and
//! store API, and the client used by the orchestration layer.

pub mod api;
pub mod client;
pub mod models;
pub mod postgres;
pub mod repository;

pub use client::{SessionStore, SessionStoreClient, StoreError};
pub use models::{
    Pagination, SaveSessionRequest, SessionDetail, SessionPage, SessionStatistics, StoredSession,
};
pub use repository::{MemorySessionRepository, SessionRepository, SessionService};
