pub mod builder;
pub mod history;
pub mod resume;

pub use builder::{Education, ResumeBuilderData, WorkExperience};
pub use history::{derive_title, AnalysisSnapshot, HistoryEntry};
pub use resume::{new_resume_id, sort_by_score, Candidate, ConsultantMessage, Resume, Role};
