//! Screening orchestration. Owns the working inputs and the current analysis, and
//! sequences the prompt builder, gateway, parser, local history and remote store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ClientConfig;
use crate::gateway::{GatewayError, ModelBackend, ModelGateway, ModelOutput};
use crate::history::HistoryCache;
use crate::ingest::{parse_file, parse_files, IngestError, UploadedFile};
use crate::models::{
    new_resume_id, sort_by_score, AnalysisSnapshot, Candidate, ConsultantMessage, HistoryEntry,
    Resume, ResumeBuilderData,
};
use crate::presets::PresetRole;
use crate::prompts::{
    build_consultant_prompt, build_resume_generation_prompt, build_resume_question_prompt,
    build_scoring_prompt, Prompt,
};
use crate::scoring::{parse_scoring_output, ParseError};
use crate::sessions::{Pagination, SaveSessionRequest, SessionStore, SessionStoreClient, StoreError};

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("A job description and at least one resume are required")]
    InputValidation,

    #[error("Another analysis or file parse is in progress")]
    Busy,

    #[error("No resume with id {0} in the current analysis")]
    UnknownResume(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScreenError {
    /// Text shown to the user. Gateway and parse details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ScreenError::InputValidation => {
                "Please provide a job description and at least one resume.".to_string()
            }
            ScreenError::Busy => {
                "Please wait for the current analysis or file upload to finish.".to_string()
            }
            ScreenError::UnknownResume(_) => {
                "That resume is not part of the current analysis.".to_string()
            }
            ScreenError::Ingest(e) => e.to_string(),
            ScreenError::Gateway(_) => "An error occurred while analyzing the resumes. Please check your API key and try again.".to_string(),
            ScreenError::Parse(_) => "Could not parse the analysis from the AI model. The response was not valid JSON.".to_string(),
            ScreenError::Store(StoreError::Api { message, .. } | StoreError::NotFound(message)) => {
                message.clone()
            }
            ScreenError::Store(e) => e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Inputs are incomplete.
    Idle,
    /// At least one file is being parsed.
    Parsing,
    /// Inputs are sufficient for an analysis.
    Ready,
    Analyzing,
}

/// Everything the user sees, apart from the history list.
#[derive(Debug, Clone, Default)]
pub struct ScreenerState {
    pub job_description: String,
    pub jd_file_name: Option<String>,
    pub jd_preset_name: Option<String>,
    pub resumes: Vec<Resume>,
    /// Results and the inputs that produced them.
    pub current: Option<AnalysisSnapshot>,
    pub error: Option<String>,
    pub consultant_log: Vec<ConsultantMessage>,
    /// Busy flags as of the snapshot.
    parsing: usize,
    analyzing: bool,
}

impl ScreenerState {
    pub fn phase(&self) -> Phase {
        if self.analyzing {
            Phase::Analyzing
        } else if self.parsing > 0 {
            Phase::Parsing
        } else if self.has_inputs() {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }

    fn has_inputs(&self) -> bool {
        !self.job_description.trim().is_empty() && !self.resumes.is_empty()
    }

    fn clear_inputs(&mut self) {
        self.job_description.clear();
        self.jd_file_name = None;
        self.jd_preset_name = None;
        self.resumes.clear();
    }
}

/// Clears the analyzing flag when dropped, including when the caller abandons
/// the analysis future.
struct AnalyzingGuard<'a>(&'a AtomicBool);

impl Drop for AnalyzingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One in-flight file parse.
struct ParsingGuard<'a>(&'a AtomicUsize);

impl Drop for ParsingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// What a successful [`Screener::analyze`] hands back.
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// Sorted by match score, highest first.
    pub candidates: Vec<Candidate>,
    /// The local history entry, if the cache write succeeded.
    pub history_entry: Option<HistoryEntry>,
    /// Background save to the session store. Dropping it does not cancel the save.
    pub remote_save: JoinHandle<()>,
}

pub struct Screener {
    backend: Arc<dyn ModelBackend>,
    store: Arc<dyn SessionStore>,
    history: Mutex<HistoryCache>,
    state: Mutex<ScreenerState>,
    // Kept outside `state` so guards can reset them without the async lock.
    analyzing: AtomicBool,
    parsing: AtomicUsize,
}

impl Screener {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        store: Arc<dyn SessionStore>,
        history: HistoryCache,
    ) -> Self {
        Self {
            backend,
            store,
            history: Mutex::new(history),
            state: Mutex::new(ScreenerState::default()),
            analyzing: AtomicBool::new(false),
            parsing: AtomicUsize::new(0),
        }
    }

    /// Wires the production gateway, store client and history cache from `config`.
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let gateway = ModelGateway::new(config.gateway_route(), config.request_timeout)
            .context("Failed to build model gateway")?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build session store client")?;
        let store = SessionStoreClient::new(http, config.session_store_url.clone());
        let history = HistoryCache::open(&config.history_dir)
            .with_context(|| format!("Failed to open history in {}", config.history_dir.display()))?;
        Ok(Self::new(Arc::new(gateway), Arc::new(store), history))
    }

    pub async fn state(&self) -> ScreenerState {
        let mut snapshot = self.state.lock().await.clone();
        snapshot.analyzing = self.analyzing.load(Ordering::Acquire);
        snapshot.parsing = self.parsing.load(Ordering::Acquire);
        snapshot
    }

    pub async fn phase(&self) -> Phase {
        self.state().await.phase()
    }

    // ── Analysis ────────────────────────────────────────────────────────────

    pub async fn analyze(&self) -> Result<AnalysisOutcome, ScreenError> {
        let (guard, job_description, jd_file_name, jd_preset_name, resumes) = {
            let mut state = self.state.lock().await;
            if self.analyzing.load(Ordering::Acquire) || self.parsing.load(Ordering::Acquire) > 0 {
                return Err(ScreenError::Busy);
            }
            if !state.has_inputs() {
                let err = ScreenError::InputValidation;
                state.error = Some(err.user_message());
                return Err(err);
            }
            self.analyzing.store(true, Ordering::Release);
            state.error = None;
            state.current = None;
            (
                AnalyzingGuard(&self.analyzing),
                state.job_description.clone(),
                state.jd_file_name.clone(),
                state.jd_preset_name.clone(),
                state.resumes.clone(),
            )
        };

        info!("Screening {} resumes", resumes.len());
        let result = self.score(&job_description, &resumes).await;

        let mut candidates = match result {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("Analysis failed: {e}");
                let mut state = self.state.lock().await;
                state.error = Some(e.user_message());
                drop(guard);
                return Err(e);
            }
        };
        sort_by_score(&mut candidates);

        let snapshot = AnalysisSnapshot {
            job_description,
            jd_file_name,
            jd_preset_name,
            resumes,
            analysis_results: candidates.clone(),
        };

        let history_entry = match self.history.lock().await.add_entry(snapshot.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Analysis kept without a local history entry: {e}");
                None
            }
        };

        let remote_save = self.spawn_remote_save(SaveSessionRequest {
            job_description: snapshot.job_description.clone(),
            jd_file_name: snapshot.jd_file_name.clone(),
            jd_preset_name: snapshot.jd_preset_name.clone(),
            resumes: snapshot.resumes.clone(),
            analysis_results: snapshot.analysis_results.clone(),
        });

        {
            let mut state = self.state.lock().await;
            state.clear_inputs();
            state.current = Some(snapshot);
            drop(guard);
        }

        Ok(AnalysisOutcome {
            candidates,
            history_entry,
            remote_save,
        })
    }

    async fn score(&self, job_description: &str, resumes: &[Resume]) -> Result<Vec<Candidate>, ScreenError> {
        let prompt = build_scoring_prompt(job_description, resumes);
        match self.backend.call_model(&prompt.to_payload(), false).await? {
            ModelOutput::Json(raw) => Ok(parse_scoring_output(&raw, resumes)?),
            ModelOutput::Text(_) => Err(ParseError::MissingContent.into()),
        }
    }

    fn spawn_remote_save(&self, request: SaveSessionRequest) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match store.save_session(&request).await {
                Ok(id) => info!("Session saved to the store as {id}"),
                Err(e) => error!("Failed to save session to the store; local history kept: {e}"),
            }
        })
    }

    /// Shows a past result again without calling the model.
    pub async fn load_history_entry(&self, entry: &HistoryEntry) {
        let mut state = self.state.lock().await;
        state.current = Some(entry.snapshot());
        state.error = None;
    }

    // ── Input editing ───────────────────────────────────────────────────────

    pub async fn set_job_description(&self, text: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.job_description = text.into();
        state.jd_file_name = None;
        state.jd_preset_name = None;
        state.current = None;
    }

    pub async fn select_preset(&self, preset: &PresetRole) {
        let mut state = self.state.lock().await;
        state.job_description = preset.description.to_string();
        state.jd_preset_name = Some(preset.title.to_string());
        state.jd_file_name = None;
        state.current = None;
    }

    pub async fn load_job_description_file(&self, file: &UploadedFile) -> Result<(), ScreenError> {
        let guard = self.begin_parse(true).await;
        let result = parse_file(file).await;

        let mut state = self.state.lock().await;
        drop(guard);
        match result {
            Ok(text) => {
                state.job_description = text;
                state.jd_file_name = Some(file.name.clone());
                Ok(())
            }
            Err(e) => {
                state.jd_file_name = None;
                state.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Adds a typed resume. Blank text is ignored and yields `None`.
    pub async fn add_pasted_resume(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let mut state = self.state.lock().await;
        let file_name = format!("Pasted Resume {}", state.resumes.len() + 1);
        let resume = Resume {
            id: new_resume_id(),
            text: text.to_string(),
            file_name,
        };
        let id = resume.id.clone();
        state.resumes.push(resume);
        state.current = None;
        Some(id)
    }

    /// Parses every file concurrently; nothing is added unless all succeed.
    /// Files with no extractable text are skipped. Returns how many were added.
    pub async fn add_resume_files(&self, files: &[UploadedFile]) -> Result<usize, ScreenError> {
        let guard = self.begin_parse(false).await;
        let result = parse_files(files).await;

        let mut state = self.state.lock().await;
        drop(guard);
        match result {
            Ok(texts) => {
                let added: Vec<Resume> = files
                    .iter()
                    .zip(texts)
                    .filter(|(_, text)| !text.trim().is_empty())
                    .map(|(file, text)| Resume::new(text, file.name.clone()))
                    .collect();
                let count = added.len();
                state.resumes.extend(added);
                Ok(count)
            }
            Err(e) => {
                state.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    pub async fn remove_resume(&self, id: &str) {
        let mut state = self.state.lock().await;
        state.resumes.retain(|r| r.id != id);
        state.current = None;
    }

    async fn begin_parse(&self, job_description: bool) -> ParsingGuard<'_> {
        let mut state = self.state.lock().await;
        self.parsing.fetch_add(1, Ordering::AcqRel);
        state.error = None;
        state.current = None;
        if job_description {
            state.jd_preset_name = None;
        }
        ParsingGuard(&self.parsing)
    }

    // ── Follow-ups ──────────────────────────────────────────────────────────

    /// Free-text answer about one resume of the current analysis.
    pub async fn ask_about_resume(&self, candidate_id: &str, question: &str) -> Result<String, ScreenError> {
        let prompt = {
            let state = self.state.lock().await;
            let current = state
                .current
                .as_ref()
                .ok_or_else(|| ScreenError::UnknownResume(candidate_id.to_string()))?;
            let resume = current
                .resumes
                .iter()
                .find(|r| r.id == candidate_id)
                .ok_or_else(|| ScreenError::UnknownResume(candidate_id.to_string()))?;
            build_resume_question_prompt(&resume.text, question, &current.job_description)
        };
        self.stream_text(&prompt).await
    }

    /// Sends one message to the consultant. The user message is only kept if an
    /// answer comes back.
    pub async fn ask_consultant(&self, message: &str) -> Result<String, ScreenError> {
        let sent = ConsultantMessage::user(message);
        let prompt = {
            let mut state = self.state.lock().await;
            state.consultant_log.push(sent.clone());
            let file_names: Vec<String> = state.resumes.iter().map(|r| r.file_name.clone()).collect();
            build_consultant_prompt(&state.job_description, &file_names, &state.consultant_log)
        };

        let result = self.stream_text(&prompt).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(answer) => {
                state.consultant_log.push(ConsultantMessage::assistant(answer.clone()));
                Ok(answer)
            }
            Err(e) => {
                // Other calls may have appended since; drop only this call's message.
                if let Some(pos) = state.consultant_log.iter().rposition(|m| *m == sent) {
                    state.consultant_log.remove(pos);
                }
                Err(e)
            }
        }
    }

    pub async fn generate_resume(&self, details: &ResumeBuilderData) -> Result<String, ScreenError> {
        self.stream_text(&build_resume_generation_prompt(details)).await
    }

    async fn stream_text(&self, prompt: &Prompt) -> Result<String, ScreenError> {
        let output = self
            .backend
            .call_model(&prompt.to_payload(), prompt.streaming())
            .await
            .map_err(|e| {
                error!("Follow-up model call failed: {e}");
                e
            })?;
        output
            .into_text()
            .ok_or_else(|| ParseError::MissingContent.into())
    }

    // ── History ─────────────────────────────────────────────────────────────

    pub async fn history_entries(&self) -> Vec<HistoryEntry> {
        self.history.lock().await.entries().to_vec()
    }

    pub async fn remove_history_entry(&self, id: &str) {
        if let Err(e) = self.history.lock().await.remove_entry(id) {
            warn!("Could not remove history entry {id}: {e}");
        }
    }

    pub async fn clear_history(&self) {
        if let Err(e) = self.history.lock().await.clear() {
            warn!("Could not clear history: {e}");
        }
    }

    /// One page of stored sessions. Errors are returned, local state is untouched.
    pub async fn remote_history(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<HistoryEntry>, Pagination), ScreenError> {
        Ok(self.store.history_page(page, limit).await?)
    }

    /// Loads a stored session, with resume text, as the current analysis.
    pub async fn open_remote_session(&self, id: &str) -> Result<HistoryEntry, ScreenError> {
        let entry = self.store.get_session(id).await?.to_history_entry();
        self.load_history_entry(&entry).await;
        Ok(entry)
    }

    pub async fn delete_remote_session(&self, id: &str) -> Result<(), ScreenError> {
        Ok(self.store.delete_session(id).await?)
    }
}
