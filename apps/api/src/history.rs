//! Local history cache: the newest-first list of completed screenings, kept as a
//! single JSON blob in a directory-backed key-value store.
//!
//! Not safe across concurrent processes: two writers race and the last rename wins.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{error, info};

use crate::models::{AnalysisSnapshot, HistoryEntry};

/// Storage key of the history blob.
pub const HISTORY_KEY: &str = "resumeScreenerHistory";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("History could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("History could not be written: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Debug)]
pub struct HistoryCache {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl HistoryCache {
    /// Opens the cache stored under `dir`, creating the directory if needed.
    ///
    /// A missing blob is an empty history. A corrupt or unreadable one is logged and
    /// also treated as empty; it is overwritten on the next write.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{HISTORY_KEY}.json"));
        let entries = load(&path);
        info!("Loaded {} history entries from {}", entries.len(), path.display());
        Ok(Self { path, entries })
    }

    /// Newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Records a finished screening and returns the entry that was stored.
    pub fn add_entry(&mut self, snapshot: AnalysisSnapshot) -> Result<HistoryEntry, HistoryError> {
        let entry = HistoryEntry::from_snapshot(snapshot);
        let mut updated = Vec::with_capacity(self.entries.len() + 1);
        updated.push(entry.clone());
        updated.extend(self.entries.iter().cloned());
        self.replace(updated)?;
        Ok(entry)
    }

    pub fn remove_entry(&mut self, id: &str) -> Result<(), HistoryError> {
        let updated: Vec<HistoryEntry> = self.entries.iter().filter(|e| e.id != id).cloned().collect();
        self.replace(updated)
    }

    pub fn clear(&mut self) -> Result<(), HistoryError> {
        self.replace(Vec::new())
    }

    /// Persists `entries` first; memory is only updated once the write landed.
    fn replace(&mut self, entries: Vec<HistoryEntry>) -> Result<(), HistoryError> {
        if let Err(e) = write_atomic(&self.path, &entries) {
            error!("Failed to save history to {}: {e}", self.path.display());
            return Err(e);
        }
        self.entries = entries;
        Ok(())
    }
}

fn load(path: &Path) -> Vec<HistoryEntry> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            error!("Failed to read history from {}: {e}", path.display());
            return Vec::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        error!("Failed to load history from {}: {e}", path.display());
        Vec::new()
    })
}

/// Temp file in the target directory, then rename over the target.
fn write_atomic(path: &Path, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp_file = NamedTempFile::new_in(parent)?;
    serde_json::to_writer(&mut temp_file, entries)?;
    temp_file.flush()?;
    temp_file.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, Resume};

    fn snapshot(jd: &str) -> AnalysisSnapshot {
        AnalysisSnapshot {
            job_description: jd.to_string(),
            jd_file_name: None,
            jd_preset_name: None,
            resumes: vec![Resume {
                id: "r1".into(),
                text: "resume".into(),
                file_name: "r1.txt".into(),
            }],
            analysis_results: vec![Candidate {
                id: "r1".into(),
                name: "Lin".into(),
                match_score: 6,
                justification: "ok".into(),
                extracted_skills: vec![],
                extracted_experience_summary: "".into(),
            }],
        }
    }

    #[test]
    fn test_missing_blob_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HistoryCache::open(dir.path()).unwrap();
        assert!(cache.entries().is_empty());
    }

    #[test]
    fn test_add_prepends_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = HistoryCache::open(dir.path()).unwrap();
        cache.add_entry(snapshot("First role")).unwrap();
        cache.add_entry(snapshot("Second role")).unwrap();

        let reopened = HistoryCache::open(dir.path()).unwrap();
        let titles: Vec<&str> = reopened.entries().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Second role", "First role"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = HistoryCache::open(dir.path()).unwrap();
        let entry = cache.add_entry(snapshot("Role")).unwrap();

        cache.remove_entry("does-not-exist").unwrap();
        assert_eq!(cache.entries().len(), 1);
        assert!(cache.get(&entry.id).is_some());

        cache.remove_entry(&entry.id).unwrap();
        assert!(cache.entries().is_empty());

        cache.add_entry(snapshot("Again")).unwrap();
        cache.clear().unwrap();
        assert!(HistoryCache::open(dir.path()).unwrap().entries().is_empty());
    }

    #[test]
    fn test_corrupt_blob_reads_as_empty_and_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(format!("{HISTORY_KEY}.json")), "{not json").unwrap();

        let mut cache = HistoryCache::open(dir.path()).unwrap();
        assert!(cache.entries().is_empty());

        cache.add_entry(snapshot("Recovered")).unwrap();
        let reopened = HistoryCache::open(dir.path()).unwrap();
        assert_eq!(reopened.entries()[0].title, "Recovered");
    }
}
