//! File-to-text extraction for uploaded job descriptions and resumes.

use futures::future::try_join_all;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file type: '{0}'. Please upload a .txt or .pdf file.")]
    UnsupportedFileType(String),

    #[error("Failed to read {file_name}: {reason}")]
    FileRead { file_name: String, reason: String },
}

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    /// MIME type reported by the uploader, if any.
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime,
            bytes,
        }
    }

    /// Lowercased text after the last dot; the whole name when there is no dot.
    pub fn extension(&self) -> String {
        self.name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Text,
    Pdf,
}

fn classify(file: &UploadedFile) -> Result<FileKind, IngestError> {
    let extension = file.extension();
    let mime = file.mime.as_deref().unwrap_or_default();
    if extension == "txt" || mime == "text/plain" {
        Ok(FileKind::Text)
    } else if extension == "pdf" || mime == "application/pdf" {
        Ok(FileKind::Pdf)
    } else {
        Err(IngestError::UnsupportedFileType(extension))
    }
}

/// Extracts the text content of a `.txt` or `.pdf` upload.
pub async fn parse_file(file: &UploadedFile) -> Result<String, IngestError> {
    match classify(file)? {
        FileKind::Text => String::from_utf8(file.bytes.clone()).map_err(|e| IngestError::FileRead {
            file_name: file.name.clone(),
            reason: format!("not valid UTF-8 text ({e})"),
        }),
        FileKind::Pdf => {
            let bytes = file.bytes.clone();
            let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| IngestError::FileRead {
                    file_name: file.name.clone(),
                    reason: format!("extraction task failed ({e})"),
                })?
                .map_err(|e| {
                    error!("Error parsing PDF {}: {e}", file.name);
                    IngestError::FileRead {
                        file_name: file.name.clone(),
                        reason: "the file might be corrupted or protected".to_string(),
                    }
                })?;
            debug!("Extracted {} chars from {}", text.len(), file.name);
            Ok(text)
        }
    }
}

/// Parses every file concurrently. Any failure fails the whole batch.
pub async fn parse_files(files: &[UploadedFile]) -> Result<Vec<String>, IngestError> {
    try_join_all(files.iter().map(parse_file)).await
}
