//! Uploaded file policy and storage

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use unicode_normalization::UnicodeNormalization;

/// Extensions accepted for upload (case-sensitive)
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "LPT1", "LPT2", "LPT3",
];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file part named 'file' in request")]
    MissingFile,

    #[error("File type not allowed: {0}")]
    DisallowedExtension(String),

    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("Upload exceeds the maximum allowed size")]
    TooLarge,

    #[error("Malformed multipart body: {0}")]
    Multipart(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// True when `filename` has an allowed extension
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Reduce a client-supplied filename to a safe flat name.
///
/// Accents are folded (NFKD) and remaining non-ASCII characters dropped.
/// Path separators and whitespace runs become `_`, anything outside
/// `[A-Za-z0-9_.-]` is removed, and leading or trailing dots and underscores
/// are stripped. May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let spaced: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == '_');

    let stem = cleaned.split('.').next().unwrap_or("");
    if WINDOWS_DEVICE_NAMES.contains(&stem.to_ascii_uppercase().as_str()) {
        return format!("_{}", cleaned);
    }

    cleaned.to_string()
}

/// Flat directory of uploaded PDFs
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and store an upload, returning the stored name
    pub async fn save(&self, original_name: &str, data: &[u8]) -> Result<String, UploadError> {
        if !allowed_file(original_name) {
            return Err(UploadError::DisallowedExtension(original_name.to_string()));
        }

        let name = secure_filename(original_name);
        if name.is_empty() {
            return Err(UploadError::InvalidFilename(original_name.to_string()));
        }
        if !allowed_file(&name) {
            return Err(UploadError::DisallowedExtension(name));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        // Unique partial file beside the target, renamed into place when complete
        let partial = tempfile::Builder::new()
            .prefix(".upload-")
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        let (file, partial_path) = partial.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        file.write_all(data).await?;
        file.flush().await?;
        drop(file);

        let target = self.dir.join(&name);
        partial_path.persist(&target).map_err(|e| e.error)?;

        tracing::info!(file_name = %name, size = data.len(), "Stored upload");
        Ok(name)
    }

    /// Path of a stored upload, if `name` is a valid stored name that exists
    pub async fn locate(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || secure_filename(name) != name || !allowed_file(name) {
            return None;
        }
        let path = self.dir.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Some(path),
            _ => None,
        }
    }
}
