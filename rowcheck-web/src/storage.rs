//! File storage under the storage root
//!
//! Layout:
//! - `<root>/<taskId>_<originalFilename>` uploaded originals
//! - `<root>/processed_<taskId>.xlsx` result spreadsheets
//! - `<root>/report_<taskId>.pdf` result reports
//!
//! Lookups by client-supplied identifiers go through [`Storage::confine`],
//! which rejects any path that resolves outside the root.

use std::fmt::Display;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Result lookup failures, kept distinct so the HTTP layer can map each one
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Access outside the storage root rejected: {0}")]
    Traversal(String),

    #[error("File is empty: {0}")]
    Empty(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle on the storage root directory
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Open (creating if missing) the storage root
    pub fn open(root: impl AsRef<Path>) -> rowcheck_common::Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where an upload is persisted
    pub fn upload_path(&self, task_id: impl Display, original_filename: &str) -> PathBuf {
        self.root
            .join(format!("{}_{}", task_id, sanitize_filename(original_filename)))
    }

    pub fn processed_path(&self, task_id: impl Display) -> PathBuf {
        self.root.join(processed_file_name(task_id))
    }

    pub fn report_path(&self, task_id: impl Display) -> PathBuf {
        self.root.join(report_file_name(task_id))
    }

    /// Resolve `file_name` under the root, rejecting escapes
    ///
    /// Resolution is lexical (`.` and `..` folded without touching the file
    /// system), so a missing file can still be checked.
    pub fn confine(&self, file_name: &str) -> Result<PathBuf, StorageError> {
        let resolved = normalize(&self.root.join(file_name));
        if resolved.starts_with(&self.root) && resolved != self.root {
            Ok(resolved)
        } else {
            warn!(file_name = %file_name, "Rejected path outside storage root");
            Err(StorageError::Traversal(file_name.to_string()))
        }
    }

    /// Check that a confined path names an existing, non-empty file
    pub async fn existing_file(&self, path: &Path) -> Result<u64, StorageError> {
        let display = path
            .strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string();

        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(display));
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        if !metadata.is_file() {
            return Err(StorageError::NotFound(display));
        }
        if metadata.len() == 0 {
            return Err(StorageError::Empty(display));
        }
        Ok(metadata.len())
    }

    /// [`Storage::confine`] followed by [`Storage::existing_file`]
    pub async fn resolve_file(&self, file_name: &str) -> Result<PathBuf, StorageError> {
        let path = self.confine(file_name)?;
        self.existing_file(&path).await?;
        Ok(path)
    }

    /// Persist uploaded bytes, returning the stored path
    pub async fn save_upload(
        &self,
        task_id: impl Display,
        original_filename: &str,
        bytes: &[u8],
    ) -> std::io::Result<PathBuf> {
        let path = self.upload_path(task_id, original_filename);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

/// `processed_<taskId>.xlsx`
pub fn processed_file_name(task_id: impl Display) -> String {
    format!("processed_{}.xlsx", task_id)
}

/// `report_<taskId>.pdf`
pub fn report_file_name(task_id: impl Display) -> String {
    format!("report_{}.pdf", task_id)
}

/// Reduce a client-supplied filename to its final component
pub fn sanitize_filename(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    match last {
        "" | "." | ".." => "upload.xlsx".to_string(),
        other => other.to_string(),
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
