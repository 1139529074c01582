//! Upload of one local file into a resolved remote folder.

use super::{FolderHandle, StorageBackend};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one upload attempt. Only `Uploaded` counts as success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    Uploaded { file_id: String },
    /// The local file was missing; the backend was not called.
    NotFound { path: PathBuf },
    /// The backend rejected the transfer; `message` is its text.
    Failed { message: String },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded { .. })
    }

    /// Error text for failed outcomes.
    pub fn error_message(&self) -> Option<String> {
        match self {
            UploadOutcome::Uploaded { .. } => None,
            UploadOutcome::NotFound { path } => {
                Some(format!("File not found at {}", path.display()))
            }
            UploadOutcome::Failed { message } => Some(message.clone()),
        }
    }
}

/// Transfers local files to the storage backend.
#[derive(Clone)]
pub struct UploadCommitter {
    backend: Arc<dyn StorageBackend>,
}

impl UploadCommitter {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Upload `path` under its current file name into `folder`.
    pub async fn upload(&self, path: &Path, folder: &FolderHandle) -> UploadOutcome {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return UploadOutcome::NotFound {
                path: path.to_path_buf(),
            };
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!(
            "Uploading {} to folder {} on {}",
            path.display(),
            folder,
            self.backend.name()
        );

        match self.backend.upload_file(path, &file_name, folder).await {
            Ok(file_id) => UploadOutcome::Uploaded { file_id },
            Err(e) => {
                warn!("Upload of {} failed: {}", file_name, e);
                UploadOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}
