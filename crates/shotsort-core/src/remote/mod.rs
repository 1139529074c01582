//! Remote storage: backend abstraction, folder resolution and upload.
//!
//! The core never talks to a storage service directly. It receives an
//! explicitly constructed [`StorageBackend`] and goes through
//! [`RemotePathResolver`] and [`UploadCommitter`].

pub mod auth;
pub mod drive;
pub mod memory;
mod resolver;
mod upload;

pub use auth::{AuthorizedUser, TokenStore};
pub use drive::DriveBackend;
pub use memory::MemoryBackend;
pub use resolver::{media_folder_name, RemotePathResolver, ResolvedPath};
pub use upload::{UploadCommitter, UploadOutcome};

use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

/// Opaque identifier of a remote folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FolderHandle(String);

impl FolderHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FolderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operations the pipeline needs from a remote store.
///
/// Authentication and token lifecycle belong to the implementation. Errors
/// are returned with the backend's own text so callers can record it
/// verbatim.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Find a folder by exact name under `parent` (anywhere when `None`).
    async fn find_folder(
        &self,
        name: &str,
        parent: Option<&FolderHandle>,
    ) -> Result<Option<FolderHandle>>;

    /// Create a folder named `name` under `parent` (top level when `None`).
    async fn create_folder(&self, name: &str, parent: Option<&FolderHandle>)
        -> Result<FolderHandle>;

    /// Upload the file at `path` as `file_name` into `parent`.
    ///
    /// Returns the id of the created remote file.
    async fn upload_file(&self, path: &Path, file_name: &str, parent: &FolderHandle)
        -> Result<String>;
}
