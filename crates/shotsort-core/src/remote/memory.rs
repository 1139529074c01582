//! In-process storage backend.
//!
//! Same lookup semantics as Drive (exact name and parent match, first hit
//! wins) with sequential ids. Failures can be injected per operation.

use super::{FolderHandle, StorageBackend};
use crate::{Result, ShotsortError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// A folder held by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFolder {
    pub id: FolderHandle,
    pub name: String,
    pub parent: Option<FolderHandle>,
}

/// A file uploaded to [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryUpload {
    pub file_id: String,
    pub name: String,
    pub parent: FolderHandle,
    pub size: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    folders: Vec<MemoryFolder>,
    uploads: Vec<MemoryUpload>,
    next_id: u64,
    create_calls: usize,
    upload_calls: usize,
    folder_error: Option<String>,
    /// File name -> error text returned for that upload.
    upload_errors: HashMap<String, String>,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

/// Storage backend kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All folders, in creation order.
    pub fn folders(&self) -> Vec<MemoryFolder> {
        self.state().folders.clone()
    }

    /// All successful uploads, in order.
    pub fn uploads(&self) -> Vec<MemoryUpload> {
        self.state().uploads.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.state().create_calls
    }

    pub fn upload_calls(&self) -> usize {
        self.state().upload_calls
    }

    /// Make every folder lookup and creation fail with `message`.
    pub fn fail_folder_ops(&self, message: impl Into<String>) {
        self.state().folder_error = Some(message.into());
    }

    /// Make uploads of `file_name` fail with `message`.
    pub fn fail_upload(&self, file_name: impl Into<String>, message: impl Into<String>) {
        self.state()
            .upload_errors
            .insert(file_name.into(), message.into());
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.folder_error = None;
        state.upload_errors.clear();
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn find_folder(
        &self,
        name: &str,
        parent: Option<&FolderHandle>,
    ) -> Result<Option<FolderHandle>> {
        let state = self.state();
        if let Some(message) = &state.folder_error {
            return Err(ShotsortError::storage(message.clone()));
        }

        Ok(state
            .folders
            .iter()
            .find(|f| f.name == name && parent.map_or(true, |p| f.parent.as_ref() == Some(p)))
            .map(|f| f.id.clone()))
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&FolderHandle>,
    ) -> Result<FolderHandle> {
        let mut state = self.state();
        if let Some(message) = &state.folder_error {
            return Err(ShotsortError::storage(message.clone()));
        }

        state.create_calls += 1;
        let id = FolderHandle::new(state.next_id("folder"));
        state.folders.push(MemoryFolder {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.cloned(),
        });
        Ok(id)
    }

    async fn upload_file(
        &self,
        path: &Path,
        file_name: &str,
        parent: &FolderHandle,
    ) -> Result<String> {
        let injected = {
            let mut state = self.state();
            state.upload_calls += 1;
            state.upload_errors.get(file_name).cloned()
        };
        if let Some(message) = injected {
            return Err(ShotsortError::storage(message));
        }

        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| ShotsortError::storage(format!("Error uploading file: {}", e)))?
            .len();

        let mut state = self.state();
        let file_id = state.next_id("file");
        state.uploads.push(MemoryUpload {
            file_id: file_id.clone(),
            name: file_name.to_string(),
            parent: parent.clone(),
            size,
        });
        Ok(file_id)
    }
}
