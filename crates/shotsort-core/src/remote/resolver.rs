//! Find-or-create of the `{year}/{month}/{images|videos}` folder path.
//!
//! Every call re-queries the backend; nothing is cached between calls.
//!
//! Known limitation: the find and the create of one level are separate
//! requests. Two resolvers running at the same time can both see a level
//! as missing and both create it, leaving duplicate folders. A single
//! agent process never does this, and no cross-process locking is done.

use super::{FolderHandle, StorageBackend};
use crate::scanner::MediaKind;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Normalize a media label to a remote folder name.
///
/// `"videos"` (any case) maps to `videos`; everything else, including
/// empty or unknown labels, maps to `images`.
pub fn media_folder_name(label: &str) -> &'static str {
    if label.trim().eq_ignore_ascii_case("videos") {
        "videos"
    } else {
        "images"
    }
}

/// The terminal folder of a resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub handle: FolderHandle,
    /// Human-readable path, e.g. `2024/1/images`.
    pub display: String,
}

/// Guarantees the three-level folder hierarchy exists.
#[derive(Clone)]
pub struct RemotePathResolver {
    backend: Arc<dyn StorageBackend>,
}

impl RemotePathResolver {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Ensure `{year}/{month}/{media}` exists and return its last level.
    ///
    /// The month is not zero-padded. `media` is normalized with
    /// [`media_folder_name`]. Backend errors are returned unchanged.
    pub async fn ensure_path(&self, year: i32, month: u32, media: &str) -> Result<ResolvedPath> {
        let media = media_folder_name(media);
        let year_name = year.to_string();
        let month_name = month.to_string();

        let year_id = self.find_or_create(&year_name, None).await?;
        let month_id = self.find_or_create(&month_name, Some(&year_id)).await?;
        let media_id = self.find_or_create(media, Some(&month_id)).await?;

        Ok(ResolvedPath {
            handle: media_id,
            display: format!("{}/{}/{}", year_name, month_name, media),
        })
    }

    /// [`ensure_path`](Self::ensure_path) for a classified media kind.
    pub async fn ensure_path_for(
        &self,
        year: i32,
        month: u32,
        kind: MediaKind,
    ) -> Result<ResolvedPath> {
        self.ensure_path(year, month, kind.folder_name()).await
    }

    async fn find_or_create(
        &self,
        name: &str,
        parent: Option<&FolderHandle>,
    ) -> Result<FolderHandle> {
        if let Some(existing) = self.backend.find_folder(name, parent).await? {
            debug!("Found remote folder '{}' ({})", name, existing);
            return Ok(existing);
        }

        let created = self.backend.create_folder(name, parent).await?;
        info!(
            "Created remote folder '{}' ({}) on {}",
            name,
            created,
            self.backend.name()
        );
        Ok(created)
    }
}
