//! Watch-directory scanner.
//!
//! Finds screenshots and screen recordings among the direct entries of the
//! watch directory and remembers which paths were already handled during
//! this process. The processed set is never persisted: a new process
//! starts from scratch and re-offers whatever a previous run left behind.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Substrings (matched against the lowercased file name) that mark a
/// screenshot or screen recording.
const NAME_MARKERS: &[&str] = &["screenshot", "screen shot", "screen-capture", "screen_capture"];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "mkv", "avi", "webm"];

/// Kind of media a candidate holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Name of the remote folder this kind is filed under.
    pub fn folder_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }

    /// Classify a bare extension (without the dot, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Classify a path by its extension alone.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file offered for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Absolute path at scan time. The orchestrator replaces it after a rename.
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl CandidateFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Decide whether a file name qualifies and, if so, what it holds.
///
/// The lowercased name must contain one of the screenshot markers and end
/// in a known image or video extension. Anything else is excluded, even
/// when the name matches.
pub fn classify(file_name: &str) -> Option<MediaKind> {
    let lower = file_name.to_lowercase();
    if !NAME_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return None;
    }
    MediaKind::from_path(Path::new(&lower))
}

/// Result of one directory scan.
#[derive(Debug, Default)]
pub struct ScanBatch {
    pub candidates: Vec<CandidateFile>,
    /// Non-fatal problems seen while scanning.
    pub diagnostics: Vec<String>,
}

/// Scanner bound to one watch directory.
#[derive(Debug)]
pub struct Scanner {
    watch_dir: PathBuf,
    processed: HashSet<PathBuf>,
}

impl Scanner {
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            processed: HashSet::new(),
        }
    }

    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    /// List qualifying files directly inside the watch directory.
    ///
    /// Subdirectories and already-processed paths are skipped. Results are
    /// sorted by path. A missing or unreadable directory yields an empty
    /// batch with a diagnostic.
    pub fn scan(&self) -> ScanBatch {
        let mut batch = ScanBatch::default();

        if !self.watch_dir.exists() {
            let msg = format!(
                "Watch directory {} does not exist",
                self.watch_dir.display()
            );
            warn!("{}", msg);
            batch.diagnostics.push(msg);
            return batch;
        }

        let entries = match std::fs::read_dir(&self.watch_dir) {
            Ok(entries) => entries,
            Err(e) => {
                let msg = format!(
                    "Cannot read watch directory {}: {}",
                    self.watch_dir.display(),
                    e
                );
                warn!("{}", msg);
                batch.diagnostics.push(msg);
                return batch;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    batch
                        .diagnostics
                        .push(format!("Skipping unreadable entry: {}", e));
                    continue;
                }
            };

            let path = entry.path();
            if path.is_dir() || self.processed.contains(&path) {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(kind) = classify(&file_name) {
                debug!("Candidate {} ({})", file_name, kind);
                batch.candidates.push(CandidateFile { path, kind });
            }
        }

        batch.candidates.sort_by(|a, b| a.path.cmp(&b.path));
        batch
    }

    /// Remember `path` as handled for the rest of this process.
    pub fn mark_processed(&mut self, path: impl Into<PathBuf>) {
        self.processed.insert(path.into());
    }

    pub fn is_processed(&self, path: &Path) -> bool {
        self.processed.contains(path)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }
}
