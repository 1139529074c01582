//! Batch orchestrator: runs each candidate through the pipeline.
//!
//! Files are handled one at a time in scan order. Every step failure stays
//! inside that file's [`FileReport`]; panics are caught per file as well.
//! A stop request is honored between files only.

use super::report::{FileReport, FileStatus, RunReport};
use super::state::FileStage;
use crate::cancel::StopSignal;
use crate::config::AgentConfig;
use crate::naming::{AdviceSource, NamingAdvisor};
use crate::remote::{RemotePathResolver, StorageBackend, UploadCommitter, UploadOutcome};
use crate::scanner::{CandidateFile, Scanner};
use crate::{Result, ShotsortError};
use chrono::{DateTime, Datelike, Local};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Upper bound on `_N` suffixes tried when a rename target exists.
const MAX_RENAME_SUFFIX: u32 = 1000;

/// Result of one file plus the paths to remember as processed.
struct FileOutcome {
    report: FileReport,
    processed: Vec<PathBuf>,
}

/// Sequences scan, naming, folder resolution, upload and local cleanup.
pub struct Orchestrator {
    scanner: Scanner,
    advisor: Option<NamingAdvisor>,
    resolver: RemotePathResolver,
    committer: UploadCommitter,
    stop: StopSignal,
}

impl Orchestrator {
    /// Orchestrator with naming disabled.
    pub fn new(scanner: Scanner, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            scanner,
            advisor: None,
            resolver: RemotePathResolver::new(backend.clone()),
            committer: UploadCommitter::new(backend),
            stop: StopSignal::new(),
        }
    }

    pub fn with_advisor(mut self, advisor: NamingAdvisor) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Build the orchestrator described by `config` on top of `backend`.
    pub fn from_config(config: &AgentConfig, backend: Arc<dyn StorageBackend>) -> Result<Self> {
        let mut orchestrator = Self::new(Scanner::new(&config.watch_dir), backend);
        if config.analyze_images {
            orchestrator.advisor = Some(NamingAdvisor::from_config(config)?);
        }
        Ok(orchestrator)
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn naming_enabled(&self) -> bool {
        self.advisor.is_some()
    }

    /// Scan once and process every candidate found.
    pub async fn run_batch(&mut self) -> RunReport {
        let batch = self.scanner.scan();
        let mut report = RunReport::new(batch.candidates.len());
        report.diagnostics = batch.diagnostics;

        if batch.candidates.is_empty() {
            info!("No screenshots or recordings found");
            return report;
        }
        info!("Found {} file(s). Processing...", batch.candidates.len());

        for candidate in &batch.candidates {
            if self.stop.is_requested() {
                warn!(
                    "Stop requested; leaving {} file(s) unprocessed",
                    report.total_found - report.attempted
                );
                report.interrupted = true;
                break;
            }

            let outcome = self.process_guarded(candidate).await;
            for path in outcome.processed {
                self.scanner.mark_processed(path);
            }
            report.record(outcome.report);
        }

        info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded, report.failed
        );
        report
    }

    /// Run one file, turning a panic into a failed report.
    async fn process_guarded(&self, candidate: &CandidateFile) -> FileOutcome {
        match AssertUnwindSafe(self.process_file(candidate))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Unexpected error processing {}: {}", candidate.path.display(), message);

                let mut report = FileReport::new(candidate.file_name(), candidate.kind);
                report.abort(format!("Unexpected error: {}", message));
                FileOutcome {
                    report,
                    processed: Vec::new(),
                }
            }
        }
    }

    async fn process_file(&self, candidate: &CandidateFile) -> FileOutcome {
        let original_name = candidate.file_name();
        let mut report = FileReport::new(&original_name, candidate.kind);
        let mut processed = Vec::new();
        let mut path = candidate.path.clone();

        // Advise + rename. Never fails the file.
        if let Some(advisor) = &self.advisor {
            report.advance(FileStage::Renaming);
            info!("Analyzing {} ({})...", original_name, candidate.kind);

            match advisor.suggest_name(&path).await {
                Ok(advice) => {
                    if let AdviceSource::FrameFallback { reason } = &advice.source {
                        report.warn(format!("{}: {}", advice.source.code(), reason));
                    }
                    let target = advice.file_name_for(&path);
                    info!("  Suggested name: {}", target);
                    report.suggested_name = Some(target.clone());

                    let renamed = rename_in_place(&path, &target).await;
                    match renamed {
                        Ok(renamed) if renamed != path => {
                            // a collision suffix may differ from the advice
                            report.suggested_name = renamed
                                .file_name()
                                .map(|n| n.to_string_lossy().into_owned());
                            processed.push(path);
                            path = renamed;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Could not rename {}: {}", original_name, e);
                            report.warn(format!("Could not rename: {}", e));
                        }
                    }
                }
                Err(failure) => {
                    warn!("Naming failed for {}: {}", original_name, failure);
                    report.warn(format!("{}: {}", failure.kind.code(), failure.message));
                }
            }
        } else {
            info!("Processing {} ({})...", original_name, candidate.kind);
        }

        let (year, month) = match modified_year_month(&path).await {
            Ok(date) => date,
            Err(e) => {
                error!("Cannot read modification time of {}: {}", path.display(), e);
                report.fail(FileStage::DateResolved, e.to_string());
                return FileOutcome { report, processed: Vec::new() };
            }
        };
        report.advance(FileStage::DateResolved);

        let folder = match self
            .resolver
            .ensure_path_for(year, month, candidate.kind)
            .await
        {
            Ok(folder) => folder,
            Err(e) => {
                error!("Failed to create folder structure for {}: {}", original_name, e);
                report.fail(FileStage::FolderResolved, e.to_string());
                return FileOutcome { report, processed: Vec::new() };
            }
        };
        report.remote_path = Some(folder.display.clone());
        report.advance(FileStage::FolderResolved);

        info!("  Uploading to {}...", folder.display);
        let outcome = self.committer.upload(&path, &folder.handle).await;
        let file_id = match outcome {
            UploadOutcome::Uploaded { file_id } => file_id,
            failed => {
                let message = failed.error_message().unwrap_or_default();
                error!("Upload failed for {}: {}", original_name, message);
                report.fail(FileStage::Uploaded, message);
                return FileOutcome { report, processed: Vec::new() };
            }
        };
        report.remote_file_id = Some(file_id);
        report.advance(FileStage::Uploaded);

        // Only reached on an explicit upload success.
        processed.push(path.clone());
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("  Deleted local file");
                report.status = FileStatus::Success;
            }
            Err(e) => {
                warn!("Could not delete {}: {}", path.display(), e);
                report.warn(format!("Could not delete local file: {}", e));
                report.status = FileStatus::UploadedButNotDeleted;
            }
        }
        report.advance(FileStage::Finalized);

        FileOutcome { report, processed }
    }
}

/// Local year and month of the file's last modification.
async fn modified_year_month(path: &Path) -> Result<(i32, u32)> {
    let modified = tokio::fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .map_err(|e| ShotsortError::io_with_path(e, path))?;
    let local: DateTime<Local> = modified.into();
    Ok((local.year(), local.month()))
}

/// Rename `path` to `target_name` in the same directory.
///
/// An existing different file is never overwritten: `_2`, `_3`, ... is
/// appended to the stem until a free name is found. A target that is the
/// source itself under another spelling (case-insensitive volumes) is not
/// treated as taken.
async fn rename_in_place(path: &Path, target_name: &str) -> Result<PathBuf> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let target = dir.join(target_name);
    if target == path {
        return Ok(target);
    }

    let taken = exists(&target).await? && !is_same_file(path, &target).await?;
    let free = if taken {
        let stem = Path::new(target_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = Path::new(target_name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut found = None;
        for n in 2..=MAX_RENAME_SUFFIX {
            let candidate = dir.join(format!("{stem}_{n}{ext}"));
            if candidate == path || !exists(&candidate).await? {
                found = Some(candidate);
                break;
            }
        }
        found.ok_or_else(|| {
            ShotsortError::Other(format!("No free file name for {}", target_name))
        })?
    } else {
        target
    };

    if free == path {
        return Ok(free);
    }
    tokio::fs::rename(path, &free)
        .await
        .map_err(|e| ShotsortError::io_with_path(e, path))?;
    Ok(free)
}

async fn exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| ShotsortError::io_with_path(e, path))
}

/// True if `a` and `b` name the same file on disk.
async fn is_same_file(a: &Path, b: &Path) -> Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let ma = tokio::fs::metadata(a)
            .await
            .map_err(|e| ShotsortError::io_with_path(e, a))?;
        let mb = tokio::fs::metadata(b)
            .await
            .map_err(|e| ShotsortError::io_with_path(e, b))?;
        Ok(ma.dev() == mb.dev() && ma.ino() == mb.ino())
    }
    #[cfg(not(unix))]
    {
        let ca = tokio::fs::canonicalize(a)
            .await
            .map_err(|e| ShotsortError::io_with_path(e, a))?;
        let cb = tokio::fs::canonicalize(b)
            .await
            .map_err(|e| ShotsortError::io_with_path(e, b))?;
        Ok(ca == cb)
    }
}
