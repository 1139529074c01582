//! End-to-end batch tests against the in-memory backend.
//!
//! Each test builds a watch directory in a temp dir, pins file
//! modification times, and runs one batch through the orchestrator.

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use shotsort_core::naming::{ExtractedFrame, FrameExtractor, VisionClient};
use shotsort_core::remote::FolderHandle;
use shotsort_core::{
    FileStage, FileStatus, MemoryBackend, NamingAdvisor, NamingFailure, NamingFailureKind,
    Orchestrator, Result, Scanner, ShotsortError, StopSignal, StorageBackend,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tempfile::TempDir;

/// Write `name` into `dir` with a modification time in mid January 2024.
fn january_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"fake media bytes").unwrap();
    let when: SystemTime = Local
        .with_ymd_and_hms(2024, 1, 15, 12, 0, 0)
        .single()
        .unwrap()
        .into();
    std::fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(when)
        .unwrap();
    path
}

struct FixedVision(std::result::Result<String, NamingFailure>);

#[async_trait]
impl VisionClient for FixedVision {
    async fn describe(&self, _image: &[u8]) -> std::result::Result<String, NamingFailure> {
        self.0.clone()
    }
}

struct BrokenFrames;

#[async_trait]
impl FrameExtractor for BrokenFrames {
    async fn extract_first_frame(&self, _video: &Path) -> Result<ExtractedFrame> {
        Err(ShotsortError::Other("ffmpeg exited with status 1".into()))
    }
}

fn advisor(answer: std::result::Result<&str, NamingFailure>) -> NamingAdvisor {
    NamingAdvisor::new(
        Arc::new(FixedVision(answer.map(str::to_string))),
        Arc::new(BrokenFrames),
    )
}

/// Delegates to a [`MemoryBackend`], with a hook run after each upload.
struct HookedBackend<F> {
    inner: MemoryBackend,
    after_upload: F,
}

#[async_trait]
impl<F> StorageBackend for HookedBackend<F>
where
    F: Fn(&Path, &str) + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "hooked"
    }

    async fn find_folder(
        &self,
        name: &str,
        parent: Option<&FolderHandle>,
    ) -> Result<Option<FolderHandle>> {
        self.inner.find_folder(name, parent).await
    }

    async fn create_folder(&self, name: &str, parent: Option<&FolderHandle>) -> Result<FolderHandle> {
        self.inner.create_folder(name, parent).await
    }

    async fn upload_file(&self, path: &Path, file_name: &str, parent: &FolderHandle) -> Result<String> {
        let id = self.inner.upload_file(path, file_name, parent).await?;
        (self.after_upload)(path, file_name);
        Ok(id)
    }
}

#[tokio::test]
async fn test_screenshot_is_filed_and_deleted() {
    let dir = TempDir::new().unwrap();
    let shot = january_file(dir.path(), "Screenshot 2024-01-05.png");
    let other = january_file(dir.path(), "random.png");

    let backend = Arc::new(MemoryBackend::new());
    let mut orchestrator = Orchestrator::new(Scanner::new(dir.path()), backend.clone());
    let report = orchestrator.run_batch().await;

    assert_eq!(report.total_found, 1);
    assert_eq!(report.attempted, 1);
    assert_eq!(report.successful(), 1);

    let file = &report.files[0];
    assert_eq!(file.original_name, "Screenshot 2024-01-05.png");
    assert_eq!(file.status, FileStatus::Success);
    assert_eq!(file.stage, FileStage::Finalized);
    assert_eq!(file.remote_path.as_deref(), Some("2024/1/images"));
    assert!(file.suggested_name.is_none());

    let uploads = backend.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].name, "Screenshot 2024-01-05.png");

    let names: Vec<_> = backend.folders().into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["2024", "1", "images"]);

    assert!(!shot.exists());
    assert!(other.exists());
}

#[tokio::test]
async fn test_upload_failure_is_isolated() {
    let dir = TempDir::new().unwrap();
    let a = january_file(dir.path(), "screenshot-a.png");
    let b = january_file(dir.path(), "screenshot-b.png");
    let c = january_file(dir.path(), "screenshot-c.png");

    let backend = Arc::new(MemoryBackend::new());
    backend.fail_upload("screenshot-b.png", "The user's Drive storage quota has been exceeded.");

    let mut orchestrator = Orchestrator::new(Scanner::new(dir.path()), backend.clone());
    let report = orchestrator.run_batch().await;

    assert_eq!(report.attempted, 3);
    assert_eq!(report.successful(), 2);
    assert_eq!(report.failed(), 1);

    let failed = &report.files[1];
    assert_eq!(failed.original_name, "screenshot-b.png");
    assert_eq!(failed.status, FileStatus::Failed);
    assert_eq!(failed.failed_at, Some(FileStage::Uploaded));
    assert_eq!(
        failed.error.as_deref(),
        Some("The user's Drive storage quota has been exceeded.")
    );

    assert!(!a.exists());
    assert!(b.exists());
    assert!(!c.exists());
    assert_eq!(report.files[2].status, FileStatus::Success);
}

#[tokio::test]
async fn test_failed_file_is_offered_again() {
    let dir = TempDir::new().unwrap();
    let shot = january_file(dir.path(), "screenshot.png");

    let backend = Arc::new(MemoryBackend::new());
    backend.fail_upload("screenshot.png", "backend offline");
    let mut orchestrator = Orchestrator::new(Scanner::new(dir.path()), backend.clone());

    let first = orchestrator.run_batch().await;
    assert_eq!(first.failed(), 1);
    assert!(shot.exists());
    assert!(!orchestrator.scanner().is_processed(&shot));

    backend.clear_failures();
    let second = orchestrator.run_batch().await;
    assert_eq!(second.successful(), 1);
    assert!(!shot.exists());
    assert!(orchestrator.scanner().is_processed(&shot));
}

#[tokio::test]
async fn test_folder_failure_fails_every_file() {
    let dir = TempDir::new().unwrap();
    let shot = january_file(dir.path(), "screenshot.png");
    let clip = january_file(dir.path(), "screen_capture.mp4");

    let backend = Arc::new(MemoryBackend::new());
    backend.fail_folder_ops("Drive API files.list returned 401 Unauthorized");

    let mut orchestrator = Orchestrator::new(Scanner::new(dir.path()), backend.clone());
    let report = orchestrator.run_batch().await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.failed(), 2);
    for file in &report.files {
        assert_eq!(file.failed_at, Some(FileStage::FolderResolved));
        assert_eq!(
            file.error.as_deref(),
            Some("Drive API files.list returned 401 Unauthorized")
        );
    }
    assert_eq!(backend.upload_calls(), 0);
    assert!(shot.exists());
    assert!(clip.exists());
}

#[tokio::test]
async fn test_vision_name_is_used_for_upload() {
    let dir = TempDir::new().unwrap();
    let shot = january_file(dir.path(), "Screenshot 2024-01-05.PNG");

    let backend = Arc::new(MemoryBackend::new());
    let mut orchestrator = Orchestrator::new(Scanner::new(dir.path()), backend.clone())
        .with_advisor(advisor(Ok("Login Screen")));
    let report = orchestrator.run_batch().await;

    let file = &report.files[0];
    assert_eq!(file.status, FileStatus::Success);
    assert_eq!(file.suggested_name.as_deref(), Some("login_screen.png"));
    assert!(file.warnings.is_empty());

    assert_eq!(backend.uploads()[0].name, "login_screen.png");
    assert!(!shot.exists());
    assert!(!dir.path().join("login_screen.png").exists());
    assert!(orchestrator.scanner().is_processed(&shot));
}

#[tokio::test]
async fn test_rename_never_overwrites_existing_file() {
    let dir = TempDir::new().unwrap();
    let bystander = dir.path().join("login_screen.png");
    std::fs::write(&bystander, b"not ours").unwrap();
    january_file(dir.path(), "screenshot.png");

    let backend = Arc::new(MemoryBackend::new());
    let mut orchestrator = Orchestrator::new(Scanner::new(dir.path()), backend.clone())
        .with_advisor(advisor(Ok("login_screen")));
    let report = orchestrator.run_batch().await;

    assert_eq!(report.files[0].suggested_name.as_deref(), Some("login_screen_2.png"));
    assert_eq!(backend.uploads()[0].name, "login_screen_2.png");
    assert_eq!(std::fs::read(&bystander).unwrap(), b"not ours");
}

#[tokio::test]
async fn test_frame_failure_uses_fallback_name() {
    let dir = TempDir::new().unwrap();
    january_file(dir.path(), "screen-capture-01.mov");

    let backend = Arc::new(MemoryBackend::new());
    let mut orchestrator = Orchestrator::new(Scanner::new(dir.path()), backend.clone())
        .with_advisor(advisor(Ok("never_used")));
    let report = orchestrator.run_batch().await;

    let file = &report.files[0];
    assert_eq!(file.status, FileStatus::Success);
    assert_eq!(
        file.suggested_name.as_deref(),
        Some("error_video_frame_screen-capture-01.mov")
    );
    assert_eq!(file.remote_path.as_deref(), Some("2024/1/videos"));
    assert!(file.warnings[0].starts_with("frame_extraction_error"));
    assert_eq!(backend.uploads()[0].name, "error_video_frame_screen-capture-01.mov");
}

#[tokio::test]
async fn test_failed_rename_uploads_under_original_name() {
    let dir = TempDir::new().unwrap();
    // fits NAME_MAX, but the fallback prefix pushes the new name past it
    let original = format!("screen-capture-{}.mov", "x".repeat(225));
    let clip = january_file(dir.path(), &original);

    let backend = Arc::new(MemoryBackend::new());
    let mut orchestrator = Orchestrator::new(Scanner::new(dir.path()), backend.clone())
        .with_advisor(advisor(Ok("never_used")));
    let report = orchestrator.run_batch().await;

    let file = &report.files[0];
    assert_eq!(file.status, FileStatus::Success);
    assert_eq!(
        file.suggested_name.as_deref(),
        Some(format!("error_video_frame_{}", original).as_str())
    );
    assert!(file.warnings[0].starts_with("frame_extraction_error"));
    assert!(
        file.warnings.iter().any(|w| w.starts_with("Could not rename")),
        "{:?}",
        file.warnings
    );
    assert_eq!(backend.uploads()[0].name, original);
    assert!(!clip.exists());
    assert!(orchestrator.scanner().is_processed(&clip));
}

#[tokio::test]
async fn test_naming_failure_keeps_original_name() {
    let dir = TempDir::new().unwrap();
    january_file(dir.path(), "Screenshot 1.png");

    let backend = Arc::new(MemoryBackend::new());
    let failure = NamingFailure::new(
        NamingFailureKind::ConnectionRefused,
        "Cannot connect to Ollama at http://localhost:11434.",
    );
    let mut orchestrator = Orchestrator::new(Scanner::new(dir.path()), backend.clone())
        .with_advisor(advisor(Err(failure)));
    let report = orchestrator.run_batch().await;

    let file = &report.files[0];
    assert_eq!(file.status, FileStatus::Success);
    assert!(file.suggested_name.is_none());
    assert!(file.warnings[0].starts_with("connection_refused"));
    assert_eq!(backend.uploads()[0].name, "Screenshot 1.png");
}

#[tokio::test]
async fn test_local_file_already_gone_counts_as_success() {
    let dir = TempDir::new().unwrap();
    january_file(dir.path(), "screenshot.png");

    let backend = Arc::new(HookedBackend {
        inner: MemoryBackend::new(),
        after_upload: |path: &Path, _: &str| std::fs::remove_file(path).unwrap(),
    });
    let mut orchestrator = Orchestrator::new(Scanner::new(dir.path()), backend);
    let report = orchestrator.run_batch().await;

    let file = &report.files[0];
    assert_eq!(file.status, FileStatus::UploadedButNotDeleted);
    assert_eq!(file.stage, FileStage::Finalized);
    assert!(file.remote_file_id.is_some());
    assert_eq!(report.successful(), 1);
    assert_eq!(report.failed(), 0);
}

#[tokio::test]
async fn test_panic_is_contained_to_one_file() {
    let dir = TempDir::new().unwrap();
    let a = january_file(dir.path(), "screenshot-a.png");
    let b = january_file(dir.path(), "screenshot-b.png");

    let backend = Arc::new(HookedBackend {
        inner: MemoryBackend::new(),
        after_upload: |_: &Path, name: &str| {
            if name == "screenshot-a.png" {
                panic!("backend exploded");
            }
        },
    });
    let mut orchestrator = Orchestrator::new(Scanner::new(dir.path()), backend);
    let report = orchestrator.run_batch().await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.files[0].status, FileStatus::Failed);
    assert_eq!(
        report.files[0].error.as_deref(),
        Some("Unexpected error: backend exploded")
    );
    assert_eq!(report.files[1].status, FileStatus::Success);
    assert!(a.exists());
    assert!(!b.exists());
}

#[tokio::test]
async fn test_stop_between_files() {
    let dir = TempDir::new().unwrap();
    let a = january_file(dir.path(), "screenshot-a.png");
    let b = january_file(dir.path(), "screenshot-b.png");

    let stop = StopSignal::new();
    let trigger = stop.clone();
    let backend = Arc::new(HookedBackend {
        inner: MemoryBackend::new(),
        after_upload: move |_: &Path, _: &str| {
            trigger.request_stop();
        },
    });
    let mut orchestrator =
        Orchestrator::new(Scanner::new(dir.path()), backend).with_stop_signal(stop);
    let report = orchestrator.run_batch().await;

    assert!(report.interrupted);
    assert_eq!(report.total_found, 2);
    assert_eq!(report.attempted, 1);
    // the in-flight file still finishes
    assert_eq!(report.files[0].status, FileStatus::Success);
    assert!(!a.exists());
    assert!(b.exists());
}

#[tokio::test]
async fn test_missing_watch_dir_reports_diagnostic() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let mut orchestrator =
        Orchestrator::new(Scanner::new(dir.path().join("Desktop")), backend);

    let report = orchestrator.run_batch().await;
    assert_eq!(report.total_found, 0);
    assert_eq!(report.diagnostics.len(), 1);
    assert!(report.render_table().contains("No screenshots or recordings found."));
}
