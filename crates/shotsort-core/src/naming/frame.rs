//! First-frame extraction for screen recordings.

use crate::{Result, ShotsortError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempPath;
use tracing::debug;

/// A still image extracted from a video.
///
/// The backing file is temporary and is deleted when this value drops,
/// whichever way the caller exits.
#[derive(Debug)]
pub struct ExtractedFrame {
    path: TempPath,
}

impl ExtractedFrame {
    pub fn new(path: TempPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(self.path())
            .await
            .map_err(|e| ShotsortError::io_with_path(e, self.path()))
    }
}

/// Produces one representative still from a video file.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Extract the first decodable frame of `video`.
    async fn extract_first_frame(&self, video: &Path) -> Result<ExtractedFrame>;
}

/// Frame extractor backed by the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl FfmpegFrameExtractor {
    pub fn new(ffmpeg: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            timeout,
        }
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_first_frame(&self, video: &Path) -> Result<ExtractedFrame> {
        let frame = tempfile::Builder::new()
            .prefix("shotsort-frame-")
            .suffix(".png")
            .tempfile()?
            .into_temp_path();

        let mut cmd = tokio::process::Command::new(&self.ffmpeg);
        cmd.arg("-i")
            .arg(video)
            .args(["-vf", "select=eq(n\\,0)", "-frames:v", "1", "-q:v", "2", "-y"])
            .arg(&*frame)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Extracting first frame of {}", video.display());

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ShotsortError::Timeout(self.timeout))?
            .map_err(|e| {
                ShotsortError::Other(format!(
                    "Failed to run {}: {}",
                    self.ffmpeg.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty());
            return Err(ShotsortError::Other(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                last_line.unwrap_or("no output")
            )));
        }

        let size = tokio::fs::metadata(&*frame)
            .await
            .map_err(|e| ShotsortError::io_with_path(e, &*frame))?
            .len();
        if size == 0 {
            return Err(ShotsortError::Other(format!(
                "ffmpeg produced no frame for {}",
                video.display()
            )));
        }

        Ok(ExtractedFrame::new(frame))
    }
}
