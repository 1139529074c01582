//! Naming advisor: derives a descriptive base name from visual content.
//!
//! Flow for one file:
//! 1. Videos: extract the first frame. On failure, return the
//!    `error_video_frame_<stem>` fallback without calling the model.
//! 2. Send the image (or frame) to the vision model.
//! 3. Sanitize the answer, falling back to a stem-based name when nothing
//!    usable comes back.
//!
//! Any extracted frame is a temporary file owned by [`ExtractedFrame`]
//! and is removed on every exit path.

pub mod frame;
pub mod sanitize;
pub mod vision;

pub use frame::{ExtractedFrame, FfmpegFrameExtractor, FrameExtractor};
pub use sanitize::{clean, fallback_name, is_valid_name, sanitize_suggestion, NamingSuggestion};
pub use vision::{OllamaVisionClient, VisionClient};

use crate::config::AgentConfig;
use crate::scanner::MediaKind;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Why the advisor could not produce a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingFailureKind {
    FileNotFound,
    ConnectionRefused,
    Timeout,
    HttpStatus(u16),
    Generic,
}

impl NamingFailureKind {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            NamingFailureKind::FileNotFound => "file_not_found",
            NamingFailureKind::ConnectionRefused => "connection_refused",
            NamingFailureKind::Timeout => "timeout",
            NamingFailureKind::HttpStatus(_) => "http_status",
            NamingFailureKind::Generic => "generic_error",
        }
    }
}

/// A naming failure: kind plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct NamingFailure {
    pub kind: NamingFailureKind,
    pub message: String,
}

impl NamingFailure {
    pub fn new(kind: NamingFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Where an advised name came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum AdviceSource {
    /// Sanitized model output.
    Vision,
    /// The model answered with nothing usable; built from the file stem.
    StemFallback,
    /// The video frame could not be extracted; the model was not called.
    FrameFallback { reason: String },
}

impl AdviceSource {
    pub fn code(&self) -> &'static str {
        match self {
            AdviceSource::Vision => "vision",
            AdviceSource::StemFallback => "stem_fallback",
            AdviceSource::FrameFallback { .. } => "frame_extraction_error",
        }
    }
}

/// A suggested name together with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingAdvice {
    pub name: NamingSuggestion,
    pub source: AdviceSource,
}

impl NamingAdvice {
    /// Target file name for `original`: the suggestion plus the original
    /// extension, lowercased.
    pub fn file_name_for(&self, original: &Path) -> String {
        let ext = original.extension().and_then(|e| e.to_str());
        self.name.file_name(ext)
    }
}

/// Suggests descriptive names for screenshots and recordings.
pub struct NamingAdvisor {
    vision: Arc<dyn VisionClient>,
    frames: Arc<dyn FrameExtractor>,
}

impl NamingAdvisor {
    pub fn new(vision: Arc<dyn VisionClient>, frames: Arc<dyn FrameExtractor>) -> Self {
        Self { vision, frames }
    }

    /// Build the Ollama + ffmpeg advisor described by `config`.
    pub fn from_config(config: &AgentConfig) -> crate::Result<Self> {
        let vision = OllamaVisionClient::new(
            &config.ollama_url,
            &config.vision_model,
            config.inference_timeout,
        )?;
        let frames = FfmpegFrameExtractor::new(&config.ffmpeg_path, config.frame_timeout);
        Ok(Self::new(Arc::new(vision), Arc::new(frames)))
    }

    /// Suggest a base name (no extension) for the file at `path`.
    pub async fn suggest_name(&self, path: &Path) -> Result<NamingAdvice, NamingFailure> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(NamingFailure::new(
                NamingFailureKind::FileNotFound,
                format!("File not found at {}", path.display()),
            ));
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        // `_frame` keeps the extracted still alive until the request is done.
        let (image, _frame) = if MediaKind::from_path(path) == Some(MediaKind::Video) {
            match self.frames.extract_first_frame(path).await {
                Ok(extracted) => {
                    let bytes = extracted.read().await.map_err(|e| {
                        NamingFailure::new(
                            NamingFailureKind::Generic,
                            format!("Error analyzing image: {}", e),
                        )
                    })?;
                    (bytes, Some(extracted))
                }
                Err(e) => {
                    warn!("Frame extraction failed for {}: {}", path.display(), e);
                    return Ok(NamingAdvice {
                        name: NamingSuggestion::frame_fallback(&stem),
                        source: AdviceSource::FrameFallback {
                            reason: e.to_string(),
                        },
                    });
                }
            }
        } else {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                NamingFailure::new(
                    NamingFailureKind::Generic,
                    format!("Error analyzing image: {}", e),
                )
            })?;
            (bytes, None::<ExtractedFrame>)
        };

        let raw = self.vision.describe(&image).await?;
        debug!("Vision model answered {:?} for {}", raw, path.display());

        Ok(match clean(&raw) {
            Some(name) => NamingAdvice {
                name,
                source: AdviceSource::Vision,
            },
            None => NamingAdvice {
                name: fallback_name(&stem),
                source: AdviceSource::StemFallback,
            },
        })
    }
}
