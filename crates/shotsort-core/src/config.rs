//! Centralized configuration for Shotsort.
//!
//! Fixed values live in constant groups; per-run settings live in
//! [`AgentConfig`], which the binary fills from flags and environment.

use std::path::PathBuf;
use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const USER_AGENT: &'static str = "shotsort/0.1";
}

/// Naming advisor constants.
pub struct NamingConfig;

impl NamingConfig {
    pub const PROMPT: &'static str = "Analyze this screenshot and generate a short, descriptive filename (no extension). \
         Requirements: 2-4 words, all lowercase, use underscores for spaces only, \
         alphanumeric and underscore only [a-z0-9_]. \
         Examples: login_screen, payment_form, error_message, dashboard_view. \
         Return ONLY the filename, nothing else.";
    pub const TEMPERATURE: f32 = 0.3;
    pub const MIN_NAME_LENGTH: usize = 2;
    pub const MAX_NAME_LENGTH: usize = 64;
    pub const FALLBACK_PREFIX: &'static str = "screenshot_";
    pub const FALLBACK_STEM_CHARS: usize = 15;
    pub const FRAME_FALLBACK_PREFIX: &'static str = "error_video_frame_";
    pub const DEFAULT_FFMPEG: &'static str = "ffmpeg";
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const DEFAULT_OLLAMA_URL: &'static str = "http://localhost:11434";
    pub const DEFAULT_VISION_MODEL: &'static str = "llava:7b";
    pub const INFERENCE_TIMEOUT: Duration = Duration::from_secs(120);
    pub const FRAME_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Google Drive endpoints and transfer settings.
pub struct DriveConfig;

impl DriveConfig {
    pub const API_BASE: &'static str = "https://www.googleapis.com";
    pub const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    pub const FOLDER_MIME_TYPE: &'static str = "application/vnd.google-apps.folder";
    pub const UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;
    /// Refresh an access token this long before it expires.
    pub const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(60);
    pub const DEFAULT_CREDENTIALS_FILE: &'static str = "credentials.json";
    pub const DEFAULT_TOKEN_FILE: &'static str = "token.json";
}

/// Settings for one agent run.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Directory scanned for screenshots and recordings (not recursive).
    pub watch_dir: PathBuf,
    /// Whether the naming advisor runs before upload.
    pub analyze_images: bool,
    /// Base URL of the Ollama server.
    pub ollama_url: String,
    /// Vision model used for naming.
    pub vision_model: String,
    pub inference_timeout: Duration,
    pub frame_timeout: Duration,
    /// ffmpeg executable used for frame extraction.
    pub ffmpeg_path: PathBuf,
    /// OAuth client secrets file.
    pub credentials_path: PathBuf,
    /// Authorized-user token file.
    pub token_path: PathBuf,
}

impl AgentConfig {
    /// Create a config for `watch_dir` with every other setting defaulted.
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            analyze_images: true,
            ollama_url: NetworkConfig::DEFAULT_OLLAMA_URL.to_string(),
            vision_model: NetworkConfig::DEFAULT_VISION_MODEL.to_string(),
            inference_timeout: NetworkConfig::INFERENCE_TIMEOUT,
            frame_timeout: NetworkConfig::FRAME_EXTRACTION_TIMEOUT,
            ffmpeg_path: PathBuf::from(NamingConfig::DEFAULT_FFMPEG),
            credentials_path: PathBuf::from(DriveConfig::DEFAULT_CREDENTIALS_FILE),
            token_path: PathBuf::from(DriveConfig::DEFAULT_TOKEN_FILE),
        }
    }

    pub fn with_analyze_images(mut self, enabled: bool) -> Self {
        self.analyze_images = enabled;
        self
    }

    pub fn with_ollama(mut self, url: impl Into<String>, model: impl Into<String>) -> Self {
        self.ollama_url = url.into();
        self.vision_model = model.into();
        self
    }

    pub fn with_credentials(
        mut self,
        credentials_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Self {
        self.credentials_path = credentials_path.into();
        self.token_path = token_path.into();
        self
    }
}

/// Interpret an on/off toggle such as `ANALYZE_IMAGES`.
///
/// `0`, `false` and `no` (any case) turn the feature off; anything else,
/// including an empty value, leaves it on.
pub fn parse_bool_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no"
    )
}
