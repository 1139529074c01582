//! HTTP client for the Ollama vision endpoint.
//!
//! One synchronous `POST /api/generate` per image, no streaming and no
//! retries. Failures come back as a [`NamingFailure`] whose kind tells the
//! caller what went wrong.

use super::{NamingFailure, NamingFailureKind};
use crate::config::{AppConfig, NamingConfig, NetworkConfig};
use crate::{Result, ShotsortError};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Describes an image in a few words.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Ask the model for a short filename-style description of `image`.
    async fn describe(&self, image: &[u8]) -> std::result::Result<String, NamingFailure>;
}

/// Body of `POST /api/generate`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Non-streamed response from `POST /api/generate`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Vision client for a running Ollama instance.
#[derive(Debug, Clone)]
pub struct OllamaVisionClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaVisionClient {
    /// Create a client for `base_url` using `model`.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(NetworkConfig::CONNECT_TIMEOUT)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| ShotsortError::Config {
                message: format!("Failed to build vision HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_send_error(&self, err: reqwest::Error) -> NamingFailure {
        if err.is_timeout() {
            NamingFailure::new(NamingFailureKind::Timeout, "Ollama request timed out.")
        } else if err.is_connect() {
            NamingFailure::new(
                NamingFailureKind::ConnectionRefused,
                format!(
                    "Cannot connect to Ollama at {}. Make sure Ollama is running with 'ollama serve'.",
                    self.base_url
                ),
            )
        } else {
            NamingFailure::new(
                NamingFailureKind::Generic,
                format!("Error analyzing image: {}", err),
            )
        }
    }
}

#[async_trait]
impl VisionClient for OllamaVisionClient {
    async fn describe(&self, image: &[u8]) -> std::result::Result<String, NamingFailure> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: NamingConfig::PROMPT,
            images: vec![base64::engine::general_purpose::STANDARD.encode(image)],
            stream: false,
            options: GenerateOptions {
                temperature: NamingConfig::TEMPERATURE,
            },
        };

        debug!(
            "Requesting description from {} ({} byte image, model {})",
            url,
            image.len(),
            self.model
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NamingFailure::new(
                NamingFailureKind::HttpStatus(status.as_u16()),
                format!("Ollama API returned {}", status.as_u16()),
            ));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                NamingFailure::new(NamingFailureKind::Timeout, "Ollama request timed out.")
            } else {
                NamingFailure::new(
                    NamingFailureKind::Generic,
                    format!("Error analyzing image: invalid response: {}", e),
                )
            }
        })?;

        Ok(parsed.response.trim().to_string())
    }
}
