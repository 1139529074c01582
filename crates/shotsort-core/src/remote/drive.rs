//! Google Drive v3 storage backend over the REST API.
//!
//! Folder lookups use the `files.list` query language, folder creation
//! posts folder metadata, and uploads use a resumable session: the
//! metadata request returns a session URL in `Location`, then the file
//! body is streamed to it with a single `PUT`.

use super::{FolderHandle, StorageBackend, TokenStore};
use crate::config::{AgentConfig, AppConfig, DriveConfig, NetworkConfig};
use crate::{Result, ShotsortError};
use async_trait::async_trait;
use futures::stream;
use reqwest::header;
use serde::Deserialize;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Storage errors carry the Drive text unchanged.
fn drive_err(msg: String) -> ShotsortError {
    ShotsortError::Storage { message: msg }
}

/// Escape a value for use inside a single-quoted Drive query string.
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Build the `files.list` query that finds a folder by exact name.
pub fn folder_query(name: &str, parent: Option<&FolderHandle>) -> String {
    let mut query = format!(
        "mimeType='{}' and name='{}' and trashed=false",
        DriveConfig::FOLDER_MIME_TYPE,
        escape_query_value(name)
    );
    if let Some(parent) = parent {
        query.push_str(&format!(
            " and '{}' in parents",
            escape_query_value(parent.as_str())
        ));
    }
    query
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Google Drive backend.
pub struct DriveBackend {
    api_base: String,
    client: reqwest::Client,
    /// Client with no total timeout for file bodies.
    upload_client: reqwest::Client,
    tokens: TokenStore,
}

impl DriveBackend {
    /// Create a backend talking to `api_base` (e.g. `https://www.googleapis.com`).
    pub fn new(tokens: TokenStore, api_base: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(NetworkConfig::REQUEST_TIMEOUT)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| ShotsortError::BackendInit {
                message: format!("Failed to build Drive HTTP client: {}", e),
            })?;

        let upload_client = reqwest::Client::builder()
            .connect_timeout(NetworkConfig::CONNECT_TIMEOUT)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| ShotsortError::BackendInit {
                message: format!("Failed to build Drive upload client: {}", e),
            })?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
            upload_client,
            tokens,
        })
    }

    /// Connect using the credential and token files named in `config`.
    ///
    /// Fails with a startup error when the credentials file is missing,
    /// the token file cannot be read, or the token endpoint rejects the
    /// refresh. An unreachable token endpoint stays a network error.
    pub async fn connect(config: &AgentConfig) -> Result<Self> {
        if !config.credentials_path.exists() {
            return Err(ShotsortError::CredentialsMissing(
                config.credentials_path.clone(),
            ));
        }

        let tokens = TokenStore::load(&config.token_path)?;
        tokens
            .access_token()
            .await
            .map_err(|e| match e {
                ShotsortError::Auth { message } => ShotsortError::BackendInit { message },
                other => other,
            })?;

        info!("Connected to Google Drive");
        Self::new(tokens, DriveConfig::API_BASE)
    }

    async fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.tokens.access_token().await?))
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(drive_err(format!(
            "Drive API {} returned {}: {}",
            what,
            status,
            body.trim()
        )))
    }
}

#[async_trait]
impl StorageBackend for DriveBackend {
    fn name(&self) -> &'static str {
        "google-drive"
    }

    async fn find_folder(
        &self,
        name: &str,
        parent: Option<&FolderHandle>,
    ) -> Result<Option<FolderHandle>> {
        let url = format!("{}/drive/v3/files", self.api_base);
        let query = folder_query(name, parent);
        debug!("Drive folder lookup: {}", query);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, self.bearer().await?)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
            ])
            .send()
            .await
            .map_err(|e| drive_err(format!("Drive folder lookup failed: {}", e)))?;

        let list: FileList = Self::check(response, "files.list")
            .await?
            .json()
            .await
            .map_err(|e| drive_err(format!("Invalid files.list response: {}", e)))?;

        Ok(list.files.into_iter().next().map(|f| FolderHandle::new(f.id)))
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&FolderHandle>,
    ) -> Result<FolderHandle> {
        let url = format!("{}/drive/v3/files", self.api_base);
        let mut body = serde_json::json!({
            "name": name,
            "mimeType": DriveConfig::FOLDER_MIME_TYPE,
        });
        if let Some(parent) = parent {
            body["parents"] = serde_json::json!([parent.as_str()]);
        }

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.bearer().await?)
            .query(&[("fields", "id")])
            .json(&body)
            .send()
            .await
            .map_err(|e| drive_err(format!("Drive folder creation failed: {}", e)))?;

        let created: DriveFile = Self::check(response, "files.create")
            .await?
            .json()
            .await
            .map_err(|e| drive_err(format!("Invalid files.create response: {}", e)))?;

        Ok(FolderHandle::new(created.id))
    }

    async fn upload_file(
        &self,
        path: &Path,
        file_name: &str,
        parent: &FolderHandle,
    ) -> Result<String> {
        let file_size = tokio::fs::metadata(path)
            .await
            .map_err(|e| drive_err(format!("Error uploading file: {}", e)))?
            .len();

        // Step 1: open a resumable session.
        let url = format!("{}/upload/drive/v3/files", self.api_base);
        let metadata = serde_json::json!({
            "name": file_name,
            "parents": [parent.as_str()],
        });

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.bearer().await?)
            .header("X-Upload-Content-Length", file_size)
            .query(&[("uploadType", "resumable"), ("fields", "id")])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| drive_err(format!("Drive upload session request failed: {}", e)))?;

        let response = Self::check(response, "upload session").await?;
        let session_url = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| drive_err("Drive upload session returned no Location".to_string()))?;

        // Step 2: stream the body to the session.
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| drive_err(format!("Error uploading file: {}", e)))?;

        let file_stream = stream::unfold(file, |mut file| async move {
            let mut buf = vec![0u8; DriveConfig::UPLOAD_CHUNK_SIZE];
            match file.read(&mut buf).await {
                Ok(0) => None,
                Ok(n) => {
                    buf.truncate(n);
                    Some((Ok::<_, std::io::Error>(bytes::Bytes::from(buf)), file))
                }
                Err(e) => Some((Err(e), file)),
            }
        });

        info!(
            "Uploading {} ({:.1} MB) to Drive",
            file_name,
            file_size as f64 / 1_048_576.0
        );

        let response = self
            .upload_client
            .put(&session_url)
            .header(header::AUTHORIZATION, self.bearer().await?)
            .header(header::CONTENT_LENGTH, file_size)
            .body(reqwest::Body::wrap_stream(file_stream))
            .send()
            .await
            .map_err(|e| drive_err(format!("Drive upload failed: {}", e)))?;

        let uploaded: DriveFile = Self::check(response, "upload")
            .await?
            .json()
            .await
            .map_err(|e| drive_err(format!("Invalid upload response: {}", e)))?;

        Ok(uploaded.id)
    }
}
