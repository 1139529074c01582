//! Shotsort Core - screenshot and screen recording triage.
//!
//! Scans a watch directory for screenshots and screen recordings, asks a
//! local vision model for a descriptive name, files each one into a
//! `{year}/{month}/{images|videos}` folder tree in remote storage and
//! removes the local copy once the upload is confirmed.
//!
//! # Example
//!
//! ```rust,ignore
//! use shotsort_core::{AgentConfig, DriveBackend, Orchestrator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> shotsort_core::Result<()> {
//!     let config = AgentConfig::new("/home/me/Desktop");
//!     let backend = Arc::new(DriveBackend::connect(&config).await?);
//!
//!     let mut orchestrator = Orchestrator::from_config(&config, backend)?;
//!     let report = orchestrator.run_batch().await;
//!     println!("{}", report.render_table());
//!
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod remote;
pub mod scanner;

// Re-export commonly used types
pub use cancel::StopSignal;
pub use config::{parse_bool_flag, AgentConfig};
pub use error::{ErrorCategory, Result, ShotsortError};
pub use naming::{
    AdviceSource, NamingAdvice, NamingAdvisor, NamingFailure, NamingFailureKind,
    NamingSuggestion,
};
pub use pipeline::{FileReport, FileStage, FileStatus, Orchestrator, RunReport};
pub use remote::{
    DriveBackend, FolderHandle, MemoryBackend, RemotePathResolver, StorageBackend,
    UploadCommitter, UploadOutcome,
};
pub use scanner::{classify, CandidateFile, MediaKind, Scanner};
