//! Per-file and per-run reports.

use super::state::FileStage;
use crate::scanner::MediaKind;
use serde::Serialize;

/// Final status of one attempted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Success,
    /// Remote copy exists but the local file could not be removed.
    UploadedButNotDeleted,
    Failed,
}

impl FileStatus {
    /// `UploadedButNotDeleted` counts as a success.
    pub fn is_success(self) -> bool {
        !matches!(self, FileStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Success => "success",
            FileStatus::UploadedButNotDeleted => "uploaded_but_not_deleted",
            FileStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub original_name: String,
    pub kind: MediaKind,
    /// File name after a successful local rename.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_name: Option<String>,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Last stage reached.
    pub stage: FileStage,
    /// Stage that was being attempted when the file failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<FileStage>,
    /// Remote folder, e.g. `2024/1/images`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_file_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl FileReport {
    /// A report for a freshly discovered file. Status stays `Failed` until
    /// the file is finalized.
    pub fn new(original_name: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            original_name: original_name.into(),
            kind,
            suggested_name: None,
            status: FileStatus::Failed,
            error: None,
            stage: FileStage::Discovered,
            failed_at: None,
            remote_path: None,
            remote_file_id: None,
            warnings: Vec::new(),
        }
    }

    /// Move to `next`. Illegal transitions are ignored and return false.
    pub fn advance(&mut self, next: FileStage) -> bool {
        if self.stage.can_advance_to(next) {
            self.stage = next;
            true
        } else {
            false
        }
    }

    /// Record a failure while attempting `attempted`.
    pub fn fail(&mut self, attempted: FileStage, error: impl Into<String>) {
        self.failed_at = Some(attempted);
        self.error = Some(error.into());
        self.status = FileStatus::Failed;
        self.stage = FileStage::Failed;
    }

    /// Record a failure that escaped step handling (a panic).
    pub fn abort(&mut self, error: impl Into<String>) {
        self.failed_at = None;
        self.error = Some(error.into());
        self.status = FileStatus::Failed;
        self.stage = FileStage::Failed;
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Aggregate outcome of one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub total_found: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// True when a stop request ended the batch early.
    pub interrupted: bool,
    /// Scanner diagnostics, e.g. a missing watch directory.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn new(total_found: usize) -> Self {
        Self {
            total_found,
            ..Default::default()
        }
    }

    /// Append a finished file and update the counters.
    pub fn record(&mut self, file: FileReport) {
        self.attempted += 1;
        if file.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.files.push(file);
    }

    pub fn successful(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable report for the terminal.
    pub fn render_table(&self) -> String {
        let rule = "=".repeat(72);
        let mut output = String::new();

        output.push_str(&format!("{rule}\nPROCESSING REPORT\n{rule}\n"));
        output.push_str(&format!("Total files found: {}\n", self.total_found));
        output.push_str(&format!("Files processed:   {}\n", self.attempted));
        output.push_str(&format!("Successful:        {}\n", self.succeeded));
        output.push_str(&format!("Failed:            {}\n", self.failed));
        if self.interrupted {
            output.push_str("Run interrupted before all files were processed.\n");
        }
        for diagnostic in &self.diagnostics {
            output.push_str(&format!("Note: {diagnostic}\n"));
        }

        if self.files.is_empty() {
            output.push_str(&format!("\nNo screenshots or recordings found.\n{rule}\n"));
            return output;
        }

        output.push_str(&format!(
            "\n  {:<30} {:<6} {:<26} {:<24}\n",
            "File", "Type", "Status", "Destination"
        ));
        output.push_str(&format!("  {}\n", "-".repeat(88)));

        for file in &self.files {
            output.push_str(&format!(
                "  {:<30} {:<6} {:<26} {:<24}\n",
                truncate(&file.original_name, 30),
                file.kind.as_str(),
                file.status.as_str(),
                file.remote_path.as_deref().unwrap_or("-"),
            ));
            if let Some(name) = &file.suggested_name {
                output.push_str(&format!("      renamed to: {name}\n"));
            }
            if let Some(error) = &file.error {
                output.push_str(&format!("      error: {error}\n"));
            }
            for warning in &file.warnings {
                output.push_str(&format!("      warning: {warning}\n"));
            }
        }

        output.push_str(&format!("{rule}\n"));
        output
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}
