//! Per-file processing stages.
//!
//! ```text
//! Discovered -> Renaming -> DateResolved -> FolderResolved -> Uploaded -> Finalized
//!      \____________\_____________\_______________\______________\__> Failed
//! ```
//!
//! `Renaming` is skipped when naming is disabled. `Failed` and
//! `Finalized` are absorbing.

use serde::{Deserialize, Serialize};

/// Stage of one file in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStage {
    /// Returned by the scanner, nothing done yet
    Discovered,
    /// Naming advice requested, local rename attempted
    Renaming,
    /// Year and month taken from the modification time
    DateResolved,
    /// Remote folder path exists
    FolderResolved,
    /// Remote copy confirmed
    Uploaded,
    /// Marked processed, local delete attempted
    Finalized,
    Failed,
}

impl FileStage {
    /// Ordinal on the success path. `Failed` has none.
    fn position(self) -> Option<u8> {
        match self {
            FileStage::Discovered => Some(0),
            FileStage::Renaming => Some(1),
            FileStage::DateResolved => Some(2),
            FileStage::FolderResolved => Some(3),
            FileStage::Uploaded => Some(4),
            FileStage::Finalized => Some(5),
            FileStage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FileStage::Finalized | FileStage::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Forward moves go one step at a time, except that `Discovered` may
    /// jump straight to `DateResolved` when naming is off. Any
    /// non-terminal stage may fail.
    pub fn can_advance_to(self, next: FileStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == FileStage::Failed {
            return true;
        }
        match (self.position(), next.position()) {
            (Some(from), Some(to)) => {
                to == from + 1
                    || (self == FileStage::Discovered && next == FileStage::DateResolved)
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for FileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FileStage::Discovered => "discovered",
            FileStage::Renaming => "renaming",
            FileStage::DateResolved => "date_resolved",
            FileStage::FolderResolved => "folder_resolved",
            FileStage::Uploaded => "uploaded",
            FileStage::Finalized => "finalized",
            FileStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        use FileStage::*;
        let path = [Discovered, Renaming, DateResolved, FolderResolved, Uploaded, Finalized];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_rename_can_be_skipped() {
        assert!(FileStage::Discovered.can_advance_to(FileStage::DateResolved));
        assert!(!FileStage::Discovered.can_advance_to(FileStage::FolderResolved));
    }

    #[test]
    fn test_no_backwards_or_skipping_upload() {
        assert!(!FileStage::Uploaded.can_advance_to(FileStage::Renaming));
        assert!(!FileStage::FolderResolved.can_advance_to(FileStage::Finalized));
    }

    #[test]
    fn test_terminal_stages_absorb() {
        assert!(FileStage::Failed.is_terminal());
        assert!(FileStage::Finalized.is_terminal());
        assert!(!FileStage::Failed.can_advance_to(FileStage::Discovered));
        assert!(!FileStage::Finalized.can_advance_to(FileStage::Failed));
        assert!(FileStage::FolderResolved.can_advance_to(FileStage::Failed));
    }
}
