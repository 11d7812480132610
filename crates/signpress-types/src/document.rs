//! Document lifecycle records

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Lifecycle states for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Sent,
    Signed,
    Expired,
}

impl DocumentStatus {
    /// Terminal state: no further signing activity is accepted.
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Signed)
    }
}

/// The storage layer's view of a document, as handed to the finalize
/// flow. Ownership, signing tokens and timestamps stay with storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub filename: String,
    /// On-disk path of the uploaded source PDF.
    pub file_path: PathBuf,
    pub page_count: u32,
    pub status: DocumentStatus,
    /// Set once the document has been finalized.
    pub signed_file_path: Option<PathBuf>,
}

impl DocumentRecord {
    pub fn new(id: impl Into<String>, filename: impl Into<String>, file_path: PathBuf) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            file_path,
            page_count: 1,
            status: DocumentStatus::Draft,
            signed_file_path: None,
        }
    }
}
