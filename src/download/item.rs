//! Download item representation.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::source::RemoteMetadata;

/// What kind of payload a download delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadKind {
    /// A gallery archive fetched directly.
    #[default]
    Archive,
    /// A torrent handed to an external client.
    Torrent,
}

impl fmt::Display for DownloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadKind::Archive => write!(f, "archive"),
            DownloadKind::Torrent => write!(f, "torrent"),
        }
    }
}

/// Lifecycle of a download item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    #[default]
    Queued,
    Downloading,
    /// Bytes are on disk at `resolved_path`; awaiting the import pass.
    ReadyToImport,
    /// Imported into the catalog.
    Cataloged,
    Failed,
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Queued => write!(f, "queued"),
            DownloadStatus::Downloading => write!(f, "downloading"),
            DownloadStatus::ReadyToImport => write!(f, "ready to import"),
            DownloadStatus::Cataloged => write!(f, "cataloged"),
            DownloadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One externally-downloaded item tracked from request to catalog.
#[derive(Debug, Clone)]
pub struct DownloadItem {
    pub id: Uuid,
    pub source_url: String,
    pub kind: DownloadKind,
    pub status: DownloadStatus,
    /// Set when the transfer completes.
    pub resolved_path: Option<PathBuf>,
    /// Metadata the source supplied directly, merged at import time.
    pub metadata: Option<RemoteMetadata>,
    pub error: Option<String>,
}

impl DownloadItem {
    pub fn new(source_url: impl Into<String>, kind: DownloadKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_url: source_url.into(),
            kind,
            status: DownloadStatus::Queued,
            resolved_path: None,
            metadata: None,
            error: None,
        }
    }

    /// Whether the item reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            DownloadStatus::Cataloged | DownloadStatus::Failed
        )
    }
}
