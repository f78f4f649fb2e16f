//! Gallery and chapter representation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Namespace → ordered tag list. The empty-string namespace holds
/// un-namespaced tags.
pub type TagMap = BTreeMap<String, Vec<String>>;

/// One cataloged unit of content, made of ordered chapters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gallery {
    /// Filesystem path (directory or archive file).
    pub path: PathBuf,

    /// Sub-path when the gallery lives inside an already-cataloged archive.
    pub path_in_archive: Option<String>,

    /// Whether `path` points at an archive rather than a directory.
    pub is_archive: bool,

    pub title: String,
    pub artist: String,
    pub language: String,

    /// Category ("Doujinshi", "Manga", "Other", ...).
    pub category: String,

    /// Free-form description text.
    pub info: String,

    pub pub_date: Option<DateTime<Utc>>,

    /// Chapters in reading order. Insertion order is significant.
    pub chapters: Vec<Chapter>,

    /// Content hashes, ordered, duplicate-free. The mid-page hash is the
    /// remote lookup key.
    pub hashes: Vec<String>,

    /// Canonical remote URL, once matched.
    pub link: Option<String>,

    pub tags: TagMap,
}

impl Gallery {
    /// Create an empty gallery rooted at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Record a content hash, suppressing duplicates.
    pub fn add_hash(&mut self, hash: String) {
        if !self.hashes.contains(&hash) {
            self.hashes.push(hash);
        }
    }

    /// Total page count across chapters.
    pub fn page_count(&self) -> usize {
        self.chapters.iter().map(|c| c.pages).sum()
    }

    /// Add a tag under a namespace, suppressing duplicates. Use `""` for
    /// un-namespaced tags.
    pub fn add_tag(&mut self, namespace: &str, tag: &str) {
        let bucket = self.tags.entry(namespace.to_string()).or_default();
        if !bucket.iter().any(|t| t == tag) {
            bucket.push(tag.to_string());
        }
    }
}

/// A contiguous page range within a gallery, located at a directory or an
/// archive-internal path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,

    /// Directory path, or entry locator inside the gallery's archive.
    pub path: PathBuf,

    /// Whether `path` is an archive-internal locator.
    pub in_archive: bool,

    /// Number of pages in this chapter.
    pub pages: usize,
}

/// Why a candidate path was not turned into a gallery. Per-item and non-fatal;
/// recorded in the scan result rather than raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The path is already present in the catalog.
    AlreadyExists,
    /// The path matched the configured ignore list.
    Ignored,
    /// The directory holds no usable content.
    EmptyDirectory,
    /// The archive holds no usable content.
    EmptyArchive,
    /// Not a directory and not a recognized archive.
    UnsupportedFile,
    /// Directory contents could not be listed.
    Unreadable,
    /// The archive could not be opened.
    ArchiveError,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyExists => write!(f, "already exists"),
            SkipReason::Ignored => write!(f, "ignored"),
            SkipReason::EmptyDirectory => write!(f, "empty directory"),
            SkipReason::EmptyArchive => write!(f, "empty archive"),
            SkipReason::UnsupportedFile => write!(f, "unsupported file"),
            SkipReason::Unreadable => write!(f, "unreadable path"),
            SkipReason::ArchiveError => write!(f, "error opening archive"),
        }
    }
}

/// Normalize a path for identity comparison. Case is folded so that catalogs
/// populated on case-insensitive filesystems compare equal.
pub fn normalized(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().to_lowercase())
}
