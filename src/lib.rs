//! gallery-acquire - gallery acquisition pipeline.
//!
//! Discovers manga/doujinshi collections on local storage, computes stable
//! content-hash identities for them, reconciles filesystem state against a
//! catalog, and fetches and merges remote metadata.
//!
//! # Features
//!
//! - Local directory/archive scanning with skip taxonomy and progress events
//! - Mid-page content hashing for dedup and remote lookup
//! - Globally-serialized metadata fetch sessions with ambiguous-match
//!   disambiguation and field-level merge policies
//! - Filesystem watcher reclassifying raw change events into catalog intents
//! - Download queue turning fetched archives/torrents into cataloged galleries
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashSet;
//! use std::path::PathBuf;
//! use gallery_acquire::archive::NoArchiveSupport;
//! use gallery_acquire::scan::{LocalScanner, ScanOptions};
//!
//! let archives = NoArchiveSupport;
//! let scanner = LocalScanner::new(HashSet::new(), Vec::new(), &archives);
//! let result = scanner.scan(&[PathBuf::from("/library")], ScanOptions::default())?;
//! println!("found {} galleries", result.galleries.len());
//! # Ok::<(), gallery_acquire::Error>(())
//! ```

pub mod archive;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fetch;
pub mod gallery;
pub mod hash;
pub mod output;
pub mod scan;
pub mod source;
pub mod watch;

// Re-exports for convenience
pub use catalog::{CatalogStore, MemoryCatalog};
pub use config::{Config, MatchStrategy, MergePolicy};
pub use download::{DownloadItem, DownloadKind, DownloadQueue, DownloadStatus};
pub use error::{Error, Result};
pub use fetch::{FetchOutcome, FetchSession, FetchStatus, FetchSummary};
pub use gallery::{Chapter, Gallery, GalleryBuilder, SkipReason};
pub use hash::{Hasher, PageSelector};
pub use scan::{LocalScanner, ScanOptions, ScanResult};
pub use source::{Candidate, DecisionHandler, RemoteMetadata, RemoteSource};
pub use watch::{FsWatcher, WatchEvent};
