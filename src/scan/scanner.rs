//! Local gallery discovery.
//!
//! A scan walks one or more root directories, turns each candidate entry into
//! a gallery via [`GalleryBuilder`], and reports determinate progress against
//! a total counted up front. Per-item problems are recorded as skips; only an
//! unreadable or empty root aborts the scan.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use walkdir::WalkDir;

use crate::archive::{is_archive_path, ArchiveReader};
use crate::error::{Error, Result};
use crate::gallery::{is_image_file, list_dir_sorted, Gallery, GalleryBuilder, SkipReason};

/// Progress stream of one scan pass.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Count of top-level entries about to be processed.
    Total(usize),
    /// Monotonic counter, emitted after each top-level item.
    Progress(usize),
    /// A candidate path was skipped.
    Skipped(PathBuf, SkipReason),
    /// The scan finished; counts of built and skipped items.
    Finished { built: usize, skipped: usize },
}

/// Scan behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Treat every subfolder (recursively) as its own gallery instead of
    /// treating a root's subfolders as chapter containers.
    pub subfolder_as_gallery: bool,
}

/// Outcome of one scan pass.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub galleries: Vec<Gallery>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
}

/// Walks root paths and materializes candidate galleries.
pub struct LocalScanner<'a> {
    known_paths: HashSet<PathBuf>,
    ignore_list: Vec<PathBuf>,
    archives: &'a dyn ArchiveReader,
    events: Option<UnboundedSender<ScanEvent>>,
    cancel: Arc<AtomicBool>,
}

impl<'a> LocalScanner<'a> {
    pub fn new(
        known_paths: HashSet<PathBuf>,
        ignore_list: Vec<PathBuf>,
        archives: &'a dyn ArchiveReader,
    ) -> Self {
        Self {
            known_paths,
            ignore_list,
            archives,
            events: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attach a progress-event channel.
    pub fn with_events(mut self, events: UnboundedSender<ScanEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Cancellation flag, checked between top-level items. Setting it stops
    /// the scan after the in-flight item completes.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Run one pass over `roots`.
    pub fn scan(&self, roots: &[PathBuf], options: ScanOptions) -> Result<ScanResult> {
        let mut per_root: Vec<(PathBuf, Vec<PathBuf>)> = Vec::with_capacity(roots.len());
        for root in roots {
            let entries = list_dir_sorted(root).map_err(|e| Error::ScanRoot {
                path: root.clone(),
                reason: e.to_string(),
            })?;
            if entries.is_empty() {
                return Err(Error::ScanRoot {
                    path: root.clone(),
                    reason: "empty directory".to_string(),
                });
            }
            per_root.push((root.clone(), entries));
        }

        let total: usize = per_root.iter().map(|(_, e)| e.len()).sum();
        self.emit(ScanEvent::Total(total));
        tracing::info!(total, "starting local scan");

        let builder = GalleryBuilder::new(&self.known_paths, &self.ignore_list, self.archives);
        let mut result = ScanResult::default();
        let mut progress = 0usize;

        'roots: for (_root, entries) in &per_root {
            for entry in entries {
                if self.cancel.load(Ordering::Relaxed) {
                    tracing::info!("scan cancelled");
                    break 'roots;
                }

                if options.subfolder_as_gallery {
                    self.scan_subfolder_mode(&builder, entry, &mut result);
                } else {
                    self.record(builder.build(entry, None, true, None), entry, &mut result);
                }

                progress += 1;
                self.emit(ScanEvent::Progress(progress));
            }
        }

        tracing::info!(
            built = result.galleries.len(),
            skipped = result.skipped.len(),
            "local scan complete"
        );
        self.emit(ScanEvent::Finished {
            built: result.galleries.len(),
            skipped: result.skipped.len(),
        });
        Ok(result)
    }

    /// Subfolder-as-gallery mode: every nested folder holding pages, and every
    /// nested archive, is its own gallery.
    fn scan_subfolder_mode(
        &self,
        builder: &GalleryBuilder<'_>,
        entry: &Path,
        result: &mut ScanResult,
    ) {
        if entry.is_dir() {
            let (folders, archives) = discover_galleries(entry);
            for folder in folders {
                self.record(builder.build(&folder, None, false, None), &folder, result);
            }
            for archive in archives {
                self.record(builder.build(&archive, None, false, None), &archive, result);
            }
        } else if is_archive_path(entry) {
            // A top-level archive may bundle several galleries as internal
            // folders; each becomes its own gallery.
            match self.archives.list_chapters(entry) {
                Ok(chapters) if !chapters.is_empty() => {
                    let mut sorted = chapters;
                    sorted.sort();
                    for locator in sorted {
                        let sub = PathBuf::from(&locator);
                        self.record(
                            builder.build(&sub, Some(locator.as_str()), false, Some(entry)),
                            entry,
                            result,
                        );
                    }
                }
                Ok(_) => self.record(builder.build(entry, None, false, None), entry, result),
                Err(_) => self.record(Err(SkipReason::ArchiveError), entry, result),
            }
        } else {
            self.record(
                Err(SkipReason::UnsupportedFile),
                entry,
                result,
            );
        }
    }

    fn record(
        &self,
        built: std::result::Result<Gallery, SkipReason>,
        path: &Path,
        result: &mut ScanResult,
    ) {
        match built {
            Ok(gallery) => result.galleries.push(gallery),
            Err(reason) => {
                tracing::warn!(path = %path.display(), %reason, "skipped in local scan");
                result.skipped.push((path.to_path_buf(), reason));
                self.emit(ScanEvent::Skipped(path.to_path_buf(), reason));
            }
        }
    }
}

/// Recursively find gallery folders (directories holding pages directly) and
/// archives under `dir`. Returned in sorted path order.
fn discover_galleries(dir: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut folders = Vec::new();
    let mut archives = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if entry.file_type().is_dir() {
            if dir_has_pages(path) {
                folders.push(path.to_path_buf());
            }
        } else if is_archive_path(path) {
            archives.push(path.to_path_buf());
        }
    }

    (folders, archives)
}

fn dir_has_pages(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.any(|e| e.map(|e| is_image_file(&e.path())).unwrap_or(false)))
        .unwrap_or(false)
}
