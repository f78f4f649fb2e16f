//! Filesystem change monitoring.
//!
//! Raw notifications from `notify` are reclassified into catalog-intent
//! events: a debounced create becomes a propose-add, a delete or move of a
//! cataloged gallery becomes a propose-remove or propose-path-update. Events
//! are handed off over an unbounded channel, so a slow consumer never stalls
//! delivery of later filesystem changes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::archive::is_archive_path;
use crate::catalog::CatalogStore;
use crate::error::Result;
use crate::gallery::{normalized, Gallery};

/// A watcher-emitted, not-yet-applied suggestion for a catalog mutation.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A new gallery candidate appeared on disk.
    ProposeAdd { path: PathBuf },
    /// A cataloged gallery's path disappeared.
    ProposeRemove { gallery: Gallery },
    /// A cataloged gallery was moved or renamed.
    ProposePathUpdate { gallery: Gallery, dest: PathBuf },
}

/// Watcher behavior switches.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Delay between a raw create notification and the propose-add event.
    /// Creates for the same path within the window collapse into one event.
    pub debounce: Duration,
    /// Archive extensions (lowercase, no dot) to ignore.
    pub ignore_exts: HashSet<String>,
    /// Ignore plain directories entirely.
    pub ignore_folders: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(8),
            ignore_exts: HashSet::new(),
            ignore_folders: false,
        }
    }
}

/// Shared classification state, driven by the notify callback and exercised
/// directly by tests.
struct WatchCore {
    catalog: Arc<dyn CatalogStore>,
    options: WatchOptions,
    tx: UnboundedSender<WatchEvent>,
    runtime: tokio::runtime::Handle,
    /// Paths with a debounce timer in flight.
    pending: Mutex<HashSet<PathBuf>>,
    /// One-shot suppression token, consumed by the next event whose path
    /// matches it.
    suppress: Mutex<Option<PathBuf>>,
}

impl WatchCore {
    fn consume_suppression(&self, path: &Path) -> bool {
        let mut slot = self.suppress.lock().unwrap();
        if slot.as_deref() == Some(normalized(path).as_path()) {
            *slot = None;
            return true;
        }
        false
    }

    fn passes_filter(&self, path: &Path, is_dir: bool) -> bool {
        if is_dir {
            return !self.options.ignore_folders;
        }
        if !is_archive_path(path) {
            return false;
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        !self.options.ignore_exts.contains(&ext)
    }

    /// A create burst (copy in progress) collapses to one propose-add,
    /// emitted after the debounce window.
    fn on_created(self: &Arc<Self>, path: PathBuf, is_dir: bool) {
        if self.consume_suppression(&path) {
            return;
        }
        if !self.passes_filter(&path, is_dir) {
            return;
        }

        let key = normalized(&path);
        {
            let mut pending = self.pending.lock().unwrap();
            if !pending.insert(key.clone()) {
                return;
            }
        }

        let core = Arc::clone(self);
        let debounce = self.options.debounce;
        self.runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            core.pending.lock().unwrap().remove(&key);
            tracing::debug!(path = %path.display(), "proposing gallery add");
            let _ = core.tx.send(WatchEvent::ProposeAdd { path });
        });
    }

    fn on_deleted(&self, path: PathBuf) {
        if self.consume_suppression(&path) {
            return;
        }
        // Not every deleted path is a cataloged gallery; unknown paths drop.
        if let Some(gallery) = self.catalog.find_by_path(&path) {
            tracing::debug!(path = %path.display(), "proposing gallery removal");
            let _ = self.tx.send(WatchEvent::ProposeRemove { gallery });
        }
    }

    fn on_moved(&self, from: PathBuf, to: PathBuf, is_dir: bool) {
        if self.consume_suppression(&from) {
            return;
        }
        if !self.passes_filter(&from, is_dir) {
            return;
        }
        // The source path identifies the gallery; a move reconciles without
        // a rescan.
        if let Some(gallery) = self.catalog.find_by_path(&from) {
            tracing::debug!(
                from = %from.display(),
                to = %to.display(),
                "proposing gallery path update"
            );
            let _ = self.tx.send(WatchEvent::ProposePathUpdate { gallery, dest: to });
        }
    }
}

/// Watches configured roots and emits [`WatchEvent`]s.
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
    core: Arc<WatchCore>,
    rx: UnboundedReceiver<WatchEvent>,
}

impl FsWatcher {
    /// Start watching `roots` recursively. Must be called within a tokio
    /// runtime; debounce timers run on it.
    pub fn new(
        roots: &[PathBuf],
        catalog: Arc<dyn CatalogStore>,
        options: WatchOptions,
    ) -> Result<Self> {
        let (tx, rx) = unbounded_channel();
        let core = Arc::new(WatchCore {
            catalog,
            options,
            tx,
            runtime: tokio::runtime::Handle::current(),
            pending: Mutex::new(HashSet::new()),
            suppress: Mutex::new(None),
        });

        let callback_core = Arc::clone(&core);
        let mut watcher = notify::recommended_watcher(
            move |event: std::result::Result<notify::Event, notify::Error>| {
                match event {
                    Ok(event) => dispatch(&callback_core, event),
                    Err(error) => tracing::warn!(%error, "filesystem watcher error"),
                }
            },
        )?;

        for root in roots {
            if let Err(error) = watcher.watch(root, RecursiveMode::Recursive) {
                tracing::error!(path = %root.display(), %error, "could not monitor path");
            } else {
                tracing::info!(path = %root.display(), "monitoring path");
            }
        }

        Ok(Self {
            _watcher: watcher,
            core,
            rx,
        })
    }

    /// Arm the one-shot suppression token: the next event matching `path` is
    /// swallowed. Used before catalog-driven filesystem operations so the
    /// watcher does not loop a self-inflicted change back as a user action.
    pub fn suppress_next(&self, path: &Path) {
        *self.core.suppress.lock().unwrap() = Some(normalized(path));
    }

    /// Receive the next propose-event.
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive.
    pub fn try_next_event(&mut self) -> Option<WatchEvent> {
        self.rx.try_recv().ok()
    }
}

fn dispatch(core: &Arc<WatchCore>, event: notify::Event) {
    match event.kind {
        EventKind::Create(_) => {
            for path in event.paths {
                let is_dir = path.is_dir();
                core.on_created(path, is_dir);
            }
        }
        EventKind::Remove(_) => {
            for path in event.paths {
                core.on_deleted(path);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if event.paths.len() >= 2 {
                let from = event.paths[0].clone();
                let to = event.paths[1].clone();
                let is_dir = to.is_dir();
                core.on_moved(from, to, is_dir);
            }
        }
        // Platforms reporting rename halves separately: the vacated path
        // behaves like a delete, the new path like a create.
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            for path in event.paths {
                core.on_deleted(path);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in event.paths {
                let is_dir = path.is_dir();
                core.on_created(path, is_dir);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;

    fn test_core(
        catalog: Arc<dyn CatalogStore>,
        debounce_ms: u64,
    ) -> (Arc<WatchCore>, UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = unbounded_channel();
        let core = Arc::new(WatchCore {
            catalog,
            options: WatchOptions {
                debounce: Duration::from_millis(debounce_ms),
                ..Default::default()
            },
            tx,
            runtime: tokio::runtime::Handle::current(),
            pending: Mutex::new(HashSet::new()),
            suppress: Mutex::new(None),
        });
        (core, rx)
    }

    fn catalog_with(path: &str) -> Arc<MemoryCatalog> {
        Arc::new(MemoryCatalog::with_galleries(vec![Gallery::new(path)]))
    }

    #[tokio::test]
    async fn test_create_burst_collapses_to_one_event() {
        let (core, mut rx) = test_core(Arc::new(MemoryCatalog::new()), 30);

        for _ in 0..5 {
            core.on_created(PathBuf::from("/lib/New Gallery"), true);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(matches!(
            rx.try_recv(),
            Ok(WatchEvent::ProposeAdd { path }) if path == PathBuf::from("/lib/New Gallery")
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_create_emits_again_after_window() {
        let (core, mut rx) = test_core(Arc::new(MemoryCatalog::new()), 20);

        core.on_created(PathBuf::from("/lib/G"), true);
        tokio::time::sleep(Duration::from_millis(60)).await;
        core.on_created(PathBuf::from("/lib/G"), true);
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delete_of_cataloged_gallery() {
        let (core, mut rx) = test_core(catalog_with("/lib/A"), 10);

        core.on_deleted(PathBuf::from("/lib/A"));
        match rx.try_recv() {
            Ok(WatchEvent::ProposeRemove { gallery }) => {
                assert_eq!(gallery.path, PathBuf::from("/lib/A"));
            }
            other => panic!("expected ProposeRemove, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_of_unknown_path_is_dropped() {
        let (core, mut rx) = test_core(catalog_with("/lib/A"), 10);

        core.on_deleted(PathBuf::from("/lib/unrelated"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_move_becomes_path_update_not_delete_create() {
        let (core, mut rx) = test_core(catalog_with("/lib/A"), 10);

        core.on_moved(PathBuf::from("/lib/A"), PathBuf::from("/lib/B"), true);

        match rx.try_recv() {
            Ok(WatchEvent::ProposePathUpdate { gallery, dest }) => {
                assert_eq!(gallery.path, PathBuf::from("/lib/A"));
                assert_eq!(dest, PathBuf::from("/lib/B"));
            }
            other => panic!("expected ProposePathUpdate, got {:?}", other),
        }
        // Exactly one event: no delete+create pair.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_suppression_is_one_shot_and_path_matched() {
        let (core, mut rx) = test_core(catalog_with("/lib/A"), 10);
        *core.suppress.lock().unwrap() = Some(normalized(Path::new("/lib/A")));

        // An unrelated event does not consume the token.
        core.on_deleted(PathBuf::from("/lib/unrelated"));
        assert!(core.suppress.lock().unwrap().is_some());

        // The matching event is swallowed and consumes the token.
        core.on_deleted(PathBuf::from("/lib/A"));
        assert!(rx.try_recv().is_err());
        assert!(core.suppress.lock().unwrap().is_none());

        // The next matching event goes through.
        core.on_deleted(PathBuf::from("/lib/A"));
        assert!(matches!(rx.try_recv(), Ok(WatchEvent::ProposeRemove { .. })));
    }

    #[tokio::test]
    async fn test_filter_rejects_plain_files() {
        let (core, mut rx) = test_core(Arc::new(MemoryCatalog::new()), 10);

        core.on_created(PathBuf::from("/lib/notes.txt"), false);
        core.on_created(PathBuf::from("/lib/gallery.zip"), false);
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Only the archive survived the filter.
        assert!(matches!(
            rx.try_recv(),
            Ok(WatchEvent::ProposeAdd { path }) if path == PathBuf::from("/lib/gallery.zip")
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ignored_extension_is_filtered() {
        let (tx, mut rx) = unbounded_channel();
        let core = Arc::new(WatchCore {
            catalog: Arc::new(MemoryCatalog::new()),
            options: WatchOptions {
                debounce: Duration::from_millis(10),
                ignore_exts: ["rar".to_string()].into_iter().collect(),
                ignore_folders: false,
            },
            tx,
            runtime: tokio::runtime::Handle::current(),
            pending: Mutex::new(HashSet::new()),
            suppress: Mutex::new(None),
        });

        core.on_created(PathBuf::from("/lib/g.rar"), false);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }
}
