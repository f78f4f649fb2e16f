//! Download queue processing.
//!
//! Items move `Queued → Downloading → ReadyToImport → Cataloged`, with
//! `Failed` reachable from the first two states or from a failed import.
//! The queue is FIFO by enqueue time and one item's terminal failure never
//! blocks the items behind it.

use std::collections::VecDeque;

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::archive::ArchiveReader;
use crate::catalog::CatalogStore;
use crate::config::MergePolicy;
use crate::download::item::{DownloadItem, DownloadKind, DownloadStatus};
use crate::fetch::merge::{merge, MergeOptions};
use crate::gallery::GalleryBuilder;
use crate::source::RemoteMetadata;

/// Performs the actual byte transfer for a download item. The torrent client
/// or HTTP fetcher lives outside this crate.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Transfer the item's payload, returning the on-disk path of the result.
    async fn fetch(&self, item: &DownloadItem) -> std::result::Result<PathBuf, String>;
}

/// State-change notifications.
#[derive(Debug, Clone)]
pub struct DownloadEvent {
    pub id: Uuid,
    pub status: DownloadStatus,
}

/// FIFO queue turning finished downloads into cataloged galleries.
pub struct DownloadQueue<'a> {
    transfer: &'a dyn Transfer,
    catalog: &'a dyn CatalogStore,
    archives: &'a dyn ArchiveReader,
    items: VecDeque<DownloadItem>,
    events: Option<UnboundedSender<DownloadEvent>>,
}

impl<'a> DownloadQueue<'a> {
    pub fn new(
        transfer: &'a dyn Transfer,
        catalog: &'a dyn CatalogStore,
        archives: &'a dyn ArchiveReader,
    ) -> Self {
        Self {
            transfer,
            catalog,
            archives,
            items: VecDeque::new(),
            events: None,
        }
    }

    /// Attach a state-change event channel.
    pub fn with_events(mut self, events: UnboundedSender<DownloadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Add an item to the back of the queue.
    pub fn enqueue(
        &mut self,
        source_url: impl Into<String>,
        kind: DownloadKind,
        metadata: Option<RemoteMetadata>,
    ) -> Uuid {
        let mut item = DownloadItem::new(source_url, kind);
        item.metadata = metadata;
        let id = item.id;
        tracing::info!(%id, url = %item.source_url, kind = %item.kind, "download queued");
        self.items.push_back(item);
        id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drain the queue front to back, returning every item in its terminal
    /// state.
    pub async fn process_all(&mut self) -> Vec<DownloadItem> {
        let mut done = Vec::new();
        while let Some(mut item) = self.items.pop_front() {
            self.process(&mut item).await;
            done.push(item);
        }
        done
    }

    async fn process(&self, item: &mut DownloadItem) {
        self.set_status(item, DownloadStatus::Downloading);

        match self.transfer.fetch(item).await {
            Ok(path) => {
                item.resolved_path = Some(path);
                self.set_status(item, DownloadStatus::ReadyToImport);
            }
            Err(reason) => {
                item.error = Some(reason);
                self.set_status(item, DownloadStatus::Failed);
                return;
            }
        }

        self.import(item);
    }

    /// `ReadyToImport → Cataloged` runs the same builder pass a scan would;
    /// a skip fails the item instead of silently dropping it.
    fn import(&self, item: &mut DownloadItem) {
        let path = item
            .resolved_path
            .clone()
            .expect("import requires a resolved path");

        let known = self.catalog.known_paths();
        let ignore = Vec::new();
        let builder = GalleryBuilder::new(&known, &ignore, self.archives);

        match builder.build(&path, None, true, None) {
            Ok(mut gallery) => {
                if let Some(meta) = &item.metadata {
                    gallery = merge(
                        &gallery,
                        meta,
                        &MergeOptions {
                            policy: MergePolicy::Replace,
                            ..Default::default()
                        },
                    );
                    gallery.link = Some(item.source_url.clone());
                }
                self.catalog.insert(&gallery);
                self.set_status(item, DownloadStatus::Cataloged);
            }
            Err(reason) => {
                item.error = Some(reason.to_string());
                self.set_status(item, DownloadStatus::Failed);
            }
        }
    }

    fn set_status(&self, item: &mut DownloadItem, status: DownloadStatus) {
        item.status = status;
        tracing::debug!(id = %item.id, %status, "download state change");
        if let Some(tx) = &self.events {
            let _ = tx.send(DownloadEvent {
                id: item.id,
                status,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::MemoryArchive;
    use crate::catalog::MemoryCatalog;
    use crate::source::RemoteTitle;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;

    struct ScriptedTransfer {
        results: HashMap<String, std::result::Result<PathBuf, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransfer {
        fn new(results: HashMap<String, std::result::Result<PathBuf, String>>) -> Self {
            Self {
                results,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transfer for ScriptedTransfer {
        async fn fetch(&self, item: &DownloadItem) -> std::result::Result<PathBuf, String> {
            self.calls.lock().unwrap().push(item.source_url.clone());
            self.results
                .get(&item.source_url)
                .cloned()
                .unwrap_or_else(|| Err("unknown url".to_string()))
        }
    }

    fn gallery_dir(root: &std::path::Path, name: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("001.jpg"), b"x").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_successful_download_is_cataloged() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = gallery_dir(tmp.path(), "Alice - Story");

        let transfer = ScriptedTransfer::new(
            [("u1".to_string(), Ok(dir.clone()))].into_iter().collect(),
        );
        let catalog = MemoryCatalog::new();
        let archives = MemoryArchive::new();
        let mut queue = DownloadQueue::new(&transfer, &catalog, &archives);

        queue.enqueue("u1", DownloadKind::Archive, None);
        let done = queue.process_all().await;

        assert_eq!(done.len(), 1);
        assert_eq!(done[0].status, DownloadStatus::Cataloged);
        assert_eq!(done[0].resolved_path.as_deref(), Some(dir.as_path()));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.all()[0].title, "Story");
    }

    #[tokio::test]
    async fn test_failed_transfer_does_not_block_queue() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = gallery_dir(tmp.path(), "Bob - Tale");

        let transfer = ScriptedTransfer::new(
            [
                ("bad".to_string(), Err("connection reset".to_string())),
                ("good".to_string(), Ok(dir)),
            ]
            .into_iter()
            .collect(),
        );
        let catalog = MemoryCatalog::new();
        let archives = MemoryArchive::new();
        let mut queue = DownloadQueue::new(&transfer, &catalog, &archives);

        queue.enqueue("bad", DownloadKind::Archive, None);
        queue.enqueue("good", DownloadKind::Archive, None);
        let done = queue.process_all().await;

        assert_eq!(done[0].status, DownloadStatus::Failed);
        assert_eq!(done[0].error.as_deref(), Some("connection reset"));
        assert_eq!(done[1].status, DownloadStatus::Cataloged);
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_fifo_processing_order() {
        let transfer = ScriptedTransfer::new(HashMap::new());
        let catalog = MemoryCatalog::new();
        let archives = MemoryArchive::new();
        let mut queue = DownloadQueue::new(&transfer, &catalog, &archives);

        queue.enqueue("first", DownloadKind::Archive, None);
        queue.enqueue("second", DownloadKind::Torrent, None);
        queue.enqueue("third", DownloadKind::Archive, None);
        queue.process_all().await;

        assert_eq!(
            *transfer.calls.lock().unwrap(),
            vec!["first", "second", "third"]
        );
    }

    #[tokio::test]
    async fn test_import_skip_fails_item_with_reason() {
        let tmp = tempfile::tempdir().unwrap();
        let empty = tmp.path().join("empty");
        fs::create_dir_all(&empty).unwrap();

        let transfer = ScriptedTransfer::new(
            [("u".to_string(), Ok(empty))].into_iter().collect(),
        );
        let catalog = MemoryCatalog::new();
        let archives = MemoryArchive::new();
        let mut queue = DownloadQueue::new(&transfer, &catalog, &archives);

        queue.enqueue("u", DownloadKind::Archive, None);
        let done = queue.process_all().await;

        assert_eq!(done[0].status, DownloadStatus::Failed);
        assert_eq!(done[0].error.as_deref(), Some("empty directory"));
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_supplied_metadata_is_merged_with_replace() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = gallery_dir(tmp.path(), "raw folder name");

        let transfer = ScriptedTransfer::new(
            [("u".to_string(), Ok(dir))].into_iter().collect(),
        );
        let catalog = MemoryCatalog::new();
        let archives = MemoryArchive::new();
        let mut queue = DownloadQueue::new(&transfer, &catalog, &archives);

        let meta = RemoteMetadata {
            title: RemoteTitle {
                default: "[Suzuki] Proper Title".to_string(),
                original: None,
            },
            category: "Doujinshi".to_string(),
            pub_date: None,
            tags: Default::default(),
        };
        queue.enqueue("u", DownloadKind::Archive, Some(meta));
        let done = queue.process_all().await;

        assert_eq!(done[0].status, DownloadStatus::Cataloged);
        let cataloged = &catalog.all()[0];
        assert_eq!(cataloged.title, "Proper Title");
        assert_eq!(cataloged.artist, "Suzuki");
        assert_eq!(cataloged.category, "Doujinshi");
        assert_eq!(cataloged.link.as_deref(), Some("u"));
    }

    #[tokio::test]
    async fn test_events_track_state_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = gallery_dir(tmp.path(), "Alice - Story");

        let transfer = ScriptedTransfer::new(
            [("u".to_string(), Ok(dir))].into_iter().collect(),
        );
        let catalog = MemoryCatalog::new();
        let archives = MemoryArchive::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut queue = DownloadQueue::new(&transfer, &catalog, &archives).with_events(tx);

        queue.enqueue("u", DownloadKind::Archive, None);
        queue.process_all().await;

        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            states.push(event.status);
        }
        assert_eq!(
            states,
            vec![
                DownloadStatus::Downloading,
                DownloadStatus::ReadyToImport,
                DownloadStatus::Cataloged
            ]
        );
    }
}
