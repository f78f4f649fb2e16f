//! Download tracking: queue and item state machine.

pub mod item;
pub mod queue;

pub use item::{DownloadItem, DownloadKind, DownloadStatus};
pub use queue::{DownloadEvent, DownloadQueue, Transfer};
