//! Filesystem monitoring.

pub mod watcher;

pub use watcher::{FsWatcher, WatchEvent, WatchOptions};
