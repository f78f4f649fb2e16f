//! Configuration structures and loading logic.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::modes::{MatchStrategy, MergePolicy};
use crate::error::{Error, Result};
use crate::fetch::{FetchOptions, MergeOptions};
use crate::scan::ScanOptions;
use crate::source::ehen::ExCredentials;
use crate::watch::WatchOptions;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

/// Library layout configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Root directories scanned for galleries.
    #[serde(default)]
    pub roots: Vec<PathBuf>,

    /// Directories watched for filesystem changes. Defaults to `roots`.
    #[serde(default)]
    pub monitor_paths: Vec<PathBuf>,

    /// Paths never turned into galleries.
    #[serde(default)]
    pub ignore_paths: Vec<PathBuf>,

    /// Treat every subfolder (recursively) as its own gallery.
    #[serde(default)]
    pub subfolder_as_gallery: bool,
}

/// Remote metadata fetching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// JSON API endpoint of the remote source.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Cookie pair for the members-only mirror.
    #[serde(default)]
    pub member_id: Option<String>,

    #[serde(default)]
    pub pass_hash: Option<String>,

    #[serde(default)]
    pub merge_policy: MergePolicy,

    #[serde(default)]
    pub match_strategy: MatchStrategy,

    /// Prefer original-language titles when the source has them.
    #[serde(default)]
    pub use_original_title: bool,

    /// Skip hash resolution when a stored link is still recognized.
    #[serde(default = "default_true")]
    pub use_gallery_link: bool,

    /// Treat a local category of "Other" as empty under fill-missing.
    #[serde(default = "default_true")]
    pub treat_other_as_empty: bool,

    /// Per-request deadline in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            member_id: None,
            pass_hash: None,
            merge_policy: MergePolicy::default(),
            match_strategy: MatchStrategy::default(),
            use_original_title: false,
            use_gallery_link: true,
            treat_other_as_empty: true,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Filesystem watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Seconds between a raw create notification and the propose-add event.
    #[serde(default = "default_debounce")]
    pub debounce_seconds: u64,

    /// Archive extensions (without dot) the watcher ignores.
    #[serde(default)]
    pub ignore_exts: HashSet<String>,

    /// Ignore plain directories entirely.
    #[serde(default)]
    pub ignore_folders: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_seconds: default_debounce(),
            ignore_exts: HashSet::new(),
            ignore_folders: false,
        }
    }
}

fn default_api_url() -> String {
    "https://api.e-hentai.org/api.php".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_debounce() -> u64 {
    8
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}. Create one from config.example.toml",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Default configuration file location.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "gallery-acquire")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Paths the watcher monitors: `monitor_paths`, falling back to `roots`.
    pub fn monitor_paths(&self) -> &[PathBuf] {
        if self.library.monitor_paths.is_empty() {
            &self.library.roots
        } else {
            &self.library.monitor_paths
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            subfolder_as_gallery: self.library.subfolder_as_gallery,
        }
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            policy: self.fetch.merge_policy,
            use_original_title: self.fetch.use_original_title,
            treat_other_as_empty: self.fetch.treat_other_as_empty,
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            merge: self.merge_options(),
            strategy: self.fetch.match_strategy,
            use_gallery_link: self.fetch.use_gallery_link,
            deadline: Duration::from_secs(self.fetch.request_timeout_seconds),
        }
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            debounce: Duration::from_secs(self.watch.debounce_seconds),
            ignore_exts: self
                .watch
                .ignore_exts
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            ignore_folders: self.watch.ignore_folders,
        }
    }

    /// Cookie credentials when both halves are configured.
    pub fn credentials(&self) -> Option<ExCredentials> {
        match (&self.fetch.member_id, &self.fetch.pass_hash) {
            (Some(member_id), Some(pass_hash)) => Some(ExCredentials {
                member_id: member_id.clone(),
                pass_hash: pass_hash.clone(),
            }),
            _ => None,
        }
    }
}
