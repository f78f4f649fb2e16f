//! Command-line argument definitions using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{Config, MatchStrategy, MergePolicy};

/// Gallery acquisition pipeline CLI.
#[derive(Parser, Debug)]
#[command(
    name = "gallery-acquire",
    version,
    about = "Scan, hash and enrich manga/doujinshi galleries",
    long_about = "Discovers gallery folders and archives under library roots, computes \
                  content hashes for identity, optionally fetches remote metadata, and \
                  can monitor the library for filesystem changes."
)]
pub struct Args {
    /// Library root directories. Can specify multiple roots.
    #[arg(short, long, num_args = 1..)]
    pub root: Option<Vec<PathBuf>>,

    /// Run mode.
    #[arg(long, value_enum, default_value_t = RunMode::Scan)]
    pub mode: RunMode,

    /// Treat every subfolder (recursively) as its own gallery.
    #[arg(long)]
    pub subfolder_as_gallery: bool,

    /// Merge policy for fetched metadata.
    #[arg(long, value_enum)]
    pub merge: Option<MergePolicyArg>,

    /// Prefer original-language titles.
    #[arg(long)]
    pub use_original_title: bool,

    /// Always take the first candidate on ambiguous matches.
    #[arg(long)]
    pub first_hit: bool,

    /// Remote source JSON API endpoint.
    #[arg(long, env = "EHEN_API_URL")]
    pub api_url: Option<String>,

    /// Member id cookie for the members-only mirror.
    #[arg(long, env = "EHEN_MEMBER_ID")]
    pub member_id: Option<String>,

    /// Pass hash cookie for the members-only mirror.
    #[arg(long, env = "EHEN_PASS_HASH")]
    pub pass_hash: Option<String>,

    /// Per-request deadline in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Watcher debounce in seconds.
    #[arg(long)]
    pub debounce: Option<u64>,

    /// Path to configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

/// What the invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Scan the roots and report discovered galleries.
    Scan,
    /// Scan, then fetch remote metadata for the discovered galleries.
    Fetch,
    /// Scan, then keep monitoring the roots for filesystem changes.
    Watch,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Scan => write!(f, "scan"),
            RunMode::Fetch => write!(f, "fetch"),
            RunMode::Watch => write!(f, "watch"),
        }
    }
}

/// CLI merge policy argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MergePolicyArg {
    /// Overwrite every field with remote values.
    Replace,
    /// Only fill fields that are empty locally; union tags.
    FillMissing,
}

impl From<MergePolicyArg> for MergePolicy {
    fn from(arg: MergePolicyArg) -> Self {
        match arg {
            MergePolicyArg::Replace => MergePolicy::Replace,
            MergePolicyArg::FillMissing => MergePolicy::FillMissing,
        }
    }
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        if let Some(roots) = &self.root {
            config.library.roots = roots.clone();
        }

        if self.subfolder_as_gallery {
            config.library.subfolder_as_gallery = true;
        }

        if let Some(merge) = self.merge {
            config.fetch.merge_policy = merge.into();
        }

        if self.use_original_title {
            config.fetch.use_original_title = true;
        }

        if self.first_hit {
            config.fetch.match_strategy = MatchStrategy::FirstHit;
        }

        if let Some(api_url) = &self.api_url {
            config.fetch.api_url = api_url.clone();
        }

        if let Some(member_id) = &self.member_id {
            config.fetch.member_id = Some(member_id.clone());
        }

        if let Some(pass_hash) = &self.pass_hash {
            config.fetch.pass_hash = Some(pass_hash.clone());
        }

        if let Some(timeout) = self.timeout {
            config.fetch.request_timeout_seconds = timeout;
        }

        if let Some(debounce) = self.debounce {
            config.watch.debounce_seconds = debounce;
        }
    }
}
