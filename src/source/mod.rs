//! Remote metadata source interface.
//!
//! A remote source resolves content hashes to candidate galleries and serves
//! full metadata for a gallery URL. The bundled [`EhenClient`] talks to an
//! e-hentai-style JSON API; embedders can supply any other implementation.

pub mod ehen;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gallery::capitalize;

pub use ehen::EhenClient;

/// One hash-lookup hit: a candidate remote gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub url: String,
}

/// Title variants a source may supply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteTitle {
    /// The source's designated default-language title.
    pub default: String,
    /// Original-language variant, when the source carries one.
    pub original: Option<String>,
}

/// Metadata payload for one remote gallery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteMetadata {
    pub title: RemoteTitle,
    pub category: String,
    pub pub_date: Option<DateTime<Utc>>,
    /// Namespace → ordered tags. Artist and language ride in the `Artist` and
    /// `Language` namespaces.
    pub tags: BTreeMap<String, Vec<String>>,
}

impl RemoteMetadata {
    /// First artist tag, capitalized, if the payload carries one.
    pub fn artist(&self) -> Option<String> {
        self.tags
            .get("Artist")
            .and_then(|tags| tags.first())
            .map(|a| capitalize(a))
    }

    /// First language tag that is not the `translated` marker, capitalized.
    pub fn language(&self) -> Option<String> {
        self.tags
            .get("Language")
            .and_then(|tags| tags.iter().find(|t| t.as_str() != "translated"))
            .map(|l| capitalize(l))
    }
}

/// Failures a remote source can report. `NoMatch` is not an error: a hash
/// legitimately absent from the source comes back as an empty candidate list.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// Credentials rejected. Session-fatal: aborts the remaining batch.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport or protocol failure. Eligible for caller-driven retry.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The caller-supplied deadline elapsed.
    #[error("Request timed out")]
    Timeout,

    /// The source answered with something unparseable.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SourceError {
    /// Whether this failure should abort a whole fetch session rather than
    /// just the current item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Auth(_))
    }
}

/// Hash-to-metadata capability of a remote source.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Resolve a content hash to candidate galleries. An empty list means the
    /// hash is unknown to the source.
    async fn resolve_hash(&self, hash: &str) -> std::result::Result<Vec<Candidate>, SourceError>;

    /// Fetch full metadata for a gallery URL.
    async fn fetch_metadata(&self, url: &str) -> std::result::Result<RemoteMetadata, SourceError>;

    /// Cheap pre-check: whether a stored link points at this source.
    fn recognizes_url(&self, url: &str) -> bool;
}

/// Human-in-the-loop disambiguation for multi-candidate matches. May block the
/// calling fetch session, and only it.
#[async_trait]
pub trait DecisionHandler: Send + Sync {
    /// Pick one candidate, or decline.
    async fn choose(&self, gallery_title: &str, candidates: &[Candidate]) -> Option<Candidate>;
}

/// Strategy that always takes the first candidate.
pub struct FirstCandidate;

#[async_trait]
impl DecisionHandler for FirstCandidate {
    async fn choose(&self, _gallery_title: &str, candidates: &[Candidate]) -> Option<Candidate> {
        candidates.first().cloned()
    }
}
