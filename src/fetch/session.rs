//! Batch metadata fetching.
//!
//! At most one fetch session runs per process. Exclusivity is a single-permit
//! semaphore acquired for the session's lifetime and released on every exit
//! path by the permit guard; a second `run` while one is active fails
//! immediately with [`Error::SessionBusy`] instead of queuing.

use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::archive::ArchiveReader;
use crate::config::MatchStrategy;
use crate::error::{Error, Result};
use crate::fetch::matcher::{MatchOutcome, RemoteMatcher};
use crate::fetch::merge::{merge, MergeOptions};
use crate::gallery::Gallery;
use crate::hash::Hasher;
use crate::source::{DecisionHandler, RemoteSource};

/// Process-wide session gate.
static FETCH_GATE: Semaphore = Semaphore::const_new(1);

/// Terminal state of one gallery in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Matched and merged.
    Matched,
    /// The source does not know this gallery.
    NoMatch,
    /// Multiple candidates and no choice was made.
    Ambiguous,
    /// Hash, transport or source failure.
    Error,
}

/// Per-gallery session outcome.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Index of the gallery in the batch.
    pub index: usize,
    pub title: String,
    pub status: FetchStatus,
    pub error: Option<String>,
}

/// Aggregate result of one session.
#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    pub succeeded: usize,
    pub no_match: usize,
    pub ambiguous: usize,
    pub errored: usize,
    /// Set when an auth-level source failure aborted the remaining batch.
    pub fatal: Option<String>,
}

/// Session progress stream.
#[derive(Debug, Clone)]
pub enum FetchEvent {
    Progress(String),
    Outcome(FetchOutcome),
    Summary(FetchSummary),
}

/// Session behavior switches.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub merge: MergeOptions,
    pub strategy: MatchStrategy,
    /// Skip hash resolution when a stored link is recognized by the source.
    pub use_gallery_link: bool,
    /// Deadline for each remote call.
    pub deadline: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            merge: MergeOptions::default(),
            strategy: MatchStrategy::default(),
            use_gallery_link: true,
            deadline: Duration::from_secs(30),
        }
    }
}

/// Orchestrates hash → match → merge over a batch of galleries.
pub struct FetchSession<'a> {
    source: &'a dyn RemoteSource,
    decider: &'a dyn DecisionHandler,
    archives: &'a dyn ArchiveReader,
    options: FetchOptions,
    events: Option<UnboundedSender<FetchEvent>>,
    gate: &'a Semaphore,
}

impl<'a> FetchSession<'a> {
    pub fn new(
        source: &'a dyn RemoteSource,
        decider: &'a dyn DecisionHandler,
        archives: &'a dyn ArchiveReader,
        options: FetchOptions,
    ) -> Self {
        Self {
            source,
            decider,
            archives,
            options,
            events: None,
            gate: &FETCH_GATE,
        }
    }

    /// Attach a progress-event channel.
    pub fn with_events(mut self, events: UnboundedSender<FetchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Substitute the exclusivity gate. Tests use private gates so they do
    /// not contend with each other.
    #[cfg(test)]
    fn with_gate(mut self, gate: &'a Semaphore) -> Self {
        self.gate = gate;
        self
    }

    fn emit(&self, event: FetchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Run the session over `galleries`, mutating matched entries in place.
    ///
    /// Fails fast with [`Error::SessionBusy`] if another session holds the
    /// gate. All other failures are per-item and land in the summary; an
    /// auth-level source failure aborts the remaining items but preserves
    /// completed outcomes.
    pub async fn run(&self, galleries: &mut [Gallery]) -> Result<FetchSummary> {
        let _permit = self.gate.try_acquire().map_err(|_| Error::SessionBusy)?;
        tracing::info!(count = galleries.len(), "fetch session started");

        let matcher = RemoteMatcher::new(self.source, self.options.deadline);
        let hasher = Hasher::new(self.archives);
        let total = galleries.len();
        let mut summary = FetchSummary::default();

        for (index, gallery) in galleries.iter_mut().enumerate() {
            self.emit(FetchEvent::Progress(format!(
                "({}/{}) Generating gallery hash: {}",
                index + 1,
                total,
                gallery.title
            )));

            // A gallery is never matched without a hash. Stored hashes are
            // reused; one is picked at random when several exist.
            let hash = if gallery.hashes.is_empty() {
                match hasher.ensure_mid_hash(gallery) {
                    Ok(hash) => hash,
                    Err(e) => {
                        self.finish_item(
                            &mut summary,
                            FetchOutcome {
                                index,
                                title: gallery.title.clone(),
                                status: FetchStatus::Error,
                                error: Some(format!("could not generate hash: {}", e)),
                            },
                        );
                        continue;
                    }
                }
            } else {
                let pick = rand::thread_rng().gen_range(0..gallery.hashes.len());
                gallery.hashes[pick].clone()
            };

            // Cheap pre-check: a stored link the source still recognizes
            // skips hash resolution entirely.
            let url = if self.options.use_gallery_link
                && gallery
                    .link
                    .as_deref()
                    .map(|l| self.source.recognizes_url(l))
                    .unwrap_or(false)
            {
                gallery.link.clone().expect("link checked above")
            } else {
                self.emit(FetchEvent::Progress(format!(
                    "({}/{}) Finding url for gallery: {}",
                    index + 1,
                    total,
                    gallery.title
                )));
                match matcher.resolve(&hash).await {
                    Ok(MatchOutcome::Single(candidate)) => candidate.url,
                    Ok(MatchOutcome::Ambiguous(candidates)) => {
                        let choice = match self.options.strategy {
                            MatchStrategy::FirstHit => candidates.first().cloned(),
                            MatchStrategy::Defer => {
                                // Suspension point: only this session waits on
                                // the decision collaborator.
                                self.decider.choose(&gallery.title, &candidates).await
                            }
                        };
                        match choice {
                            Some(candidate) => candidate.url,
                            None => {
                                self.finish_item(
                                    &mut summary,
                                    FetchOutcome {
                                        index,
                                        title: gallery.title.clone(),
                                        status: FetchStatus::Ambiguous,
                                        error: None,
                                    },
                                );
                                continue;
                            }
                        }
                    }
                    Ok(MatchOutcome::NoMatch) => {
                        self.finish_item(
                            &mut summary,
                            FetchOutcome {
                                index,
                                title: gallery.title.clone(),
                                status: FetchStatus::NoMatch,
                                error: None,
                            },
                        );
                        continue;
                    }
                    Err(e) => {
                        let fatal = e.is_fatal();
                        self.finish_item(
                            &mut summary,
                            FetchOutcome {
                                index,
                                title: gallery.title.clone(),
                                status: FetchStatus::Error,
                                error: Some(e.to_string()),
                            },
                        );
                        if fatal {
                            summary.fatal = Some(e.to_string());
                            tracing::error!(error = %e, "session-fatal source failure");
                            break;
                        }
                        continue;
                    }
                }
            };

            self.emit(FetchEvent::Progress(format!(
                "({}/{}) Applying metadata: {}",
                index + 1,
                total,
                gallery.title
            )));

            match timeout(self.options.deadline, self.source.fetch_metadata(&url)).await {
                Ok(Ok(meta)) => {
                    *gallery = merge(gallery, &meta, &self.options.merge);
                    if gallery.link.is_none()
                        || self.options.merge.policy == crate::config::MergePolicy::Replace
                    {
                        gallery.link = Some(url);
                    }
                    self.finish_item(
                        &mut summary,
                        FetchOutcome {
                            index,
                            title: gallery.title.clone(),
                            status: FetchStatus::Matched,
                            error: None,
                        },
                    );
                }
                Ok(Err(e)) => {
                    let fatal = e.is_fatal();
                    self.finish_item(
                        &mut summary,
                        FetchOutcome {
                            index,
                            title: gallery.title.clone(),
                            status: FetchStatus::Error,
                            error: Some(e.to_string()),
                        },
                    );
                    if fatal {
                        summary.fatal = Some(e.to_string());
                        break;
                    }
                }
                Err(_) => {
                    self.finish_item(
                        &mut summary,
                        FetchOutcome {
                            index,
                            title: gallery.title.clone(),
                            status: FetchStatus::Error,
                            error: Some("timeout".to_string()),
                        },
                    );
                }
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            no_match = summary.no_match,
            errored = summary.errored,
            "fetch session finished"
        );
        self.emit(FetchEvent::Summary(summary.clone()));
        Ok(summary)
    }

    fn finish_item(&self, summary: &mut FetchSummary, outcome: FetchOutcome) {
        match outcome.status {
            FetchStatus::Matched => summary.succeeded += 1,
            FetchStatus::NoMatch => summary.no_match += 1,
            FetchStatus::Ambiguous => summary.ambiguous += 1,
            FetchStatus::Error => summary.errored += 1,
        }
        if let Some(error) = &outcome.error {
            tracing::warn!(title = %outcome.title, error, "fetch item failed");
        }
        self.emit(FetchEvent::Outcome(outcome));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::MemoryArchive;
    use crate::source::{Candidate, RemoteMetadata, RemoteTitle, SourceError};
    use async_trait::async_trait;

    struct TestSource {
        candidates: Vec<Candidate>,
        auth_fail: bool,
        delay: Option<Duration>,
        recognize_links: bool,
    }

    impl Default for TestSource {
        fn default() -> Self {
            Self {
                candidates: vec![],
                auth_fail: false,
                delay: None,
                recognize_links: false,
            }
        }
    }

    #[async_trait]
    impl RemoteSource for TestSource {
        async fn resolve_hash(
            &self,
            _hash: &str,
        ) -> std::result::Result<Vec<Candidate>, SourceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.auth_fail {
                return Err(SourceError::Auth("bad cookie".into()));
            }
            Ok(self.candidates.clone())
        }

        async fn fetch_metadata(
            &self,
            _url: &str,
        ) -> std::result::Result<RemoteMetadata, SourceError> {
            Ok(RemoteMetadata {
                title: RemoteTitle {
                    default: "[Suzuki] Remote Title".to_string(),
                    original: None,
                },
                category: "Doujinshi".to_string(),
                pub_date: None,
                tags: Default::default(),
            })
        }

        fn recognizes_url(&self, _url: &str) -> bool {
            self.recognize_links
        }
    }

    struct PickSecond;

    #[async_trait]
    impl DecisionHandler for PickSecond {
        async fn choose(
            &self,
            _gallery_title: &str,
            candidates: &[Candidate],
        ) -> Option<Candidate> {
            candidates.get(1).cloned()
        }
    }

    struct Decline;

    #[async_trait]
    impl DecisionHandler for Decline {
        async fn choose(&self, _t: &str, _c: &[Candidate]) -> Option<Candidate> {
            None
        }
    }

    fn candidate(n: u32) -> Candidate {
        Candidate {
            title: format!("Title {}", n),
            url: format!("https://e-hentai.org/g/{}/tok/", n),
        }
    }

    fn hashed_gallery(title: &str) -> Gallery {
        let mut g = Gallery::new(format!("/lib/{}", title));
        g.title = title.to_string();
        g.add_hash("deadbeef".to_string());
        g
    }

    #[tokio::test]
    async fn test_second_session_fails_fast() {
        let gate = Semaphore::new(1);
        let archives = MemoryArchive::new();
        let slow = TestSource {
            candidates: vec![candidate(1)],
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let decider = PickSecond;

        let first =
            FetchSession::new(&slow, &decider, &archives, FetchOptions::default()).with_gate(&gate);
        let second =
            FetchSession::new(&slow, &decider, &archives, FetchOptions::default()).with_gate(&gate);

        let mut batch_a = vec![hashed_gallery("a")];
        let mut batch_b = vec![hashed_gallery("b")];

        // join! polls in order: the first session takes the gate on its first
        // poll, the second must reject synchronously.
        let (r1, r2) = tokio::join!(first.run(&mut batch_a), second.run(&mut batch_b));

        let summary = r1.unwrap();
        assert_eq!(summary.succeeded, 1);
        assert!(matches!(r2, Err(Error::SessionBusy)));
        // The rejected call must not have touched the second batch.
        assert!(batch_b[0].link.is_none());
    }

    #[tokio::test]
    async fn test_gate_released_after_run() {
        let gate = Semaphore::new(1);
        let archives = MemoryArchive::new();
        let source = TestSource {
            candidates: vec![candidate(1)],
            ..Default::default()
        };
        let decider = PickSecond;

        let session = FetchSession::new(&source, &decider, &archives, FetchOptions::default())
            .with_gate(&gate);
        session.run(&mut [hashed_gallery("a")]).await.unwrap();

        // A later session acquires the gate again.
        let again = FetchSession::new(&source, &decider, &archives, FetchOptions::default())
            .with_gate(&gate);
        assert!(again.run(&mut [hashed_gallery("b")]).await.is_ok());
    }

    #[tokio::test]
    async fn test_ambiguous_deferred_choice() {
        let gate = Semaphore::new(1);
        let archives = MemoryArchive::new();
        let source = TestSource {
            candidates: vec![candidate(1), candidate(2)],
            ..Default::default()
        };
        let decider = PickSecond;

        let session = FetchSession::new(&source, &decider, &archives, FetchOptions::default())
            .with_gate(&gate);
        let mut batch = vec![hashed_gallery("a")];
        let summary = session.run(&mut batch).await.unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.ambiguous, 0);
        // The chosen (second) candidate's URL was used.
        assert_eq!(batch[0].link.as_deref(), Some(candidate(2).url.as_str()));
    }

    #[tokio::test]
    async fn test_ambiguous_declined() {
        let gate = Semaphore::new(1);
        let archives = MemoryArchive::new();
        let source = TestSource {
            candidates: vec![candidate(1), candidate(2)],
            ..Default::default()
        };
        let decider = Decline;

        let session = FetchSession::new(&source, &decider, &archives, FetchOptions::default())
            .with_gate(&gate);
        let mut batch = vec![hashed_gallery("a")];
        let summary = session.run(&mut batch).await.unwrap();

        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.ambiguous, 1);
        assert!(batch[0].link.is_none());
    }

    #[tokio::test]
    async fn test_no_match_outcome() {
        let gate = Semaphore::new(1);
        let archives = MemoryArchive::new();
        let source = TestSource::default();
        let decider = PickSecond;

        let session = FetchSession::new(&source, &decider, &archives, FetchOptions::default())
            .with_gate(&gate);
        let summary = session.run(&mut [hashed_gallery("a")]).await.unwrap();

        assert_eq!(summary.no_match, 1);
        assert_eq!(summary.succeeded, 0);
        assert!(summary.fatal.is_none());
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_batch() {
        let gate = Semaphore::new(1);
        let archives = MemoryArchive::new();
        let source = TestSource {
            auth_fail: true,
            ..Default::default()
        };
        let decider = PickSecond;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let session = FetchSession::new(&source, &decider, &archives, FetchOptions::default())
            .with_gate(&gate)
            .with_events(tx);
        let mut batch = vec![hashed_gallery("a"), hashed_gallery("b"), hashed_gallery("c")];
        let summary = session.run(&mut batch).await.unwrap();

        // First item errored, remaining items never ran.
        assert_eq!(summary.errored, 1);
        assert!(summary.fatal.is_some());

        let mut outcomes = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, FetchEvent::Outcome(_)) {
                outcomes += 1;
            }
        }
        assert_eq!(outcomes, 1);
    }

    #[tokio::test]
    async fn test_recognized_link_skips_resolution() {
        let gate = Semaphore::new(1);
        let archives = MemoryArchive::new();
        // No candidates: resolution would yield NoMatch, so a Matched outcome
        // proves the stored link short-circuited the matcher.
        let source = TestSource {
            recognize_links: true,
            ..Default::default()
        };
        let decider = PickSecond;

        let session = FetchSession::new(&source, &decider, &archives, FetchOptions::default())
            .with_gate(&gate);
        let mut gallery = hashed_gallery("a");
        gallery.link = Some("https://e-hentai.org/g/99/tok/".to_string());
        let mut batch = vec![gallery];
        let summary = session.run(&mut batch).await.unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.no_match, 0);
    }

    #[tokio::test]
    async fn test_missing_hash_without_pages_is_item_error() {
        let gate = Semaphore::new(1);
        let archives = MemoryArchive::new();
        let source = TestSource {
            candidates: vec![candidate(1)],
            ..Default::default()
        };
        let decider = PickSecond;

        let session = FetchSession::new(&source, &decider, &archives, FetchOptions::default())
            .with_gate(&gate);
        // No hashes and no chapters: hashing must fail, batch must continue.
        let mut broken = Gallery::new("/lib/broken");
        broken.title = "broken".to_string();
        let mut batch = vec![broken, hashed_gallery("ok")];
        let summary = session.run(&mut batch).await.unwrap();

        assert_eq!(summary.errored, 1);
        assert_eq!(summary.succeeded, 1);
    }
}
