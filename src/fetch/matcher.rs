//! Hash-to-candidate resolution.

use std::time::Duration;

use tokio::time::timeout;

use crate::source::{Candidate, RemoteSource, SourceError};

/// Result of resolving one content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The hash is legitimately absent from the source.
    NoMatch,
    /// Exactly one candidate.
    Single(Candidate),
    /// More than one candidate; disambiguation required.
    Ambiguous(Vec<Candidate>),
}

/// Resolves content hashes against a remote source, bounded by a timeout.
///
/// Adds no logic beyond interpreting candidate-list cardinality. Never
/// retries: retry policy belongs to the caller, which can tell a transport
/// [`SourceError`] apart from a legitimate `NoMatch`.
pub struct RemoteMatcher<'a> {
    source: &'a dyn RemoteSource,
    deadline: Duration,
}

impl<'a> RemoteMatcher<'a> {
    pub fn new(source: &'a dyn RemoteSource, deadline: Duration) -> Self {
        Self { source, deadline }
    }

    /// Resolve `hash` to zero, one or many candidates.
    pub async fn resolve(&self, hash: &str) -> std::result::Result<MatchOutcome, SourceError> {
        let candidates = timeout(self.deadline, self.source.resolve_hash(hash))
            .await
            .map_err(|_| SourceError::Timeout)??;

        Ok(match candidates.len() {
            0 => MatchOutcome::NoMatch,
            1 => MatchOutcome::Single(candidates.into_iter().next().expect("len checked")),
            _ => MatchOutcome::Ambiguous(candidates),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RemoteMetadata;
    use async_trait::async_trait;

    struct FixedSource {
        candidates: Vec<Candidate>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl RemoteSource for FixedSource {
        async fn resolve_hash(
            &self,
            _hash: &str,
        ) -> std::result::Result<Vec<Candidate>, SourceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.candidates.clone())
        }

        async fn fetch_metadata(
            &self,
            _url: &str,
        ) -> std::result::Result<RemoteMetadata, SourceError> {
            Ok(RemoteMetadata::default())
        }

        fn recognizes_url(&self, _url: &str) -> bool {
            false
        }
    }

    fn candidate(n: u32) -> Candidate {
        Candidate {
            title: format!("Title {}", n),
            url: format!("https://e-hentai.org/g/{}/tok/", n),
        }
    }

    #[tokio::test]
    async fn test_no_match() {
        let source = FixedSource {
            candidates: vec![],
            delay: None,
        };
        let matcher = RemoteMatcher::new(&source, Duration::from_secs(1));
        assert_eq!(matcher.resolve("h").await.unwrap(), MatchOutcome::NoMatch);
    }

    #[tokio::test]
    async fn test_single_match() {
        let source = FixedSource {
            candidates: vec![candidate(1)],
            delay: None,
        };
        let matcher = RemoteMatcher::new(&source, Duration::from_secs(1));
        assert_eq!(
            matcher.resolve("h").await.unwrap(),
            MatchOutcome::Single(candidate(1))
        );
    }

    #[tokio::test]
    async fn test_ambiguous_match() {
        let source = FixedSource {
            candidates: vec![candidate(1), candidate(2)],
            delay: None,
        };
        let matcher = RemoteMatcher::new(&source, Duration::from_secs(1));
        assert_eq!(
            matcher.resolve("h").await.unwrap(),
            MatchOutcome::Ambiguous(vec![candidate(1), candidate(2)])
        );
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_error() {
        let source = FixedSource {
            candidates: vec![candidate(1)],
            delay: Some(Duration::from_secs(5)),
        };
        let matcher = RemoteMatcher::new(&source, Duration::from_millis(20));
        assert!(matches!(
            matcher.resolve("h").await,
            Err(SourceError::Timeout)
        ));
    }
}
