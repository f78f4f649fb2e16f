//! HTTP client for an e-hentai-style metadata API.
//!
//! Speaks the JSON `gdata` protocol: gallery metadata is fetched by
//! `(gallery id, token)` pairs parsed out of gallery URLs, and hash lookup
//! goes through the sibling `shash` method. Tags arrive as `namespace:tag`
//! strings and are split into namespaced buckets here.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use url::Url;

use crate::source::{Candidate, RemoteMetadata, RemoteSource, RemoteTitle, SourceError};

/// Hosts this client claims ownership of.
const KNOWN_HOSTS: &[&str] = &["e-hentai.org", "exhentai.org"];

/// Cookie pair for the members-only mirror.
#[derive(Debug, Clone)]
pub struct ExCredentials {
    pub member_id: String,
    pub pass_hash: String,
}

/// Remote-source client over the JSON API.
pub struct EhenClient {
    client: Client,
    api_url: String,
    credentials: Option<ExCredentials>,
}

impl EhenClient {
    /// Build a client against `api_url`, optionally authenticated.
    pub fn new(api_url: impl Into<String>, credentials: Option<ExCredentials>) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(crate::Error::Http)?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            credentials,
        })
    }

    fn cookie_header(&self) -> Option<String> {
        self.credentials.as_ref().map(|c| {
            format!("ipb_member_id={}; ipb_pass_hash={}", c.member_id, c.pass_hash)
        })
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        payload: &impl Serialize,
    ) -> std::result::Result<T, SourceError> {
        // Jittered delay keeps request spacing irregular.
        let delay_ms = rand::thread_rng().gen_range(400..750);
        sleep(Duration::from_millis(delay_ms)).await;

        let mut request = self.client.post(&self.api_url).json(payload);
        if let Some(cookie) = self.cookie_header() {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(SourceError::Auth(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(SourceError::Transport(format!("HTTP {}", status)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RemoteSource for EhenClient {
    async fn resolve_hash(&self, hash: &str) -> std::result::Result<Vec<Candidate>, SourceError> {
        tracing::debug!(hash, "resolving hash against remote source");
        let payload = ShashRequest {
            method: "shash",
            shash: hash,
        };
        let response: ShashResponse = self.post(&payload).await?;
        Ok(response
            .results
            .into_iter()
            .map(|r| Candidate {
                title: r.title,
                url: r.url,
            })
            .collect())
    }

    async fn fetch_metadata(&self, url: &str) -> std::result::Result<RemoteMetadata, SourceError> {
        let (id, token) = parse_gallery_url(url)?;
        tracing::debug!(url, id, "fetching gallery metadata");

        let payload = GdataRequest {
            method: "gdata",
            gidlist: vec![(id, token)],
            namespace: 1,
        };
        let response: GdataResponse = self.post(&payload).await?;

        let entry = response
            .gmetadata
            .into_iter()
            .find(|e| e.error.is_none())
            .ok_or_else(|| SourceError::InvalidResponse("no valid gmetadata entry".into()))?;

        Ok(entry.into_metadata())
    }

    fn recognizes_url(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .map(|host| KNOWN_HOSTS.iter().any(|k| host.ends_with(k)))
            .unwrap_or(false)
    }
}

/// Parse `(gallery id, token)` out of a `…/g/{id}/{token}/` gallery URL.
fn parse_gallery_url(url: &str) -> std::result::Result<(u64, String), SourceError> {
    let parsed =
        Url::parse(url).map_err(|e| SourceError::InvalidResponse(format!("bad URL: {}", e)))?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        ["g", id, token] => {
            let id = id
                .parse::<u64>()
                .map_err(|_| SourceError::InvalidResponse(format!("bad gallery id in {}", url)))?;
            Ok((id, token.to_string()))
        }
        _ => Err(SourceError::InvalidResponse(format!(
            "not a gallery URL: {}",
            url
        ))),
    }
}

#[derive(Serialize)]
struct ShashRequest<'a> {
    method: &'static str,
    shash: &'a str,
}

#[derive(Deserialize)]
struct ShashResponse {
    #[serde(default)]
    results: Vec<ShashResult>,
}

#[derive(Deserialize)]
struct ShashResult {
    title: String,
    url: String,
}

#[derive(Serialize)]
struct GdataRequest {
    method: &'static str,
    gidlist: Vec<(u64, String)>,
    namespace: u8,
}

#[derive(Deserialize)]
struct GdataResponse {
    #[serde(default)]
    gmetadata: Vec<GmetadataEntry>,
}

#[derive(Deserialize)]
struct GmetadataEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    title_jpn: String,
    #[serde(default)]
    category: String,
    /// Unix timestamp, as a string per the API.
    #[serde(default)]
    posted: String,
    #[serde(default)]
    tags: Vec<String>,
    error: Option<String>,
}

impl GmetadataEntry {
    fn into_metadata(self) -> RemoteMetadata {
        let mut meta = RemoteMetadata {
            title: RemoteTitle {
                default: self.title,
                original: if self.title_jpn.is_empty() {
                    None
                } else {
                    Some(self.title_jpn)
                },
            },
            category: self.category,
            pub_date: self
                .posted
                .parse::<i64>()
                .ok()
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            tags: Default::default(),
        };

        // "namespace:tag" strings; bare tags land in the default bucket.
        for tag in self.tags {
            let (namespace, value) = match tag.split_once(':') {
                Some((ns, v)) => (normalize_namespace(ns), v.to_string()),
                None => (String::new(), tag),
            };
            let bucket = meta.tags.entry(namespace).or_default();
            if !bucket.contains(&value) {
                bucket.push(value);
            }
        }

        meta
    }
}

/// API namespaces are lowercase; the merge layer expects title-cased keys.
fn normalize_namespace(ns: &str) -> String {
    crate::gallery::capitalize(ns)
}
