//! Field-level metadata merging.

use crate::config::MergePolicy;
use crate::gallery::{capitalize, parse_title, Gallery};
use crate::source::RemoteMetadata;

/// Merge behavior switches.
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    pub policy: MergePolicy,
    /// Prefer the source's original-language title variant when present.
    pub use_original_title: bool,
    /// Under `FillMissing`, treat a local category of `"Other"` as empty.
    pub treat_other_as_empty: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            policy: MergePolicy::FillMissing,
            use_original_title: false,
            treat_other_as_empty: true,
        }
    }
}

/// Combine remote metadata into a gallery under the given policy.
///
/// Returns the updated gallery; the catalog is untouched. Merging the same
/// payload twice yields the same gallery.
pub fn merge(gallery: &Gallery, meta: &RemoteMetadata, options: &MergeOptions) -> Gallery {
    let mut merged = gallery.clone();

    let raw_title = match (&meta.title.original, options.use_original_title) {
        (Some(original), true) => original.as_str(),
        _ => meta.title.default.as_str(),
    };
    let parsed = parse_title(raw_title);
    let tag_artist = meta.artist();
    let tag_language = meta.language();

    match options.policy {
        MergePolicy::Replace => {
            merged.title = parsed.title;
            if !parsed.artist.is_empty() {
                merged.artist = parsed.artist;
            }
            merged.language = capitalize(&parsed.language);
            if let Some(artist) = tag_artist {
                merged.artist = artist;
            }
            if let Some(language) = tag_language {
                merged.language = language;
            }
            merged.category = meta.category.clone();
            merged.pub_date = meta.pub_date;
            merged.tags = meta.tags.clone();
        }
        MergePolicy::FillMissing => {
            if merged.title.is_empty() {
                merged.title = parsed.title;
            }
            if merged.artist.is_empty() {
                merged.artist = tag_artist.unwrap_or(parsed.artist);
            }
            if merged.language.is_empty() {
                merged.language = tag_language.unwrap_or_else(|| capitalize(&parsed.language));
            }
            let category_empty = merged.category.is_empty()
                || (options.treat_other_as_empty && merged.category == "Other");
            if category_empty {
                merged.category = meta.category.clone();
            }
            if merged.pub_date.is_none() {
                merged.pub_date = meta.pub_date;
            }
            // Tags union rather than replace: remote tags are appended to
            // each namespace bucket, duplicates suppressed.
            for (namespace, tags) in &meta.tags {
                for tag in tags {
                    merged.add_tag(namespace, tag);
                }
            }
        }
    }

    merged
}
