//! Content hashing for gallery identity.
//!
//! A gallery's identity hash is the digest of one or more of its page images.
//! The default selector samples the middle page of the first chapter, keeping
//! hashing O(1) in page count; callers wanting lower false-match risk hash
//! every page and store the full set.

use std::path::Path;

use md5::{Digest, Md5};

use crate::archive::ArchiveReader;
use crate::error::{Error, Result};
use crate::gallery::{is_image_file, list_dir_sorted, Gallery};

/// Which page(s) of a chapter contribute to the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelector {
    /// The representative middle page: index `floor(count / 2)`.
    Middle,
    /// A specific zero-based page index.
    Page(usize),
    /// Every page, one hash each.
    All,
}

/// Computes content hashes for galleries.
pub struct Hasher<'a> {
    archives: &'a dyn ArchiveReader,
}

impl<'a> Hasher<'a> {
    pub fn new(archives: &'a dyn ArchiveReader) -> Self {
        Self { archives }
    }

    /// Hash the selected page(s) of the gallery's first chapter.
    ///
    /// Deterministic and content-only: the same page bytes produce the same
    /// hash wherever the gallery lives on disk.
    pub fn compute(&self, gallery: &Gallery, selector: PageSelector) -> Result<Vec<String>> {
        let chapter = gallery
            .chapters
            .first()
            .ok_or_else(|| Error::Hash(format!("gallery has no chapters: {}", gallery.title)))?;

        let pages = if chapter.in_archive {
            let locator = chapter.path.to_string_lossy().into_owned();
            let mut pages = self.archives.list_pages(&gallery.path, &locator)?;
            pages.sort();
            PageSource::Archive(pages)
        } else {
            let pages: Vec<_> = list_dir_sorted(&chapter.path)
                .map_err(|e| Error::Hash(format!("cannot list {}: {}", chapter.path.display(), e)))?
                .into_iter()
                .filter(|p| is_image_file(p))
                .collect();
            PageSource::Directory(pages)
        };

        let count = pages.len();
        if count == 0 {
            return Err(Error::Hash(format!(
                "no pages to hash in {}",
                gallery.path.display()
            )));
        }

        let indices: Vec<usize> = match selector {
            PageSelector::Middle => vec![count / 2],
            PageSelector::Page(n) => {
                if n >= count {
                    return Err(Error::Hash(format!(
                        "page {} out of range ({} pages)",
                        n, count
                    )));
                }
                vec![n]
            }
            PageSelector::All => (0..count).collect(),
        };

        let mut hashes = Vec::with_capacity(indices.len());
        for index in indices {
            let bytes = pages.read(self, &gallery.path, index)?;
            hashes.push(digest(&bytes));
        }
        Ok(hashes)
    }

    /// Memoized mid-page hash: computes and records it only when the gallery
    /// carries no hashes yet.
    pub fn ensure_mid_hash(&self, gallery: &mut Gallery) -> Result<String> {
        if let Some(hash) = gallery.hashes.first() {
            return Ok(hash.clone());
        }
        let hash = self
            .compute(gallery, PageSelector::Middle)?
            .pop()
            .expect("Middle selector yields one hash");
        gallery.add_hash(hash.clone());
        Ok(hash)
    }
}

enum PageSource {
    Directory(Vec<std::path::PathBuf>),
    Archive(Vec<String>),
}

impl PageSource {
    fn len(&self) -> usize {
        match self {
            PageSource::Directory(pages) => pages.len(),
            PageSource::Archive(pages) => pages.len(),
        }
    }

    fn read(&self, hasher: &Hasher<'_>, gallery_path: &Path, index: usize) -> Result<Vec<u8>> {
        match self {
            PageSource::Directory(pages) => std::fs::read(&pages[index])
                .map_err(|e| Error::Hash(format!("cannot read {}: {}", pages[index].display(), e))),
            PageSource::Archive(pages) => hasher.archives.read_page(gallery_path, &pages[index]),
        }
    }
}

/// MD5 digest of raw bytes, hex-encoded.
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
