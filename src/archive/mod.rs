//! Archive-reading collaborator interface.
//!
//! The pipeline never parses archive formats itself; it consumes an
//! [`ArchiveReader`] supplied by the embedding application. Entry locators are
//! archive-internal paths with `/` separators, `""` naming the archive root.

use std::path::Path;

use crate::error::Result;

/// File suffixes treated as gallery archives.
pub const ARCHIVE_SUFFIXES: &[&str] = &[".zip", ".cbz", ".rar", ".cbr"];

/// Reads listings and page bytes out of gallery archives.
pub trait ArchiveReader: Send + Sync {
    /// Top-level entry locators of an archive, unordered.
    ///
    /// A flat archive (images at the root) returns an empty list; such an
    /// archive is a single-chapter gallery.
    fn list_chapters(&self, archive: &Path) -> Result<Vec<String>>;

    /// Page locators under a chapter locator (`""` for the archive root).
    fn list_pages(&self, archive: &Path, chapter: &str) -> Result<Vec<String>>;

    /// Raw bytes of one page entry.
    fn read_page(&self, archive: &Path, locator: &str) -> Result<Vec<u8>>;
}

/// Whether a path names a recognized archive file.
pub fn is_archive_path(path: &Path) -> bool {
    let name = path.to_string_lossy().to_lowercase();
    ARCHIVE_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Strip a recognized archive suffix from a display name, if present.
pub fn strip_archive_suffix(name: &str) -> String {
    let lower = name.to_lowercase();
    for suffix in ARCHIVE_SUFFIXES {
        if lower.ends_with(suffix) {
            return name[..name.len() - suffix.len()].to_string();
        }
    }
    name.to_string()
}

/// Reader for embedders that bring no archive support: every archive comes
/// back unreadable and is recorded as a skip. Directory galleries are
/// unaffected.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoArchiveSupport;

impl ArchiveReader for NoArchiveSupport {
    fn list_chapters(&self, archive: &Path) -> Result<Vec<String>> {
        Err(unsupported(archive))
    }

    fn list_pages(&self, archive: &Path, _chapter: &str) -> Result<Vec<String>> {
        Err(unsupported(archive))
    }

    fn read_page(&self, archive: &Path, _locator: &str) -> Result<Vec<u8>> {
        Err(unsupported(archive))
    }
}

fn unsupported(archive: &Path) -> crate::error::Error {
    crate::error::Error::Download(format!(
        "no archive reader configured for {}",
        archive.display()
    ))
}

#[cfg(test)]
pub mod testing {
    //! In-memory archive fixture for unit tests.

    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};

    use super::ArchiveReader;
    use crate::error::{Error, Result};

    /// Maps archive path → entry locator → page bytes. Locators with a `/`
    /// belong to the chapter named by their first segment.
    #[derive(Debug, Default)]
    pub struct MemoryArchive {
        entries: BTreeMap<PathBuf, BTreeMap<String, Vec<u8>>>,
    }

    impl MemoryArchive {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_page(&mut self, archive: impl Into<PathBuf>, locator: &str, bytes: &[u8]) {
            self.entries
                .entry(archive.into())
                .or_default()
                .insert(locator.to_string(), bytes.to_vec());
        }

        fn archive(&self, path: &Path) -> Result<&BTreeMap<String, Vec<u8>>> {
            self.entries
                .get(path)
                .ok_or_else(|| Error::Download(format!("no such archive: {}", path.display())))
        }
    }

    impl ArchiveReader for MemoryArchive {
        fn list_chapters(&self, archive: &Path) -> Result<Vec<String>> {
            let mut chapters: Vec<String> = self
                .archive(archive)?
                .keys()
                .filter_map(|k| k.split_once('/').map(|(dir, _)| dir.to_string()))
                .collect();
            chapters.dedup();
            Ok(chapters)
        }

        fn list_pages(&self, archive: &Path, chapter: &str) -> Result<Vec<String>> {
            Ok(self
                .archive(archive)?
                .keys()
                .filter(|k| {
                    if chapter.is_empty() {
                        !k.contains('/')
                    } else {
                        k.starts_with(&format!("{}/", chapter))
                    }
                })
                .cloned()
                .collect())
        }

        fn read_page(&self, archive: &Path, locator: &str) -> Result<Vec<u8>> {
            self.archive(archive)?
                .get(locator)
                .cloned()
                .ok_or_else(|| Error::Download(format!("no such entry: {}", locator)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_archive_path() {
        assert!(is_archive_path(Path::new("/lib/Bob - Tale.zip")));
        assert!(is_archive_path(Path::new("/lib/a.CBZ")));
        assert!(!is_archive_path(Path::new("/lib/folder")));
        assert!(!is_archive_path(Path::new("/lib/readme.txt")));
    }

    #[test]
    fn test_strip_archive_suffix() {
        assert_eq!(strip_archive_suffix("Bob - Tale.zip"), "Bob - Tale");
        assert_eq!(strip_archive_suffix("plain name"), "plain name");
        assert_eq!(strip_archive_suffix("a.CbZ"), "a");
    }
}
