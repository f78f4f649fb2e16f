//! Building candidate galleries from filesystem paths.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::archive::{is_archive_path, ArchiveReader};
use crate::gallery::item::{normalized, Chapter, Gallery, SkipReason};
use crate::gallery::title::parse_title;

/// Turns a directory or archive path into a candidate [`Gallery`].
///
/// Pure with respect to the catalog: dedup is decided against the supplied
/// known-paths set, and nothing is persisted. Per-path problems come back as
/// [`SkipReason`]s, never panics.
pub struct GalleryBuilder<'a> {
    known_paths: &'a HashSet<PathBuf>,
    ignore_list: &'a [PathBuf],
    archives: &'a dyn ArchiveReader,
}

impl<'a> GalleryBuilder<'a> {
    pub fn new(
        known_paths: &'a HashSet<PathBuf>,
        ignore_list: &'a [PathBuf],
        archives: &'a dyn ArchiveReader,
    ) -> Self {
        Self {
            known_paths,
            ignore_list,
            archives,
        }
    }

    /// Build a gallery from `path`.
    ///
    /// `display_name` overrides the name used for title parsing (defaults to
    /// the path's file name). With `subfolders_as_chapters`, subdirectories
    /// and nested archives each become one chapter, sorted lexicographically
    /// by name; otherwise the whole path is chapter 0. `archive_ctx` names the
    /// containing archive when `path` is an entry inside one.
    pub fn build(
        &self,
        path: &Path,
        display_name: Option<&str>,
        subfolders_as_chapters: bool,
        archive_ctx: Option<&Path>,
    ) -> std::result::Result<Gallery, SkipReason> {
        let identity = archive_ctx.unwrap_or(path);

        if self.is_ignored(identity) {
            return Err(SkipReason::Ignored);
        }
        if self.known_paths.contains(&normalized(identity)) {
            return Err(SkipReason::AlreadyExists);
        }

        let name = match display_name {
            Some(n) => n.to_string(),
            None => identity
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| identity.to_string_lossy().into_owned()),
        };

        let mut gallery = if let Some(archive) = archive_ctx {
            self.build_from_archive_entry(archive, path)?
        } else if path.is_dir() {
            self.build_from_directory(path, subfolders_as_chapters)?
        } else if is_archive_path(path) {
            self.build_from_archive(path, subfolders_as_chapters)?
        } else {
            return Err(SkipReason::UnsupportedFile);
        };

        let parsed = parse_title(&name);
        gallery.title = parsed.title;
        gallery.artist = parsed.artist;
        gallery.language = parsed.language;
        gallery.info = String::new();

        tracing::debug!(path = %gallery.path.display(), title = %gallery.title, "built gallery");
        Ok(gallery)
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let wanted = normalized(path);
        self.ignore_list.iter().any(|p| normalized(p) == wanted)
    }

    fn build_from_directory(
        &self,
        path: &Path,
        subfolders_as_chapters: bool,
    ) -> std::result::Result<Gallery, SkipReason> {
        let entries = list_dir_sorted(path).map_err(|_| SkipReason::Unreadable)?;
        if entries.is_empty() {
            return Err(SkipReason::EmptyDirectory);
        }

        let mut gallery = Gallery::new(path);

        let chapter_sources: Vec<&PathBuf> = if subfolders_as_chapters {
            entries
                .iter()
                .filter(|e| e.is_dir() || is_archive_path(e))
                .collect()
        } else {
            Vec::new()
        };

        if !chapter_sources.is_empty() {
            for source in chapter_sources {
                let chapter_name = source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                gallery.chapters.push(Chapter {
                    title: parse_title(&chapter_name).title,
                    path: source.clone(),
                    in_archive: false,
                    pages: count_pages(source),
                });
            }
        } else {
            // All pages live directly in the gallery folder.
            let pages = count_pages(path);
            if pages == 0 {
                return Err(SkipReason::EmptyDirectory);
            }
            let chapter_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            gallery.chapters.push(Chapter {
                title: parse_title(&chapter_name).title,
                path: path.to_path_buf(),
                in_archive: false,
                pages,
            });
        }

        Ok(gallery)
    }

    fn build_from_archive(
        &self,
        path: &Path,
        subfolders_as_chapters: bool,
    ) -> std::result::Result<Gallery, SkipReason> {
        let chapters = self
            .archives
            .list_chapters(path)
            .map_err(|_| SkipReason::ArchiveError)?;

        let mut gallery = Gallery::new(path);
        gallery.is_archive = true;

        if subfolders_as_chapters && !chapters.is_empty() {
            let mut sorted = chapters;
            sorted.sort();
            for locator in sorted {
                let pages = self
                    .archives
                    .list_pages(path, &locator)
                    .map_err(|_| SkipReason::ArchiveError)?
                    .len();
                gallery.chapters.push(Chapter {
                    title: parse_title(&locator).title,
                    path: PathBuf::from(&locator),
                    in_archive: true,
                    pages,
                });
            }
        } else {
            let pages = self
                .archives
                .list_pages(path, "")
                .map_err(|_| SkipReason::ArchiveError)?
                .len();
            if pages == 0 && gallery.chapters.is_empty() {
                return Err(SkipReason::EmptyArchive);
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            gallery.chapters.push(Chapter {
                title: parse_title(&name).title,
                path: PathBuf::from(""),
                in_archive: true,
                pages,
            });
        }

        if gallery.chapters.iter().all(|c| c.pages == 0) {
            return Err(SkipReason::EmptyArchive);
        }

        Ok(gallery)
    }

    /// Build a gallery that lives at a sub-path inside an already-known
    /// archive.
    fn build_from_archive_entry(
        &self,
        archive: &Path,
        entry: &Path,
    ) -> std::result::Result<Gallery, SkipReason> {
        let locator = entry.to_string_lossy().trim_matches('/').to_string();
        let pages = self
            .archives
            .list_pages(archive, &locator)
            .map_err(|_| SkipReason::ArchiveError)?
            .len();
        if pages == 0 {
            return Err(SkipReason::EmptyArchive);
        }

        let mut gallery = Gallery::new(archive);
        gallery.is_archive = true;
        gallery.path_in_archive = Some(locator.clone());
        gallery.chapters.push(Chapter {
            title: parse_title(&locator).title,
            path: PathBuf::from(&locator),
            in_archive: true,
            pages,
        });
        Ok(gallery)
    }
}

/// Directory entries sorted lexicographically by file name. The sort is the
/// chapter-order tie-break: "1" < "10" < "2".
pub fn list_dir_sorted(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(entries)
}

/// Count image pages directly under a directory.
fn count_pages(path: &Path) -> usize {
    match std::fs::read_dir(path) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| is_image_file(&e.path()))
            .count(),
        Err(_) => 0,
    }
}

/// Whether a path looks like an image page.
pub fn is_image_file(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.type_() == mime_guess::mime::IMAGE)
        .unwrap_or(false)
}
