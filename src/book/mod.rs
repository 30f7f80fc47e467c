//! An opened book: the archive index plus every resolved package.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::archive::{ArchiveIndex, ByteSource};
use crate::epub::{self, Container, ManifestItem, Metadata, Navigation, OpenOptions, Package};
use crate::error::{Error, Result};
use crate::render::{RenderOptions, Renderer, StyledLine};

/// A fully resolved book.
///
/// Read-only once opened; chapters may be read and rendered from several
/// threads at once.
#[derive(Debug)]
pub struct Book {
    archive: ArchiveIndex,
    container: Container,
    packages: Vec<Package>,
}

impl Book {
    /// Open and resolve an EPUB file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, OpenOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening book");
        Self::from_archive(ArchiveIndex::open(path)?, options)
    }

    /// Resolve an EPUB held in memory.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        Self::from_bytes_with(bytes, OpenOptions::default())
    }

    pub fn from_bytes_with(bytes: impl Into<Arc<[u8]>>, options: OpenOptions) -> Result<Self> {
        Self::from_archive(ArchiveIndex::from_bytes(bytes)?, options)
    }

    /// Resolve an EPUB read through a custom byte source.
    pub fn from_source(source: Arc<dyn ByteSource>) -> Result<Self> {
        Self::from_source_with(source, OpenOptions::default())
    }

    pub fn from_source_with(source: Arc<dyn ByteSource>, options: OpenOptions) -> Result<Self> {
        Self::from_archive(ArchiveIndex::from_source(source)?, options)
    }

    fn from_archive(archive: ArchiveIndex, options: OpenOptions) -> Result<Self> {
        let (container, packages) = epub::read_epub(&archive, options)?;
        let book = Self {
            archive,
            container,
            packages,
        };
        info!(
            title = %book.metadata().title,
            renditions = book.packages.len(),
            chapters = book.chapter_count(),
            "opened book"
        );
        Ok(book)
    }

    pub fn archive(&self) -> &ArchiveIndex {
        &self.archive
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Every rendition, in container order.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// The rendition chapters are read from: the first one listed.
    pub fn default_rendition(&self) -> &Package {
        &self.packages[0]
    }

    pub fn metadata(&self) -> &Metadata {
        &self.default_rendition().metadata
    }

    pub fn navigation(&self) -> &Navigation {
        &self.default_rendition().navigation
    }

    /// Key for storing reading progress.
    pub fn book_id(&self) -> String {
        self.metadata().book_id()
    }

    pub fn chapter_count(&self) -> usize {
        self.default_rendition().spine.len()
    }

    /// Manifest item of the chapter at spine position `index`.
    pub fn chapter(&self, index: usize) -> Result<&ManifestItem> {
        let package = self.default_rendition();
        let itemref = package
            .spine
            .itemrefs
            .get(index)
            .ok_or(Error::ChapterOutOfRange {
                index,
                count: package.spine.len(),
            })?;
        Ok(package.item(itemref))
    }

    /// Title from the table of contents, or `Chapter N of M`.
    pub fn chapter_title(&self, index: usize) -> String {
        let count = self.chapter_count();
        let fallback = || format!("Chapter {} of {}", index + 1, count);
        let Ok(item) = self.chapter(index) else {
            return fallback();
        };
        let navigation = self.navigation();
        navigation
            .lookup_title(&item.href)
            .or_else(|| navigation.lookup_path(&item.path))
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .unwrap_or_else(fallback)
    }

    /// Raw bytes of a chapter document.
    pub fn read_chapter(&self, index: usize) -> Result<Vec<u8>> {
        let item = self.chapter(index)?;
        let entry = item
            .entry
            .ok_or_else(|| Error::MissingEntry(item.path.clone()))?;
        self.archive.read(entry)
    }

    pub fn renderer<'a>(&'a self, options: &'a RenderOptions) -> Renderer<'a> {
        Renderer::new(&self.archive, self.default_rendition(), options)
    }

    pub fn render_chapter(&self, index: usize, options: &RenderOptions) -> Result<Vec<StyledLine>> {
        let item = self.chapter(index)?;
        self.renderer(options).render_item(item)
    }
}
