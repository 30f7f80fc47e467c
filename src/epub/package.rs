//! Resolved package model: metadata, manifest and spine.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use super::nav::Navigation;
use crate::archive::EntryHandle;

/// One `<rootfile>` pointer from `META-INF/container.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rootfile {
    pub full_path: String,
    pub media_type: String,
}

/// The parsed container document. Always holds at least one rootfile.
#[derive(Debug, Clone)]
pub struct Container {
    rootfiles: Vec<Rootfile>,
}

impl Container {
    /// Returns `None` when `rootfiles` is empty.
    pub(crate) fn new(rootfiles: Vec<Rootfile>) -> Option<Self> {
        (!rootfiles.is_empty()).then_some(Self { rootfiles })
    }

    pub fn rootfiles(&self) -> &[Rootfile] {
        &self.rootfiles
    }

    /// The rendition a reader opens by default: the first rootfile.
    pub fn default_rendition(&self) -> &Rootfile {
        &self.rootfiles[0]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub scheme: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Date {
    pub event: String,
    pub date: String,
}

/// Dublin Core metadata of a package. Missing fields are empty strings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metadata {
    pub title: String,
    pub language: String,
    pub identifier: Identifier,
    pub creator: String,
    pub contributor: String,
    pub publisher: String,
    pub subject: String,
    pub description: String,
    pub dates: Vec<Date>,
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    pub source: String,
    pub relation: String,
    pub coverage: String,
    pub rights: String,
}

impl Metadata {
    /// Stable key for reading progress: `scheme:content`, or `title:<title>`
    /// when the book carries no identifier.
    pub fn book_id(&self) -> String {
        if self.identifier.content.is_empty() {
            warn!(title = %self.title, "book has no identifier, keying progress by title");
            format!("title:{}", self.title)
        } else {
            format!("{}:{}", self.identifier.scheme, self.identifier.content)
        }
    }
}

/// Position of an item in its package's manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemIndex(pub(crate) usize);

impl ItemIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct ManifestItem {
    pub id: String,
    /// Href as written, relative to the package document.
    pub href: String,
    pub media_type: String,
    pub properties: Vec<String>,
    /// Normalised archive path the href resolves to.
    pub path: String,
    /// Archive entry, `None` when the href points at nothing.
    pub entry: Option<EntryHandle>,
}

impl ManifestItem {
    pub fn is_readable(&self) -> bool {
        self.entry.is_some()
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Manifest items in document order, indexed by id and by archive path.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    items: Vec<ManifestItem>,
    by_id: HashMap<String, ItemIndex>,
    by_path: HashMap<String, ItemIndex>,
}

impl Manifest {
    /// Add an item. A second item with an already-used id is dropped.
    pub(crate) fn push(&mut self, item: ManifestItem) -> Option<ItemIndex> {
        if self.by_id.contains_key(&item.id) {
            warn!(id = %item.id, href = %item.href, "duplicate manifest id, keeping the first");
            return None;
        }
        let index = ItemIndex(self.items.len());
        self.by_id.insert(item.id.clone(), index);
        self.by_path.entry(item.path.clone()).or_insert(index);
        self.items.push(item);
        Some(index)
    }

    pub fn get(&self, index: ItemIndex) -> &ManifestItem {
        &self.items[index.0]
    }

    pub fn find_id(&self, id: &str) -> Option<ItemIndex> {
        self.by_id.get(id).copied()
    }

    pub fn by_id(&self, id: &str) -> Option<&ManifestItem> {
        self.find_id(id).map(|i| self.get(i))
    }

    /// Item whose resolved archive path is `path`.
    pub fn by_path(&self, path: &str) -> Option<&ManifestItem> {
        self.by_path.get(path).map(|&i| self.get(i))
    }

    /// First item carrying `property`, e.g. `nav`.
    pub fn with_property(&self, property: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.has_property(property))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A spine entry, linked to its manifest item by index.
#[derive(Debug, Clone)]
pub struct Itemref {
    pub idref: String,
    pub linear: bool,
    pub item: ItemIndex,
}

#[derive(Debug, Clone, Default)]
pub struct Spine {
    /// Manifest id named by the spine's `toc` attribute.
    pub toc: Option<String>,
    pub itemrefs: Vec<Itemref>,
}

impl Spine {
    pub fn len(&self) -> usize {
        self.itemrefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.itemrefs.is_empty()
    }
}

/// One package document (rendition) of a book.
#[derive(Debug, Clone)]
pub struct Package {
    /// Archive path of the package document.
    pub path: String,
    /// Directory hrefs in the manifest are relative to.
    pub base_dir: String,
    pub version: String,
    pub metadata: Metadata,
    pub manifest: Manifest,
    pub spine: Spine,
    pub navigation: Navigation,
}

impl Package {
    /// Manifest item behind a spine entry.
    pub fn item(&self, itemref: &Itemref) -> &ManifestItem {
        self.manifest.get(itemref.item)
    }

    /// Spine items in reading order.
    pub fn chapters(&self) -> impl Iterator<Item = &ManifestItem> {
        self.spine.itemrefs.iter().map(|r| self.item(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, path: &str) -> ManifestItem {
        ManifestItem {
            id: id.to_string(),
            href: path.to_string(),
            media_type: "application/xhtml+xml".to_string(),
            properties: Vec::new(),
            path: path.to_string(),
            entry: None,
        }
    }

    #[test]
    fn test_manifest_duplicate_id_keeps_first() {
        let mut manifest = Manifest::default();
        assert!(manifest.push(item("a", "one.xhtml")).is_some());
        assert!(manifest.push(item("a", "two.xhtml")).is_none());
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.by_id("a").unwrap().path, "one.xhtml");
        assert!(manifest.by_path("two.xhtml").is_none());
    }

    #[test]
    fn test_book_id() {
        let mut meta = Metadata {
            title: "Moby Dick".into(),
            ..Default::default()
        };
        assert_eq!(meta.book_id(), "title:Moby Dick");

        meta.identifier = Identifier {
            scheme: "ISBN".into(),
            content: "123".into(),
        };
        assert_eq!(meta.book_id(), "ISBN:123");
    }

    #[test]
    fn test_container_requires_rootfile() {
        assert!(Container::new(Vec::new()).is_none());
        let container = Container::new(vec![
            Rootfile {
                full_path: "a.opf".into(),
                media_type: String::new(),
            },
            Rootfile {
                full_path: "b.opf".into(),
                media_type: String::new(),
            },
        ])
        .unwrap();
        assert_eq!(container.default_rendition().full_path, "a.opf");
    }
}
