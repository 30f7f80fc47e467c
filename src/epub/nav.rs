//! Table-of-contents trees and chapter-title lookup.

use serde::Serialize;

/// One entry of a navigation tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavPoint {
    pub label: String,
    /// Href as written in the navigation document (may carry a fragment).
    pub href: String,
    /// Archive path `href` points at, without fragment. Empty until the
    /// tree is resolved against its document.
    #[serde(skip)]
    pub path: String,
    pub children: Vec<NavPoint>,
}

impl NavPoint {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            path: String::new(),
            children: Vec::new(),
        }
    }
}

/// Navigation trees found for a package. Either or both may be missing.
#[derive(Debug, Clone, Default)]
pub struct Navigation {
    /// EPUB 3 XHTML navigation document.
    pub nav: Option<Vec<NavPoint>>,
    /// EPUB 2 NCX.
    pub ncx: Option<Vec<NavPoint>>,
}

impl Navigation {
    /// Label of the first entry whose href equals `href`, searching the nav
    /// tree depth-first and then the NCX tree.
    pub fn lookup_title(&self, href: &str) -> Option<&str> {
        [&self.nav, &self.ncx]
            .into_iter()
            .flatten()
            .find_map(|tree| find_label(tree, href))
    }

    /// Like [`lookup_title`](Self::lookup_title), but matching resolved
    /// archive paths, so entries written relative to a navigation document
    /// in another directory are still found.
    pub fn lookup_path(&self, path: &str) -> Option<&str> {
        [&self.nav, &self.ncx]
            .into_iter()
            .flatten()
            .find_map(|tree| find_by(tree, &|point: &NavPoint| point.path == path))
    }

    /// The tree to show as a table of contents: nav if present, else NCX.
    pub fn entries(&self) -> &[NavPoint] {
        self.nav
            .as_deref()
            .filter(|nav| !nav.is_empty())
            .or(self.ncx.as_deref())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

fn find_label<'a>(points: &'a [NavPoint], href: &str) -> Option<&'a str> {
    find_by(points, &|point: &NavPoint| point.href == href)
}

fn find_by<'a>(points: &'a [NavPoint], matches: &dyn Fn(&NavPoint) -> bool) -> Option<&'a str> {
    points.iter().find_map(|point| {
        if matches(point) {
            Some(point.label.as_str())
        } else {
            find_by(&point.children, matches)
        }
    })
}
