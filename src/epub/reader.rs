//! Resolution pipeline: container → packages → spine → navigation.

use tracing::{debug, warn};

use super::nav::{NavPoint, Navigation};
use super::package::{Container, Itemref, Manifest, ManifestItem, Package, Rootfile, Spine};
use super::parser::{parse_container, parse_nav_document, parse_ncx, parse_package};
use crate::archive::ArchiveIndex;
use crate::error::{Error, Result};
use crate::util::{decode_document, parent_dir, resolve_href, strip_bom};

/// Well-known location of the container document.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// Options controlling how strictly a book is validated on open.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    /// Fail with [`Error::BadManifest`] when a manifest href points at a
    /// file missing from the archive, instead of warning and keeping the
    /// item as unreadable.
    pub strict: bool,
}

impl OpenOptions {
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Resolve the container and every package it lists.
///
/// Fails with [`Error::NoItemref`] when no package contributes a spine
/// entry.
pub fn read_epub(
    archive: &ArchiveIndex,
    options: OpenOptions,
) -> Result<(Container, Vec<Package>)> {
    let container = resolve_container(archive)?;
    let packages = container
        .rootfiles()
        .iter()
        .map(|rootfile| load_package(archive, rootfile, options))
        .collect::<Result<Vec<_>>>()?;

    if packages.iter().all(|p| p.spine.is_empty()) {
        return Err(Error::NoItemref);
    }
    Ok((container, packages))
}

/// Read `META-INF/container.xml` and collect its rootfiles.
///
/// Rootfile paths are not checked here.
pub fn resolve_container(archive: &ArchiveIndex) -> Result<Container> {
    if archive.lookup(CONTAINER_PATH).is_none() {
        return Err(Error::NoContainer);
    }
    let content = read_document(archive, CONTAINER_PATH)?;
    let rootfiles = parse_container(&content)?;
    debug!(rootfiles = rootfiles.len(), "resolved container");
    Container::new(rootfiles).ok_or(Error::NoRootfile)
}

/// Parse one package document and cross-link its manifest and spine.
pub fn load_package(
    archive: &ArchiveIndex,
    rootfile: &Rootfile,
    options: OpenOptions,
) -> Result<Package> {
    let path = rootfile.full_path.as_str();
    if archive.lookup(path).is_none() {
        return Err(Error::BadRootfile(path.to_string()));
    }
    let content = read_document(archive, path)?;
    let data = parse_package(&content, path)?;
    let base_dir = parent_dir(path).to_string();

    let mut manifest = Manifest::default();
    for raw in data.items {
        if raw.id.is_empty() {
            warn!(href = %raw.href, package = path, "manifest item without id, skipping");
            continue;
        }
        let item_path = resolve_href(&base_dir, &raw.href);
        let entry = archive.lookup(&item_path);
        if entry.is_none() {
            if options.strict {
                return Err(Error::BadManifest {
                    id: raw.id,
                    href: raw.href,
                });
            }
            warn!(
                id = %raw.id,
                href = %raw.href,
                package = path,
                "manifest item points at a missing file"
            );
        }
        manifest.push(ManifestItem {
            id: raw.id,
            href: raw.href,
            media_type: raw.media_type,
            properties: raw.properties,
            path: item_path,
            entry,
        });
    }

    let itemrefs = data
        .itemrefs
        .into_iter()
        .map(|raw| {
            let item = manifest
                .find_id(&raw.idref)
                .ok_or_else(|| Error::BadItemref(raw.idref.clone()))?;
            Ok(Itemref {
                idref: raw.idref,
                linear: raw.linear,
                item,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let spine = Spine {
        toc: data.spine_toc,
        itemrefs,
    };
    let navigation = resolve_navigation(archive, &manifest, &spine);

    debug!(
        package = path,
        items = manifest.len(),
        itemrefs = spine.len(),
        "loaded package"
    );

    Ok(Package {
        path: path.to_string(),
        base_dir,
        version: data.version,
        metadata: data.metadata,
        manifest,
        spine,
        navigation,
    })
}

/// Locate and parse the package's navigation documents.
///
/// Missing, unreadable or malformed documents leave the corresponding tree
/// empty; they never fail the open.
pub fn resolve_navigation(
    archive: &ArchiveIndex,
    manifest: &Manifest,
    spine: &Spine,
) -> Navigation {
    let nav_item = manifest
        .by_id("toc")
        .filter(|item| item.media_type != NCX_MEDIA_TYPE)
        .or_else(|| manifest.with_property("nav"));

    let ncx_item = manifest
        .by_id("ncx")
        .or_else(|| spine.toc.as_deref().and_then(|id| manifest.by_id(id)))
        .or_else(|| manifest.iter().find(|item| item.media_type == NCX_MEDIA_TYPE));

    Navigation {
        nav: nav_item.and_then(|item| load_tree(archive, item, parse_nav_document)),
        ncx: ncx_item.and_then(|item| load_tree(archive, item, parse_ncx)),
    }
}

fn load_tree(
    archive: &ArchiveIndex,
    item: &ManifestItem,
    parse: fn(&str, &str) -> Result<Vec<NavPoint>>,
) -> Option<Vec<NavPoint>> {
    let Some(entry) = item.entry else {
        warn!(path = %item.path, "navigation document missing from archive");
        return None;
    };
    let parsed = archive.read(entry).and_then(|bytes| {
        let content = decode_document(strip_bom(&bytes)).into_owned();
        parse(&content, &item.path)
    });
    match parsed {
        Ok(mut points) => {
            resolve_paths(&mut points, parent_dir(&item.path));
            Some(points)
        }
        Err(e) => {
            warn!(path = %item.path, error = %e, "ignoring unreadable navigation document");
            None
        }
    }
}

fn resolve_paths(points: &mut [NavPoint], base_dir: &str) {
    for point in points {
        if !point.href.is_empty() {
            point.path = resolve_href(base_dir, &point.href);
        }
        resolve_paths(&mut point.children, base_dir);
    }
}

/// Read an archive entry as text, honouring its XML encoding declaration.
fn read_document(archive: &ArchiveIndex, path: &str) -> Result<String> {
    let bytes = archive.read_by_name(path)?;
    Ok(decode_document(strip_bom(&bytes)).into_owned())
}
