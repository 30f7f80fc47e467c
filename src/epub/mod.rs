//! EPUB container, package and navigation model.

mod nav;
mod package;
pub mod parser;
mod reader;

pub use nav::{NavPoint, Navigation};
pub use package::{
    Container, Date, Identifier, ItemIndex, Itemref, Manifest, ManifestItem, Metadata, Package,
    Rootfile, Spine,
};
pub use reader::{
    CONTAINER_PATH, OpenOptions, load_package, read_epub, resolve_container, resolve_navigation,
};
