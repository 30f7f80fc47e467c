//! # quire
//!
//! Open EPUB books and render their chapters as styled, word-wrapped text
//! for a fixed-width terminal.
//!
//! ## Features
//!
//! - Reads EPUB 2 and 3: container, every rendition, manifest, spine,
//!   Dublin Core metadata, XHTML nav documents and NCX tables of contents
//! - Random-access archive index; chapters are decompressed on demand
//! - Renders paragraphs, headings, lists, rules and boxed tables
//! - Draws embedded images as glyph art
//! - Themes mapping elements to colours and text attributes
//!
//! ## Quick Start
//!
//! ```no_run
//! use quire::{Book, RenderOptions};
//!
//! let book = Book::open("book.epub")?;
//! println!("{} ({} chapters)", book.metadata().title, book.chapter_count());
//!
//! let options = RenderOptions { width: 72, ..RenderOptions::default() };
//! for index in 0..book.chapter_count() {
//!     println!("== {}", book.chapter_title(index));
//!     for line in book.render_chapter(index, &options)? {
//!         println!("{}", line.to_ansi());
//!     }
//! }
//! # Ok::<(), quire::Error>(())
//! ```
//!
//! ## Lower-level access
//!
//! The resolution stages are available separately through [`archive`] and
//! [`epub`], and [`render::Renderer`] renders any markup against a package.

pub mod archive;
pub mod book;
pub mod config;
pub mod epub;
pub mod error;
pub mod progress;
pub mod render;
pub mod theme;
pub(crate) mod util;

pub use archive::ArchiveIndex;
pub use book::Book;
pub use config::Config;
pub use epub::{Metadata, NavPoint, Navigation, OpenOptions, Package};
pub use error::{Error, Result};
pub use progress::Progress;
pub use render::{RenderOptions, Renderer, StyledLine, TableStyle};
pub use theme::{Color, Style, Theme};
