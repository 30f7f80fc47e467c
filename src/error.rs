//! Error types for quire operations.

use std::io;

use thiserror::Error;

/// Errors that can occur while opening a book or rendering its chapters.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not a ZIP archive: {0}")]
    NotAnArchive(String),

    #[error("archive is truncated: {0}")]
    Truncated(String),

    #[error("checksum mismatch in {0}")]
    ChecksumMismatch(String),

    #[error("unsupported compression method {method} for {name}")]
    UnsupportedCompression { name: String, method: u16 },

    #[error("file not found in archive: {0}")]
    MissingEntry(String),

    #[error("archive has no META-INF/container.xml")]
    NoContainer,

    #[error("container lists no rootfile")]
    NoRootfile,

    #[error("rootfile not found in archive: {0}")]
    BadRootfile(String),

    #[error("spine has no itemref")]
    NoItemref,

    #[error("itemref does not match any manifest item: {0}")]
    BadItemref(String),

    #[error("manifest item {id} points at missing file {href}")]
    BadManifest { id: String, href: String },

    #[error("XML parsing error in {path}: {source}")]
    Xml {
        path: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("chapter {index} out of range (book has {count})")]
    ChapterOutOfRange { index: usize, count: usize },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error means the book itself is unusable, as opposed to a
    /// failure reading one chapter or a bad argument.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::NotAnArchive(_)
                | Error::Truncated(_)
                | Error::NoContainer
                | Error::NoRootfile
                | Error::BadRootfile(_)
                | Error::NoItemref
                | Error::BadItemref(_)
                | Error::BadManifest { .. }
                | Error::Xml { .. }
        )
    }

    pub(crate) fn xml(path: &str, source: quick_xml::Error) -> Self {
        Error::Xml {
            path: path.to_string(),
            source,
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Error::Truncated(e.to_string())
            }
            zip::result::ZipError::Io(e) => Error::Io(e),
            other => Error::NotAnArchive(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
