//! Random-access ZIP archive index.
//!
//! The central directory is scanned once with the `zip` crate; afterwards
//! every entry read goes straight to the [`ByteSource`] by offset, so the
//! index can be shared between threads without locking.

mod cursor;
mod source;

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use flate2::Crc;
use flate2::read::DeflateDecoder;
use tracing::debug;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::util::percent_decode;

pub use cursor::ByteSourceCursor;
pub use source::{ByteSource, FileSource, MemorySource};

const STORED: u16 = 0;
const DEFLATED: u16 = 8;

/// Opaque handle to one entry of an [`ArchiveIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle(usize);

/// Location and checksum of one archive entry.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path within the archive, `/` separated.
    pub name: String,
    /// Offset of the entry's (compressed) data within the source.
    pub data_offset: u64,
    pub compressed_size: u64,
    /// Uncompressed size.
    pub size: u64,
    /// ZIP compression method (0 = Store, 8 = Deflate).
    pub compression: u16,
    pub crc32: u32,
}

/// Name → entry table over a random-access ZIP archive.
pub struct ArchiveIndex {
    source: Arc<dyn ByteSource>,
    entries: Vec<ArchiveEntry>,
    by_name: HashMap<String, EntryHandle>,
}

impl fmt::Debug for ArchiveIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveIndex")
            .field("entries", &self.entries.len())
            .field("source_len", &self.source.len())
            .finish()
    }
}

impl ArchiveIndex {
    /// Open an archive on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_source(Arc::new(FileSource::new(file)?))
    }

    /// Index an archive held in memory.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        Self::from_source(Arc::new(MemorySource::new(bytes)))
    }

    /// Index an archive read through an arbitrary byte source.
    pub fn from_source(source: Arc<dyn ByteSource>) -> Result<Self> {
        let cursor = ByteSourceCursor::new(source.clone());
        let mut archive = ZipArchive::new(cursor)?;

        let mut entries = Vec::with_capacity(archive.len());
        let mut by_name = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)?;
            if file.is_dir() {
                continue;
            }
            let entry = ArchiveEntry {
                name: file.name().to_string(),
                data_offset: file.data_start(),
                compressed_size: file.compressed_size(),
                size: file.size(),
                compression: compression_to_u16(file.compression()),
                crc32: file.crc32(),
            };
            if entry.data_offset + entry.compressed_size > source.len() {
                return Err(Error::Truncated(entry.name));
            }
            let handle = EntryHandle(entries.len());
            by_name.entry(entry.name.clone()).or_insert(handle);
            entries.push(entry);
        }

        debug!(entries = entries.len(), "indexed archive");
        Ok(Self {
            source,
            entries,
            by_name,
        })
    }

    /// Find an entry by its exact name, falling back to the percent-decoded
    /// form of `name`.
    pub fn lookup(&self, name: &str) -> Option<EntryHandle> {
        if let Some(&handle) = self.by_name.get(name) {
            return Some(handle);
        }
        let decoded = percent_decode(name);
        if decoded != name {
            return self.by_name.get(decoded.as_ref()).copied();
        }
        None
    }

    pub fn entry(&self, handle: EntryHandle) -> &ArchiveEntry {
        &self.entries[handle.0]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names in central directory order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Read and decompress a whole entry, verifying its CRC-32.
    pub fn read(&self, handle: EntryHandle) -> Result<Vec<u8>> {
        let entry = self.entry(handle);
        let compressed_len = usize::try_from(entry.compressed_size)
            .map_err(|_| Error::Truncated(entry.name.clone()))?;
        let compressed = self
            .source
            .read_at(entry.data_offset, compressed_len)
            .map_err(|e| truncated_or_io(e, &entry.name))?;

        let data = match entry.compression {
            STORED => compressed,
            DEFLATED => {
                // deflate expands at most 1032:1
                let capacity = usize::try_from(entry.size)
                    .unwrap_or(usize::MAX)
                    .min(compressed.len().saturating_mul(1032));
                let mut out = Vec::with_capacity(capacity);
                // one byte past the declared size is enough to fail the check
                DeflateDecoder::new(&compressed[..])
                    .take(entry.size.saturating_add(1))
                    .read_to_end(&mut out)
                    .map_err(|e| truncated_or_io(e, &entry.name))?;
                out
            }
            method => {
                return Err(Error::UnsupportedCompression {
                    name: entry.name.clone(),
                    method,
                });
            }
        };

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 || data.len() as u64 != entry.size {
            return Err(Error::ChecksumMismatch(entry.name.clone()));
        }
        Ok(data)
    }

    /// Read a whole entry by name.
    pub fn read_by_name(&self, name: &str) -> Result<Vec<u8>> {
        let handle = self
            .lookup(name)
            .ok_or_else(|| Error::MissingEntry(name.to_string()))?;
        self.read(handle)
    }

    /// Open a streaming reader over an entry's decompressed bytes.
    ///
    /// The checksum is verified when the reader reaches the end of the
    /// entry; a mismatch surfaces as an `InvalidData` I/O error.
    pub fn reader(&self, handle: EntryHandle) -> Result<EntryReader> {
        let entry = self.entry(handle);
        let raw = ByteSourceCursor::window(
            self.source.clone(),
            entry.data_offset,
            entry.compressed_size,
        );
        let inner = match entry.compression {
            STORED => Decoder::Stored(raw),
            DEFLATED => Decoder::Deflated(Box::new(DeflateDecoder::new(raw))),
            method => {
                return Err(Error::UnsupportedCompression {
                    name: entry.name.clone(),
                    method,
                });
            }
        };
        Ok(EntryReader {
            inner,
            crc: Crc::new(),
            expected_crc: entry.crc32,
            expected_size: entry.size,
            name: entry.name.clone(),
        })
    }
}

enum Decoder {
    Stored(ByteSourceCursor),
    Deflated(Box<DeflateDecoder<ByteSourceCursor>>),
}

/// Streaming reader over one decompressed entry. Owned by a single caller.
pub struct EntryReader {
    inner: Decoder,
    crc: Crc,
    expected_crc: u32,
    expected_size: u64,
    name: String,
}

impl Read for EntryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = match &mut self.inner {
            Decoder::Stored(r) => r.read(buf)?,
            Decoder::Deflated(r) => r.read(buf)?,
        };
        if read == 0 && !buf.is_empty() {
            if self.crc.sum() != self.expected_crc
                || u64::from(self.crc.amount()) != self.expected_size & 0xFFFF_FFFF
            {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("checksum mismatch in {}", self.name),
                ));
            }
            return Ok(0);
        }
        self.crc.update(&buf[..read]);
        Ok(read)
    }
}

fn truncated_or_io(err: io::Error, name: &str) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::Truncated(name.to_string())
    } else {
        Error::Io(err)
    }
}

fn compression_to_u16(method: zip::CompressionMethod) -> u16 {
    match method {
        zip::CompressionMethod::Stored => STORED,
        zip::CompressionMethod::Deflated => DEFLATED,
        _ => 255,
    }
}
