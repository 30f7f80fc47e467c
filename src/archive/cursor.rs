use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use super::source::ByteSource;

/// A stateful `Read + Seek` view over a window of a [`ByteSource`].
///
/// The whole source is handed to `zip::ZipArchive` for the directory scan;
/// a window over one entry's compressed bytes feeds streaming reads.
pub struct ByteSourceCursor {
    inner: Arc<dyn ByteSource>,
    start: u64,
    len: u64,
    position: u64,
}

impl ByteSourceCursor {
    pub fn new(inner: Arc<dyn ByteSource>) -> Self {
        let len = inner.len();
        Self {
            inner,
            start: 0,
            len,
            position: 0,
        }
    }

    /// A cursor over `len` bytes starting at `start`.
    pub fn window(inner: Arc<dyn ByteSource>, start: u64, len: u64) -> Self {
        Self {
            inner,
            start,
            len,
            position: 0,
        }
    }
}

impl Read for ByteSourceCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position >= self.len || buf.is_empty() {
            return Ok(0);
        }
        let want = (self.len - self.position).min(buf.len() as u64) as usize;
        self.inner
            .read_exact_at(&mut buf[..want], self.start + self.position)?;
        self.position += want as u64;
        Ok(want)
    }
}

impl Seek for ByteSourceCursor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(p) => self.len.checked_add_signed(p),
            SeekFrom::Current(p) => self.position.checked_add_signed(p),
        };
        let Some(target) = target else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of source",
            ));
        };
        self.position = target;
        Ok(target)
    }
}
