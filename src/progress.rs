//! Reading position within a book.
//!
//! Storing progress is up to the caller; this type only carries the
//! position and converts it to and from line offsets in a rendered chapter.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Book key from [`Metadata::book_id`](crate::epub::Metadata::book_id).
    pub book_id: String,
    /// Spine index of the current chapter.
    pub chapter: usize,
    /// Fraction of the chapter already read, in `[0, 1]`.
    pub position: f64,
}

impl Progress {
    pub fn new(book_id: impl Into<String>, chapter: usize, position: f64) -> Self {
        Self {
            book_id: book_id.into(),
            chapter,
            position: clamp_fraction(position),
        }
    }

    /// Progress for a viewport whose top line is `line` in a chapter of
    /// `line_count` lines.
    pub fn at_line(
        book_id: impl Into<String>,
        chapter: usize,
        line: usize,
        line_count: usize,
    ) -> Self {
        let position = if line_count == 0 {
            0.0
        } else {
            line as f64 / line_count as f64
        };
        Self::new(book_id, chapter, position)
    }

    /// First line to show when the chapter renders to `line_count` lines.
    ///
    /// Re-rendering at another width changes the line count, so the fraction
    /// keeps the reader at roughly the same place.
    pub fn line_offset(&self, line_count: usize) -> usize {
        if line_count == 0 {
            return 0;
        }
        let line = (clamp_fraction(self.position) * line_count as f64).floor() as usize;
        line.min(line_count - 1)
    }
}

fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
