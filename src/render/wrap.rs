//! Streaming word wrap.
//!
//! Text arrives in arbitrary pieces; the writer keeps the current partial
//! line and partial word across calls and hands complete lines to a
//! [`LineSink`]. Lines break only at spaces, so a word wider than the
//! target width sits alone on an overlong line.

use unicode_segmentation::UnicodeSegmentation;

use super::line::{Cell, LineSink, StyledLine};
use crate::theme::Style;

pub struct WordWrap<S: LineSink> {
    sink: S,
    width: usize,
    line: Vec<Cell>,
    line_width: usize,
    spaces: Vec<Cell>,
    word: Vec<Cell>,
    word_width: usize,
}

impl<S: LineSink> WordWrap<S> {
    pub fn new(sink: S, width: usize) -> Self {
        Self {
            sink,
            width: width.max(1),
            line: Vec::new(),
            line_width: 0,
            spaces: Vec::new(),
            word: Vec::new(),
            word_width: 0,
        }
    }

    /// Append `text` drawn in `style`. `\n` ends the current line.
    pub fn write(&mut self, text: &str, style: Style) {
        for grapheme in text.graphemes(true) {
            match grapheme {
                "\n" | "\r\n" => self.newline(),
                " " => {
                    self.finish_word();
                    self.spaces.push(Cell::new(" ", style));
                }
                _ => {
                    let cell = Cell::new(grapheme, style);
                    self.word_width += cell.width();
                    self.word.push(cell);
                }
            }
        }
    }

    /// End the current line, even if it is empty.
    pub fn newline(&mut self) {
        self.finish_word();
        self.spaces.clear();
        self.emit();
    }

    /// Whether the last thing written was a space.
    pub fn ends_with_space(&self) -> bool {
        self.word.is_empty() && !self.spaces.is_empty()
    }

    /// Emit the held-back partial line, if any, and return the sink.
    pub fn finish(mut self) -> S {
        self.finish_word();
        self.spaces.clear();
        if !self.line.is_empty() {
            self.emit();
        }
        self.sink
    }

    fn finish_word(&mut self) {
        if self.word.is_empty() {
            return;
        }
        let spaces_width = self.spaces.len();
        if self.line_width + spaces_width + self.word_width <= self.width {
            self.line.append(&mut self.spaces);
            self.line_width += spaces_width;
        } else if self.line.is_empty() {
            // indent does not fit alongside the word
            self.spaces.clear();
        } else {
            self.spaces.clear();
            self.emit();
        }
        self.line_width += self.word_width;
        self.line.append(&mut self.word);
        self.word_width = 0;
    }

    fn emit(&mut self) {
        let cells = std::mem::take(&mut self.line);
        self.line_width = 0;
        self.sink.push_line(StyledLine::new(cells));
    }
}
