//! Styled output lines.

use unicode_width::UnicodeWidthStr;

use crate::theme::Style;

/// One grapheme cluster and the style it is drawn in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub grapheme: String,
    pub style: Style,
}

impl Cell {
    pub fn new(grapheme: impl Into<String>, style: Style) -> Self {
        Self {
            grapheme: grapheme.into(),
            style,
        }
    }

    /// Display width in terminal columns.
    pub fn width(&self) -> usize {
        self.grapheme.width()
    }
}

/// A rendered line of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledLine {
    pub cells: Vec<Cell>,
}

impl StyledLine {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// The line without styling.
    pub fn text(&self) -> String {
        self.cells.iter().map(|c| c.grapheme.as_str()).collect()
    }

    pub fn width(&self) -> usize {
        self.cells.iter().map(Cell::width).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Runs of consecutive cells sharing a style.
    pub fn spans(&self) -> Vec<(Style, String)> {
        let mut spans: Vec<(Style, String)> = Vec::new();
        for cell in &self.cells {
            match spans.last_mut() {
                Some((style, text)) if *style == cell.style => text.push_str(&cell.grapheme),
                _ => spans.push((cell.style, cell.grapheme.clone())),
            }
        }
        spans
    }

    /// The line with ANSI escapes around every styled span.
    pub fn to_ansi(&self) -> String {
        let mut out = String::new();
        for (style, text) in self.spans() {
            let style = anstyle::Style::from(style);
            out.push_str(&format!("{style}{text}{style:#}"));
        }
        out
    }
}

/// Receiver of finished lines.
pub trait LineSink {
    fn push_line(&mut self, line: StyledLine);
}

impl LineSink for Vec<StyledLine> {
    fn push_line(&mut self, line: StyledLine) {
        self.push(line);
    }
}

impl<T: LineSink + ?Sized> LineSink for &mut T {
    fn push_line(&mut self, line: StyledLine) {
        (**self).push_line(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Color;

    fn line(parts: &[(&str, Style)]) -> StyledLine {
        StyledLine::new(
            parts
                .iter()
                .flat_map(|(text, style)| {
                    text.chars().map(move |c| Cell::new(c.to_string(), *style))
                })
                .collect(),
        )
    }

    #[test]
    fn test_spans_group_styles() {
        let bold = Style::BASE.bold();
        let l = line(&[("ab", Style::BASE), ("cd", bold), ("e", Style::BASE)]);
        assert_eq!(l.text(), "abcde");
        assert_eq!(
            l.spans(),
            vec![
                (Style::BASE, "ab".to_string()),
                (bold, "cd".to_string()),
                (Style::BASE, "e".to_string())
            ]
        );
    }

    #[test]
    fn test_ansi_output() {
        let plain = line(&[("plain", Style::BASE)]);
        assert_eq!(plain.to_ansi(), "plain");

        let red = Style::BASE.fg(Color::Red);
        let styled = line(&[("a", Style::BASE), ("b", red)]);
        assert_eq!(styled.to_ansi(), "a\x1b[91mb\x1b[0m");
    }

    #[test]
    fn test_wide_cells() {
        let l = line(&[("日本", Style::BASE)]);
        assert_eq!(l.width(), 4);
    }
}
