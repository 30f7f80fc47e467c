//! Table column solver and box drawing.
//!
//! A table is buffered completely (rows of plain cell strings) before any
//! of it is drawn; column widths are then chosen to fit the display.

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Which rules a table is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStyle {
    /// Outer frame.
    pub border: bool,
    /// Horizontal rule between rows.
    pub separate_rows: bool,
    /// Vertical rule between columns.
    pub separate_columns: bool,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            border: true,
            separate_rows: true,
            separate_columns: false,
        }
    }
}

/// Columns taken up by padding and rules for `columns` columns.
pub fn decoration_width(style: &TableStyle, columns: usize) -> usize {
    let mut width = 2 * columns;
    if style.border {
        width += 2;
    }
    if style.separate_columns && columns > 0 {
        width += columns - 1;
    }
    width
}

/// Display width of the widest line of a cell.
fn cell_width(cell: &str) -> usize {
    cell.lines().map(UnicodeWidthStr::width).max().unwrap_or(0)
}

/// Display width of the widest grapheme in a cell: the narrowest the
/// column can get without a piece of the cell overflowing it.
fn grapheme_width(cell: &str) -> usize {
    cell.graphemes(true).map(UnicodeWidthStr::width).max().unwrap_or(0)
}

/// Choose per-column text widths so the drawn table fits `available_width`.
///
/// Columns first get their natural (widest cell) width; when that does not
/// fit, the available width is shared out in proportion to each column's
/// content, biased toward equal widths. No column is narrower than its
/// widest grapheme. Returns `None` when there are no columns or the table
/// cannot fit.
pub fn solve(
    grid: &[Vec<String>],
    available_width: usize,
    style: &TableStyle,
) -> Option<Vec<usize>> {
    let columns = grid.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return None;
    }
    let avail = available_width.checked_sub(decoration_width(style, columns))?;
    if avail < columns {
        debug!(columns, available_width, "table does not fit, skipping");
        return None;
    }

    let mut natural = vec![0usize; columns];
    let mut minimum = vec![0usize; columns];
    for row in grid {
        for (col, cell) in row.iter().enumerate() {
            natural[col] = natural[col].max(cell_width(cell));
            minimum[col] = minimum[col].max(grapheme_width(cell));
        }
    }
    if natural.iter().sum::<usize>() <= avail {
        return Some(natural);
    }
    if minimum.iter().sum::<usize>() > avail {
        debug!(columns, available_width, "wide characters do not fit, skipping table");
        return None;
    }

    let equal = avail / columns;
    let mut fair = vec![0usize; columns];
    for row in grid {
        for (col, cell) in row.iter().enumerate() {
            fair[col] = fair[col].max((cell_width(cell) + equal) / 2);
        }
    }
    let total: usize = fair.iter().sum();
    debug!(columns, avail, "sharing table width by content");
    Some(distribute(&fair, total, avail, &minimum))
}

/// Scale `weights` to sum exactly to `avail`, handing the rounding remainder
/// to the largest fractional parts, then raise every column to its
/// `minimum`. The minimums must sum to at most `avail`.
fn distribute(weights: &[usize], total: usize, avail: usize, minimum: &[usize]) -> Vec<usize> {
    let columns = weights.len();
    let mut widths = if total == 0 {
        let mut widths = vec![avail / columns; columns];
        for width in widths.iter_mut().take(avail % columns) {
            *width += 1;
        }
        widths
    } else {
        let mut widths = Vec::with_capacity(columns);
        let mut remainders = Vec::with_capacity(columns);
        for (col, &weight) in weights.iter().enumerate() {
            let scaled = avail * weight;
            widths.push(scaled / total);
            remainders.push((scaled % total, col));
        }
        let short = avail - widths.iter().sum::<usize>();
        remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        for &(_, col) in remainders.iter().take(short) {
            widths[col] += 1;
        }
        widths
    };

    for col in 0..columns {
        while widths[col] < minimum[col] {
            // take from the column with the most room to spare
            let Some(donor) = (0..columns)
                .filter(|&c| widths[c] > minimum[c])
                .max_by_key(|&c| (widths[c] - minimum[c], std::cmp::Reverse(c)))
            else {
                break;
            };
            widths[donor] -= 1;
            widths[col] += 1;
        }
    }
    widths
}

/// Wrap a cell's text to `width` columns, splitting words that are wider
/// than the column.
pub fn wrap_cell(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        let mut line_width = 0;
        for word in paragraph.split_whitespace() {
            let word_width = word.width();
            if line_width > 0 && line_width + 1 + word_width <= width {
                line.push(' ');
                line.push_str(word);
                line_width += 1 + word_width;
                continue;
            }
            if line_width > 0 {
                lines.push(std::mem::take(&mut line));
                line_width = 0;
            }
            if word_width <= width {
                line.push_str(word);
                line_width = word_width;
                continue;
            }
            for grapheme in word.graphemes(true) {
                let w = grapheme.width();
                if line_width + w > width && line_width > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0;
                }
                line.push_str(grapheme);
                line_width += w;
            }
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Draw `grid` with the given column widths.
pub fn render(grid: &[Vec<String>], widths: &[usize], style: &TableStyle) -> Vec<String> {
    let rule = horizontal_rule(widths, style);
    let mut out = Vec::new();
    if style.border {
        out.push(rule.clone());
    }

    for (index, row) in grid.iter().enumerate() {
        if index > 0 && style.separate_rows {
            out.push(rule.clone());
        }
        let wrapped: Vec<Vec<String>> = widths
            .iter()
            .enumerate()
            .map(|(col, &width)| match row.get(col) {
                Some(cell) => wrap_cell(cell, width),
                None => vec![String::new()],
            })
            .collect();
        let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);

        for line_no in 0..height {
            let mut line = String::new();
            if style.border {
                line.push('|');
            }
            for (col, &width) in widths.iter().enumerate() {
                if col > 0 && style.separate_columns {
                    line.push('|');
                }
                let text = wrapped[col].get(line_no).map(String::as_str).unwrap_or("");
                line.push(' ');
                line.push_str(text);
                line.push_str(&" ".repeat(width.saturating_sub(text.width())));
                line.push(' ');
            }
            if style.border {
                line.push('|');
            }
            out.push(line);
        }
    }

    if style.border {
        out.push(rule);
    }
    out
}

fn horizontal_rule(widths: &[usize], style: &TableStyle) -> String {
    let mut rule = String::new();
    if style.border {
        rule.push('+');
    }
    for (col, &width) in widths.iter().enumerate() {
        if col > 0 && style.separate_columns {
            rule.push('+');
        }
        rule.push_str(&"-".repeat(width + 2));
    }
    if style.border {
        rule.push('+');
    }
    rule
}

/// Rows and cells of a table still being read.
#[derive(Debug, Default)]
pub(crate) struct TableBuilder {
    rows: Vec<Vec<String>>,
    cells: Vec<String>,
}

impl TableBuilder {
    pub fn start_cell(&mut self) {
        self.cells.push(String::new());
    }

    /// The cell text is currently written to, if a cell is open.
    pub fn current_cell(&mut self) -> Option<&mut String> {
        self.cells.last_mut()
    }

    /// Close the current row. Rows without cells are dropped.
    pub fn finish_row(&mut self) {
        if self.cells.is_empty() {
            return;
        }
        let row = self
            .cells
            .drain(..)
            .map(|cell| cell.trim().to_string())
            .collect();
        self.rows.push(row);
    }

    pub fn finish(mut self) -> Vec<Vec<String>> {
        self.finish_row();
        self.rows
    }
}
