//! Chapter rendering: XHTML in, styled word-wrapped lines out.
//!
//! A chapter is rendered in one forward pass over the HTML token stream.
//! The pass keeps a stack of open elements (for styles), counters for the
//! blank lines and indent owed to the next piece of text, and a stack of
//! tables whose cells are buffered until the table closes.
//!
//! ```no_run
//! use quire::{Book, RenderOptions};
//!
//! let book = Book::open("book.epub")?;
//! for line in book.render_chapter(0, &RenderOptions::default())? {
//!     println!("{}", line.text());
//! }
//! # Ok::<(), quire::Error>(())
//! ```

pub mod image;
mod line;
pub mod table;
pub mod tag;
mod whitespace;
pub mod wrap;

use std::cell::RefCell;

use html5ever::Attribute;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use tracing::{debug, trace, warn};

pub use line::{Cell, LineSink, StyledLine};
pub use table::TableStyle;
pub use wrap::WordWrap;

use self::table::TableBuilder;
use self::tag::Element;
use crate::archive::ArchiveIndex;
use crate::config::DEFAULT_WIDTH;
use crate::epub::{ManifestItem, Package};
use crate::error::{Error, Result};
use crate::theme::{Style, Theme};
use crate::util::{decode_document, parent_dir, resolve_href, strip_bom};

/// How chapters are laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Target width in terminal columns.
    pub width: usize,
    pub theme: Theme,
    pub table_style: TableStyle,
    /// Draw images as glyph art.
    pub images: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            theme: Theme::default(),
            table_style: TableStyle::default(),
            images: true,
        }
    }
}

/// Renders the chapters of one package.
///
/// The renderer only borrows the book; each call owns all of its state, so
/// one renderer can serve several threads at once.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    archive: &'a ArchiveIndex,
    package: &'a Package,
    options: &'a RenderOptions,
}

impl<'a> Renderer<'a> {
    pub fn new(
        archive: &'a ArchiveIndex,
        package: &'a Package,
        options: &'a RenderOptions,
    ) -> Self {
        Self {
            archive,
            package,
            options,
        }
    }

    /// Read and render a manifest item.
    pub fn render_item(&self, item: &ManifestItem) -> Result<Vec<StyledLine>> {
        let entry = item
            .entry
            .ok_or_else(|| Error::MissingEntry(item.path.clone()))?;
        let bytes = self.archive.read(entry)?;
        Ok(self.render(&item.path, &bytes))
    }

    /// Render chapter markup. `path` is the chapter's archive path; image
    /// sources are resolved against it.
    pub fn render(&self, path: &str, bytes: &[u8]) -> Vec<StyledLine> {
        let mut lines = Vec::new();
        self.render_into(path, bytes, &mut lines);
        lines
    }

    /// Render chapter markup into `sink`.
    ///
    /// Malformed markup never fails a render: the tokenizer recovers the way
    /// a browser would and the recoveries are logged at trace level.
    pub fn render_into<S: LineSink + ?Sized>(&self, path: &str, bytes: &[u8], sink: &mut S) {
        let content = decode_document(strip_bom(bytes));
        let pass = RefCell::new(Pass::new(self, path, sink));
        {
            let tokens = ChapterTokens {
                pass: &pass,
                text: RefCell::new(String::new()),
            };
            let tokenizer = Tokenizer::new(tokens, TokenizerOpts::default());
            let input = BufferQueue::default();
            input.push_back(StrTendril::from_slice(&content));
            let _ = tokenizer.feed(&input);
            tokenizer.end();
        }
        pass.into_inner().finish();
    }
}

/// Feeds tokenizer output into a render pass.
struct ChapterTokens<'p, 'r, S: LineSink + ?Sized> {
    pass: &'p RefCell<Pass<'r, S>>,
    /// Character tokens between two tags form one run.
    text: RefCell<String>,
}

impl<S: LineSink + ?Sized> ChapterTokens<'_, '_, S> {
    fn flush_text(&self) {
        let text = std::mem::take(&mut *self.text.borrow_mut());
        self.pass.borrow_mut().text(&text);
    }
}

impl<S: LineSink + ?Sized> TokenSink for ChapterTokens<'_, '_, S> {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::CharacterTokens(text) => self.text.borrow_mut().push_str(&text),
            Token::TagToken(tag) => {
                self.flush_text();
                if let Some(kind) = self.pass.borrow_mut().tag(&tag) {
                    return TokenSinkResult::RawData(kind);
                }
            }
            Token::EOFToken => self.flush_text(),
            Token::ParseError(message) => self.pass.borrow_mut().parse_error(&message),
            _ => {}
        }
        TokenSinkResult::Continue
    }

    // XHTML chapters carry CDATA sections; read them as text.
    fn adjusted_current_node_present_but_not_in_html_namespace(&self) -> bool {
        true
    }
}

/// Elements whose content the tokenizer must not read as markup.
fn raw_kind(name: &str) -> Option<RawKind> {
    match name {
        "script" => Some(RawKind::ScriptData),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "title" | "textarea" => Some(RawKind::Rcdata),
        _ => None,
    }
}

/// Drop a namespace prefix (`svg:image` -> `image`).
fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Value of the attribute whose local name is `key`.
fn attr<'t>(attrs: &'t [Attribute], key: &str) -> Option<&'t str> {
    attrs
        .iter()
        .find(|a| local_part(&a.name.local) == key)
        .map(|a| &*a.value)
}

/// State of one render call.
struct Pass<'r, S: LineSink + ?Sized> {
    renderer: &'r Renderer<'r>,
    path: &'r str,
    out: WordWrap<&'r mut S>,
    stack: Vec<Element>,
    newlines: usize,
    indent: usize,
    /// Whitespace seen between two inline runs.
    space: bool,
    /// Whether anything has reached the main output yet.
    written: bool,
    tables: Vec<TableBuilder>,
    /// Malformed markup the tokenizer recovered from.
    parse_errors: usize,
}

impl<'r, S: LineSink + ?Sized> Pass<'r, S> {
    fn new(renderer: &'r Renderer<'r>, path: &'r str, sink: &'r mut S) -> Self {
        Self {
            renderer,
            path,
            out: WordWrap::new(sink, renderer.options.width),
            stack: Vec::new(),
            newlines: 0,
            indent: 0,
            space: false,
            written: false,
            tables: Vec::new(),
            parse_errors: 0,
        }
    }

    fn width(&self) -> usize {
        self.renderer.options.width
    }

    fn style(&self) -> Style {
        self.renderer
            .options
            .theme
            .resolve(self.stack.iter().map(Element::name))
    }

    fn ensure_newlines(&mut self, n: usize) {
        self.newlines = self.newlines.max(n);
    }

    fn ensure_indent(&mut self, n: usize) {
        self.indent = self.indent.max(n);
    }

    fn in_cell(&mut self) -> bool {
        self.tables.last_mut().and_then(|t| t.current_cell()).is_some()
    }

    /// Handle a start or end tag. Returns the raw-text mode the tokenizer
    /// switches to when the element's content is not markup.
    fn tag(&mut self, tag: &Tag) -> Option<RawKind> {
        let name = local_part(&tag.name).to_ascii_lowercase();
        let element = Element::parse(&name);
        match tag.kind {
            TagKind::StartTag if tag.self_closing => {
                self.start(&element, &tag.attrs);
                if matches!(element, Element::Table | Element::Tr) {
                    self.end(&element);
                }
                None
            }
            TagKind::StartTag => {
                if !element.is_void() {
                    self.stack.push(element.clone());
                }
                self.start(&element, &tag.attrs);
                raw_kind(&name)
            }
            TagKind::EndTag => {
                self.indent = 0;
                // unclosed children go with their parent
                if let Some(index) = self.stack.iter().rposition(|open| open.name() == name) {
                    self.stack.truncate(index + 1);
                    if let Some(open) = self.stack.pop() {
                        self.end(&open);
                    }
                }
                None
            }
        }
    }

    fn parse_error(&mut self, message: &str) {
        self.parse_errors += 1;
        trace!(path = self.path, message, "malformed markup");
    }

    fn start(&mut self, element: &Element, attrs: &[Attribute]) {
        match element {
            Element::Br => self.newlines += 1,
            Element::P => {
                self.ensure_newlines(2);
                self.ensure_indent(2);
            }
            Element::ListItem(_) => self.ensure_newlines(1),
            Element::Hr => {
                self.ensure_newlines(2);
                self.block(&"-".repeat(self.width()));
                self.ensure_newlines(2);
            }
            Element::Table => self.tables.push(TableBuilder::default()),
            Element::Tr => {
                if let Some(table) = self.tables.last_mut() {
                    table.finish_row();
                }
            }
            Element::Cell(_) => {
                if let Some(table) = self.tables.last_mut() {
                    table.start_cell();
                }
            }
            Element::Img | Element::SvgImage => self.image(element, attrs),
            other if other.is_paragraph_block() => self.ensure_newlines(2),
            _ => {}
        }
    }

    fn end(&mut self, element: &Element) {
        match element {
            Element::P => self.ensure_newlines(2),
            Element::ListItem(_) => self.ensure_newlines(1),
            Element::Table => self.close_table(),
            Element::Tr => {
                if let Some(table) = self.tables.last_mut() {
                    table.finish_row();
                }
            }
            other if other.is_paragraph_block() => self.ensure_newlines(2),
            _ => {}
        }
    }

    /// A run of raw text between two tags.
    fn text(&mut self, raw: &str) {
        if raw.is_empty() || self.stack.last().is_some_and(Element::hides_text) {
            return;
        }
        let text = whitespace::collapse(raw);
        if !whitespace::has_text(&text) {
            self.space = true;
            return;
        }
        let style = self.style();
        self.append(&text, style);
    }

    /// Write text, paying off pending spacing first.
    fn append(&mut self, text: &str, style: Style) {
        let newlines = std::mem::take(&mut self.newlines);
        let indent = std::mem::take(&mut self.indent);
        let space = std::mem::take(&mut self.space);

        if let Some(cell) = self.tables.last_mut().and_then(|t| t.current_cell()) {
            push_separated(cell, text, newlines > 0 || space);
            return;
        }

        let mut text = text;
        if newlines > 0 || !self.written {
            text = text.trim_start();
        }
        if self.written {
            for _ in 0..newlines {
                self.out.newline();
            }
        }
        if indent > 0 {
            self.out.write(&" ".repeat(indent), Style::BASE);
        }
        if self.out.ends_with_space() {
            text = text.trim_start_matches(' ');
        } else if space && newlines == 0 && self.written && !text.starts_with(' ') {
            self.out.write(" ", style);
        }
        if !text.is_empty() {
            self.out.write(text, style);
            self.written = true;
        }
    }

    /// Write preformatted lines (rules, tables, art) without indent.
    fn block(&mut self, text: &str) {
        let newlines = std::mem::take(&mut self.newlines);
        self.indent = 0;
        self.space = false;

        if let Some(cell) = self.tables.last_mut().and_then(|t| t.current_cell()) {
            push_separated(cell, text, true);
            return;
        }
        if self.written {
            for _ in 0..newlines {
                self.out.newline();
            }
        }
        let style = self.style();
        self.out.write(text, style);
        self.written = true;
    }

    fn close_table(&mut self) {
        let Some(table) = self.tables.pop() else {
            return;
        };
        let grid = table.finish();

        if let Some(cell) = self.tables.last_mut().and_then(|t| t.current_cell()) {
            let flat: Vec<&str> = grid
                .iter()
                .flatten()
                .map(String::as_str)
                .filter(|c| !c.is_empty())
                .collect();
            if !flat.is_empty() {
                push_separated(cell, &flat.join(" "), true);
            }
            return;
        }

        let style = self.renderer.options.table_style;
        match table::solve(&grid, self.width(), &style) {
            Some(widths) => {
                let lines = table::render(&grid, &widths, &style);
                self.ensure_newlines(2);
                self.block(&lines.join("\n"));
                self.ensure_newlines(2);
            }
            None => debug!(path = self.path, rows = grid.len(), "table not rendered"),
        }
    }

    fn image(&mut self, element: &Element, attrs: &[Attribute]) {
        let src = match element {
            Element::SvgImage => attr(attrs, "href"),
            _ => attr(attrs, "src"),
        };
        if let Some(src) = src
            && self.renderer.options.images
            && !self.in_cell()
        {
            self.image_art(src);
        }

        if let Some(alt) = attr(attrs, "alt") {
            let alt = whitespace::collapse(alt);
            if whitespace::has_text(&alt) {
                self.ensure_newlines(1);
                let style = self.style();
                self.append(&format!("Alt text: {}", alt.trim()), style);
                self.ensure_newlines(1);
            }
        }
    }

    fn image_art(&mut self, src: &str) {
        let manifest = &self.renderer.package.manifest;
        let path = resolve_href(parent_dir(self.path), src);
        let Some(item) = manifest
            .by_path(&path)
            .or_else(|| manifest.iter().find(|item| item.href == src))
        else {
            debug!(chapter = self.path, src, "image not in manifest");
            return;
        };
        let Some(entry) = item.entry else {
            debug!(chapter = self.path, src, "image not in archive");
            return;
        };
        let bytes = match self.renderer.archive.read(entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(chapter = self.path, image = %item.path, error = %e, "cannot read image");
                return;
            }
        };
        for line in image::convert(&bytes, self.width()) {
            self.ensure_newlines(1);
            self.block(&line);
            self.ensure_newlines(1);
        }
    }

    fn finish(mut self) {
        if self.parse_errors > 0 {
            debug!(path = self.path, errors = self.parse_errors, "recovered from malformed markup");
        }
        while !self.tables.is_empty() {
            self.close_table();
        }
        self.out.finish();
    }
}

/// Append `text` to a table cell, with a single space before it when
/// `separate` is set and the cell already has text.
fn push_separated(cell: &mut String, text: &str, separate: bool) {
    let text = if cell.is_empty() || cell.ends_with(' ') {
        text.trim_start()
    } else {
        text
    };
    if separate && !cell.is_empty() && !cell.ends_with(' ') && !text.starts_with(' ') {
        cell.push(' ');
    }
    cell.push_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::Metadata;
    use crate::theme::Color;

    fn package() -> Package {
        Package {
            path: "OEBPS/content.opf".into(),
            base_dir: "OEBPS".into(),
            version: "3.0".into(),
            metadata: Metadata::default(),
            manifest: Default::default(),
            spine: Default::default(),
            navigation: Default::default(),
        }
    }

    fn archive() -> ArchiveIndex {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        zip.start_file("mimetype", zip::write::SimpleFileOptions::default())
            .unwrap();
        std::io::Write::write_all(&mut zip, b"application/epub+zip").unwrap();
        ArchiveIndex::from_bytes(zip.finish().unwrap().into_inner()).unwrap()
    }

    fn render_with(markup: &str, options: &RenderOptions) -> Vec<String> {
        let archive = archive();
        let package = package();
        Renderer::new(&archive, &package, options)
            .render("OEBPS/ch1.xhtml", markup.as_bytes())
            .iter()
            .map(StyledLine::text)
            .collect()
    }

    fn render(markup: &str) -> Vec<String> {
        render_with(markup, &RenderOptions::default())
    }

    #[test]
    fn test_paragraphs() {
        assert_eq!(
            render("<html><body><p>Hello</p>\n<p>World</p></body></html>"),
            vec!["  Hello", "", "  World"]
        );
    }

    #[test]
    fn test_no_leading_blank_lines() {
        let lines = render(
            "<html><head><title></title></head><body>\n  <h1>Title</h1><p>Text</p></body></html>",
        );
        assert_eq!(lines, vec!["Title", "", "  Text"]);
    }

    #[test]
    fn test_nested_blocks_do_not_stack_blank_lines() {
        let lines = render("<div><div><p>a</p></div></div><div><div><p>b</p></div></div>");
        assert_eq!(lines, vec!["  a", "", "  b"]);
    }

    #[test]
    fn test_br_adds_one_line_each() {
        assert_eq!(render("one<br/>two<br/><br/>three"), vec!["one", "two", "", "three"]);
    }

    #[test]
    fn test_source_whitespace_collapses() {
        let lines = render("<p>The  quick\n    brown\tfox</p>");
        assert_eq!(lines, vec!["  The quick brown fox"]);
    }

    #[test]
    fn test_carriage_returns_collapse() {
        assert_eq!(render("<p>a\rb\r\nc</p>"), vec!["  a b c"]);
    }

    #[test]
    fn test_space_between_inline_elements() {
        assert_eq!(render("<p><b>bold</b> <i>italic</i></p>"), vec!["  bold italic"]);
        assert_eq!(render("<p>a <b>b</b> c</p>"), vec!["  a b c"]);
    }

    #[test]
    fn test_style_and_script_hidden() {
        let lines = render(
            "<html><head><style>p { color: red }</style></head>\
             <body><p>shown</p><script>var x = 1;</script></body></html>",
        );
        assert_eq!(lines, vec!["  shown"]);
    }

    #[test]
    fn test_entities() {
        assert_eq!(
            render("<p>a &amp; b&nbsp;c &mdash; &bogus;</p>"),
            vec!["  a & b\u{a0}c \u{2014} &bogus;"]
        );
    }

    #[test]
    fn test_hr_spans_width() {
        let options = RenderOptions {
            width: 40,
            ..RenderOptions::default()
        };
        let lines = render_with("<p>above</p><hr/><p>below</p>", &options);
        assert_eq!(
            lines,
            vec![
                "  above".to_string(),
                String::new(),
                "-".repeat(40),
                String::new(),
                "  below".to_string()
            ]
        );
    }

    #[test]
    fn test_list_items_one_per_line() {
        assert_eq!(
            render("<ul><li>one</li><li>two</li></ul><p>after</p>"),
            vec!["one", "two", "", "  after"]
        );
    }

    #[test]
    fn test_styles_follow_tag_stack() {
        let archive = archive();
        let package = package();
        let options = RenderOptions::default();
        let lines = Renderer::new(&archive, &package, &options)
            .render("ch.xhtml", b"<h2>A <strong>B</strong></h2>");
        let spans = lines[0].spans();
        assert_eq!(spans[0].0.foreground, Some(Color::Navy));
        assert_eq!(spans[0].0.bold, Some(false));
        assert_eq!(spans.last().unwrap().0.bold, Some(true));
        assert_eq!(spans.last().unwrap().1, "B");
    }

    #[test]
    fn test_table() {
        let lines = render(
            "<p>before</p><table><tr><th>Name</th><th>Age</th></tr>\
             <tr><td>Alice</td><td>30</td></tr></table><p>after</p>",
        );
        assert_eq!(
            lines,
            vec![
                "  before",
                "",
                "+------------+",
                "| Name   Age |",
                "+------------+",
                "| Alice  30  |",
                "+------------+",
                "",
                "  after",
            ]
        );
    }

    #[test]
    fn test_nested_table_flattened() {
        let lines = render(
            "<table><tr><td>outer <table><tr><td>x</td><td>y</td></tr></table></td></tr></table>",
        );
        assert_eq!(lines, vec!["+-----------+", "| outer x y |", "+-----------+"]);
    }

    #[test]
    fn test_empty_table_emits_nothing() {
        assert_eq!(
            render("<p>a</p><table></table><table><tr></tr></table><p>b</p>"),
            vec!["  a", "", "  b"]
        );
    }

    #[test]
    fn test_unclosed_tags_tolerated() {
        let lines = render("<p>one<p>two</span></p>");
        assert_eq!(lines, vec!["  one", "", "  two"]);
    }

    #[test]
    fn test_alt_text_without_image() {
        let lines = render(r#"<p>see</p><img src="missing.png" alt="A  cat"/>"#);
        assert_eq!(lines, vec!["  see", "", "Alt text: A cat"]);
    }

    #[test]
    fn test_idempotent() {
        let markup = "<h1>T</h1><p>Some <em>text</em> here.</p><table><tr><td>a</td></tr></table>";
        assert_eq!(render(markup), render(markup));
    }

    #[test]
    fn test_named_entities() {
        assert_eq!(
            render("<p>caf&eacute; &hearts; na&iuml;ve &euro;5</p>"),
            vec!["  caf\u{e9} \u{2665} na\u{ef}ve \u{20ac}5"]
        );
    }

    #[test]
    fn test_bare_less_than_is_text() {
        assert_eq!(
            render("<p>if 1 < 2 then</p><p>next</p>"),
            vec!["  if 1 < 2 then", "", "  next"]
        );
    }

    #[test]
    fn test_malformed_markup_recovers() {
        assert_eq!(render("<p>text</p><a href=\"x>broken"), vec!["  text"]);
    }

    #[test]
    fn test_style_content_is_not_markup() {
        let lines = render("<style>p > a { content: \"<p>\" }</style><p>shown</p>");
        assert_eq!(lines, vec!["  shown"]);
    }

    #[test]
    fn test_xml_prolog_and_doctype_ignored() {
        let markup = "<?xml version=\"1.0\"?><!DOCTYPE html><html><body><p>x</p></body></html>";
        assert_eq!(render(markup), vec!["  x"]);
    }

    #[test]
    fn test_push_separated() {
        let mut cell = String::new();
        push_separated(&mut cell, " a", true);
        push_separated(&mut cell, "b", false);
        push_separated(&mut cell, "c", true);
        assert_eq!(cell, "ab c");
    }
}
