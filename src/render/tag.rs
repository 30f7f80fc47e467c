//! Element names the renderer treats specially.

/// A chapter element, classified by how it affects layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Br,
    Hr,
    Img,
    /// `<image>` inside inline SVG.
    SvgImage,
    P,
    Heading(u8),
    Title,
    Div,
    /// Other elements that start and end a paragraph-level block.
    Block(&'static str),
    /// `li`, `dt`, `dd` and `figcaption`: one line break either side.
    ListItem(&'static str),
    Table,
    Tr,
    /// `td` or `th`.
    Cell(&'static str),
    Style,
    Script,
    Other(String),
}

const BLOCKS: [&str; 12] = [
    "section",
    "article",
    "blockquote",
    "ul",
    "ol",
    "dl",
    "figure",
    "header",
    "footer",
    "aside",
    "nav",
    "main",
];

const LIST_ITEMS: [&str; 4] = ["li", "dt", "dd", "figcaption"];

/// Elements that never have content or an end tag.
const VOID: [&str; 14] = [
    "br", "hr", "img", "meta", "link", "input", "col", "area", "base", "source", "wbr", "embed",
    "param", "track",
];

impl Element {
    /// Classify a lowercase local name.
    pub fn parse(name: &str) -> Self {
        match name {
            "br" => Element::Br,
            "hr" => Element::Hr,
            "img" => Element::Img,
            "image" => Element::SvgImage,
            "p" => Element::P,
            "title" => Element::Title,
            "div" => Element::Div,
            "table" => Element::Table,
            "tr" => Element::Tr,
            "td" => Element::Cell("td"),
            "th" => Element::Cell("th"),
            "style" => Element::Style,
            "script" => Element::Script,
            _ => {
                if let Some(level) = heading_level(name) {
                    Element::Heading(level)
                } else if let Some(block) = BLOCKS.iter().find(|b| **b == name) {
                    Element::Block(*block)
                } else if let Some(item) = LIST_ITEMS.iter().find(|i| **i == name) {
                    Element::ListItem(*item)
                } else {
                    Element::Other(name.to_string())
                }
            }
        }
    }

    /// Name the element is known by in the theme.
    pub fn name(&self) -> &str {
        match self {
            Element::Br => "br",
            Element::Hr => "hr",
            Element::Img => "img",
            Element::SvgImage => "image",
            Element::P => "p",
            Element::Heading(level) => {
                ["h1", "h2", "h3", "h4", "h5", "h6"][usize::from((*level).clamp(1, 6) - 1)]
            }
            Element::Title => "title",
            Element::Div => "div",
            Element::Block(name) | Element::ListItem(name) | Element::Cell(name) => *name,
            Element::Table => "table",
            Element::Tr => "tr",
            Element::Style => "style",
            Element::Script => "script",
            Element::Other(name) => name.as_str(),
        }
    }

    pub fn is_void(&self) -> bool {
        VOID.contains(&self.name())
    }

    /// Whether text inside this element is never shown.
    pub fn hides_text(&self) -> bool {
        matches!(self, Element::Style | Element::Script)
    }

    /// Block elements separated from their surroundings by a blank line.
    pub fn is_paragraph_block(&self) -> bool {
        matches!(
            self,
            Element::Heading(_) | Element::Title | Element::Div | Element::Block(_)
        )
    }
}

fn heading_level(name: &str) -> Option<u8> {
    let digit = name.strip_prefix('h')?;
    match digit.as_bytes() {
        [d @ b'1'..=b'6'] => Some(d - b'0'),
        _ => None,
    }
}
