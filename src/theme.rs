//! Text styles and the tag → style theme.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anstyle::{AnsiColor, Effects};
use serde::{Deserialize, Serialize};

/// Terminal colour: one of the sixteen named colours, an RGB value, or the
/// terminal's default (`-`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Color {
    #[default]
    Default,
    Black,
    Maroon,
    Green,
    Olive,
    Navy,
    Purple,
    Teal,
    Silver,
    Gray,
    Red,
    Lime,
    Yellow,
    Blue,
    Fuchsia,
    Aqua,
    White,
    Rgb(u8, u8, u8),
}

const NAMED: [(&str, Color); 16] = [
    ("black", Color::Black),
    ("maroon", Color::Maroon),
    ("green", Color::Green),
    ("olive", Color::Olive),
    ("navy", Color::Navy),
    ("purple", Color::Purple),
    ("teal", Color::Teal),
    ("silver", Color::Silver),
    ("gray", Color::Gray),
    ("red", Color::Red),
    ("lime", Color::Lime),
    ("yellow", Color::Yellow),
    ("blue", Color::Blue),
    ("fuchsia", Color::Fuchsia),
    ("aqua", Color::Aqua),
    ("white", Color::White),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown color {:?}", self.0)
    }
}

impl std::error::Error for ParseColorError {}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if name == "-" || name == "default" {
            return Ok(Color::Default);
        }
        if name == "grey" {
            return Ok(Color::Gray);
        }
        if let Some(hex) = name.strip_prefix('#')
            && hex.len() == 6
            && let Ok(rgb) = u32::from_str_radix(hex, 16)
        {
            return Ok(Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8));
        }
        NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| *c)
            .ok_or_else(|| ParseColorError(s.to_string()))
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Default => f.write_str("-"),
            Color::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            named => {
                let name = NAMED
                    .iter()
                    .find(|(_, c)| c == named)
                    .map(|(n, _)| *n)
                    .unwrap_or("-");
                f.write_str(name)
            }
        }
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl Color {
    /// The terminal colour this maps to; `None` leaves the terminal default.
    pub fn to_anstyle(self) -> Option<anstyle::Color> {
        let ansi = match self {
            Color::Default => return None,
            Color::Rgb(r, g, b) => return Some(anstyle::RgbColor(r, g, b).into()),
            Color::Black => AnsiColor::Black,
            Color::Maroon => AnsiColor::Red,
            Color::Green => AnsiColor::Green,
            Color::Olive => AnsiColor::Yellow,
            Color::Navy => AnsiColor::Blue,
            Color::Purple => AnsiColor::Magenta,
            Color::Teal => AnsiColor::Cyan,
            Color::Silver => AnsiColor::White,
            Color::Gray => AnsiColor::BrightBlack,
            Color::Red => AnsiColor::BrightRed,
            Color::Lime => AnsiColor::BrightGreen,
            Color::Yellow => AnsiColor::BrightYellow,
            Color::Blue => AnsiColor::BrightBlue,
            Color::Fuchsia => AnsiColor::BrightMagenta,
            Color::Aqua => AnsiColor::BrightCyan,
            Color::White => AnsiColor::BrightWhite,
        };
        Some(ansi.into())
    }
}

/// Visual attributes of a run of text. Unset fields inherit when merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Style {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
}

impl Style {
    /// Fully specified plain style every resolution starts from.
    pub const BASE: Style = Style {
        foreground: Some(Color::Default),
        background: Some(Color::Default),
        bold: Some(false),
        italic: Some(false),
        strikethrough: Some(false),
        underline: Some(false),
    };

    pub fn fg(mut self, color: Color) -> Self {
        self.foreground = Some(color);
        self
    }

    pub fn bg(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = Some(true);
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = Some(true);
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = Some(true);
        self
    }

    pub fn strikethrough(mut self) -> Self {
        self.strikethrough = Some(true);
        self
    }

    /// Apply every attribute `other` sets on top of `self`.
    pub fn merge(self, other: Style) -> Style {
        Style {
            foreground: other.foreground.or(self.foreground),
            background: other.background.or(self.background),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            strikethrough: other.strikethrough.or(self.strikethrough),
            underline: other.underline.or(self.underline),
        }
    }

    pub fn is_plain(&self) -> bool {
        Style::BASE.merge(*self) == Style::BASE
    }
}

impl From<Style> for anstyle::Style {
    fn from(style: Style) -> Self {
        let mut effects = Effects::new();
        for (flag, effect) in [
            (style.bold, Effects::BOLD),
            (style.italic, Effects::ITALIC),
            (style.underline, Effects::UNDERLINE),
            (style.strikethrough, Effects::STRIKETHROUGH),
        ] {
            if flag == Some(true) {
                effects |= effect;
            }
        }
        anstyle::Style::new()
            .fg_color(style.foreground.and_then(Color::to_anstyle))
            .bg_color(style.background.and_then(Color::to_anstyle))
            .effects(effects)
    }
}

/// Styles keyed by lowercase element name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme(HashMap<String, Style>);

impl Default for Theme {
    fn default() -> Self {
        let bold = Style::default().bold();
        let heading = Style::default().fg(Color::Teal);

        let mut styles = HashMap::new();
        for tag in ["strong", "em", "b"] {
            styles.insert(tag.to_string(), bold);
        }
        styles.insert("i".into(), Style::default().italic().fg(Color::Olive));
        styles.insert("title".into(), Style::default().fg(Color::Maroon));
        styles.insert("h1".into(), Style::default().fg(Color::Purple));
        styles.insert("h2".into(), Style::default().fg(Color::Navy));
        for tag in ["h3", "h4", "h5", "h6"] {
            styles.insert(tag.to_string(), heading);
        }
        Theme(styles)
    }
}

impl Theme {
    /// A theme with no entries: everything renders in the base style.
    pub fn empty() -> Self {
        Theme(HashMap::new())
    }

    pub fn get(&self, tag: &str) -> Option<&Style> {
        self.0.get(tag)
    }

    pub fn set(&mut self, tag: impl Into<String>, style: Style) {
        self.0.insert(tag.into(), style);
    }

    /// Replace entries with those of `other`, keeping tags it does not name.
    pub fn extend(&mut self, other: Theme) {
        self.0.extend(other.0);
    }

    /// Merge the style of every tag, outermost first, over [`Style::BASE`].
    pub fn resolve<'a>(&self, tags: impl IntoIterator<Item = &'a str>) -> Style {
        tags.into_iter()
            .filter_map(|tag| self.0.get(tag))
            .fold(Style::BASE, |style, over| style.merge(*over))
    }
}
