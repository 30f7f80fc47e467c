//! JSON configuration file.
//!
//! ```json
//! {
//!   "width": 72,
//!   "images": false,
//!   "theme": { "h1": { "foreground": "#d75f00", "bold": true } }
//! }
//! ```
//!
//! Every key is optional. Theme entries replace the default entry for the
//! same element and leave the others alone.

use std::io;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::render::RenderOptions;
use crate::theme::Theme;

pub const DEFAULT_WIDTH: usize = 80;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub width: usize,
    /// Render images as glyph art.
    pub images: bool,
    /// Reject books whose manifest points at missing files.
    pub strict: bool,
    pub theme: Theme,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            images: true,
            strict: false,
            theme: Theme::default(),
        }
    }
}

/// On-disk shape: everything optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    width: Option<usize>,
    images: Option<bool>,
    strict: Option<bool>,
    theme: Option<Theme>,
}

impl Config {
    /// Load a configuration file over the defaults. A missing file yields
    /// the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading config");
                Self::from_json(&content)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse configuration text over the defaults.
    pub fn from_json(content: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(content)?;
        let mut config = Self::default();
        if let Some(width) = file.width {
            config.width = width;
        }
        if let Some(images) = file.images {
            config.images = images;
        }
        if let Some(strict) = file.strict {
            config.strict = strict;
        }
        if let Some(theme) = file.theme {
            config.theme.extend(theme);
        }
        Ok(config)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            width: self.width,
            theme: self.theme.clone(),
            images: self.images,
            ..RenderOptions::default()
        }
    }
}
