//! Raster images as lines of glyphs.

use image::imageops::FilterType;
use tracing::debug;

/// Glyphs from darkest to lightest.
pub const GRADIENT: &str = "MND8OZ$7I?+=~:,..";

/// Render `bytes` as glyph art `width` columns wide.
///
/// Glyph cells are roughly twice as tall as they are wide, so the picture
/// gets half as many rows as its aspect ratio would suggest. Undecodable
/// data and images that scale to zero rows produce no lines.
pub fn convert(bytes: &[u8], width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            debug!(error = %e, "cannot decode image");
            return Vec::new();
        }
    };
    let (w, h) = (u64::from(img.width()), u64::from(img.height()));
    if w == 0 {
        return Vec::new();
    }
    let height = h * width as u64 / (w * 2);
    if height == 0 {
        return Vec::new();
    }
    let (Ok(cols), Ok(rows)) = (u32::try_from(width), u32::try_from(height)) else {
        return Vec::new();
    };

    let luma = img.resize_exact(cols, rows, FilterType::Lanczos3).to_luma8();
    let glyphs: Vec<char> = GRADIENT.chars().collect();
    let last = glyphs.len() - 1;
    luma.rows()
        .map(|row| {
            row.map(|pixel| glyphs[last * usize::from(pixel.0[0]) / 255])
                .collect()
        })
        .collect()
}
