//! Text decoding and archive path helpers.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (common in old ebooks)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Decode an XML or XHTML document, honouring its declared encoding.
pub fn decode_document(bytes: &[u8]) -> Cow<'_, str> {
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// Extract the encoding name from an XML declaration, if present.
///
/// Only the first 100 bytes are inspected.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(100)];

    let xml_start = memchr::memmem::find(prefix, b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let quote = *after_enc.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = memchr::memchr(quote, &after_enc[1..])? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Directory part of an archive path, without the trailing slash.
///
/// `"OEBPS/content.opf"` → `"OEBPS"`, `"content.opf"` → `""`.
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Drop a `#fragment` suffix.
pub fn strip_fragment(href: &str) -> &str {
    href.split_once('#').map(|(path, _)| path).unwrap_or(href)
}

/// Percent-decode an href, keeping the raw text when it is not valid UTF-8.
pub fn percent_decode(href: &str) -> Cow<'_, str> {
    match percent_decode_str(href).decode_utf8() {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(href),
    }
}

/// Resolve `href` against the directory `base_dir` into a normalised archive
/// path.
///
/// The fragment is removed, escapes are decoded and `.`/`..` segments are
/// folded. A leading `/` addresses the archive root.
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    let href = percent_decode(strip_fragment(href));
    if let Some(absolute) = href.strip_prefix('/') {
        return normalize_path(absolute);
    }
    if base_dir.is_empty() {
        normalize_path(&href)
    } else {
        normalize_path(&format!("{base_dir}/{href}"))
    }
}

/// Fold `.` and `..` segments and empty components out of a `/` path.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(8);
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}
