//! EPUB parsing utilities (container.xml, OPF, NCX, XHTML nav).
//!
//! These functions only understand document structure. Path resolution and
//! cross-referencing against the archive happen in [`super::reader`].

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};

use super::nav::NavPoint;
use super::package::{Date, Identifier, Metadata, Rootfile};
use crate::error::{Error, Result};

/// Manifest `<item>` exactly as written in the package document.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Vec<String>,
}

/// Spine `<itemref>` exactly as written in the package document.
#[derive(Debug, Clone)]
pub struct RawItemref {
    pub idref: String,
    pub linear: bool,
}

/// Parsed OPF package data, before cross-referencing.
#[derive(Debug, Default)]
pub struct PackageData {
    pub version: String,
    pub metadata: Metadata,
    pub items: Vec<RawItem>,
    pub itemrefs: Vec<RawItemref>,
    /// Manifest id named by `<spine toc="...">` (EPUB 2 NCX pointer).
    pub spine_toc: Option<String>,
}

/// Parse `META-INF/container.xml` into its list of rootfiles, in document
/// order. An empty list is returned as-is; the caller decides whether
/// that is an error.
pub fn parse_container(content: &str) -> Result<Vec<Rootfile>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut rootfiles = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                let mut rootfile = Rootfile::default();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"full-path" => rootfile.full_path = attr_value(&attr),
                        b"media-type" => rootfile.media_type = attr_value(&attr),
                        _ => {}
                    }
                }
                if !rootfile.full_path.is_empty() {
                    rootfiles.push(rootfile);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::xml("META-INF/container.xml", e)),
            _ => {}
        }
    }
    Ok(rootfiles)
}

/// Which metadata element text is currently being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Language,
    Identifier,
    Creator,
    Contributor,
    Publisher,
    Subject,
    Description,
    Date,
    Type,
    Format,
    Source,
    Relation,
    Coverage,
    Rights,
}

impl Field {
    fn from_local(name: &[u8]) -> Option<Self> {
        Some(match name {
            b"title" => Field::Title,
            b"language" => Field::Language,
            b"identifier" => Field::Identifier,
            b"creator" => Field::Creator,
            b"contributor" => Field::Contributor,
            b"publisher" => Field::Publisher,
            b"subject" => Field::Subject,
            b"description" => Field::Description,
            b"date" => Field::Date,
            b"type" => Field::Type,
            b"format" => Field::Format,
            b"source" => Field::Source,
            b"relation" => Field::Relation,
            b"coverage" => Field::Coverage,
            b"rights" => Field::Rights,
            _ => return None,
        })
    }
}

/// Parse an OPF package document. `path` is only used in error messages.
pub fn parse_package(content: &str, path: &str) -> Result<PackageData> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut data = PackageData::default();
    let mut unique_identifier = String::new();
    let mut identifiers: Vec<(String, Identifier)> = Vec::new();

    let mut in_metadata = false;
    // (field, element id, scheme or event attribute)
    let mut current: Option<(Field, String, String)> = None;
    let mut buf_text = String::new();

    loop {
        let event = reader.read_event().map_err(|e| Error::xml(path, e))?;
        match event {
            Event::Start(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"package" => {
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"version" => data.version = attr_value(&attr),
                                b"unique-identifier" => unique_identifier = attr_value(&attr),
                                _ => {}
                            }
                        }
                    }
                    b"metadata" => in_metadata = true,
                    b"spine" => data.spine_toc = find_attr(&e, b"toc"),
                    b"item" => push_item(&e, &mut data.items),
                    b"itemref" => push_itemref(&e, &mut data.itemrefs),
                    _ if in_metadata && current.is_none() => {
                        if let Some(field) = Field::from_local(local) {
                            let id = find_attr(&e, b"id").unwrap_or_default();
                            let qualifier = match field {
                                Field::Identifier => find_attr(&e, b"scheme"),
                                Field::Date => find_attr(&e, b"event"),
                                _ => None,
                            };
                            current = Some((field, id, qualifier.unwrap_or_default()));
                            buf_text.clear();
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"item" => push_item(&e, &mut data.items),
                    b"itemref" => push_itemref(&e, &mut data.itemrefs),
                    b"spine" => data.spine_toc = find_attr(&e, b"toc"),
                    _ => {}
                }
            }
            Event::Text(e) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if current.is_some()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    buf_text.push_str(&resolved);
                }
            }
            Event::End(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"metadata" {
                    in_metadata = false;
                }
                if let Some((field, id, qualifier)) = current.take_if(|(field, _, _)| {
                    Field::from_local(local) == Some(*field)
                }) {
                    let text = buf_text.trim().to_string();
                    buf_text.clear();
                    store_field(&mut data.metadata, &mut identifiers, field, id, qualifier, text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // The identifier named by unique-identifier wins, otherwise the first.
    let chosen = identifiers
        .iter()
        .position(|(id, _)| !unique_identifier.is_empty() && *id == unique_identifier)
        .or_else(|| (!identifiers.is_empty()).then_some(0));
    if let Some(index) = chosen {
        data.metadata.identifier = identifiers.swap_remove(index).1;
    }

    Ok(data)
}

fn store_field(
    metadata: &mut Metadata,
    identifiers: &mut Vec<(String, Identifier)>,
    field: Field,
    id: String,
    qualifier: String,
    text: String,
) {
    fn first(slot: &mut String, text: String) {
        if slot.is_empty() {
            *slot = text;
        }
    }

    match field {
        Field::Title => first(&mut metadata.title, text),
        Field::Language => first(&mut metadata.language, text),
        Field::Identifier => identifiers.push((
            id,
            Identifier {
                scheme: qualifier,
                content: text,
            },
        )),
        Field::Creator => first(&mut metadata.creator, text),
        Field::Contributor => first(&mut metadata.contributor, text),
        Field::Publisher => first(&mut metadata.publisher, text),
        Field::Subject => first(&mut metadata.subject, text),
        Field::Description => first(&mut metadata.description, text),
        Field::Date => metadata.dates.push(Date {
            event: qualifier,
            date: text,
        }),
        Field::Type => first(&mut metadata.kind, text),
        Field::Format => first(&mut metadata.format, text),
        Field::Source => first(&mut metadata.source, text),
        Field::Relation => first(&mut metadata.relation, text),
        Field::Coverage => first(&mut metadata.coverage, text),
        Field::Rights => first(&mut metadata.rights, text),
    }
}

fn push_item(e: &BytesStart<'_>, items: &mut Vec<RawItem>) {
    let mut item = RawItem::default();
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"id" => item.id = attr_value(&attr),
            b"href" => item.href = attr_value(&attr),
            b"media-type" => item.media_type = attr_value(&attr),
            b"properties" => {
                item.properties = attr_value(&attr)
                    .split_ascii_whitespace()
                    .map(str::to_string)
                    .collect()
            }
            _ => {}
        }
    }
    items.push(item);
}

fn push_itemref(e: &BytesStart<'_>, itemrefs: &mut Vec<RawItemref>) {
    let mut idref = String::new();
    let mut linear = true;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"idref" => idref = attr_value(&attr),
            b"linear" => linear = attr.value.as_ref() != b"no",
            _ => {}
        }
    }
    itemrefs.push(RawItemref { idref, linear });
}

/// Parse an NCX table of contents into a navigation tree.
pub fn parse_ncx(content: &str, path: &str) -> Result<Vec<NavPoint>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<NavPoint> = vec![NavPoint::default()];
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| Error::xml(path, e))? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"navPoint" => stack.push(NavPoint::default()),
                b"text" => in_text = true,
                b"content" => set_ncx_src(&e, &mut stack),
                _ => {}
            },
            Event::Empty(e) => {
                if local_name(e.name().as_ref()) == b"content" {
                    set_ncx_src(&e, &mut stack);
                }
            }
            Event::Text(e) => {
                if in_text && let Some(point) = stack.last_mut() {
                    point.label.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if in_text
                    && let Some(point) = stack.last_mut()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    point.label.push_str(&resolved);
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"text" => in_text = false,
                b"navPoint" if stack.len() > 1 => {
                    if let Some(mut point) = stack.pop() {
                        point.label = collapse_whitespace(&point.label);
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(point);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(stack.swap_remove(0).children)
}

fn set_ncx_src(e: &BytesStart<'_>, stack: &mut [NavPoint]) {
    if let Some(src) = find_attr(e, b"src")
        && let Some(point) = stack.last_mut()
    {
        point.href = src;
    }
}

/// Parse an XHTML navigation document (`nav > ol > li > a`).
///
/// When the document has several `nav` elements, the one typed `toc` is
/// used, otherwise the first.
pub fn parse_nav_document(content: &str, path: &str) -> Result<Vec<NavPoint>> {
    let mut reader = Reader::from_str(content);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;

    struct NavState {
        is_toc: bool,
        stack: Vec<NavPoint>,
    }

    let mut navs: Vec<(bool, Vec<NavPoint>)> = Vec::new();
    let mut nav: Option<NavState> = None;
    // Open elements inside the current label (`a` or `span`), counting the
    // label element itself.
    let mut label_depth = 0usize;

    loop {
        match reader.read_event().map_err(|e| Error::xml(path, e))? {
            Event::Start(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"nav" && nav.is_none() {
                    let is_toc = find_attr(&e, b"type")
                        .is_some_and(|t| t.split_ascii_whitespace().any(|t| t == "toc"));
                    nav = Some(NavState {
                        is_toc,
                        stack: vec![NavPoint::default()],
                    });
                    continue;
                }
                let Some(state) = nav.as_mut() else { continue };
                if label_depth > 0 {
                    label_depth += 1;
                    continue;
                }
                match local {
                    b"li" => state.stack.push(NavPoint::default()),
                    b"a" | b"span" if state.stack.len() > 1 => {
                        label_depth = 1;
                        if let Some(point) = state.stack.last_mut()
                            && let Some(href) = find_attr(&e, b"href")
                        {
                            point.href = href;
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if label_depth > 0
                    && let Some(point) = nav.as_mut().and_then(|s| s.stack.last_mut())
                {
                    point.label.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if label_depth > 0
                    && let Some(point) = nav.as_mut().and_then(|s| s.stack.last_mut())
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    point.label.push_str(&resolved);
                }
            }
            Event::End(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if label_depth > 0 {
                    label_depth -= 1;
                    continue;
                }
                match local {
                    b"li" => {
                        if let Some(state) = nav.as_mut()
                            && state.stack.len() > 1
                            && let Some(mut point) = state.stack.pop()
                        {
                            point.label = collapse_whitespace(&point.label);
                            if let Some(parent) = state.stack.last_mut() {
                                parent.children.push(point);
                            }
                        }
                    }
                    b"nav" => {
                        if let Some(mut state) = nav.take() {
                            state.stack.truncate(1);
                            navs.push((state.is_toc, state.stack.swap_remove(0).children));
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let index = navs.iter().position(|(is_toc, _)| *is_toc).unwrap_or(0);
    if index < navs.len() {
        Ok(navs.swap_remove(index).1)
    } else {
        Ok(Vec::new())
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Attribute value with XML escapes resolved; the raw text is kept when it
/// does not unescape cleanly.
pub(crate) fn attr_value(attr: &Attribute<'_>) -> String {
    let raw = String::from_utf8_lossy(&attr.value);
    match quick_xml::escape::unescape(&raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw.into_owned(),
    }
}

/// Value of the attribute whose local name is `key`.
pub(crate) fn find_attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .map(|attr| attr_value(&attr))
}

/// Resolve an entity reference (the name between `&` and `;`): the XML
/// predefined entities and numeric references.
pub(crate) fn resolve_entity(entity: &str) -> Option<Cow<'static, str>> {
    let named = match entity {
        "apos" => Some("'"),
        "quot" => Some("\""),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        _ => None,
    };
    if let Some(named) = named {
        return Some(Cow::Borrowed(named));
    }

    let code = if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse::<u32>().ok()?
    };
    char::from_u32(code).map(|c| Cow::Owned(c.to_string()))
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
