//! In-memory EPUB builder shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Files of an EPUB, written in order after the `mimetype` entry.
#[derive(Default)]
pub struct EpubBuilder {
    files: Vec<(String, Vec<u8>)>,
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual layout: container pointing at `OEBPS/content.opf`.
    pub fn standard() -> Self {
        Self::new().file("META-INF/container.xml", CONTAINER)
    }

    pub fn file(mut self, name: &str, data: impl AsRef<[u8]>) -> Self {
        self.files.push((name.to_string(), data.as_ref().to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(
                "mimetype",
                SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
            )
            .unwrap();
        writer.write_all(b"application/epub+zip").unwrap();

        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in &self.files {
            writer.start_file(name.as_str(), deflated).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

/// A package document with the given manifest and spine bodies.
pub fn opf(metadata: &str, manifest: &str, spine: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    {metadata}
  </metadata>
  <manifest>
    {manifest}
  </manifest>
  <spine>
    {spine}
  </spine>
</package>"#
    )
}

/// An XHTML chapter around `body`.
pub fn xhtml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title></title></head>
<body>
{body}
</body>
</html>"#
    )
}

/// One chapter with id `c1` at `OEBPS/ch1.xhtml`.
pub fn single_chapter(body: &str) -> Vec<u8> {
    EpubBuilder::standard()
        .file(
            "OEBPS/content.opf",
            opf(
                r#"<dc:title>Test Book</dc:title><dc:identifier id="bookid">urn:uuid:1234</dc:identifier>"#,
                r#"<item id="c1" href="ch1.xhtml" media-type="application/xhtml+xml"/>"#,
                r#"<itemref idref="c1"/>"#,
            ),
        )
        .file("OEBPS/ch1.xhtml", xhtml(body))
        .build()
}

/// A grayscale PNG of one shade.
pub fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = image::GrayImage::from_pixel(width, height, image::Luma([shade]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
