//! Opening books: container, package, spine and navigation resolution.

mod common;

use common::{EpubBuilder, opf, single_chapter, xhtml};
use quire::{Book, Error, OpenOptions};

fn three_chapters(extra_manifest: &str, spine_attrs: &str) -> EpubBuilder {
    let manifest = format!(
        r#"<item id="c1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="c2" href="text/ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="c3" href="text/ch%203.xhtml" media-type="application/xhtml+xml"/>
    {extra_manifest}"#
    );
    let package = opf(
        r#"<dc:title>Three</dc:title>
    <dc:creator>A. Writer</dc:creator>
    <dc:language>en</dc:language>
    <dc:identifier id="bookid" opf:scheme="ISBN" xmlns:opf="http://www.idpf.org/2007/opf">9780000000002</dc:identifier>"#,
        &manifest,
        r#"<itemref idref="c1"/><itemref idref="c2"/><itemref idref="c3" linear="no"/>"#,
    )
    .replace("<spine>", &format!("<spine {spine_attrs}>"));

    EpubBuilder::standard()
        .file("OEBPS/content.opf", package)
        .file("OEBPS/text/ch1.xhtml", xhtml("<h1>One</h1>"))
        .file("OEBPS/text/ch2.xhtml", xhtml("<h1>Two</h1>"))
        .file("OEBPS/text/ch 3.xhtml", xhtml("<h1>Three</h1>"))
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn test_open_minimal_book() {
    let book = Book::from_bytes(single_chapter("<p>Hello</p>")).unwrap();

    assert_eq!(book.packages().len(), 1);
    assert_eq!(book.container().rootfiles().len(), 1);
    assert_eq!(book.metadata().title, "Test Book");
    assert_eq!(book.chapter_count(), 1);

    let chapter = book.chapter(0).unwrap();
    assert_eq!(chapter.id, "c1");
    assert_eq!(chapter.path, "OEBPS/ch1.xhtml");
    assert!(chapter.is_readable());
}

#[test]
fn test_spine_order_and_linear_flag() {
    let book = Book::from_bytes(three_chapters("", "").build()).unwrap();
    let package = book.default_rendition();

    let ids: Vec<&str> = package.chapters().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, ["c1", "c2", "c3"]);
    assert!(package.spine.itemrefs[0].linear);
    assert!(!package.spine.itemrefs[2].linear);

    // escaped href resolves to the file with a space in its name
    assert_eq!(book.chapter(2).unwrap().path, "OEBPS/text/ch 3.xhtml");
    assert!(book.read_chapter(2).unwrap().starts_with(b"<?xml"));
}

#[test]
fn test_every_itemref_points_into_its_manifest() {
    let book = Book::from_bytes(three_chapters("", "").build()).unwrap();
    let package = book.default_rendition();
    for itemref in &package.spine.itemrefs {
        assert_eq!(package.item(itemref).id, itemref.idref);
        assert!(package.manifest.by_id(&itemref.idref).is_some());
    }
}

#[test]
fn test_metadata_and_book_id() {
    let book = Book::from_bytes(three_chapters("", "").build()).unwrap();
    let meta = book.metadata();
    assert_eq!(meta.creator, "A. Writer");
    assert_eq!(meta.language, "en");
    assert_eq!(book.book_id(), "ISBN:9780000000002");
}

#[test]
fn test_chapter_out_of_range() {
    let book = Book::from_bytes(single_chapter("<p>x</p>")).unwrap();
    assert!(matches!(
        book.read_chapter(5),
        Err(Error::ChapterOutOfRange { index: 5, count: 1 })
    ));
}

// ============================================================================
// Structural failures
// ============================================================================

#[test]
fn test_missing_container() {
    let epub = EpubBuilder::new().file("OEBPS/content.opf", "<package/>").build();
    let err = Book::from_bytes(epub).unwrap_err();
    assert!(matches!(err, Error::NoContainer));
    assert!(err.is_structural());
}

#[test]
fn test_empty_container_has_no_rootfile() {
    let container = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles></rootfiles>
</container>"#;
    let epub = EpubBuilder::new().file("META-INF/container.xml", container).build();
    assert!(matches!(Book::from_bytes(epub), Err(Error::NoRootfile)));
}

#[test]
fn test_dangling_rootfile() {
    let epub = EpubBuilder::standard().build();
    assert!(matches!(
        Book::from_bytes(epub),
        Err(Error::BadRootfile(path)) if path == "OEBPS/content.opf"
    ));
}

#[test]
fn test_dangling_itemref() {
    let package = opf(
        "<dc:title>Broken</dc:title>",
        r#"<item id="c1" href="ch1.xhtml" media-type="application/xhtml+xml"/>"#,
        r#"<itemref idref="c1"/><itemref idref="missing"/>"#,
    );
    let epub = EpubBuilder::standard()
        .file("OEBPS/content.opf", package)
        .file("OEBPS/ch1.xhtml", xhtml("<p>x</p>"))
        .build();
    assert!(matches!(
        Book::from_bytes(epub),
        Err(Error::BadItemref(id)) if id == "missing"
    ));
}

#[test]
fn test_empty_spine() {
    let package = opf(
        "<dc:title>Empty</dc:title>",
        r#"<item id="c1" href="ch1.xhtml" media-type="application/xhtml+xml"/>"#,
        "",
    );
    let epub = EpubBuilder::standard()
        .file("OEBPS/content.opf", package)
        .file("OEBPS/ch1.xhtml", xhtml("<p>x</p>"))
        .build();
    assert!(matches!(Book::from_bytes(epub), Err(Error::NoItemref)));
}

#[test]
fn test_not_a_zip() {
    let err = Book::from_bytes(b"this is not an archive".to_vec()).unwrap_err();
    assert!(matches!(err, Error::NotAnArchive(_)));
}

// ============================================================================
// Manifest resolution
// ============================================================================

fn with_missing_image() -> Vec<u8> {
    let package = opf(
        "<dc:title>Lenient</dc:title>",
        r#"<item id="c1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="img" href="images/gone.png" media-type="image/png"/>"#,
        r#"<itemref idref="c1"/>"#,
    );
    EpubBuilder::standard()
        .file("OEBPS/content.opf", package)
        .file("OEBPS/ch1.xhtml", xhtml("<p>x</p>"))
        .build()
}

#[test]
fn test_unresolved_href_is_not_fatal() {
    let book = Book::from_bytes(with_missing_image()).unwrap();
    let item = book.default_rendition().manifest.by_id("img").unwrap();
    assert!(!item.is_readable());
    assert_eq!(item.path, "OEBPS/images/gone.png");
}

#[test]
fn test_strict_rejects_unresolved_href() {
    let result = Book::from_bytes_with(with_missing_image(), OpenOptions::default().strict(true));
    assert!(matches!(
        result,
        Err(Error::BadManifest { id, .. }) if id == "img"
    ));
}

#[test]
fn test_duplicate_manifest_id_keeps_first() {
    let package = opf(
        "<dc:title>Dupes</dc:title>",
        r#"<item id="c1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="c1" href="ch2.xhtml" media-type="application/xhtml+xml"/>"#,
        r#"<itemref idref="c1"/>"#,
    );
    let epub = EpubBuilder::standard()
        .file("OEBPS/content.opf", package)
        .file("OEBPS/ch1.xhtml", xhtml("<p>first</p>"))
        .file("OEBPS/ch2.xhtml", xhtml("<p>second</p>"))
        .build();
    let book = Book::from_bytes(epub).unwrap();
    assert_eq!(book.chapter(0).unwrap().path, "OEBPS/ch1.xhtml");
}

#[test]
fn test_multiple_renditions() {
    let container = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="a/content.opf" media-type="application/oebps-package+xml"/>
    <rootfile full-path="b/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
    let package = |title: &str| {
        opf(
            &format!("<dc:title>{title}</dc:title>"),
            r#"<item id="c1" href="ch1.xhtml" media-type="application/xhtml+xml"/>"#,
            r#"<itemref idref="c1"/>"#,
        )
    };
    let epub = EpubBuilder::new()
        .file("META-INF/container.xml", container)
        .file("a/content.opf", package("First"))
        .file("a/ch1.xhtml", xhtml("<p>a</p>"))
        .file("b/content.opf", package("Second"))
        .file("b/ch1.xhtml", xhtml("<p>b</p>"))
        .build();

    let book = Book::from_bytes(epub).unwrap();
    assert_eq!(book.packages().len(), 2);
    assert_eq!(book.metadata().title, "First");
    assert_eq!(book.packages()[1].metadata.title, "Second");
    assert_eq!(book.container().default_rendition().full_path, "a/content.opf");
}

// ============================================================================
// Navigation
// ============================================================================

const NAV: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body>
  <nav epub:type="landmarks"><ol><li><a href="text/ch2.xhtml">Wrong</a></li></ol></nav>
  <nav epub:type="toc">
    <ol>
      <li><a href="text/ch1.xhtml">The <em>First</em> Chapter</a>
        <ol><li><a href="text/ch1.xhtml#part">Part</a></li></ol>
      </li>
      <li><a href="text/ch2.xhtml">Second</a></li>
    </ol>
  </nav>
</body>
</html>"#;

const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
    <navPoint id="n1" playOrder="1">
      <navLabel><text>Uno</text></navLabel>
      <content src="text/ch1.xhtml"/>
      <navPoint id="n2" playOrder="2">
        <navLabel><text>Dos</text></navLabel>
        <content src="text/ch2.xhtml"/>
      </navPoint>
    </navPoint>
  </navMap>
</ncx>"#;

#[test]
fn test_nav_document_titles() {
    let epub = three_chapters(
        r#"<item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>"#,
        "",
    )
    .file("OEBPS/nav.xhtml", NAV)
    .build();
    let book = Book::from_bytes(epub).unwrap();

    let entries = book.navigation().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].label, "The First Chapter");
    assert_eq!(entries[0].children[0].label, "Part");

    assert_eq!(book.chapter_title(0), "The First Chapter");
    assert_eq!(book.chapter_title(1), "Second");
    assert_eq!(book.chapter_title(2), "Chapter 3 of 3");
}

#[test]
fn test_ncx_titles() {
    let epub = three_chapters(
        r#"<item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>"#,
        r#"toc="ncx""#,
    )
    .file("OEBPS/toc.ncx", NCX)
    .build();
    let book = Book::from_bytes(epub).unwrap();

    assert_eq!(book.default_rendition().spine.toc.as_deref(), Some("ncx"));
    assert_eq!(book.chapter_title(0), "Uno");
    // nested entries are searched depth first
    assert_eq!(book.chapter_title(1), "Dos");
    assert_eq!(book.chapter_title(2), "Chapter 3 of 3");
}

#[test]
fn test_broken_navigation_is_ignored() {
    let epub = three_chapters(
        r#"<item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>"#,
        r#"toc="ncx""#,
    )
    .file("OEBPS/toc.ncx", "<ncx><navMap><navPoint><navLabel><text>Uno</text>")
    .build();
    let book = Book::from_bytes(epub).unwrap();
    assert_eq!(book.chapter_title(0), "Chapter 1 of 3");
}

#[test]
fn test_no_navigation_falls_back_to_position() {
    let book = Book::from_bytes(single_chapter("<p>x</p>")).unwrap();
    assert!(book.navigation().is_empty());
    assert_eq!(book.chapter_title(0), "Chapter 1 of 1");
}

// ============================================================================
// Sources
// ============================================================================

#[test]
fn test_open_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.epub");
    std::fs::write(&path, single_chapter("<p>on disk</p>")).unwrap();

    let book = Book::open(&path).unwrap();
    assert_eq!(book.chapter_count(), 1);
    assert!(String::from_utf8(book.read_chapter(0).unwrap()).unwrap().contains("on disk"));
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(Book::open(dir.path().join("absent.epub")), Err(Error::Io(_))));
}
