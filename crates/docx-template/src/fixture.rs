//! Minimal in-memory `.docx` packages for tests.
//!
//! Each paragraph is given as a list of run texts so tests can reproduce
//! Word splitting a tag across several runs.

use std::io::{Cursor, Read, Write};
use std::sync::LazyLock;

use quick_xml::escape::{escape, unescape};
use regex::Regex;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:p[\s>].*?</w:p>").expect("valid pattern"));

static TEXT_OR_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:br/>|<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("valid pattern")
});

/// Build a `.docx` whose body holds one paragraph per entry, one run per text.
pub fn docx_with_paragraphs(paragraphs: &[&[&str]]) -> Vec<u8> {
    let mut body = String::new();
    for runs in paragraphs {
        body.push_str("<w:p>");
        for text in runs.iter() {
            let open = if text.starts_with(' ') || text.ends_with(' ') {
                r#"<w:t xml:space="preserve">"#
            } else {
                "<w:t>"
            };
            body.push_str("<w:r><w:rPr><w:b/></w:rPr>");
            body.push_str(open);
            body.push_str(&escape(*text));
            body.push_str("</w:t></w:r>");
        }
        body.push_str("</w:p>");
    }
    docx_with_body(&body)
}

/// Build a `.docx` around raw `<w:body>` content, for layouts the run
/// builder cannot express (text boxes, nested paragraphs).
pub fn docx_with_body(body: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("word/document.xml", document.as_str()),
    ] {
        writer.start_file(name, options).expect("start zip entry");
        writer
            .write_all(content.as_bytes())
            .expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Raw `word/document.xml` of a package.
pub fn document_xml(docx: &[u8]) -> String {
    let mut archive = ZipArchive::new(Cursor::new(docx)).expect("valid docx archive");
    let mut part = archive
        .by_name("word/document.xml")
        .expect("document part present");
    let mut xml = String::new();
    part.read_to_string(&mut xml).expect("utf-8 document part");
    xml
}

/// Visible text of each body paragraph; `<w:br/>` reads as `\n`.
pub fn paragraph_texts(docx: &[u8]) -> Vec<String> {
    let xml = document_xml(docx);
    PARAGRAPH
        .find_iter(&xml)
        .map(|paragraph| {
            TEXT_OR_BREAK
                .captures_iter(paragraph.as_str())
                .map(|caps| match caps.get(1) {
                    Some(text) => unescape(text.as_str())
                        .expect("well-formed text")
                        .into_owned(),
                    None => "\n".to_string(),
                })
                .collect::<String>()
        })
        .collect()
}
