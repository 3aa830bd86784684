//! Tag scanning and substitution over WordprocessingML text.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

use quick_xml::escape::{escape, unescape};
use regex::Regex;

use crate::archive::DocxPackage;
use crate::error::TemplateError;

/// Paragraph boundaries and text nodes, in document order. Self-closing
/// paragraphs are matched first so they never open a scope.
static PART_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<empty><w:p(?:\s[^>]*)?/>)|(?P<open><w:p(?:\s[^>]*)?>)|(?P<close></w:p>)|<w:t(?:\s[^>]*)?>(?P<text>[^<]*)</w:t>",
    )
    .expect("part token pattern is valid")
});

const OPEN: char = '{';
const CLOSE: char = '}';
const PRESERVE_OPEN: &str = r#"<w:t xml:space="preserve">"#;
const LINE_BREAK: &str = r#"</w:t><w:br/><w:t xml:space="preserve">"#;

/// Rendering switches.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Turn `\n` inside substituted values into Word line breaks.
    pub linebreaks: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { linebreaks: true }
    }
}

/// A parsed `.docx` template, reusable for any number of renders.
pub struct DocxTemplate {
    package: DocxPackage,
}

impl DocxTemplate {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TemplateError> {
        Ok(Self {
            package: DocxPackage::read(bytes)?,
        })
    }

    /// Distinct tag names found in the template, in paragraph order.
    pub fn tags(&self) -> Result<Vec<String>, TemplateError> {
        let mut found: Vec<String> = Vec::new();
        for part in self.package.text_part_names() {
            let Some(xml) = self.package.part_text(&part)? else {
                continue;
            };
            let layout = PartLayout::parse(&xml, &part, &mut Vec::new());
            for paragraph in &layout.paragraphs {
                let nodes = layout.nodes_of(paragraph);
                let mut ignored = Vec::new();
                scan_paragraph(&nodes, &part, &mut ignored, |name| {
                    if !found.iter().any(|f| f == name) {
                        found.push(name.to_string());
                    }
                    Ok(String::new())
                });
            }
        }
        Ok(found)
    }

    /// Substitute every tag and return the bytes of the rendered package.
    ///
    /// Fails with [`TemplateError::Render`] listing every unresolved,
    /// malformed or unsupported tag when any is found.
    pub fn render(
        &self,
        values: &BTreeMap<String, String>,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, TemplateError> {
        let mut explanations = Vec::new();
        let mut replacements = Vec::new();

        for part in self.package.text_part_names() {
            let Some(xml) = self.package.part_text(&part)? else {
                continue;
            };
            if let Some(rendered) = render_part(&xml, &part, values, options, &mut explanations) {
                replacements.push((part, rendered));
            }
        }

        if !explanations.is_empty() {
            dedup_in_order(&mut explanations);
            return Err(TemplateError::Render { explanations });
        }

        tracing::trace!(parts = replacements.len(), "docx parts rewritten");
        self.package.write_with(&replacements)
    }
}

/// A `<w:t>` node with its text already unescaped.
struct TextNode {
    span: Range<usize>,
    text: String,
}

/// Text nodes of one part, grouped by the paragraph that directly holds them.
///
/// A paragraph nested inside another (text boxes, shapes) is its own group;
/// the outer paragraph keeps the nodes before and after it.
struct PartLayout {
    nodes: Vec<TextNode>,
    paragraphs: Vec<Vec<usize>>,
}

impl PartLayout {
    fn parse(xml: &str, part: &str, explanations: &mut Vec<String>) -> Self {
        let mut nodes = Vec::new();
        let mut paragraphs: Vec<Vec<usize>> = Vec::new();
        let mut open: Vec<usize> = Vec::new();

        for caps in PART_TOKEN.captures_iter(xml) {
            if caps.name("open").is_some() {
                open.push(paragraphs.len());
                paragraphs.push(Vec::new());
            } else if caps.name("close").is_some() {
                open.pop();
            } else if let Some(raw) = caps.name("text") {
                // Text outside any paragraph is not scanned.
                let Some(&paragraph) = open.last() else {
                    continue;
                };
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                let text = match unescape(raw.as_str()) {
                    Ok(text) => text.into_owned(),
                    Err(e) => {
                        explanations.push(format!("Malformed XML text in {part}: {e}"));
                        raw.as_str().to_string()
                    }
                };
                paragraphs[paragraph].push(nodes.len());
                nodes.push(TextNode {
                    span: whole.range(),
                    text,
                });
            }
        }

        paragraphs.retain(|paragraph| !paragraph.is_empty());
        Self { nodes, paragraphs }
    }

    fn nodes_of(&self, paragraph: &[usize]) -> Vec<&TextNode> {
        paragraph.iter().map(|&idx| &self.nodes[idx]).collect()
    }
}

/// Returns the rewritten part, or `None` when it holds no tags.
fn render_part(
    xml: &str,
    part: &str,
    values: &BTreeMap<String, String>,
    options: &RenderOptions,
    explanations: &mut Vec<String>,
) -> Option<String> {
    let layout = PartLayout::parse(xml, part, explanations);
    let mut rewritten: Vec<Option<String>> = vec![None; layout.nodes.len()];

    for paragraph in &layout.paragraphs {
        let nodes = layout.nodes_of(paragraph);
        let texts = scan_paragraph(&nodes, part, explanations, |name| {
            values
                .get(name)
                .cloned()
                .ok_or_else(|| format!("Unresolved tag {{{name}}} in {part}: no value supplied"))
        });
        if let Some(texts) = texts {
            for (&idx, text) in paragraph.iter().zip(texts) {
                rewritten[idx] = Some(text);
            }
        }
    }

    if rewritten.iter().all(Option::is_none) {
        return None;
    }

    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0;
    for (node, text) in layout.nodes.iter().zip(&rewritten) {
        let Some(text) = text else {
            continue;
        };
        out.push_str(&xml[cursor..node.span.start]);
        out.push_str(PRESERVE_OPEN);
        out.push_str(&encode_text(text, options));
        out.push_str("</w:t>");
        cursor = node.span.end;
    }
    out.push_str(&xml[cursor..]);
    Some(out)
}

enum ScanState {
    Text,
    InTag { node: usize, name: String },
}

/// Walk the paragraph text, resolving each `{tag}` through `resolve`.
///
/// Returns the new text of every node, or `None` when the paragraph holds
/// no delimiters at all. The value of a tag lands in the node holding its
/// opening delimiter; the rest of the tag is removed from later nodes.
fn scan_paragraph<F>(
    nodes: &[&TextNode],
    part: &str,
    explanations: &mut Vec<String>,
    mut resolve: F,
) -> Option<Vec<String>>
where
    F: FnMut(&str) -> Result<String, String>,
{
    let mut texts: Vec<String> = vec![String::new(); nodes.len()];
    let mut state = ScanState::Text;
    let mut seen_delimiter = false;
    let mut preceding = String::new();

    for (idx, node) in nodes.iter().enumerate() {
        for ch in node.text.chars() {
            state = match (std::mem::replace(&mut state, ScanState::Text), ch) {
                (ScanState::Text, OPEN) => {
                    seen_delimiter = true;
                    ScanState::InTag {
                        node: idx,
                        name: String::new(),
                    }
                }
                (ScanState::Text, CLOSE) => {
                    seen_delimiter = true;
                    explanations.push(format!(
                        "Unopened tag in {part}: closing delimiter after \"{}\" has no opening delimiter",
                        tail(&preceding, 20)
                    ));
                    preceding.push(ch);
                    ScanState::Text
                }
                (ScanState::Text, _) => {
                    texts[idx].push(ch);
                    preceding.push(ch);
                    ScanState::Text
                }
                (ScanState::InTag { name, .. }, OPEN) => {
                    explanations.push(format!("Unclosed tag {{{name} in {part}"));
                    ScanState::InTag {
                        node: idx,
                        name: String::new(),
                    }
                }
                (ScanState::InTag { node: start, name }, CLOSE) => {
                    let tag = name.trim();
                    match check_tag(tag, part).and_then(|()| resolve(tag)) {
                        Ok(value) => texts[start].push_str(&value),
                        Err(explanation) => explanations.push(explanation),
                    }
                    ScanState::Text
                }
                (ScanState::InTag { node, mut name }, _) => {
                    name.push(ch);
                    ScanState::InTag { node, name }
                }
            };
        }
    }

    if let ScanState::InTag { name, .. } = state {
        explanations.push(format!("Unclosed tag {{{name} in {part}"));
    }

    seen_delimiter.then_some(texts)
}

fn check_tag(tag: &str, part: &str) -> Result<(), String> {
    if tag.is_empty() {
        return Err(format!("Empty tag {{}} in {part}"));
    }
    if tag.starts_with(['#', '/', '^']) {
        return Err(format!(
            "Section tag {{{tag}}} in {part} is not supported: only scalar placeholders can be rendered"
        ));
    }
    Ok(())
}

fn encode_text(text: &str, options: &RenderOptions) -> String {
    if !options.linebreaks || !text.contains('\n') {
        return escape(text).into_owned();
    }
    text.split('\n')
        .map(|line| escape(line.trim_end_matches('\r')).into_owned())
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max_chars)).collect()
}

fn dedup_in_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
