//! Markdown-to-AST parser.
//!
//! A single forward scan over lines drives a small state machine
//! (`Normal`, `InCodeBlock`, `InList`). Fenced code is consumed verbatim
//! and is never reinterpreted as headers or lists. YAML front matter is
//! supplementary: a decode failure is logged and parsing continues with
//! an empty map.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use unicode_segmentation::UnicodeSegmentation;

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*+]|\d+\.)\s+").expect("list marker regex"));

/// Kind of a parsed document element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Header,
    Paragraph,
    CodeBlock,
    List,
}

/// A typed document element. Produced once by the parser; immutable
/// afterward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    /// Header: the title without `#` markers. Code block: the fenced text
    /// including both fences. List: the raw marker lines. Paragraph: the
    /// lines joined with single spaces.
    pub text: String,
    /// Header level (1-6), headers only
    pub level: Option<u8>,
    /// Fence info string, code blocks only
    pub language: Option<String>,
    /// Item texts without markers, lists only
    pub items: Vec<String>,
}

impl Element {
    fn header(level: u8, title: &str) -> Self {
        Self {
            kind: ElementKind::Header,
            text: title.to_string(),
            level: Some(level),
            language: None,
            items: Vec::new(),
        }
    }

    fn paragraph(text: String) -> Self {
        Self {
            kind: ElementKind::Paragraph,
            text,
            level: None,
            language: None,
            items: Vec::new(),
        }
    }

    fn code_block(text: String, language: Option<String>) -> Self {
        Self {
            kind: ElementKind::CodeBlock,
            text,
            level: None,
            language,
            items: Vec::new(),
        }
    }

    fn list(text: String, items: Vec<String>) -> Self {
        Self {
            kind: ElementKind::List,
            text,
            level: None,
            language: None,
            items,
        }
    }

    /// Render the element back to markdown-shaped text
    #[must_use]
    pub fn markdown(&self) -> String {
        match self.kind {
            ElementKind::Header => {
                let level = usize::from(self.level.unwrap_or(1));
                if self.text.is_empty() {
                    "#".repeat(level)
                } else {
                    format!("{} {}", "#".repeat(level), self.text)
                }
            }
            _ => self.text.clone(),
        }
    }

    /// Rendered length in characters
    #[must_use]
    pub fn char_len(&self) -> usize {
        match self.kind {
            ElementKind::Header => {
                let level = usize::from(self.level.unwrap_or(1));
                if self.text.is_empty() {
                    level
                } else {
                    level + 1 + self.text.chars().count()
                }
            }
            _ => self.text.chars().count(),
        }
    }
}

/// Parsed document: ordered elements plus extracted front matter and
/// derived metadata. Owned by the parsing stage; strategies receive it
/// by immutable reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentAst {
    pub elements: Vec<Element>,
    pub frontmatter: Map<String, Value>,
    pub metadata: Map<String, Value>,
}

impl DocumentAst {
    /// Flatten the elements back into a single text, front matter
    /// stripped. Used by the window-sliding strategies.
    #[must_use]
    pub fn flattened_text(&self) -> String {
        let parts: Vec<String> = self.elements.iter().map(Element::markdown).collect();
        parts.join("\n\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InCodeBlock,
    InList,
}

/// Parse raw text into a [`DocumentAst`]
#[must_use]
pub fn parse(text: &str) -> DocumentAst {
    let (frontmatter, body) = strip_front_matter(text);
    let lines: Vec<&str> = body.lines().collect();

    let mut elements: Vec<Element> = Vec::new();
    let mut state = State::Normal;

    let mut paragraph: Vec<&str> = Vec::new();
    let mut code: Vec<&str> = Vec::new();
    let mut code_language: Option<String> = None;
    let mut list_lines: Vec<&str> = Vec::new();
    let mut list_items: Vec<String> = Vec::new();

    let flush_paragraph = |paragraph: &mut Vec<&str>, elements: &mut Vec<Element>| {
        if !paragraph.is_empty() {
            elements.push(Element::paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    };
    let flush_list =
        |list_lines: &mut Vec<&str>, list_items: &mut Vec<String>, elements: &mut Vec<Element>| {
            if !list_lines.is_empty() {
                elements.push(Element::list(
                    list_lines.join("\n"),
                    std::mem::take(list_items),
                ));
                list_lines.clear();
            }
        };

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        match state {
            State::InCodeBlock => {
                code.push(line);
                if trimmed.starts_with("```") {
                    elements.push(Element::code_block(code.join("\n"), code_language.take()));
                    code.clear();
                    state = State::Normal;
                }
                i += 1;
            }
            State::InList => {
                if trimmed.is_empty() {
                    // Blank lines continue the list; a following non-marker
                    // line ends it.
                    i += 1;
                } else if let Some(marker) = LIST_MARKER.find(trimmed) {
                    list_lines.push(trimmed);
                    list_items.push(trimmed[marker.end()..].to_string());
                    i += 1;
                } else {
                    flush_list(&mut list_lines, &mut list_items, &mut elements);
                    state = State::Normal;
                    // Reprocess the current line in Normal state.
                }
            }
            State::Normal => {
                if trimmed.is_empty() {
                    flush_paragraph(&mut paragraph, &mut elements);
                    i += 1;
                } else if let Some((level, title)) = header_line(trimmed) {
                    flush_paragraph(&mut paragraph, &mut elements);
                    elements.push(Element::header(level, title));
                    i += 1;
                } else if let Some(info) = trimmed.strip_prefix("```") {
                    flush_paragraph(&mut paragraph, &mut elements);
                    code_language = Some(info.trim().to_string()).filter(|s| !s.is_empty());
                    code.push(line);
                    state = State::InCodeBlock;
                    i += 1;
                } else if LIST_MARKER.is_match(trimmed) {
                    flush_paragraph(&mut paragraph, &mut elements);
                    state = State::InList;
                    // Reprocess the current line in InList state.
                } else {
                    paragraph.push(trimmed);
                    i += 1;
                }
            }
        }
    }

    // End of input: close whatever is still open. An unterminated code
    // fence consumes to EOF by contract.
    flush_paragraph(&mut paragraph, &mut elements);
    flush_list(&mut list_lines, &mut list_items, &mut elements);
    if !code.is_empty() {
        elements.push(Element::code_block(code.join("\n"), code_language.take()));
    }

    let metadata = derive_metadata(&elements, &frontmatter);

    DocumentAst {
        elements,
        frontmatter,
        metadata,
    }
}

fn header_line(trimmed: &str) -> Option<(u8, &str)> {
    let run = trimmed.chars().take_while(|&c| c == '#').count();
    if run == 0 {
        return None;
    }
    let title = trimmed[run..].trim();
    Some((run.min(6) as u8, title))
}

/// Strip and decode YAML front matter delimited by `---` at document
/// start. Returns the decoded map (empty on any failure) and the
/// remaining body.
fn strip_front_matter(text: &str) -> (Map<String, Value>, &str) {
    let empty = Map::new();

    let mut offset = 0usize;
    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (empty, text);
    };
    if first.trim_end() != "---" {
        return (empty, text);
    }
    offset += first.len();
    let yaml_start = offset;

    let mut yaml_end = None;
    for line in lines {
        if line.trim_end() == "---" {
            yaml_end = Some(offset);
            offset += line.len();
            break;
        }
        offset += line.len();
    }
    let Some(yaml_end) = yaml_end else {
        // No closing delimiter: treat the leading `---` as document text.
        return (empty, text);
    };

    let body = &text[offset..];
    let block = &text[yaml_start..yaml_end];
    match serde_yaml::from_str::<Value>(block) {
        Ok(Value::Object(map)) => (map, body),
        Ok(Value::Null) => (empty, body),
        Ok(_) => {
            log::warn!("front matter is not a mapping, ignoring it");
            (empty, body)
        }
        Err(err) => {
            log::warn!("failed to decode front matter, continuing without it: {err}");
            (empty, body)
        }
    }
}

/// Derive document metadata once, after the scan
fn derive_metadata(elements: &[Element], frontmatter: &Map<String, Value>) -> Map<String, Value> {
    let mut metadata = Map::new();

    let count = |kind: ElementKind| {
        elements.iter().filter(|e| e.kind == kind).count() as u64
    };
    metadata.insert("header_count".into(), json!(count(ElementKind::Header)));
    metadata.insert(
        "paragraph_count".into(),
        json!(count(ElementKind::Paragraph)),
    );
    metadata.insert(
        "code_block_count".into(),
        json!(count(ElementKind::CodeBlock)),
    );
    metadata.insert("list_count".into(), json!(count(ElementKind::List)));

    let headers: Vec<&Element> = elements
        .iter()
        .filter(|e| e.kind == ElementKind::Header)
        .collect();
    let hierarchy: Vec<Value> = headers
        .iter()
        .map(|h| json!({ "level": h.level.unwrap_or(1), "title": h.text }))
        .collect();
    metadata.insert("header_hierarchy".into(), Value::Array(hierarchy));

    let title = headers
        .iter()
        .find(|h| h.level == Some(1))
        .or_else(|| headers.first())
        .map(|h| h.text.clone())
        .or_else(|| {
            frontmatter
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_string)
        });
    if let Some(title) = title {
        metadata.insert("title".into(), Value::String(title));
    }

    let word_count: usize = elements
        .iter()
        .map(|e| e.text.unicode_words().count())
        .sum();
    metadata.insert("word_count".into(), json!(word_count as u64));
    // 200 words per minute, rounded up, minimum one minute.
    let minutes = (word_count as u64).div_ceil(200).max(1);
    metadata.insert("estimated_reading_minutes".into(), json!(minutes));

    metadata
}
