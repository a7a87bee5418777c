//! Markdown block model consumed by the AI pipeline.
//!
//! # Responsibility
//! - Parse note markdown into an ordered block sequence.
//! - Flatten blocks back into canonical markdown.
//!
//! # Invariants
//! - `Document::parse(&doc.flatten()) == doc` for documents produced by `parse`.
//! - Attachment blocks always flatten to the canonical `![Attachment](target)`.
//! - Fenced code content is carried byte-for-byte, blank lines included.

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*$").expect("valid heading regex"));
static CHECKLIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*+]\s+\[([ xX])\]\s+(.*)$").expect("valid checklist regex"));
static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*+]\s+(.*)$").expect("valid bullet regex"));
static NUMBERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,9})[.)]\s+(.*)$").expect("valid numbered regex"));
static QUOTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>\s?(.*)$").expect("valid quote regex"));
static ATTACHMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!\[[^\]]*\]\(([^)]*)\)$").expect("valid attachment regex"));

/// Alt text used by the canonical attachment line.
pub const ATTACHMENT_ALT: &str = "Attachment";

const FENCE_MARKER: &str = "```";

/// One typed markdown block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    /// Consecutive non-blank prose lines, joined with `\n`.
    Paragraph { text: String },
    Bullet { text: String },
    Numbered { number: u32, text: String },
    Checklist { checked: bool, text: String },
    Quote { text: String },
    /// Fenced code block. `language` is the info string after the fence.
    Code { language: Option<String>, code: String },
    /// Raw pipe-table lines, kept as written.
    Table { rows: Vec<String> },
    /// Image/file reference. `target` is the raw storage path or filename.
    Attachment { target: String },
}

impl Block {
    /// Returns the attachment target trimmed, or `None` when it is blank.
    pub fn attachment_target(&self) -> Option<&str> {
        match self {
            Self::Attachment { target } => {
                let trimmed = target.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    fn is_list_item(&self) -> bool {
        matches!(
            self,
            Self::Bullet { .. } | Self::Numbered { .. } | Self::Checklist { .. }
        )
    }

    fn to_markdown(&self) -> String {
        match self {
            Self::Heading { level, text } => {
                format!("{} {text}", "#".repeat(usize::from(*level)))
            }
            Self::Paragraph { text } => text.clone(),
            Self::Bullet { text } => format!("- {text}"),
            Self::Numbered { number, text } => format!("{number}. {text}"),
            Self::Checklist { checked, text } => {
                let mark = if *checked { 'x' } else { ' ' };
                format!("- [{mark}] {text}")
            }
            Self::Quote { text } => format!("> {text}"),
            Self::Code { language, code } => {
                let info = language.as_deref().unwrap_or("");
                if code.is_empty() {
                    format!("{FENCE_MARKER}{info}\n{FENCE_MARKER}")
                } else {
                    format!("{FENCE_MARKER}{info}\n{code}\n{FENCE_MARKER}")
                }
            }
            Self::Table { rows } => rows.join("\n"),
            Self::Attachment { target } => canonical_attachment_line(target),
        }
    }
}

/// Returns the canonical one-line markdown for an attachment target.
pub fn canonical_attachment_line(target: &str) -> String {
    format!("![{ATTACHMENT_ALT}]({target})")
}

/// Returns the trimmed target when `line` is a standalone attachment line.
///
/// Blank targets yield `None`, matching `Block::attachment_target`.
pub fn attachment_line_target(line: &str) -> Option<&str> {
    let caps = ATTACHMENT_RE.captures(line.trim())?;
    let target = caps.get(1)?.as_str().trim();
    (!target.is_empty()).then_some(target)
}

/// Returns true when `line` opens or closes a fenced code block.
pub fn is_fence_line(line: &str) -> bool {
    line.trim_start().starts_with(FENCE_MARKER)
}

/// Ordered block sequence for one note body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Parses markdown into blocks.
    ///
    /// Parsing is total: any input yields a document. An unterminated code
    /// fence runs to end of input.
    pub fn parse(markdown: &str) -> Self {
        let mut blocks = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        let mut lines = markdown.lines().peekable();

        while let Some(line) = lines.next() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                flush_paragraph(&mut paragraph, &mut blocks);
                continue;
            }

            if let Some(info) = trimmed.strip_prefix(FENCE_MARKER) {
                flush_paragraph(&mut paragraph, &mut blocks);
                let info = info.trim();
                let mut code_lines = Vec::new();
                for code_line in lines.by_ref() {
                    if code_line.trim_start().starts_with(FENCE_MARKER) {
                        break;
                    }
                    code_lines.push(code_line);
                }
                blocks.push(Block::Code {
                    language: (!info.is_empty()).then(|| info.to_string()),
                    code: code_lines.join("\n"),
                });
                continue;
            }

            if trimmed.starts_with('|') {
                flush_paragraph(&mut paragraph, &mut blocks);
                let mut rows = vec![trimmed.to_string()];
                while let Some(next) = lines.peek() {
                    let next = next.trim();
                    if !next.starts_with('|') {
                        break;
                    }
                    rows.push(next.to_string());
                    lines.next();
                }
                blocks.push(Block::Table { rows });
                continue;
            }

            if let Some(block) = classify_line(trimmed) {
                flush_paragraph(&mut paragraph, &mut blocks);
                blocks.push(block);
                continue;
            }

            paragraph.push(trimmed);
        }

        flush_paragraph(&mut paragraph, &mut blocks);
        Self { blocks }
    }

    /// Serializes blocks to canonical markdown.
    ///
    /// Adjacent list items and adjacent quotes are joined by one newline,
    /// every other boundary by a blank line.
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        let mut previous: Option<&Block> = None;
        for block in &self.blocks {
            if let Some(prev) = previous {
                let tight = (prev.is_list_item() && block.is_list_item())
                    || (matches!(prev, Block::Quote { .. }) && matches!(block, Block::Quote { .. }));
                out.push_str(if tight { "\n" } else { "\n\n" });
            }
            out.push_str(&block.to_markdown());
            previous = Some(block);
        }
        out
    }

    /// Heading texts in document order.
    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Heading { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Bullet, numbered and checklist item texts in document order.
    pub fn list_items(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Bullet { text }
            | Block::Numbered { text, .. }
            | Block::Checklist { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

fn classify_line(trimmed: &str) -> Option<Block> {
    if let Some(caps) = ATTACHMENT_RE.captures(trimmed) {
        return Some(Block::Attachment {
            target: caps[1].trim().to_string(),
        });
    }
    if let Some(caps) = HEADING_RE.captures(trimmed) {
        return Some(Block::Heading {
            level: caps[1].len() as u8,
            text: caps[2].to_string(),
        });
    }
    if let Some(caps) = CHECKLIST_RE.captures(trimmed) {
        return Some(Block::Checklist {
            checked: !caps[1].trim().is_empty(),
            text: caps[2].to_string(),
        });
    }
    if let Some(caps) = BULLET_RE.captures(trimmed) {
        return Some(Block::Bullet {
            text: caps[1].to_string(),
        });
    }
    if let Some(caps) = NUMBERED_RE.captures(trimmed) {
        let number = caps[1].parse::<u32>().ok()?;
        return Some(Block::Numbered {
            number,
            text: caps[2].to_string(),
        });
    }
    QUOTE_RE.captures(trimmed).map(|caps| Block::Quote {
        text: caps[1].to_string(),
    })
}

fn flush_paragraph(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if paragraph.is_empty() {
        return;
    }
    blocks.push(Block::Paragraph {
        text: paragraph.join("\n"),
    });
    paragraph.clear();
}
