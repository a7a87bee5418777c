//! Compact note digests for cross-note intents.
//!
//! # Responsibility
//! - Project one note into headings, list items and a plain-text snippet.
//! - Keep digest size bounded so many notes fit in one prompt.
//!
//! # Invariants
//! - At most `DIGEST_MAX_ITEMS` headings and bullets each.
//! - `snippet` is markdown-free and at most `DIGEST_SNIPPET_CHARS` chars.

use crate::model::document::{Block, Document};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum headings and bullets kept per digest.
pub const DIGEST_MAX_ITEMS: usize = 8;
/// Maximum snippet length in chars.
pub const DIGEST_SNIPPET_CHARS: usize = 240;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*]\(([^)]+)\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static HIGHLIGHT_SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"==[A-Za-z]+:([^=\n]+)==").expect("valid highlight span regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\*_`#>~\[\]\(\)!]+"#).expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Compact summary of one note used as backend input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDigest {
    pub note_id: Uuid,
    pub title: String,
    pub headings: Vec<String>,
    pub bullets: Vec<String>,
    pub snippet: String,
}

impl NoteDigest {
    /// Builds a digest from a note's title and markdown body.
    pub fn from_markdown(note_id: Uuid, title: &str, markdown: &str) -> Self {
        let document = Document::parse(markdown);
        let headings = document
            .headings()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .take(DIGEST_MAX_ITEMS)
            .map(str::to_string)
            .collect();
        let bullets = document
            .list_items()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .take(DIGEST_MAX_ITEMS)
            .map(str::to_string)
            .collect();

        let prose = document
            .blocks()
            .iter()
            .filter_map(|block| match block {
                Block::Paragraph { text } | Block::Quote { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            note_id,
            title: title.trim().to_string(),
            headings,
            bullets,
            snippet: plain_snippet(&prose, DIGEST_SNIPPET_CHARS),
        }
    }
}

/// Strips markdown syntax and truncates to `max_chars`.
pub fn plain_snippet(markdown: &str, max_chars: usize) -> String {
    let without_images = MARKDOWN_IMAGE_RE.replace_all(markdown, " ");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_highlights = HIGHLIGHT_SPAN_RE.replace_all(&without_links, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_highlights, " ");
    let normalized = WHITESPACE_RE.replace_all(&without_symbols, " ");
    normalized.trim().chars().take(max_chars).collect()
}
