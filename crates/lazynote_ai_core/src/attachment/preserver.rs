//! Attachment placeholder tokens for backend round trips.
//!
//! # Responsibility
//! - Swap attachment lines for opaque `[[ATTACHMENT:n]]` tokens before a
//!   prompt leaves the device.
//! - Put the lines back afterwards and re-append any the backend dropped.
//!
//! # Invariants
//! - Tokens are numbered sequentially in document order, starting at 0.
//! - Attachments with a blank target are never tokenized.
//! - `restore_and_ensure` output contains every token's markdown line at
//!   least once.

use crate::model::document::{
    attachment_line_target, canonical_attachment_line, is_fence_line, Document,
};
use log::{debug, warn};
use std::collections::BTreeSet;

/// Heading of the section that collects attachments the backend dropped.
pub const ATTACHMENTS_SECTION_HEADING: &str = "## Attachments";

/// One protected attachment for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentToken {
    /// Placeholder sent to the backend, e.g. `[[ATTACHMENT:0]]`.
    pub token: String,
    /// Canonical markdown line the token stands in for.
    pub markdown_line: String,
    /// Trimmed storage path or filename.
    pub target: String,
}

/// Returns the placeholder string for attachment `index`.
pub fn attachment_token(index: usize) -> String {
    format!("[[ATTACHMENT:{index}]]")
}

/// Collects one token per attachment block with a resolvable target.
pub fn extract_tokens(document: &Document) -> Vec<AttachmentToken> {
    let tokens = document
        .blocks()
        .iter()
        .filter_map(|block| block.attachment_target())
        .enumerate()
        .map(|(index, target)| AttachmentToken {
            token: attachment_token(index),
            markdown_line: canonical_attachment_line(target),
            target: target.to_string(),
        })
        .collect::<Vec<_>>();
    debug!(
        "event=attachment_extract module=attachment status=ok tokens={}",
        tokens.len()
    );
    tokens
}

/// Replaces the first occurrence of each token's markdown line with the token.
pub fn tokenize(content: &str, tokens: &[AttachmentToken]) -> String {
    let mut result = content.to_string();
    for token in tokens {
        if let Some(position) = result.find(token.markdown_line.as_str()) {
            result.replace_range(
                position..position + token.markdown_line.len(),
                token.token.as_str(),
            );
        }
    }
    result
}

/// Replaces each standalone attachment line of the raw note with its token.
///
/// Every other line is kept verbatim, indentation and trailing spaces
/// included. Lines inside fenced code are never touched. `tokens` must come
/// from `extract_tokens` on the same markdown so the order lines up.
pub fn tokenize_source(markdown: &str, tokens: &[AttachmentToken]) -> String {
    let mut pending = tokens.iter();
    let mut in_fence = false;
    markdown
        .split('\n')
        .map(|line| {
            if is_fence_line(line) {
                in_fence = !in_fence;
                return line.to_string();
            }
            if in_fence || attachment_line_target(line).is_none() {
                return line.to_string();
            }
            match pending.next() {
                Some(token) => {
                    let indent = &line[..line.len() - line.trim_start().len()];
                    format!("{indent}{}", token.token)
                }
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replaces every occurrence of each token with its markdown line.
pub fn restore(content: &str, tokens: &[AttachmentToken]) -> String {
    tokens.iter().fold(content.to_string(), |acc, token| {
        acc.replace(token.token.as_str(), token.markdown_line.as_str())
    })
}

/// Appends every token line missing from `markdown` under `## Attachments`.
pub fn ensure_all_attachments_present(markdown: &str, tokens: &[AttachmentToken]) -> String {
    let mut seen = BTreeSet::new();
    let missing = tokens
        .iter()
        .map(|token| token.markdown_line.as_str())
        .filter(|line| !markdown.contains(line) && seen.insert(*line))
        .collect::<Vec<_>>();
    if missing.is_empty() {
        return markdown.to_string();
    }

    warn!(
        "event=attachment_reappend module=attachment status=degraded missing={}",
        missing.len()
    );
    let body = markdown.trim_end();
    let section = format!("{ATTACHMENTS_SECTION_HEADING}\n{}", missing.join("\n"));
    if body.is_empty() {
        section
    } else {
        format!("{body}\n\n{section}")
    }
}

/// Restores tokens, then re-appends any attachment still missing.
pub fn restore_and_ensure(content: &str, tokens: &[AttachmentToken]) -> String {
    ensure_all_attachments_present(&restore(content, tokens), tokens)
}
