//! Length-tiered highlight injection.
//!
//! # Responsibility
//! - Decide how many `==color:text==` spans a note should carry.
//! - Ask the backend for missing spans and place them in the text.
//!
//! # Invariants
//! - Text inside triple-backtick fences is never modified.
//! - Markdown links, attachment tokens and existing spans are never
//!   split by a new span.
//! - Every placed or leftover suggestion appears exactly once in the output.
//! - Matching is case-sensitive and literal.

use crate::ai::error::AiResult;
use crate::model::insight::HighlightSuggestion;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::ops::Range;

/// Heading of the section that collects suggestions not found in the text.
pub const HIGHLIGHTS_SECTION_HEADING: &str = "## Highlights";

const FENCE_MARKER: &str = "```";

static HIGHLIGHT_SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"==[A-Za-z]+:[^=\n]+==").expect("valid highlight span regex"));
static PROTECTED_SPAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!?\[[^\]]*\]\([^)]*\)|\[\[ATTACHMENT:\d+\]\]|==[A-Za-z]+:[^=\n]+==")
        .expect("valid protected span regex")
});

/// Target highlight density for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightPlan {
    pub min: usize,
    pub max: usize,
    pub existing: usize,
    /// `max - existing`, floored at zero.
    pub remaining: usize,
}

impl HighlightPlan {
    /// Returns whether the backend should be asked for more spans.
    pub fn needs_supplement(&self) -> bool {
        self.existing < self.min && self.remaining > 0
    }
}

/// Returns the `(min, max)` span count for a text of `char_count` chars.
pub fn highlight_target_range(char_count: usize) -> (usize, usize) {
    match char_count {
        0..=200 => (0, 2),
        201..=800 => (3, 5),
        _ => (5, 8),
    }
}

/// Counts `==color:text==` spans.
pub fn count_highlights(markdown: &str) -> usize {
    HIGHLIGHT_SPAN_RE.find_iter(markdown).count()
}

/// Computes the density plan from the trimmed text length.
pub fn highlight_plan(markdown: &str) -> HighlightPlan {
    let (min, max) = highlight_target_range(markdown.trim().chars().count());
    let existing = count_highlights(markdown);
    HighlightPlan {
        min,
        max,
        existing,
        remaining: max.saturating_sub(existing),
    }
}

/// Tops up highlights when the document is below its tier minimum.
///
/// `supplement` receives the document and the maximum number of spans to
/// return. A failing supplement call leaves the document unchanged.
pub async fn apply_highlights_if_needed<F, Fut>(markdown: &str, supplement: F) -> String
where
    F: FnOnce(String, usize) -> Fut,
    Fut: Future<Output = AiResult<Vec<HighlightSuggestion>>>,
{
    if markdown.trim().is_empty() {
        return markdown.to_string();
    }
    let plan = highlight_plan(markdown);
    if !plan.needs_supplement() {
        return markdown.to_string();
    }

    let mut suggestions = match supplement(markdown.to_string(), plan.remaining).await {
        Ok(suggestions) => suggestions,
        Err(err) => {
            warn!(
                "event=highlight_supplement module=highlight status=degraded code={}",
                err.code()
            );
            return markdown.to_string();
        }
    };
    suggestions.truncate(plan.remaining);
    inject_highlights(markdown, &suggestions)
}

/// Places each suggestion at its first literal match outside code fences.
///
/// Suggestions that cannot be placed are listed under `## Highlights`.
pub fn inject_highlights(markdown: &str, suggestions: &[HighlightSuggestion]) -> String {
    let mut document = markdown.to_string();
    let mut leftovers = Vec::new();
    let mut placed = 0usize;

    for suggestion in suggestions {
        let text = suggestion.text.trim();
        if text.is_empty() {
            continue;
        }
        let markup = suggestion.markup(text);
        match replace_first_outside_fences(&document, text, &markup) {
            Some(updated) => {
                document = updated;
                placed += 1;
            }
            None => leftovers.push(markup),
        }
    }

    info!(
        "event=highlight_inject module=highlight status=ok placed={} leftovers={}",
        placed,
        leftovers.len()
    );
    if leftovers.is_empty() {
        return document;
    }

    let bullets = leftovers
        .iter()
        .map(|markup| format!("- {markup}"))
        .collect::<Vec<_>>()
        .join("\n");
    let body = document.trim_end();
    if body.is_empty() {
        format!("{HIGHLIGHTS_SECTION_HEADING}\n{bullets}")
    } else {
        format!("{body}\n\n{HIGHLIGHTS_SECTION_HEADING}\n{bullets}")
    }
}

/// Splits on fence markers and searches only even-indexed segments.
fn replace_first_outside_fences(document: &str, needle: &str, replacement: &str) -> Option<String> {
    let segments = document.split(FENCE_MARKER).collect::<Vec<_>>();
    let (target_index, position) = segments
        .iter()
        .enumerate()
        .step_by(2)
        .find_map(|(index, segment)| {
            find_unprotected(segment, needle).map(|position| (index, position))
        })?;

    let mut rebuilt = String::with_capacity(document.len() + replacement.len());
    for (index, segment) in segments.iter().enumerate() {
        if index > 0 {
            rebuilt.push_str(FENCE_MARKER);
        }
        if index == target_index {
            rebuilt.push_str(&segment[..position]);
            rebuilt.push_str(replacement);
            rebuilt.push_str(&segment[position + needle.len()..]);
        } else {
            rebuilt.push_str(segment);
        }
    }
    Some(rebuilt)
}

fn find_unprotected(segment: &str, needle: &str) -> Option<usize> {
    let protected = PROTECTED_SPAN_RE
        .find_iter(segment)
        .map(|found| found.range())
        .collect::<Vec<Range<usize>>>();
    segment
        .match_indices(needle)
        .map(|(position, _)| position)
        .find(|position| {
            let end = position + needle.len();
            !protected
                .iter()
                .any(|range| range.start < end && *position < range.end)
        })
}
