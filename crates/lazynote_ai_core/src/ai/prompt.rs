//! Prompt templates for every AI intent.
//!
//! # Responsibility
//! - Render one self-contained prompt per intent: strict-JSON header,
//!   schema, numbered rules, optional notebook context, user content.
//!
//! # Invariants
//! - Prompts are deterministic for identical inputs; a retry resends the
//!   exact same text.
//! - Protected tokens are listed verbatim whenever any exist.

use crate::highlight::injector::highlight_target_range;
use crate::model::digest::NoteDigest;
use crate::model::insight::HighlightColor;

const STRICT_JSON_HEADER: &str = "You are the writing assistant inside a note-taking app.\n\
Respond with strict JSON only. Do not wrap it in markdown code fences and do not add any text before or after it.\n\
The JSON must match this schema:";

const TASKS_SCHEMA: &str = r#"{"tasks":[{"text":"string","dueDate":"string|null","priority":"high|medium|low","confidence":0.0,"sourceAnchor":{"paragraphIndex":0}}]}"#;

const ANALYZE_SCHEMA: &str = r#"{"markdown":"string","report":{"title":"string","summary":"string","sections":[{"heading":"string","paragraphs":["string"],"bullets":["string"]}],"tables":[{"title":"string","columns":["string"],"rows":[["string"]],"notes":"string|null"}]},"tasks":[{"text":"string","dueDate":"string|null","priority":"high|medium|low","confidence":0.0,"sourceAnchor":{"paragraphIndex":0}}]}"#;

const REWRITE_SCHEMA: &str = r#"{"title":"string|null","markdown":"string"}"#;

const HIGHLIGHTS_SCHEMA: &str = r#"{"highlights":[{"color":"yellow|green|blue|pink|orange|purple","text":"string"}]}"#;

const CONNECTIONS_SCHEMA: &str =
    r#"{"connections":[{"sourceNoteId":"uuid","targetNoteId":"uuid","reason":"string"}]}"#;

const REPORT_SCHEMA: &str = r#"{"report":{"title":"string","summary":"string","sections":[{"heading":"string","paragraphs":["string"],"bullets":["string"]}],"tables":[{"title":"string","columns":["string"],"rows":[["string"]],"notes":"string|null"}]}}"#;

/// Rewrite flavor requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    /// Clearer structure and wording, same meaning.
    Optimize,
    /// Remove repetition and merge overlapping points.
    Dedupe,
    /// Elaborate each point with more detail.
    Expand,
}

impl RewriteMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "optimize" => Some(Self::Optimize),
            "dedupe" => Some(Self::Dedupe),
            "expand" => Some(Self::Expand),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optimize => "optimize",
            Self::Dedupe => "dedupe",
            Self::Expand => "expand",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Self::Optimize => {
                "Improve clarity, flow and structure without changing the meaning. Keep roughly the same length."
            }
            Self::Dedupe => {
                "Remove repeated sentences and merge overlapping points. Never drop a fact that appears only once."
            }
            Self::Expand => {
                "Elaborate every point with concrete detail and examples. Do not more than double the length."
            }
        }
    }
}

pub fn extract_tasks_prompt(text: &str) -> String {
    let rules = [
        "Only include actionable items the author intends to do.".to_string(),
        "Use an ISO 8601 date for dueDate when the note states one, otherwise null.".to_string(),
        "confidence is a number between 0 and 1.".to_string(),
        "sourceAnchor.paragraphIndex is the 0-based index of the paragraph the task comes from."
            .to_string(),
        "Return {\"tasks\": []} when there is nothing actionable.".to_string(),
        same_language_rule(),
    ];
    assemble(TASKS_SCHEMA, &rules, None, None, "Note content", text)
}

pub fn analyze_note_prompt(
    text: &str,
    title: &str,
    notebook_context: Option<&str>,
    protected_tokens: &[String],
) -> String {
    let (min, max) = highlight_target_range(text.trim().chars().count());
    let mut rules = vec![
        "markdown is the cleaned-up note body: fix structure and wording, keep every fact, and stay between 70% and 130% of the source length.".to_string(),
        "report summarizes the note. Do not repeat report summary sentences, section bullets or table content inside markdown.".to_string(),
        "Put tabular data only in report.tables; never write markdown tables in markdown.".to_string(),
        "Copy fenced code blocks byte-for-byte, including the language tag. Never rewrite code.".to_string(),
        format!(
            "Emphasize key phrases in markdown with =={{color}}:{{text}}== using only {}; use between {min} and {max} highlights.",
            color_list()
        ),
        "tasks lists actionable items with the same rules as a task extraction.".to_string(),
        same_language_rule(),
    ];
    if let Some(rule) = protected_tokens_rule(protected_tokens) {
        rules.push(rule);
    }
    assemble(
        ANALYZE_SCHEMA,
        &rules,
        notebook_context,
        Some(title),
        "Note content",
        text,
    )
}

pub fn rewrite_note_prompt(
    text: &str,
    title: &str,
    notebook_context: Option<&str>,
    mode: RewriteMode,
    protected_tokens: &[String],
) -> String {
    let mut rules = vec![
        mode.instruction().to_string(),
        "title is an improved note title, or null to keep the current one.".to_string(),
        "Copy fenced code blocks byte-for-byte, including the language tag.".to_string(),
        format!(
            "Keep existing ==color:text== highlights; colors must be one of {}.",
            color_list()
        ),
        same_language_rule(),
    ];
    if let Some(rule) = protected_tokens_rule(protected_tokens) {
        rules.push(rule);
    }
    assemble(
        REWRITE_SCHEMA,
        &rules,
        notebook_context,
        Some(title),
        "Note content",
        text,
    )
}

pub fn supplement_highlights_prompt(text: &str, max_highlights: usize) -> String {
    let rules = [
        format!("Return at most {max_highlights} highlights."),
        "text must be copied exactly, character for character, from the note; do not paraphrase."
            .to_string(),
        "Pick short key phrases (3 to 12 words), never whole paragraphs.".to_string(),
        "Never pick text inside fenced code blocks or placeholder tokens.".to_string(),
        format!("color is one of {}.", color_list()),
    ];
    assemble(HIGHLIGHTS_SCHEMA, &rules, None, None, "Note content", text)
}

pub fn semantic_connections_prompt(digests: &[NoteDigest], limit: usize) -> String {
    let rules = [
        format!("Return at most {limit} connections."),
        "sourceNoteId and targetNoteId must be noteId values from the input and must differ."
            .to_string(),
        "Only link notes that share a concrete topic, project or entity.".to_string(),
        "reason is one short sentence.".to_string(),
        same_language_rule(),
    ];
    assemble(
        CONNECTIONS_SCHEMA,
        &rules,
        None,
        None,
        "Note digests (JSON)",
        &digests_json(digests),
    )
}

pub fn digest_report_prompt(digests: &[NoteDigest], notebook_context: Option<&str>) -> String {
    let rules = [
        "report synthesizes all notes into one overview; group related notes into sections."
            .to_string(),
        "Use report.tables for comparisons, schedules or figures that span notes.".to_string(),
        "Do not invent facts that are not in the digests.".to_string(),
        same_language_rule(),
    ];
    assemble(
        REPORT_SCHEMA,
        &rules,
        notebook_context,
        None,
        "Note digests (JSON)",
        &digests_json(digests),
    )
}

fn assemble(
    schema: &str,
    rules: &[String],
    notebook_context: Option<&str>,
    title: Option<&str>,
    content_label: &str,
    content: &str,
) -> String {
    let mut prompt = format!("{STRICT_JSON_HEADER}\n{schema}\n\nRules:\n");
    for (index, rule) in rules.iter().enumerate() {
        prompt.push_str(&format!("{}. {rule}\n", index + 1));
    }

    if let Some(context) = notebook_context.map(str::trim).filter(|value| !value.is_empty()) {
        prompt.push_str(&format!("\nNotebook context:\n{context}\n"));
    }
    if let Some(title) = title.map(str::trim).filter(|value| !value.is_empty()) {
        prompt.push_str(&format!("\nNote title: {title}\n"));
    }
    prompt.push_str(&format!("\n{content_label}:\n<<<\n{content}\n>>>\n"));
    prompt
}

fn protected_tokens_rule(tokens: &[String]) -> Option<String> {
    if tokens.is_empty() {
        return None;
    }
    Some(format!(
        "These placeholder tokens stand for attachments. Keep each one exactly as written, once, on its own line: {}",
        tokens.join(", ")
    ))
}

fn same_language_rule() -> String {
    "Write in the same language as the note.".to_string()
}

fn color_list() -> String {
    HighlightColor::ALL
        .iter()
        .map(|color| color.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

fn digests_json(digests: &[NoteDigest]) -> String {
    serde_json::to_string_pretty(digests).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::{analyze_note_prompt, rewrite_note_prompt, RewriteMode};

    #[test]
    fn analyze_prompt_lists_protected_tokens_and_context() {
        let prompt = analyze_note_prompt(
            "Body\n[[ATTACHMENT:0]]",
            "Groceries",
            Some("Household notebook"),
            &["[[ATTACHMENT:0]]".to_string()],
        );
        assert!(prompt.starts_with("You are the writing assistant"));
        assert!(prompt.contains("on its own line: [[ATTACHMENT:0]]"));
        assert!(prompt.contains("Notebook context:\nHousehold notebook"));
        assert!(prompt.contains("Note title: Groceries"));
    }

    #[test]
    fn rewrite_prompt_without_tokens_omits_token_rule() {
        let prompt = rewrite_note_prompt("Body", "T", None, RewriteMode::Dedupe, &[]);
        assert!(!prompt.contains("placeholder tokens"));
        assert!(!prompt.contains("Notebook context"));
        assert!(prompt.contains("Remove repeated sentences"));
    }

    #[test]
    fn rewrite_mode_parse_is_case_insensitive() {
        assert_eq!(RewriteMode::parse(" Expand "), Some(RewriteMode::Expand));
        assert_eq!(RewriteMode::parse("shorten"), None);
    }
}
