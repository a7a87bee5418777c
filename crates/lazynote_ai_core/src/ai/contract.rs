//! JSON response contract for every AI intent.
//!
//! # Responsibility
//! - Define the wire shapes each intent expects back.
//! - Strip code-fence wrapping and decode with one slice fallback.
//! - Convert wire shapes into validated model types.
//!
//! # Invariants
//! - Absent arrays decode as empty; absent objects decode as `None`.
//! - Wire → model conversion drops blank items instead of failing.

use crate::ai::error::{AiError, AiResult};
use crate::model::insight::{
    ConnectionSuggestion, HighlightColor, HighlightSuggestion, InsightReport, ReportSection,
    ReportTable, SourceAnchor, TaskPriority, TaskSuggestion,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use uuid::Uuid;

const FENCE_MARKER: &str = "```";

/// Removes a wrapping markdown code fence from a raw response.
///
/// Only applies when the trimmed response starts with a fence marker; the
/// opening line (with its info string) and a trailing fence are removed.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with(FENCE_MARKER) {
        return trimmed;
    }
    let body = match trimmed.find('\n') {
        Some(newline) => &trimmed[newline + 1..],
        None => &trimmed[FENCE_MARKER.len()..],
    };
    body.trim_end()
        .strip_suffix(FENCE_MARKER)
        .unwrap_or(body)
        .trim()
}

/// Decodes a raw backend response into `W`.
///
/// Tries the fence-stripped text first, then the outermost `{...}` slice.
///
/// # Errors
/// - `DecodingFailed` when neither attempt parses.
pub fn decode_response<W: DeserializeOwned>(raw: &str) -> AiResult<W> {
    let stripped = strip_code_fence(raw);
    let strict_error = match serde_json::from_str::<W>(stripped) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    if let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}')) {
        if end > start {
            if let Ok(value) = serde_json::from_str::<W>(&stripped[start..=end]) {
                return Ok(value);
            }
        }
    }
    Err(AiError::from(strict_error))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireTask {
    #[serde(deserialize_with = "nullable")]
    pub text: String,
    pub due_date: Option<String>,
    pub priority: Option<String>,
    pub confidence: Option<f64>,
    pub source_anchor: Option<WireAnchor>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireAnchor {
    pub paragraph_index: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TasksEnvelope {
    #[serde(deserialize_with = "nullable")]
    pub tasks: Vec<WireTask>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireReport {
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub summary: String,
    #[serde(deserialize_with = "nullable")]
    pub sections: Vec<WireSection>,
    #[serde(deserialize_with = "nullable")]
    pub tables: Vec<WireTable>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireSection {
    #[serde(deserialize_with = "nullable")]
    pub heading: String,
    #[serde(deserialize_with = "nullable")]
    pub paragraphs: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub bullets: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireTable {
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub columns: Vec<Value>,
    #[serde(deserialize_with = "nullable")]
    pub rows: Vec<Vec<Value>>,
    pub notes: Option<String>,
}

/// `analyze_note` response.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeEnvelope {
    #[serde(alias = "rewrittenBody", alias = "body")]
    #[serde(deserialize_with = "nullable")]
    pub markdown: String,
    pub report: Option<WireReport>,
    #[serde(deserialize_with = "nullable")]
    pub tasks: Vec<WireTask>,
}

/// `rewrite_note` response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RewriteEnvelope {
    pub title: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub markdown: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireHighlight {
    #[serde(deserialize_with = "nullable")]
    pub color: String,
    #[serde(deserialize_with = "nullable")]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HighlightsEnvelope {
    #[serde(deserialize_with = "nullable")]
    pub highlights: Vec<WireHighlight>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireConnection {
    #[serde(deserialize_with = "nullable")]
    pub source_note_id: String,
    #[serde(deserialize_with = "nullable")]
    pub target_note_id: String,
    #[serde(deserialize_with = "nullable")]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionsEnvelope {
    #[serde(deserialize_with = "nullable")]
    pub connections: Vec<WireConnection>,
}

/// `digest_report` response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReportEnvelope {
    pub report: Option<WireReport>,
}

/// Treats an explicit JSON `null` like an absent field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Converts wire tasks, dropping blank ones and clamping confidence.
pub fn into_tasks(wire: Vec<WireTask>) -> Vec<TaskSuggestion> {
    wire.into_iter()
        .filter_map(|task| {
            let text = task.text.trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(TaskSuggestion {
                text,
                due_date: task
                    .due_date
                    .map(|due| due.trim().to_string())
                    .filter(|due| !due.is_empty()),
                priority: task
                    .priority
                    .as_deref()
                    .map(TaskPriority::from_lenient)
                    .unwrap_or_default(),
                confidence: task
                    .confidence
                    .filter(|value| value.is_finite())
                    .map_or(1.0, |value| value.clamp(0.0, 1.0)),
                source_anchor: SourceAnchor {
                    paragraph_index: task.source_anchor.map_or(0, |anchor| anchor.paragraph_index),
                },
            })
        })
        .collect()
}

/// Converts a wire report into the model shape.
pub fn into_report(wire: WireReport) -> InsightReport {
    InsightReport {
        title: wire.title.trim().to_string(),
        summary: wire.summary.trim().to_string(),
        sections: wire
            .sections
            .into_iter()
            .map(|section| ReportSection {
                heading: section.heading.trim().to_string(),
                paragraphs: non_blank(section.paragraphs),
                bullets: non_blank(section.bullets),
            })
            .filter(|section| {
                !section.heading.is_empty()
                    || !section.paragraphs.is_empty()
                    || !section.bullets.is_empty()
            })
            .collect(),
        tables: wire
            .tables
            .into_iter()
            .map(|table| ReportTable {
                title: table.title.trim().to_string(),
                columns: table.columns.iter().map(cell_text).collect(),
                rows: table
                    .rows
                    .iter()
                    .map(|row| row.iter().map(cell_text).collect())
                    .collect(),
                notes: table
                    .notes
                    .map(|notes| notes.trim().to_string())
                    .filter(|notes| !notes.is_empty()),
            })
            .filter(|table| !table.columns.is_empty() || !table.rows.is_empty())
            .collect(),
    }
}

/// Converts wire highlights, normalizing colors and dropping blank text.
pub fn into_highlights(wire: Vec<WireHighlight>) -> Vec<HighlightSuggestion> {
    wire.into_iter()
        .filter(|highlight| !highlight.text.trim().is_empty())
        .map(|highlight| HighlightSuggestion {
            color: HighlightColor::normalize(&highlight.color),
            text: highlight.text,
        })
        .collect()
}

/// Converts wire connections, dropping unparsable ids and self-links.
pub fn into_connections(wire: Vec<WireConnection>) -> Vec<ConnectionSuggestion> {
    wire.into_iter()
        .filter_map(|connection| {
            let source = Uuid::parse_str(connection.source_note_id.trim()).ok()?;
            let target = Uuid::parse_str(connection.target_note_id.trim()).ok()?;
            (source != target).then(|| ConnectionSuggestion {
                source_note_id: source,
                target_note_id: target,
                reason: connection.reason.trim().to_string(),
            })
        })
        .collect()
}

fn non_blank(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_response, into_connections, into_report, into_tasks, strip_code_fence,
        AnalyzeEnvelope, TasksEnvelope, WireConnection,
    };
    use crate::ai::error::AiError;
    use crate::model::insight::TaskPriority;
    use uuid::Uuid;

    #[test]
    fn strip_code_fence_removes_json_wrapper() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn decode_falls_back_to_outer_object_slice() {
        let raw = "Sure! Here is the JSON:\n{\"tasks\": [{\"text\": \"Call Bob\"}]}\nHope it helps.";
        let envelope: TasksEnvelope = decode_response(raw).expect("slice fallback decodes");
        assert_eq!(envelope.tasks.len(), 1);
    }

    #[test]
    fn decode_reports_failure_for_garbage() {
        let result = decode_response::<TasksEnvelope>("not json at all");
        assert!(matches!(result, Err(AiError::DecodingFailed(_))));
    }

    #[test]
    fn analyze_envelope_tolerates_missing_fields_and_body_alias() {
        let envelope: AnalyzeEnvelope =
            decode_response(r#"{"rewrittenBody":"text"}"#).expect("decodes");
        assert_eq!(envelope.markdown, "text");
        assert!(envelope.report.is_none());
        assert!(envelope.tasks.is_empty());
    }

    #[test]
    fn tasks_are_normalized() {
        let envelope: TasksEnvelope = decode_response(
            r#"{"tasks":[{"text":"  Pay rent ","priority":"URGENT","confidence":3.5,"sourceAnchor":{"paragraphIndex":2}},{"text":"  "}]}"#,
        )
        .expect("decodes");
        let tasks = into_tasks(envelope.tasks);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "Pay rent");
        assert_eq!(tasks[0].priority, TaskPriority::High);
        assert_eq!(tasks[0].confidence, 1.0);
        assert_eq!(tasks[0].source_anchor.paragraph_index, 2);
    }

    #[test]
    fn report_tables_stringify_non_string_cells() {
        let envelope: AnalyzeEnvelope = decode_response(
            r#"{"markdown":"x","report":{"tables":[{"columns":["Item","Qty"],"rows":[["Milk",2],["Eggs",null]]}]}}"#,
        )
        .expect("decodes");
        let report = into_report(envelope.report.expect("report present"));
        assert_eq!(report.tables[0].rows[0], vec!["Milk".to_string(), "2".to_string()]);
        assert_eq!(report.tables[0].rows[1][1], "");
    }

    #[test]
    fn connections_drop_self_links_and_bad_ids() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let wire = vec![
            WireConnection {
                source_note_id: id.to_string(),
                target_note_id: id.to_string(),
                reason: "self".to_string(),
            },
            WireConnection {
                source_note_id: "nope".to_string(),
                target_note_id: other.to_string(),
                reason: "bad".to_string(),
            },
            WireConnection {
                source_note_id: id.to_string(),
                target_note_id: other.to_string(),
                reason: " shared topic ".to_string(),
            },
        ];
        let connections = into_connections(wire);
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].reason, "shared topic");
    }
}
