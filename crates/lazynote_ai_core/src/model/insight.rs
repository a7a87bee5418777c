//! Structured results produced by the AI backend.
//!
//! # Responsibility
//! - Define the decoded, validated shapes every intent returns.
//! - Own lenient normalization for enum-like backend fields.
//!
//! # Invariants
//! - Any collection may be empty; empty is success.
//! - `TaskSuggestion::confidence` is always within `[0, 1]`.
//! - Unknown highlight colors normalize to `HighlightColor::Yellow`.
//! - A `ConnectionSuggestion` never links a note to itself.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Analysis report returned alongside a rewritten note body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightReport {
    pub title: String,
    pub summary: String,
    pub sections: Vec<ReportSection>,
    pub tables: Vec<ReportTable>,
}

impl InsightReport {
    /// Returns whether the report carries nothing renderable.
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty()
            && self.summary.trim().is_empty()
            && self.sections.is_empty()
            && self.tables.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub heading: String,
    pub paragraphs: Vec<String>,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTable {
    pub title: String,
    pub columns: Vec<String>,
    /// Data rows; a row shorter than `columns` renders its missing cells empty.
    pub rows: Vec<Vec<String>>,
    pub notes: Option<String>,
}

/// Task urgency suggested by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl TaskPriority {
    /// Parses a backend priority string; anything unrecognized is `Medium`.
    pub fn from_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" | "urgent" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Points back at the paragraph a task was extracted from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAnchor {
    pub paragraph_index: usize,
}

/// One actionable item extracted from note text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuggestion {
    pub text: String,
    /// Free-form due date exactly as the backend phrased it.
    pub due_date: Option<String>,
    pub priority: TaskPriority,
    pub confidence: f64,
    pub source_anchor: SourceAnchor,
}

impl TaskSuggestion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            due_date: None,
            priority: TaskPriority::Medium,
            confidence: 1.0,
            source_anchor: SourceAnchor::default(),
        }
    }

    /// Renders the task as an unchecked markdown checklist line.
    pub fn checklist_line(&self) -> String {
        match self
            .due_date
            .as_deref()
            .map(str::trim)
            .filter(|due| !due.is_empty())
        {
            Some(due) => format!("- [ ] {} ({due})", self.text.trim()),
            None => format!("- [ ] {}", self.text.trim()),
        }
    }
}

/// Palette accepted inside `==color:text==` emphasis spans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
    Orange,
    Purple,
}

impl HighlightColor {
    /// Every supported color key.
    pub const ALL: [Self; 6] = [
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Pink,
        Self::Orange,
        Self::Purple,
    ];

    /// Maps any color key to the palette; unknown keys become yellow.
    pub fn normalize(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|color| color.as_str() == normalized)
            .unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Pink => "pink",
            Self::Orange => "orange",
            Self::Purple => "purple",
        }
    }
}

/// One phrase the backend wants emphasized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightSuggestion {
    pub color: HighlightColor,
    pub text: String,
}

impl HighlightSuggestion {
    pub fn new(color: HighlightColor, text: impl Into<String>) -> Self {
        Self {
            color,
            text: text.into(),
        }
    }

    /// Renders the emphasis span for `text`.
    pub fn markup(&self, text: &str) -> String {
        format!("=={}:{text}==", self.color.as_str())
    }
}

/// Semantic link between two notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSuggestion {
    pub source_note_id: Uuid,
    pub target_note_id: Uuid,
    pub reason: String,
}

impl ConnectionSuggestion {
    /// Order-independent identity of the linked pair.
    pub fn undirected_key(&self) -> (Uuid, Uuid) {
        if self.source_note_id <= self.target_note_id {
            (self.source_note_id, self.target_note_id)
        } else {
            (self.target_note_id, self.source_note_id)
        }
    }
}
