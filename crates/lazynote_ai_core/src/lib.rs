//! Core AI rewrite pipeline for LazyNote.
//! Attachment-safe rewriting, insight composition and highlight injection
//! over a pluggable prompt transport.

pub mod ai;
pub mod attachment;
pub mod compose;
pub mod highlight;
pub mod logging;
pub mod model;
pub mod service;

pub use ai::client::{AiClient, NoteAnalysis, NoteRewrite};
pub use ai::config::{AiBackendConfig, AiProvider};
pub use ai::error::{AiError, AiResult, Locale};
pub use ai::prompt::RewriteMode;
pub use ai::registry::{BackendRegistry, BackendRegistryError};
pub use ai::transport::PromptTransport;
pub use attachment::preserver::{
    attachment_token, ensure_all_attachments_present, extract_tokens, restore,
    restore_and_ensure, tokenize, tokenize_source, AttachmentToken,
};
pub use compose::insight_composer::{compose, resolved_title};
pub use highlight::injector::{
    apply_highlights_if_needed, highlight_plan, inject_highlights, HighlightPlan,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::digest::NoteDigest;
pub use model::document::{Block, Document};
pub use model::insight::{
    ConnectionSuggestion, HighlightColor, HighlightSuggestion, InsightReport, ReportSection,
    ReportTable, SourceAnchor, TaskPriority, TaskSuggestion,
};
pub use service::organize_service::{NoteOrganizer, OrganizeOutcome, OrganizeRequest};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
