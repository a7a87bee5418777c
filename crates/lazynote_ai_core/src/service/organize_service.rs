//! AI note-organize use-case service.
//!
//! # Responsibility
//! - Run the full auto-organize flow: tokenize attachments, analyze,
//!   compose, restore attachments, top up highlights.
//! - Expose rewrite modes, task extraction, digest reports and connection
//!   suggestions with the same attachment safety net.
//!
//! # Invariants
//! - Backend calls within one run are strictly sequential.
//! - Every attachment with a resolvable target survives into the output.
//! - Nothing is persisted here; dropping the future discards the run.
//!
//! # See also
//! - `crate::ai::client` for retry semantics.

use crate::ai::client::AiClient;
use crate::ai::error::AiResult;
use crate::ai::prompt::RewriteMode;
use crate::ai::transport::PromptTransport;
use crate::attachment::preserver::{
    extract_tokens, restore_and_ensure, tokenize_source, AttachmentToken,
};
use crate::compose::insight_composer::{compose, resolved_title};
use crate::highlight::injector::apply_highlights_if_needed;
use crate::model::digest::NoteDigest;
use crate::model::document::Document;
use crate::model::insight::{ConnectionSuggestion, TaskSuggestion};
use log::info;
use std::collections::BTreeSet;

/// Input for one organize/rewrite run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizeRequest {
    pub title: String,
    /// Current markdown body of the note.
    pub content: String,
    /// Optional notebook description passed as prompt context.
    pub notebook_context: Option<String>,
}

impl OrganizeRequest {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            notebook_context: None,
        }
    }

    pub fn with_notebook_context(mut self, context: impl Into<String>) -> Self {
        self.notebook_context = Some(context.into());
        self
    }

    fn context(&self) -> Option<&str> {
        self.notebook_context
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Output the caller persists back onto the note.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizeOutcome {
    pub title: String,
    pub markdown: String,
    pub tasks: Vec<TaskSuggestion>,
}

/// Tokenized note text plus the tokens needed to undo it.
struct ProtectedContent {
    text: String,
    tokens: Vec<AttachmentToken>,
}

impl ProtectedContent {
    fn from_markdown(markdown: &str) -> Self {
        let tokens = extract_tokens(&Document::parse(markdown));
        Self {
            text: tokenize_source(markdown, &tokens),
            tokens,
        }
    }

    fn token_strings(&self) -> Vec<String> {
        self.tokens.iter().map(|token| token.token.clone()).collect()
    }
}

/// Use-case facade over an `AiClient`.
pub struct NoteOrganizer<T: PromptTransport> {
    client: AiClient<T>,
}

impl<T: PromptTransport> NoteOrganizer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            client: AiClient::new(transport),
        }
    }

    pub fn client(&self) -> &AiClient<T> {
        &self.client
    }

    /// Rewrites and restructures one note with a report, tasks and highlights.
    pub async fn auto_organize(&self, request: &OrganizeRequest) -> AiResult<OrganizeOutcome> {
        let protected = ProtectedContent::from_markdown(&request.content);
        let analysis = self
            .client
            .analyze_note(
                &protected.text,
                &request.title,
                request.context(),
                &protected.token_strings(),
            )
            .await?;

        let body = if analysis.rewritten_body.trim().is_empty() {
            protected.text.as_str()
        } else {
            analysis.rewritten_body.as_str()
        };
        let title = resolved_title(
            analysis.report.as_ref().map(|report| report.title.as_str()),
            &request.title,
        );
        let composed = compose(body, analysis.report.as_ref(), &analysis.tasks, &title);
        let restored = restore_and_ensure(&composed, &protected.tokens);
        let markdown = self.top_up_highlights(&restored).await;

        info!(
            "event=ai_organize module=service status=ok report={} tasks={} attachments={} output_chars={}",
            analysis.report.is_some(),
            analysis.tasks.len(),
            protected.tokens.len(),
            markdown.chars().count()
        );
        Ok(OrganizeOutcome {
            title,
            markdown,
            tasks: analysis.tasks,
        })
    }

    /// Rewrites one note in `mode`, keeping attachments.
    pub async fn rewrite(
        &self,
        request: &OrganizeRequest,
        mode: RewriteMode,
    ) -> AiResult<OrganizeOutcome> {
        let protected = ProtectedContent::from_markdown(&request.content);
        let rewrite = self
            .client
            .rewrite_note(
                &protected.text,
                &request.title,
                request.context(),
                mode,
                &protected.token_strings(),
            )
            .await?;

        let restored = restore_and_ensure(&rewrite.markdown, &protected.tokens);
        let markdown = self.top_up_highlights(&restored).await;
        info!(
            "event=ai_rewrite module=service status=ok mode={} attachments={}",
            mode.as_str(),
            protected.tokens.len()
        );
        Ok(OrganizeOutcome {
            title: resolved_title(rewrite.title.as_deref(), &request.title),
            markdown,
            tasks: Vec::new(),
        })
    }

    /// Extracts tasks from a note body with attachments masked out.
    pub async fn extract_tasks(&self, content: &str) -> AiResult<Vec<TaskSuggestion>> {
        let protected = ProtectedContent::from_markdown(content);
        self.client.extract_tasks(&protected.text).await
    }

    /// Suggests cross-note links, with undirected duplicates removed.
    pub async fn suggest_connections(
        &self,
        digests: &[NoteDigest],
        limit: i64,
    ) -> AiResult<Vec<ConnectionSuggestion>> {
        let connections = self.client.semantic_connections(digests, limit).await?;
        Ok(dedupe_connections(connections))
    }

    /// Renders a cross-note report as markdown; `None` when none came back.
    pub async fn digest_report(
        &self,
        digests: &[NoteDigest],
        notebook_context: Option<&str>,
    ) -> AiResult<Option<String>> {
        let report = self.client.digest_report(digests, notebook_context).await?;
        Ok(report.map(|report| {
            let title = resolved_title(Some(report.title.as_str()), "");
            let rendered = compose("", Some(&report), &[], &title);
            if title.is_empty() {
                rendered
            } else {
                format!("# {title}\n\n{rendered}").trim_end().to_string()
            }
        }))
    }

    async fn top_up_highlights(&self, markdown: &str) -> String {
        let client = &self.client;
        apply_highlights_if_needed(markdown, |text, max| async move {
            client.supplement_highlights(&text, max).await
        })
        .await
    }
}

/// Keeps the first suggestion of each undirected note pair.
pub fn dedupe_connections(connections: Vec<ConnectionSuggestion>) -> Vec<ConnectionSuggestion> {
    let mut seen = BTreeSet::new();
    connections
        .into_iter()
        .filter(|connection| seen.insert(connection.undirected_key()))
        .collect()
}
