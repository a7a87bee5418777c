//! AI backend client: one async operation per intent.
//!
//! # Responsibility
//! - Build the intent prompt, send it through the transport and decode the
//!   JSON contract into model types.
//! - Apply the single-retry recovery for schema-incomplete responses.
//!
//! # Invariants
//! - At most two round trips per intent call.
//! - Transport errors are returned immediately and never retried.
//! - A response that decodes but stays incomplete after the retry yields a
//!   partial result, not an error.
//! - Log lines carry sizes and counts only, never note text.

use crate::ai::contract::{
    decode_response, into_connections, into_highlights, into_report, into_tasks,
    AnalyzeEnvelope, ConnectionsEnvelope, HighlightsEnvelope, ReportEnvelope, RewriteEnvelope,
    TasksEnvelope,
};
use crate::ai::error::{AiError, AiResult};
use crate::ai::prompt::{
    analyze_note_prompt, digest_report_prompt, extract_tasks_prompt, rewrite_note_prompt,
    semantic_connections_prompt, supplement_highlights_prompt, RewriteMode,
};
use crate::ai::transport::PromptTransport;
use crate::model::digest::NoteDigest;
use crate::model::insight::{
    ConnectionSuggestion, HighlightSuggestion, InsightReport, TaskSuggestion,
};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;

/// Result of `analyze_note`.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteAnalysis {
    /// Free-form rewritten markdown, still carrying attachment tokens.
    pub rewritten_body: String,
    /// Structured report; `None` when the backend never produced one.
    pub report: Option<InsightReport>,
    pub tasks: Vec<TaskSuggestion>,
}

/// Result of `rewrite_note`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRewrite {
    pub title: Option<String>,
    pub markdown: String,
}

/// Intent-level facade over a prompt transport.
pub struct AiClient<T: PromptTransport> {
    transport: T,
}

impl<T: PromptTransport> AiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Extracts actionable tasks; retries once when the list comes back empty.
    pub async fn extract_tasks(&self, text: &str) -> AiResult<Vec<TaskSuggestion>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let prompt = extract_tasks_prompt(text);

        let first = into_tasks(
            self.round_trip::<TasksEnvelope>("extract_tasks", &prompt)
                .await?
                .tasks,
        );
        if !first.is_empty() {
            return Ok(first);
        }

        info!("event=ai_retry module=ai status=retry intent=extract_tasks reason=empty_tasks");
        let retried = match self
            .round_trip::<TasksEnvelope>("extract_tasks", &prompt)
            .await
        {
            Ok(envelope) => into_tasks(envelope.tasks),
            Err(AiError::DecodingFailed(details)) => {
                warn!(
                    "event=ai_retry module=ai status=degraded intent=extract_tasks reason=retry_undecodable details_len={}",
                    details.len()
                );
                return Ok(first);
            }
            Err(err) => return Err(err),
        };
        info!(
            "event=ai_intent module=ai status=ok intent=extract_tasks tasks={} attempts=2",
            retried.len()
        );
        Ok(retried)
    }

    /// Rewrites and analyzes a note; retries once when `report` is missing.
    pub async fn analyze_note(
        &self,
        text: &str,
        title: &str,
        notebook_context: Option<&str>,
        protected_tokens: &[String],
    ) -> AiResult<NoteAnalysis> {
        let prompt = analyze_note_prompt(text, title, notebook_context, protected_tokens);

        let first = to_analysis(
            self.round_trip::<AnalyzeEnvelope>("analyze_note", &prompt)
                .await?,
        );
        if first.report.is_some() {
            return Ok(first);
        }

        info!("event=ai_retry module=ai status=retry intent=analyze_note reason=missing_report");
        let retried = match self
            .round_trip::<AnalyzeEnvelope>("analyze_note", &prompt)
            .await
        {
            Ok(envelope) => to_analysis(envelope),
            Err(AiError::DecodingFailed(details)) => {
                warn!(
                    "event=ai_retry module=ai status=degraded intent=analyze_note reason=retry_undecodable details_len={}",
                    details.len()
                );
                return Ok(first);
            }
            Err(err) => return Err(err),
        };

        if retried.report.is_some() {
            return Ok(retried);
        }
        warn!("event=ai_intent module=ai status=degraded intent=analyze_note reason=no_report");
        Ok(best_partial(first, retried))
    }

    /// Rewrites a note in the requested mode.
    ///
    /// # Errors
    /// - `EmptyResponse` when the returned markdown is blank.
    pub async fn rewrite_note(
        &self,
        text: &str,
        title: &str,
        notebook_context: Option<&str>,
        mode: RewriteMode,
        protected_tokens: &[String],
    ) -> AiResult<NoteRewrite> {
        let prompt = rewrite_note_prompt(text, title, notebook_context, mode, protected_tokens);
        let envelope = self
            .round_trip::<RewriteEnvelope>("rewrite_note", &prompt)
            .await?;
        if envelope.markdown.trim().is_empty() {
            warn!(
                "event=ai_intent module=ai status=error intent=rewrite_note mode={} reason=empty_markdown",
                mode.as_str()
            );
            return Err(AiError::EmptyResponse);
        }
        Ok(NoteRewrite {
            title: envelope
                .title
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            markdown: envelope.markdown,
        })
    }

    /// Asks for up to `max_highlights` extra emphasis spans. Never retried.
    pub async fn supplement_highlights(
        &self,
        text: &str,
        max_highlights: usize,
    ) -> AiResult<Vec<HighlightSuggestion>> {
        if max_highlights == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let prompt = supplement_highlights_prompt(text, max_highlights);
        let mut highlights = into_highlights(
            self.round_trip::<HighlightsEnvelope>("supplement_highlights", &prompt)
                .await?
                .highlights,
        );
        highlights.truncate(max_highlights);
        Ok(highlights)
    }

    /// Suggests links between notes. No call for empty input or zero limit.
    pub async fn semantic_connections(
        &self,
        digests: &[NoteDigest],
        limit: i64,
    ) -> AiResult<Vec<ConnectionSuggestion>> {
        let Ok(limit) = usize::try_from(limit) else {
            return Ok(Vec::new());
        };
        if digests.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let prompt = semantic_connections_prompt(digests, limit);
        let known = digests
            .iter()
            .map(|digest| digest.note_id)
            .collect::<BTreeSet<_>>();
        let mut connections = into_connections(
            self.round_trip::<ConnectionsEnvelope>("semantic_connections", &prompt)
                .await?
                .connections,
        );
        connections.retain(|connection| {
            known.contains(&connection.source_note_id) && known.contains(&connection.target_note_id)
        });
        connections.truncate(limit);
        Ok(connections)
    }

    /// Builds a cross-note report from digests; retries once when missing.
    pub async fn digest_report(
        &self,
        digests: &[NoteDigest],
        notebook_context: Option<&str>,
    ) -> AiResult<Option<InsightReport>> {
        if digests.is_empty() {
            return Ok(None);
        }
        let prompt = digest_report_prompt(digests, notebook_context);

        let first = self
            .round_trip::<ReportEnvelope>("digest_report", &prompt)
            .await?
            .report
            .map(into_report)
            .filter(|report| !report.is_empty());
        if first.is_some() {
            return Ok(first);
        }

        info!("event=ai_retry module=ai status=retry intent=digest_report reason=missing_report");
        match self
            .round_trip::<ReportEnvelope>("digest_report", &prompt)
            .await
        {
            Ok(envelope) => Ok(envelope
                .report
                .map(into_report)
                .filter(|report| !report.is_empty())),
            Err(AiError::DecodingFailed(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn round_trip<W: DeserializeOwned>(&self, intent: &str, prompt: &str) -> AiResult<W> {
        debug!(
            "event=ai_request module=ai status=start intent={} prompt_chars={}",
            intent,
            prompt.chars().count()
        );
        let raw = self.transport.send_prompt(prompt).await.map_err(|err| {
            warn!(
                "event=ai_request module=ai status=error intent={} code={}",
                intent,
                err.code()
            );
            err
        })?;
        decode_response::<W>(&raw).map_err(|err| {
            warn!(
                "event=ai_decode module=ai status=error intent={} response_chars={}",
                intent,
                raw.chars().count()
            );
            err
        })
    }
}

fn to_analysis(envelope: AnalyzeEnvelope) -> NoteAnalysis {
    NoteAnalysis {
        rewritten_body: envelope.markdown,
        report: envelope
            .report
            .map(into_report)
            .filter(|report| !report.is_empty()),
        tasks: into_tasks(envelope.tasks),
    }
}

fn best_partial(first: NoteAnalysis, retried: NoteAnalysis) -> NoteAnalysis {
    let rewritten_body = if retried.rewritten_body.trim().is_empty() {
        first.rewritten_body
    } else {
        retried.rewritten_body
    };
    let tasks = if retried.tasks.is_empty() {
        first.tasks
    } else {
        retried.tasks
    };
    NoteAnalysis {
        rewritten_body,
        report: None,
        tasks,
    }
}
