//! FFI use-case API for the Flutter AI features.
//!
//! # Responsibility
//! - Expose note-level AI actions to Dart via FRB.
//! - Adapt the Dart-side HTTP callback into a core `PromptTransport`.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures come back as envelopes with a stable `code` and a localized
//!   `message`; nothing is thrown.
//! - Note text is never logged here.

use async_trait::async_trait;
use flutter_rust_bridge::DartFnFuture;
use lazynote_ai_core::{
    core_version as core_version_inner, highlight_plan, init_logging as init_logging_inner,
    ping as ping_inner, AiError, AiResult, Locale, NoteOrganizer, OrganizeOutcome,
    OrganizeRequest, PromptTransport, RewriteMode, TaskSuggestion,
};
use log::{info, warn};

const INVALID_MODE_CODE: &str = "invalid_mode";

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Idempotent for the same `level + log_dir`; other combinations error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Raw HTTP outcome reported by the Dart-side backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptReply {
    /// HTTP status; `0` when the request never reached the server.
    pub status_code: u16,
    /// Completion text extracted from the provider response.
    pub body: String,
    /// Provider or network error text, if any.
    pub error_message: Option<String>,
}

impl PromptReply {
    fn into_result(self) -> AiResult<String> {
        if (200..300).contains(&self.status_code) {
            return Ok(self.body);
        }
        Err(AiError::BadResponse {
            code: self.status_code,
            message: self
                .error_message
                .map(|message| message.trim().to_string())
                .filter(|message| !message.is_empty()),
        })
    }
}

/// Task row returned to Dart.
#[derive(Debug, Clone, PartialEq)]
pub struct AiTaskItem {
    pub text: String,
    pub due_date: Option<String>,
    /// `high|medium|low`.
    pub priority: String,
    pub confidence: f64,
    pub paragraph_index: u32,
}

/// Result envelope for note-rewriting actions.
#[derive(Debug, Clone, PartialEq)]
pub struct AiNoteResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Stable error code; empty on success.
    pub code: String,
    /// Localized message for UI display.
    pub message: String,
    /// Title to store on the note; empty on failure.
    pub title: String,
    /// Final markdown to store on the note; empty on failure.
    pub markdown: String,
    pub tasks: Vec<AiTaskItem>,
}

impl AiNoteResponse {
    fn success(message: impl Into<String>, outcome: OrganizeOutcome) -> Self {
        Self {
            ok: true,
            code: String::new(),
            message: message.into(),
            title: outcome.title,
            markdown: outcome.markdown,
            tasks: outcome.tasks.iter().map(to_task_item).collect(),
        }
    }

    fn failure(code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            code: code.to_string(),
            message: message.into(),
            title: String::new(),
            markdown: String::new(),
            tasks: Vec::new(),
        }
    }
}

/// Result envelope for task extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct AiTasksResponse {
    pub ok: bool,
    pub code: String,
    pub message: String,
    pub tasks: Vec<AiTaskItem>,
}

/// Highlight density snapshot for the editor toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightPlanResponse {
    pub min: u32,
    pub max: u32,
    pub existing: u32,
    pub remaining: u32,
    pub needs_supplement: bool,
}

/// Adapts the Dart callback into the core transport seam.
struct DartPromptTransport<F> {
    send: F,
}

#[async_trait]
impl<F> PromptTransport for DartPromptTransport<F>
where
    F: Fn(String) -> DartFnFuture<PromptReply> + Send + Sync,
{
    async fn send_prompt(&self, prompt: &str) -> AiResult<String> {
        let reply = (self.send)(prompt.to_string()).await;
        reply.into_result()
    }
}

/// Rewrites a note with report, tasks and highlights.
///
/// # FFI contract
/// - Async call; issues two to three sequential backend requests through
///   `send_prompt`.
/// - Never panics; failure returns `ok = false` with `code` and a message
///   localized by `locale` (`en`, `zh-Hans`...).
/// - Cancelling the Dart future discards the result; nothing is persisted.
pub async fn ai_auto_organize(
    title: String,
    content: String,
    notebook_context: Option<String>,
    locale: String,
    send_prompt: impl Fn(String) -> DartFnFuture<PromptReply> + Send + Sync + 'static,
) -> AiNoteResponse {
    let organizer = NoteOrganizer::new(DartPromptTransport { send: send_prompt });
    let request = build_request(title, content, notebook_context);
    match organizer.auto_organize(&request).await {
        Ok(outcome) => {
            info!(
                "event=ffi_ai_organize module=ffi status=ok tasks={}",
                outcome.tasks.len()
            );
            AiNoteResponse::success("Note organized.", outcome)
        }
        Err(err) => note_failure("ai_auto_organize", &err, &locale),
    }
}

/// Rewrites a note in `mode` (`optimize|dedupe|expand`).
///
/// # FFI contract
/// - Async call; one backend request, plus one highlight request for
///   longer notes.
/// - Unknown `mode` fails with `code = invalid_mode` and makes no request.
/// - Never panics.
pub async fn ai_rewrite_note(
    title: String,
    content: String,
    mode: String,
    notebook_context: Option<String>,
    locale: String,
    send_prompt: impl Fn(String) -> DartFnFuture<PromptReply> + Send + Sync + 'static,
) -> AiNoteResponse {
    let Some(parsed_mode) = RewriteMode::parse(&mode) else {
        warn!("event=ffi_ai_rewrite module=ffi status=error code={INVALID_MODE_CODE}");
        return AiNoteResponse::failure(
            INVALID_MODE_CODE,
            format!(
                "unsupported rewrite mode `{}`; expected optimize|dedupe|expand",
                mode.trim()
            ),
        );
    };

    let organizer = NoteOrganizer::new(DartPromptTransport { send: send_prompt });
    let request = build_request(title, content, notebook_context);
    match organizer.rewrite(&request, parsed_mode).await {
        Ok(outcome) => {
            info!(
                "event=ffi_ai_rewrite module=ffi status=ok mode={}",
                parsed_mode.as_str()
            );
            AiNoteResponse::success("Note rewritten.", outcome)
        }
        Err(err) => note_failure("ai_rewrite_note", &err, &locale),
    }
}

/// Extracts actionable tasks from note content.
///
/// # FFI contract
/// - Async call; zero requests for blank content, otherwise one or two.
/// - An empty task list is success.
/// - Never panics.
pub async fn ai_extract_tasks(
    content: String,
    locale: String,
    send_prompt: impl Fn(String) -> DartFnFuture<PromptReply> + Send + Sync + 'static,
) -> AiTasksResponse {
    let organizer = NoteOrganizer::new(DartPromptTransport { send: send_prompt });
    match organizer.extract_tasks(&content).await {
        Ok(tasks) => {
            let message = if tasks.is_empty() {
                "No tasks found.".to_string()
            } else {
                format!("Found {} task(s).", tasks.len())
            };
            AiTasksResponse {
                ok: true,
                code: String::new(),
                message,
                tasks: tasks.iter().map(to_task_item).collect(),
            }
        }
        Err(err) => {
            warn!(
                "event=ffi_ai_extract_tasks module=ffi status=error code={}",
                err.code()
            );
            AiTasksResponse {
                ok: false,
                code: err.code().to_string(),
                message: err.user_message(Locale::from_tag(&locale)),
                tasks: Vec::new(),
            }
        }
    }
}

/// Reports how many highlights the note should carry.
///
/// # FFI contract
/// - Sync call, pure computation.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn ai_highlight_plan(markdown: String) -> HighlightPlanResponse {
    let plan = highlight_plan(&markdown);
    HighlightPlanResponse {
        min: saturating_u32(plan.min),
        max: saturating_u32(plan.max),
        existing: saturating_u32(plan.existing),
        remaining: saturating_u32(plan.remaining),
        needs_supplement: plan.needs_supplement(),
    }
}

fn build_request(
    title: String,
    content: String,
    notebook_context: Option<String>,
) -> OrganizeRequest {
    let request = OrganizeRequest::new(title, content);
    match notebook_context {
        Some(context) => request.with_notebook_context(context),
        None => request,
    }
}

fn note_failure(operation: &str, err: &AiError, locale: &str) -> AiNoteResponse {
    warn!(
        "event=ffi_{} module=ffi status=error code={}",
        operation,
        err.code()
    );
    AiNoteResponse::failure(err.code(), err.user_message(Locale::from_tag(locale)))
}

fn to_task_item(task: &TaskSuggestion) -> AiTaskItem {
    AiTaskItem {
        text: task.text.clone(),
        due_date: task.due_date.clone(),
        priority: task.priority.as_str().to_string(),
        confidence: task.confidence,
        paragraph_index: saturating_u32(task.source_anchor.paragraph_index),
    }
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{
        ai_auto_organize, ai_extract_tasks, ai_highlight_plan, ai_rewrite_note, core_version,
        init_logging, ping, PromptReply,
    };
    use flutter_rust_bridge::DartFnFuture;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    fn ok_reply(body: &str) -> PromptReply {
        PromptReply {
            status_code: 200,
            body: body.to_string(),
            error_message: None,
        }
    }

    fn scripted(
        replies: Vec<PromptReply>,
    ) -> (
        Arc<Mutex<usize>>,
        impl Fn(String) -> DartFnFuture<PromptReply> + Send + Sync + 'static,
    ) {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&calls);
        let replies = Mutex::new(VecDeque::from(replies));
        let send = move |_prompt: String| -> DartFnFuture<PromptReply> {
            *counter.lock().unwrap() += 1;
            let reply = replies.lock().unwrap().pop_front().unwrap_or(PromptReply {
                status_code: 599,
                body: String::new(),
                error_message: Some("script exhausted".to_string()),
            });
            Box::pin(async move { reply })
        };
        (calls, send)
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), "  ".to_string());
        assert!(error.contains("log_dir"));
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("loud".to_string(), "/tmp".to_string());
        assert!(error.contains("unsupported log level"));
    }

    #[test]
    fn highlight_plan_reports_tier() {
        let plan = ai_highlight_plan("x".repeat(500));
        assert_eq!((plan.min, plan.max, plan.existing, plan.remaining), (3, 5, 0, 5));
        assert!(plan.needs_supplement);
    }

    #[tokio::test]
    async fn auto_organize_returns_note_envelope() {
        let (calls, send) = scripted(vec![ok_reply(
            r#"{"markdown":"Body","report":{"title":"Tidy","summary":"Recap."},"tasks":[{"text":"Ship it","priority":"urgent"}]}"#,
        )]);
        let response = ai_auto_organize(
            "Draft".to_string(),
            "Body".to_string(),
            None,
            "en".to_string(),
            send,
        )
        .await;

        assert!(response.ok);
        assert!(response.code.is_empty());
        assert_eq!(response.title, "Tidy");
        assert_eq!(
            response.markdown,
            "## Summary\nRecap.\n\n## Tasks\n- [ ] Ship it\n\nBody"
        );
        assert_eq!(response.tasks[0].priority, "high");
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn http_failure_maps_to_localized_bad_response() {
        let (_, send) = scripted(vec![PromptReply {
            status_code: 401,
            body: String::new(),
            error_message: Some("invalid key".to_string()),
        }]);
        let response = ai_auto_organize(
            "t".to_string(),
            "body".to_string(),
            None,
            "zh-Hans-CN".to_string(),
            send,
        )
        .await;
        assert!(!response.ok);
        assert_eq!(response.code, "bad_response");
        assert!(response.message.contains("401"));
        assert!(response.markdown.is_empty());
    }

    #[tokio::test]
    async fn rewrite_rejects_unknown_mode_without_calling_backend() {
        let (calls, send) = scripted(Vec::new());
        let response = ai_rewrite_note(
            "t".to_string(),
            "body".to_string(),
            "shorten".to_string(),
            None,
            "en".to_string(),
            send,
        )
        .await;
        assert!(!response.ok);
        assert_eq!(response.code, "invalid_mode");
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn extract_tasks_reports_empty_list_as_success() {
        let (calls, send) = scripted(vec![
            ok_reply(r#"{"tasks":[]}"#),
            ok_reply(r#"{"tasks":[]}"#),
        ]);
        let response =
            ai_extract_tasks("Just thoughts.".to_string(), "en".to_string(), send).await;
        assert!(response.ok);
        assert!(response.tasks.is_empty());
        assert_eq!(response.message, "No tasks found.");
        assert_eq!(*calls.lock().unwrap(), 2);
    }
}
