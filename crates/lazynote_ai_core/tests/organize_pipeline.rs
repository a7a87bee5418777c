mod support;

use lazynote_ai_core::{
    AiError, NoteDigest, NoteOrganizer, OrganizeRequest, RewriteMode, TaskPriority,
};
use support::ScriptedTransport;
use uuid::Uuid;

const GROCERY_NOTE: &str = "# Groceries\n\nBuy milk and eggs for the weekend, then check whether the bakery on Main Street still has the sourdough loaf we liked last time.\n\n![photo](images/cart.png)\n\n```\nlet list = 1;\n```";

const ANALYZE_REPLY: &str = r##"```json
{
  "markdown": "# Groceries\n\nBuy milk and eggs for the weekend, then check whether the bakery on Main Street still has the sourdough loaf we liked last time.\n\n```\nlet list = 1;\n```",
  "report": {"title": "Weekend Groceries", "summary": "Shopping list for the weekend.", "sections": [], "tables": []},
  "tasks": [{"text": "Buy milk", "dueDate": "Saturday", "priority": "high", "confidence": 0.9}]
}
```"##;

const HIGHLIGHTS_REPLY: &str = r#"{"highlights": [{"color": "green", "text": "sourdough loaf"}, {"color": "teal", "text": "not in the note"}]}"#;

#[tokio::test]
async fn auto_organize_runs_full_pipeline() {
    let organizer = NoteOrganizer::new(ScriptedTransport::replying(&[
        ANALYZE_REPLY,
        HIGHLIGHTS_REPLY,
    ]));
    let request = OrganizeRequest::new("Groceries", GROCERY_NOTE).with_notebook_context("Home");

    let outcome = organizer.auto_organize(&request).await.unwrap();

    assert_eq!(outcome.title, "Weekend Groceries");
    assert_eq!(outcome.tasks.len(), 1);
    assert_eq!(outcome.tasks[0].priority, TaskPriority::High);

    let markdown = &outcome.markdown;
    assert!(markdown.starts_with(
        "## Summary\nShopping list for the weekend.\n\n## Tasks\n- [ ] Buy milk (Saturday)\n\n# Weekend Groceries"
    ));
    assert!(markdown.contains("==green:sourdough loaf=="));
    assert!(markdown.contains("```\nlet list = 1;\n```"));
    assert!(markdown.contains("## Attachments\n![Attachment](images/cart.png)"));
    assert!(markdown.ends_with("## Highlights\n- ==yellow:not in the note=="));

    let transport = organizer.client().transport();
    assert_eq!(transport.call_count(), 2);
    let prompts = transport.prompts();
    let analyze_prompt = &prompts[0];
    assert!(analyze_prompt.contains("[[ATTACHMENT:0]]"));
    assert!(!analyze_prompt.contains("images/cart.png"));
    assert!(analyze_prompt.contains("Notebook context:\nHome"));
}

#[tokio::test]
async fn auto_organize_survives_highlight_failure() {
    let organizer = NoteOrganizer::new(ScriptedTransport::new(vec![
        Ok(ANALYZE_REPLY.to_string()),
        Err(AiError::BadResponse {
            code: 429,
            message: None,
        }),
    ]));
    let outcome = organizer
        .auto_organize(&OrganizeRequest::new("Groceries", GROCERY_NOTE))
        .await
        .unwrap();
    assert!(!outcome.markdown.contains("## Highlights"));
    assert!(outcome.markdown.contains("![Attachment](images/cart.png)"));
}

#[tokio::test]
async fn auto_organize_falls_back_to_source_on_empty_body() {
    let organizer = NoteOrganizer::new(ScriptedTransport::replying(&[
        r#"{"markdown": "", "report": {"title": "", "summary": "Short."}}"#,
    ]));
    let outcome = organizer
        .auto_organize(&OrganizeRequest::new("Cat", "# Cat\n\n![pic](cat.png)"))
        .await
        .unwrap();
    assert_eq!(outcome.title, "Cat");
    assert_eq!(
        outcome.markdown,
        "## Summary\nShort.\n\n# Cat\n\n![Attachment](cat.png)"
    );
}

#[tokio::test]
async fn auto_organize_fallback_keeps_list_nesting_and_line_breaks() {
    let source = "- parent\n  - child\n    - grandchild\n\nLine one  \nLine two\n\n![pic](cat.png)";
    let organizer = NoteOrganizer::new(ScriptedTransport::replying(&[
        r#"{"markdown": "  ", "report": {"title": "Tree", "summary": "Nested."}}"#,
    ]));
    let outcome = organizer
        .auto_organize(&OrganizeRequest::new("Tree", source))
        .await
        .unwrap();

    assert!(outcome
        .markdown
        .contains("- parent\n  - child\n    - grandchild\n\nLine one  \nLine two"));
    assert!(outcome.markdown.contains("![Attachment](cat.png)"));

    let prompts = organizer.client().transport().prompts();
    assert!(prompts[0].contains("- parent\n  - child\n    - grandchild"));
    assert!(prompts[0].contains("[[ATTACHMENT:0]]"));
}

#[tokio::test]
async fn auto_organize_propagates_transport_errors() {
    let organizer = NoteOrganizer::new(ScriptedTransport::new(vec![Err(
        AiError::MissingCredential,
    )]));
    let error = organizer
        .auto_organize(&OrganizeRequest::new("t", "body"))
        .await
        .unwrap_err();
    assert_eq!(error, AiError::MissingCredential);
}

#[tokio::test]
async fn rewrite_restores_attachments_and_keeps_title_when_blank() {
    let organizer = NoteOrganizer::new(ScriptedTransport::replying(&[
        r#"{"title": "  ", "markdown": "Cleaner text\n\n[[ATTACHMENT:0]]"}"#,
    ]));
    let request = OrganizeRequest::new("Receipts", "Messy text\n\n![scan](r.pdf)");
    let outcome = organizer.rewrite(&request, RewriteMode::Dedupe).await.unwrap();
    assert_eq!(outcome.title, "Receipts");
    assert_eq!(outcome.markdown, "Cleaner text\n\n![Attachment](r.pdf)");
    assert!(outcome.tasks.is_empty());
    assert_eq!(organizer.client().transport().call_count(), 1);
}

#[tokio::test]
async fn rewrite_surfaces_empty_response() {
    let organizer =
        NoteOrganizer::new(ScriptedTransport::replying(&[r#"{"markdown": null}"#]));
    let error = organizer
        .rewrite(&OrganizeRequest::new("t", "body"), RewriteMode::Expand)
        .await
        .unwrap_err();
    assert_eq!(error, AiError::EmptyResponse);
}

#[tokio::test]
async fn suggest_connections_dedupes_undirected_pairs() {
    let first = NoteDigest::from_markdown(Uuid::new_v4(), "Budget", "- rent");
    let second = NoteDigest::from_markdown(Uuid::new_v4(), "Lease", "- landlord");
    let reply = format!(
        r#"{{"connections": [
            {{"sourceNoteId": "{a}", "targetNoteId": "{b}", "reason": "rent"}},
            {{"sourceNoteId": "{b}", "targetNoteId": "{a}", "reason": "rent again"}}
        ]}}"#,
        a = first.note_id,
        b = second.note_id
    );
    let organizer = NoteOrganizer::new(ScriptedTransport::replying(&[reply.as_str()]));
    let connections = organizer
        .suggest_connections(&[first, second], 5)
        .await
        .unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].reason, "rent");
}

#[tokio::test]
async fn digest_report_renders_markdown() {
    let digest = NoteDigest::from_markdown(Uuid::new_v4(), "Trip", "# Plan\n- Book hotel");
    let organizer = NoteOrganizer::new(ScriptedTransport::replying(&[
        r#"{"report": {"title": "Overview", "summary": "Two notes.", "tables": [{"title": "Budget", "columns": ["Item", "Cost"], "rows": [["Hotel", 120]]}]}}"#,
    ]));
    let markdown = organizer
        .digest_report(std::slice::from_ref(&digest), None)
        .await
        .unwrap();
    assert_eq!(
        markdown.as_deref(),
        Some("# Overview\n\n## Summary\nTwo notes.\n\n## Budget\n\n| Item | Cost |\n| --- | --- |\n| Hotel | 120 |")
    );
}

#[tokio::test]
async fn digest_report_is_none_without_digests() {
    let organizer = NoteOrganizer::new(ScriptedTransport::replying(&[]));
    assert_eq!(organizer.digest_report(&[], Some("ctx")).await.unwrap(), None);
    assert_eq!(organizer.client().transport().call_count(), 0);
}
