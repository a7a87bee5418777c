use lazynote_ai_core::{
    apply_highlights_if_needed, highlight_plan, inject_highlights, AiError, HighlightColor,
    HighlightSuggestion,
};
use std::cell::Cell;

#[test]
fn short_input_targets_at_most_two_spans() {
    let plan = highlight_plan(&"a".repeat(50));
    assert_eq!((plan.min, plan.max), (0, 2));
    assert_eq!(plan.remaining, 2);

    let with_one = format!("==yellow:abc== {}", "a".repeat(35));
    let plan = highlight_plan(&with_one);
    assert_eq!(plan.existing, 1);
    assert_eq!(plan.remaining, 1);
    assert!(!plan.needs_supplement());
}

#[tokio::test]
async fn long_input_requests_up_to_eight_suggestions() {
    let requested = Cell::new(None);
    let text = "word ".repeat(200);
    let output = apply_highlights_if_needed(&text, |_, max| {
        requested.set(Some(max));
        async { Ok(Vec::new()) }
    })
    .await;
    assert_eq!(requested.get(), Some(8));
    assert_eq!(output, text);
}

#[tokio::test]
async fn short_document_is_byte_identical_across_runs() {
    let calls = Cell::new(0);
    let text = "A short note about tea.";

    let first = apply_highlights_if_needed(text, |_, _| {
        calls.set(calls.get() + 1);
        async { Ok(Vec::new()) }
    })
    .await;
    let second = apply_highlights_if_needed(&first, |_, _| {
        calls.set(calls.get() + 1);
        async { Ok(Vec::new()) }
    })
    .await;

    assert_eq!(first, text);
    assert_eq!(second, text);
    assert_eq!(calls.get(), 0);
}

#[tokio::test]
async fn adequately_highlighted_document_skips_backend() {
    let calls = Cell::new(0);
    let text = format!(
        "==yellow:one== ==green:two== ==blue:three== {}",
        "filler ".repeat(40)
    );
    let output = apply_highlights_if_needed(&text, |_, _| {
        calls.set(calls.get() + 1);
        async { Ok(Vec::new()) }
    })
    .await;
    assert_eq!(output, text);
    assert_eq!(calls.get(), 0);
}

#[tokio::test]
async fn supplement_failure_leaves_document_unchanged() {
    let text = "sentence ".repeat(40);
    let output = apply_highlights_if_needed(&text, |_, _| async {
        Err(AiError::BadResponse {
            code: 503,
            message: None,
        })
    })
    .await;
    assert_eq!(output, text);
}

#[tokio::test]
async fn supplement_results_are_placed_and_capped() {
    let text = format!("The launch date moved. {}", "Notes follow. ".repeat(20));
    let output = apply_highlights_if_needed(&text, |_, max| async move {
        assert_eq!(max, 5);
        Ok((0..7)
            .map(|_| HighlightSuggestion::new(HighlightColor::Orange, "launch date"))
            .collect())
    })
    .await;
    assert!(output.starts_with("The ==orange:launch date== moved."));
    assert_eq!(output.matches("==orange:launch date==").count(), 5);
    assert!(output.contains("## Highlights"));
}

#[test]
fn fenced_text_is_never_highlighted() {
    let markdown = "before ```code with TARGET``` after";
    let output = inject_highlights(
        markdown,
        &[HighlightSuggestion::new(HighlightColor::Yellow, "TARGET")],
    );
    assert_eq!(
        output,
        "before ```code with TARGET``` after\n\n## Highlights\n- ==yellow:TARGET=="
    );
}

#[test]
fn match_after_fence_is_used_when_fence_holds_first_occurrence() {
    let markdown = "```\nTARGET\n```\n\nOutside TARGET here";
    let output = inject_highlights(
        markdown,
        &[HighlightSuggestion::new(HighlightColor::Purple, "TARGET")],
    );
    assert_eq!(output, "```\nTARGET\n```\n\nOutside ==purple:TARGET== here");
}

#[test]
fn tokens_and_blank_suggestions_are_left_alone() {
    let markdown = "See [[ATTACHMENT:0]] for details";
    let output = inject_highlights(
        markdown,
        &[
            HighlightSuggestion::new(HighlightColor::Blue, "ATTACHMENT"),
            HighlightSuggestion::new(HighlightColor::Blue, "   "),
            HighlightSuggestion::new(HighlightColor::Blue, "details"),
        ],
    );
    assert_eq!(
        output,
        "See [[ATTACHMENT:0]] for ==blue:details==\n\n## Highlights\n- ==blue:ATTACHMENT=="
    );
}

#[test]
fn matching_is_case_sensitive() {
    let output = inject_highlights(
        "Budget review on Friday",
        &[HighlightSuggestion::new(HighlightColor::Green, "budget")],
    );
    assert_eq!(
        output,
        "Budget review on Friday\n\n## Highlights\n- ==green:budget=="
    );
}

#[test]
fn link_urls_are_skipped_for_later_prose_match() {
    let output = inject_highlights(
        "See [the site](https://example.com/docs) for example docs.",
        &[HighlightSuggestion::new(HighlightColor::Yellow, "example")],
    );
    assert_eq!(
        output,
        "See [the site](https://example.com/docs) for ==yellow:example== docs."
    );
}
