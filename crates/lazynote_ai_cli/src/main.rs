//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `lazynote_ai_core` linkage.
//! - Dry-run the offline pipeline stages on a markdown file without
//!   contacting any backend.
//!
//! Usage: `lazynote_ai_cli [note.md]`

use lazynote_ai_core::{extract_tokens, highlight_plan, tokenize_source, AiBackendConfig, Document};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("lazynote_ai_core ping={}", lazynote_ai_core::ping());
    println!(
        "lazynote_ai_core version={}",
        lazynote_ai_core::core_version()
    );
    print_backend_status();

    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    let markdown = match std::fs::read_to_string(&path) {
        Ok(markdown) => markdown,
        Err(err) => {
            eprintln!("cannot read `{path}`: {err}");
            return ExitCode::FAILURE;
        }
    };

    let document = Document::parse(&markdown);
    let tokens = extract_tokens(&document);
    let tokenized = tokenize_source(&markdown, &tokens);
    println!("blocks={} attachments={}", document.blocks().len(), tokens.len());
    for token in &tokens {
        println!("  {} -> {}", token.token, token.target);
    }
    println!("tokenized_chars={}", tokenized.chars().count());

    let plan = highlight_plan(&markdown);
    println!(
        "highlights min={} max={} existing={} remaining={} needs_supplement={}",
        plan.min,
        plan.max,
        plan.existing,
        plan.remaining,
        plan.needs_supplement()
    );
    ExitCode::SUCCESS
}

fn print_backend_status() {
    match AiBackendConfig::from_env() {
        None => println!("backend=unconfigured"),
        Some(config) => match config.validate() {
            Ok(()) => println!("backend={} status=ok", config.provider.as_str()),
            Err(err) => println!(
                "backend={} status=invalid code={}",
                config.provider.as_str(),
                err.code()
            ),
        },
    }
}
