//! Merges a structured insight report with the rewritten note body.
//!
//! # Responsibility
//! - Render report summary, sections, tables and tasks as markdown in a
//!   fixed order.
//! - Reconcile the free-form body against that output so no sentence,
//!   heading section or table appears twice.
//!
//! # Invariants
//! - Without a report the body is returned byte-identical.
//! - Lines inside fenced code blocks are never rewritten, stripped as tables
//!   or deduplicated (unless their whole section is stripped).
//! - Heading and blank lines are never deduplicated.
//! - Composition is total; it never fails.

use crate::model::insight::{InsightReport, ReportTable, TaskSuggestion};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

pub const SUMMARY_HEADING: &str = "## Summary";
pub const TASKS_HEADING: &str = "## Tasks";
pub const BODY_HEADING: &str = "## Body";

/// Bodies at least this long (trimmed chars) get a `## Body` label.
const BODY_LABEL_MIN_CHARS: usize = 120;
const RESERVED_HEADINGS: [&str; 3] = ["summary", "tasks", "body"];
const FENCE_MARKER: &str = "```";

static HEADING_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*$").expect("valid heading line regex"));
static LIST_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*+]|\d{1,9}[.)])\s+(?:\[[ xX]\]\s+)?").expect("valid list marker regex")
});
static TABLE_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\|?\s*:?-{3,}:?\s*(?:\|\s*:?-{3,}:?\s*)*\|?$").expect("valid table separator regex")
});
static THEMATIC_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*_]\s*){3,}$").expect("valid thematic break regex"));

/// Returns the report title when non-blank, else the fallback.
pub fn resolved_title(report_title: Option<&str>, fallback: &str) -> String {
    report_title
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Composes report, tasks and rewritten body into one markdown document.
pub fn compose(
    rewritten_body: &str,
    report: Option<&InsightReport>,
    tasks: &[TaskSuggestion],
    fallback_title: &str,
) -> String {
    let Some(report) = report else {
        return rewritten_body.to_string();
    };

    let drop_set = report_drop_set(report);
    let mut emitted_headings = RESERVED_HEADINGS
        .iter()
        .map(|heading| heading.to_string())
        .collect::<BTreeSet<_>>();
    let mut parts = Vec::new();

    if !report.summary.trim().is_empty() {
        parts.push(format!("{SUMMARY_HEADING}\n{}", report.summary.trim()));
    }

    let mut emitted_bullets = HashSet::new();
    for section in &report.sections {
        let mut blocks = Vec::new();
        let heading = strip_heading_marks(&section.heading);
        if !heading.is_empty() {
            blocks.push(format!("## {heading}"));
            emitted_headings.insert(heading_key(heading));
        }
        blocks.extend(
            section
                .paragraphs
                .iter()
                .map(|paragraph| paragraph.trim())
                .filter(|paragraph| !paragraph.is_empty())
                .map(str::to_string),
        );
        let bullets = section
            .bullets
            .iter()
            .map(|bullet| strip_list_marker(bullet.trim()))
            .filter(|bullet| !bullet.is_empty() && emitted_bullets.insert(bullet.to_string()))
            .map(|bullet| format!("- {bullet}"))
            .collect::<Vec<_>>();
        if !bullets.is_empty() {
            blocks.push(bullets.join("\n"));
        }
        if !blocks.is_empty() {
            parts.push(blocks.join("\n\n"));
        }
    }

    for table in &report.tables {
        let Some(rendered) = render_table(table) else {
            continue;
        };
        let mut blocks = Vec::new();
        let title = strip_heading_marks(&table.title);
        if !title.is_empty() {
            blocks.push(format!("## {title}"));
            emitted_headings.insert(heading_key(title));
        }
        blocks.push(rendered);
        if let Some(notes) = table
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
        {
            blocks.push(notes.to_string());
        }
        parts.push(blocks.join("\n\n"));
    }

    if !tasks.is_empty() {
        let lines = tasks
            .iter()
            .map(TaskSuggestion::checklist_line)
            .collect::<Vec<_>>();
        parts.push(format!("{TASKS_HEADING}\n{}", lines.join("\n")));
    }

    let title = resolved_title(Some(report.title.as_str()), fallback_title);
    let body = process_body(rewritten_body, &title, &emitted_headings, &drop_set);
    if !body.is_empty() {
        if needs_body_label(&body) {
            parts.push(format!("{BODY_HEADING}\n\n{body}"));
        } else {
            parts.push(body);
        }
    }

    parts.join("\n\n")
}

#[derive(Debug, Clone)]
struct BodyLine {
    text: String,
    fenced: bool,
}

impl BodyLine {
    fn heading(&self) -> Option<(usize, String)> {
        if self.fenced {
            return None;
        }
        HEADING_LINE_RE
            .captures(self.text.trim())
            .map(|caps| (caps[1].len(), caps[2].to_string()))
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

fn process_body(
    body: &str,
    title: &str,
    emitted_headings: &BTreeSet<String>,
    drop_set: &HashSet<String>,
) -> String {
    let mut lines = split_fenced(body);
    let title_index = rewrite_title_heading(&mut lines, title);
    let lines = strip_reported_sections(lines, title_index, emitted_headings);
    let lines = strip_tables(lines);
    let lines = dedupe_lines(lines, drop_set);
    collapse_blank_lines(lines)
}

fn split_fenced(body: &str) -> Vec<BodyLine> {
    let mut in_fence = false;
    body.lines()
        .map(|line| {
            if line.trim_start().starts_with(FENCE_MARKER) {
                in_fence = !in_fence;
                return BodyLine {
                    text: line.to_string(),
                    fenced: true,
                };
            }
            BodyLine {
                text: line.to_string(),
                fenced: in_fence,
            }
        })
        .collect()
}

/// Replaces a leading level-1 heading with the resolved title, in place.
fn rewrite_title_heading(lines: &mut [BodyLine], title: &str) -> Option<usize> {
    if title.trim().is_empty() {
        return None;
    }
    let index = lines.iter().position(|line| !line.is_blank())?;
    match lines[index].heading() {
        Some((1, _)) => {
            lines[index].text = format!("# {}", title.trim());
            Some(index)
        }
        _ => None,
    }
}

/// Drops every section whose heading the report already emitted.
fn strip_reported_sections(
    lines: Vec<BodyLine>,
    title_index: Option<usize>,
    emitted_headings: &BTreeSet<String>,
) -> Vec<BodyLine> {
    let mut skipping = false;
    let mut kept = Vec::with_capacity(lines.len());
    for (index, line) in lines.into_iter().enumerate() {
        if let Some((_, text)) = line.heading() {
            skipping = Some(index) != title_index && emitted_headings.contains(&heading_key(&text));
        }
        if !skipping {
            kept.push(line);
        }
    }
    kept
}

/// Drops runs of pipe lines that contain a separator row.
fn strip_tables(lines: Vec<BodyLine>) -> Vec<BodyLine> {
    let mut kept = Vec::with_capacity(lines.len());
    let mut run: Vec<BodyLine> = Vec::new();

    let flush = |run: &mut Vec<BodyLine>, kept: &mut Vec<BodyLine>| {
        let is_table = run
            .iter()
            .any(|line| TABLE_SEPARATOR_RE.is_match(line.text.trim()));
        if !is_table {
            kept.append(run);
        }
        run.clear();
    };

    for line in lines {
        if !line.fenced && line.text.trim_start().starts_with('|') {
            run.push(line);
            continue;
        }
        flush(&mut run, &mut kept);
        kept.push(line);
    }
    flush(&mut run, &mut kept);
    kept
}

fn dedupe_lines(lines: Vec<BodyLine>, drop_set: &HashSet<String>) -> Vec<BodyLine> {
    let mut seen = HashSet::new();
    lines
        .into_iter()
        .filter(|line| {
            if line.fenced || line.is_blank() || line.heading().is_some() {
                return true;
            }
            let trimmed = line.text.trim();
            if THEMATIC_BREAK_RE.is_match(trimmed) {
                return true;
            }
            let key = dedup_key(trimmed);
            if key.is_empty() {
                return true;
            }
            !drop_set.contains(key) && seen.insert(key.to_string())
        })
        .collect()
}

fn collapse_blank_lines(lines: Vec<BodyLine>) -> String {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut previous_blank = true;
    for line in lines {
        let blank = !line.fenced && line.is_blank();
        if blank && previous_blank {
            continue;
        }
        previous_blank = blank;
        out.push(if blank { String::new() } else { line.text });
    }
    while out.last().is_some_and(|line| line.trim().is_empty()) {
        out.pop();
    }
    out.join("\n")
}

fn report_drop_set(report: &InsightReport) -> HashSet<String> {
    let mut drop_set = HashSet::new();
    let mut add_lines = |text: &str| {
        let whole = dedup_key(text.trim());
        if !whole.is_empty() {
            drop_set.insert(whole.to_string());
        }
        for line in text.lines() {
            let key = dedup_key(line.trim());
            if !key.is_empty() {
                drop_set.insert(key.to_string());
            }
        }
    };

    add_lines(report.summary.as_str());
    for section in &report.sections {
        for text in section.paragraphs.iter().chain(&section.bullets) {
            add_lines(text.as_str());
        }
    }
    drop_set
}

fn render_table(table: &ReportTable) -> Option<String> {
    let width = table
        .rows
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
        .max(table.columns.len());
    if width == 0 {
        return None;
    }

    let render_row = |cells: &[String]| {
        let cells = (0..width)
            .map(|index| cells.get(index).map(|cell| escape_cell(cell)).unwrap_or_default())
            .collect::<Vec<_>>();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = vec![render_row(table.columns.as_slice())];
    lines.push(format!("|{}", " --- |".repeat(width)));
    lines.extend(table.rows.iter().map(|row| render_row(row.as_slice())));
    Some(lines.join("\n"))
}

fn escape_cell(cell: &str) -> String {
    cell.trim().replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn needs_body_label(body: &str) -> bool {
    let starts_with_heading = body
        .lines()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| HEADING_LINE_RE.is_match(line.trim()));
    !starts_with_heading && body.trim().chars().count() >= BODY_LABEL_MIN_CHARS
}

/// Drops `#` marks the backend already put in front of a heading.
fn strip_heading_marks(text: &str) -> &str {
    text.trim().trim_start_matches('#').trim()
}

fn heading_key(text: &str) -> String {
    text.trim()
        .trim_end_matches('#')
        .trim_end()
        .trim_end_matches([':', '：'])
        .trim()
        .to_lowercase()
}

fn strip_list_marker(line: &str) -> &str {
    match LIST_MARKER_RE.find(line) {
        Some(marker) => line[marker.end()..].trim(),
        None => line,
    }
}

fn dedup_key(line: &str) -> &str {
    strip_list_marker(line).trim()
}
