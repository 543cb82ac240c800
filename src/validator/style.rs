//! House style checks, plus the indentation drift check which always runs.

use crate::diagnostics::{DiagnosticCode, ScriptDiagnostic};
use crate::expression::find_closing;
use crate::language::MAX_OPTION_WORDS;
use crate::parser::interpolation::multireplace_parts;
use crate::parser::scanner::introducer_len;
use crate::parser::{ParseEvent, ParseOutput};
use crate::text::{line_end, next_line_start, Span};

pub(super) fn check(text: &str, output: &ParseOutput) -> Vec<ScriptDiagnostic> {
    let mut diagnostics = Vec::new();

    for event in &output.events {
        match event {
            ParseEvent::Prose { span } => {
                let prose = &text[span.start..span.end];
                for run in runs(prose, '.', 3) {
                    diagnostics.push(ScriptDiagnostic::new(
                        DiagnosticCode::StyleEllipsis,
                        Span::new(span.start + run.start, span.start + run.end),
                    ));
                }
                for run in runs(prose, '-', 2) {
                    diagnostics.push(ScriptDiagnostic::new(
                        DiagnosticCode::StyleEmDash,
                        Span::new(span.start + run.start, span.start + run.end),
                    ));
                }
            }
            ParseEvent::ChoiceOption { span } => {
                let words = option_word_count(&text[span.start..span.end]);
                if words > MAX_OPTION_WORDS {
                    diagnostics.push(ScriptDiagnostic::with_message(
                        DiagnosticCode::OptionTooLong,
                        *span,
                        format!(
                            "Options should be at most {} words, this one has {}",
                            MAX_OPTION_WORDS, words
                        ),
                    ));
                }
            }
            _ => {}
        }
    }

    diagnostics
}

/// Runs of at least `min` consecutive `ch`, as local spans.
fn runs(text: &str, ch: char, min: usize) -> Vec<Span> {
    let mut found = Vec::new();
    let mut start = None;
    for (idx, current) in text.char_indices().chain(std::iter::once((text.len(), '\0'))) {
        match (current == ch, start) {
            (true, None) => start = Some(idx),
            (false, Some(begin)) => {
                if idx - begin >= min {
                    found.push(Span::new(begin, idx));
                }
                start = None;
            }
            _ => {}
        }
    }
    found
}

/// Words a reader sees in an option. A replacement counts as one word and a
/// multireplace as its longest branch.
pub(crate) fn option_word_count(option: &str) -> usize {
    flatten(option).split_whitespace().count()
}

fn flatten(text: &str) -> String {
    let mut flat = String::with_capacity(text.len());
    let mut idx = 0;
    while idx < text.len() {
        let rest = &text[idx..];
        if let Some(intro) = introducer_len(rest, '@') {
            if let Some(close) = find_closing(rest, intro, '{', '}', false) {
                let inner = &rest[intro..close];
                let longest = multireplace_parts(inner)
                    .options
                    .iter()
                    .map(|&(start, end)| flatten(&inner[start..end]))
                    .max_by_key(|branch| branch.split_whitespace().count())
                    .unwrap_or_default();
                flat.push_str(&longest);
                idx += close + 1;
                continue;
            }
        }
        if let Some(intro) = introducer_len(rest, '$') {
            if let Some(close) = find_closing(rest, intro, '{', '}', true) {
                flat.push('x');
                idx += close + 1;
                continue;
            }
        }
        let Some(ch) = rest.chars().next() else {
            break;
        };
        flat.push(ch);
        idx += ch.len_utf8();
    }
    flat
}

/// Consecutive indented lines that switch between tabs and spaces.
pub(super) fn indentation_drift(text: &str) -> Vec<ScriptDiagnostic> {
    let mut diagnostics = Vec::new();
    let mut previous: Option<char> = None;
    let mut pos = 0;

    while pos < text.len() {
        let end = line_end(text, pos);
        let line = &text[pos..end];
        let content = line.trim_start_matches([' ', '\t']);
        if !content.trim().is_empty() {
            let indent = &line[..line.len() - content.len()];
            match indent.chars().next() {
                Some(first) => {
                    if previous.is_some_and(|previous| previous != first) {
                        diagnostics.push(ScriptDiagnostic::new(
                            DiagnosticCode::IndentationDrift,
                            Span::new(pos, pos + indent.len()),
                        ));
                    }
                    previous = Some(first);
                }
                None => previous = None,
            }
        }
        pos = next_line_start(text, pos);
    }

    diagnostics
}
