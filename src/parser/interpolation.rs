//! `${...}` replacements and `@{...}` multireplaces.
//!
//! These are shared between document text and string literals inside
//! expressions, so they return what they found instead of emitting events.

use super::scanner::{introducer_len, lex, ScanTokenKind};
use crate::diagnostics::{DiagnosticCode, ScriptDiagnostic};
use crate::expression::{find_closing, Expression};
use crate::language::EvalType;
use crate::text::{line_end, Span};

#[derive(Debug, Default)]
pub(crate) struct Interpolations {
    /// Replacement bodies and multireplace tests, in source order.
    pub expressions: Vec<Expression>,
    pub errors: Vec<ScriptDiagnostic>,
    /// Plain text outside any interpolation (including multireplace options).
    pub text_runs: Vec<Span>,
}

impl Interpolations {
    fn merge(&mut self, other: Interpolations) {
        self.expressions.extend(other.expressions);
        self.errors.extend(other.errors);
        self.text_runs.extend(other.text_runs);
    }

    fn error(&mut self, code: DiagnosticCode, span: Span) {
        self.errors.push(ScriptDiagnostic::new(code, span));
    }

    fn expression(&mut self, expression: Expression) {
        self.errors.extend(expression.errors.iter().cloned());
        self.expressions.push(expression);
    }
}

/// Find every interpolation in `text`, which starts at `offset`.
/// `in_multireplace` is set while scanning a multireplace option, where a
/// further multireplace is an error.
pub(crate) fn scan_interpolations(
    text: &str,
    offset: usize,
    in_multireplace: bool,
) -> Interpolations {
    let mut found = Interpolations::default();
    let mut cursor = offset;

    for token in lex(text, offset, false) {
        let start = token.span.start - offset;
        match token.kind {
            ScanTokenKind::TextRun => {
                let run_start = token.span.start.max(cursor);
                if run_start < token.span.end {
                    found.text_runs.push(Span::new(run_start, token.span.end));
                }
            }
            ScanTokenKind::ReplacementStart if token.span.start >= cursor => {
                let (end, inner) = parse_replacement(&text[start..], token.span.start, in_multireplace);
                found.merge(inner);
                cursor = end;
            }
            ScanTokenKind::MultireplaceStart if token.span.start >= cursor => {
                let (end, inner) = parse_multireplace(&text[start..], token.span.start, in_multireplace);
                found.merge(inner);
                cursor = end;
            }
            _ => {}
        }
        cursor = cursor.max(token.span.end);
    }

    found
}

/// Parse the replacement at the start of `text`. Returns the absolute offset
/// where scanning should resume.
pub(crate) fn parse_replacement(
    text: &str,
    offset: usize,
    in_multireplace: bool,
) -> (usize, Interpolations) {
    let mut found = Interpolations::default();
    let intro = introducer_len(text, '$').unwrap_or(2);
    let limit = line_end(text, 0);

    let Some(close) = find_closing(&text[..limit], intro, '{', '}', true) else {
        found.error(
            DiagnosticCode::UnterminatedReplacement,
            Span::new(offset, offset + limit),
        );
        return (offset + limit, found);
    };

    let inner = &text[intro..close];
    if inner.trim().is_empty() {
        found.error(
            DiagnosticCode::EmptyReplacement,
            Span::new(offset, offset + close + 1),
        );
    } else {
        found.expression(Expression::parse_in(inner, offset + intro, in_multireplace));
    }
    (offset + close + 1, found)
}

/// Local byte ranges of a multireplace's test and options, given the text
/// between its braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MultireplaceParts {
    pub test: (usize, usize),
    pub options: Vec<(usize, usize)>,
}

pub(crate) fn multireplace_parts(inner: &str) -> MultireplaceParts {
    let lead = inner.len() - inner.trim_start().len();
    let test_end = if inner[lead..].starts_with('(') {
        find_closing(inner, lead + 1, '(', ')', true)
            .map(|close| close + 1)
            .unwrap_or(inner.len())
    } else {
        inner[lead..]
            .find(char::is_whitespace)
            .map(|idx| lead + idx)
            .unwrap_or(inner.len())
    };

    let options_start = match inner[test_end..].chars().next() {
        Some(ch) if ch.is_whitespace() => test_end + ch.len_utf8(),
        _ => test_end,
    };

    let mut options = Vec::new();
    let mut depth = 0usize;
    let mut start = options_start;
    for (idx, ch) in inner[options_start..].char_indices() {
        let at = options_start + idx;
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => {
                options.push((start, at));
                start = at + 1;
            }
            _ => {}
        }
    }
    options.push((start, inner.len()));

    MultireplaceParts {
        test: (lead, test_end),
        options,
    }
}

/// Parse the multireplace at the start of `text`. Returns the absolute offset
/// where scanning should resume.
pub(crate) fn parse_multireplace(
    text: &str,
    offset: usize,
    in_multireplace: bool,
) -> (usize, Interpolations) {
    let mut found = Interpolations::default();
    let intro = introducer_len(text, '@').unwrap_or(2);
    let limit = line_end(text, 0);

    let Some(close) = find_closing(&text[..limit], intro, '{', '}', false) else {
        found.error(
            DiagnosticCode::UnterminatedMultireplace,
            Span::new(offset, offset + limit),
        );
        return (offset + limit, found);
    };
    let whole = Span::new(offset, offset + close + 1);

    if in_multireplace {
        found.error(DiagnosticCode::NestedMultireplace, whole);
        return (whole.end, found);
    }

    let inner = &text[intro..close];
    let inner_offset = offset + intro;
    if inner.trim().is_empty() {
        found.error(DiagnosticCode::EmptyMultireplace, whole);
        return (whole.end, found);
    }

    let parts = multireplace_parts(inner);
    let (test_start, test_end) = parts.test;
    let test = Expression::parse_in(&inner[test_start..test_end], inner_offset + test_start, true);
    if test.errors.is_empty() && test.eval_type == EvalType::String {
        found.error(DiagnosticCode::InvalidMultireplaceTest, test.span);
    }
    found.expression(test);

    if parts.options.len() < 2 {
        found.error(DiagnosticCode::MultireplaceTooFewOptions, whole);
    }

    for (start, end) in parts.options {
        let option = scan_interpolations(&inner[start..end], inner_offset + start, true);
        found.merge(option);
    }

    (whole.end, found)
}
