//! Flat token stream over document text.
//!
//! The lexer only finds the places where the grammar changes: command
//! introducers, replacement introducers and multireplace introducers.
//! Everything in between is a text run. Which of those tokens are actually
//! consumed is up to the state machine in [`super::Parser`].

use crate::language::REUSE_COMMANDS;
use crate::text::{line_start, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanTokenKind {
    /// `*word`; the span covers the asterisk and the name.
    CommandStart,
    /// `${`, `$!{` or `$!!{`.
    ReplacementStart,
    /// `@{`, `@!{` or `@!!{`.
    MultireplaceStart,
    TextRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanToken {
    pub kind: ScanTokenKind,
    pub span: Span,
    /// For commands: only whitespace (or reuse commands) precede it on its line.
    pub line_start: bool,
}

/// Lex `text`, whose first byte sits at `offset` in the document.
///
/// With `commands` unset, `*word` is ordinary text; this is how string
/// contents and multireplace options are scanned.
pub(crate) fn lex(text: &str, offset: usize, commands: bool) -> Vec<ScanToken> {
    let mut tokens = Vec::new();
    let mut run_start: Option<usize> = None;
    let mut idx = 0;

    while idx < text.len() {
        let rest = &text[idx..];
        let found = if commands {
            command_at(text, idx).map(|end| (ScanTokenKind::CommandStart, end))
        } else {
            None
        }
        .or_else(|| {
            introducer_len(rest, '$').map(|len| (ScanTokenKind::ReplacementStart, idx + len))
        })
        .or_else(|| {
            introducer_len(rest, '@').map(|len| (ScanTokenKind::MultireplaceStart, idx + len))
        });

        match found {
            Some((kind, end)) => {
                if let Some(start) = run_start.take() {
                    tokens.push(text_run(start, idx, offset));
                }
                let line_start =
                    kind == ScanTokenKind::CommandStart && preceded_by_line_start(text, idx);
                tokens.push(ScanToken {
                    kind,
                    span: Span::new(offset + idx, offset + end),
                    line_start,
                });
                idx = end;
            }
            None => {
                if run_start.is_none() {
                    run_start = Some(idx);
                }
                idx += rest.chars().next().map(char::len_utf8).unwrap_or(1);
            }
        }
    }

    if let Some(start) = run_start {
        tokens.push(text_run(start, text.len(), offset));
    }
    tokens
}

fn text_run(start: usize, end: usize, offset: usize) -> ScanToken {
    ScanToken {
        kind: ScanTokenKind::TextRun,
        span: Span::new(offset + start, offset + end),
        line_start: false,
    }
}

/// Length of `${`, `$!{`, `$!!{` (or the `@` forms) at the start of `rest`.
pub(crate) fn introducer_len(rest: &str, sigil: char) -> Option<usize> {
    let after = rest.strip_prefix(sigil)?;
    ["{", "!{", "!!{"]
        .iter()
        .find(|form| after.starts_with(*form))
        .map(|form| 1 + form.len())
}

/// End of a `*word` starting at `idx`, if one starts there.
fn command_at(text: &str, idx: usize) -> Option<usize> {
    let rest = &text[idx..];
    let name = rest.strip_prefix('*')?;
    if !name.starts_with(|ch: char| ch.is_ascii_alphabetic() || ch == '_') {
        return None;
    }
    let preceded_by_space = text[..idx]
        .chars()
        .next_back()
        .map(char::is_whitespace)
        .unwrap_or(true);
    if !preceded_by_space {
        return None;
    }
    let len = name
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .unwrap_or(name.len());
    Some(idx + 1 + len)
}

/// Nothing but whitespace and reuse commands between the line start and `idx`.
fn preceded_by_line_start(text: &str, idx: usize) -> bool {
    let mut prefix = &text[line_start(text, idx)..idx];
    loop {
        prefix = prefix.trim_start();
        if prefix.is_empty() {
            return true;
        }
        let Some(command) = prefix.strip_prefix('*') else {
            return false;
        };
        let len = command
            .find(char::is_whitespace)
            .unwrap_or(command.len());
        if !REUSE_COMMANDS.contains(&&command[..len]) {
            return false;
        }
        prefix = &command[len..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(tokens: &[ScanToken]) -> Vec<ScanTokenKind> {
        tokens.iter().map(|token| token.kind).collect()
    }

    #[test]
    fn splits_commands_and_interpolations_from_text() {
        let tokens = lex("*set x 2\nHello ${name}, @{rich sir|friend}.", 0, true);
        assert_eq!(
            kinds(&tokens),
            vec![
                ScanTokenKind::CommandStart,
                ScanTokenKind::TextRun,
                ScanTokenKind::ReplacementStart,
                ScanTokenKind::TextRun,
                ScanTokenKind::MultireplaceStart,
                ScanTokenKind::TextRun,
            ]
        );
        assert_eq!(tokens[0].span, Span::new(0, 4));
        assert!(tokens[0].line_start);
        assert_eq!(tokens[2].span, Span::new(15, 17));
    }

    #[test]
    fn capitalized_introducers() {
        let tokens = lex("$!{a} $!!{b} @!{c d|e}", 10, false);
        let spans: Vec<Span> = tokens
            .iter()
            .filter(|token| token.kind != ScanTokenKind::TextRun)
            .map(|token| token.span)
            .collect();
        assert_eq!(
            spans,
            vec![Span::new(10, 13), Span::new(16, 20), Span::new(23, 26)]
        );
    }

    #[test]
    fn mid_line_commands_are_not_at_line_start() {
        let tokens = lex("  *if x\nHe said *goto there", 0, true);
        let commands: Vec<(Span, bool)> = tokens
            .iter()
            .filter(|token| token.kind == ScanTokenKind::CommandStart)
            .map(|token| (token.span, token.line_start))
            .collect();
        assert_eq!(
            commands,
            vec![(Span::new(2, 5), true), (Span::new(16, 21), false)]
        );
    }

    #[test]
    fn reuse_commands_keep_line_start() {
        let tokens = lex("  *hide_reuse *if (x) #Go", 0, true);
        let commands: Vec<bool> = tokens
            .iter()
            .filter(|token| token.kind == ScanTokenKind::CommandStart)
            .map(|token| token.line_start)
            .collect();
        assert_eq!(commands, vec![true, true]);
    }

    #[test]
    fn asterisks_inside_words_are_text() {
        let tokens = lex("3*4 and **bold**", 0, true);
        assert_eq!(kinds(&tokens), vec![ScanTokenKind::TextRun]);
    }
}
