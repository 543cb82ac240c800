//! Single-pass parser for scene documents.
//!
//! [`parse`] walks the document once and returns an ordered list of
//! [`ParseEvent`]s. The index and the validator both fold over that list;
//! neither looks at the text again except for line-oriented style checks.

pub(crate) mod blocks;
mod commands;
pub(crate) mod interpolation;
pub(crate) mod scanner;

use crate::diagnostics::{DiagnosticCode, ScriptDiagnostic};
use crate::expression::Expression;
use crate::text::Span;
use interpolation::Interpolations;
use scanner::{lex, ScanTokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope {
    /// `*create`: global when it appears in the startup document.
    Global,
    /// `*temp`.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Choice,
    /// Where `choice_achieved_<codename>` variables may be read.
    Achievement,
    /// Where `param_<n>` and `param_count` may be read.
    Params,
}

/// A label or scene named by a flow-control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub span: Span,
    /// `{expr}`: only known at runtime.
    pub dynamic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowControl {
    pub command: String,
    pub command_span: Span,
    pub scene: Option<Target>,
    pub label: Option<Target>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementDefinition {
    pub codename: String,
    pub span: Span,
    pub points: Option<u32>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    Command {
        name: String,
        span: Span,
        line_start: bool,
    },
    VariableCreate {
        name: String,
        span: Span,
        scope: VariableScope,
    },
    /// Arguments named by `*params`.
    SubroutineLocalCreate {
        name: String,
        span: Span,
    },
    LabelCreate {
        name: String,
        span: Span,
    },
    VariableReference {
        name: String,
        span: Span,
    },
    FlowControl(FlowControl),
    SceneList {
        scenes: Vec<Target>,
    },
    AchievementCreate(AchievementDefinition),
    AchievementReference {
        codename: String,
        span: Span,
    },
    Scope {
        kind: ScopeKind,
        span: Span,
    },
    /// The text of an `#option` line, after the `#`.
    ChoiceOption {
        span: Span,
    },
    ImageReference {
        filename: String,
        span: Span,
    },
    Prose {
        span: Span,
    },
    ParseError(ScriptDiagnostic),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutput {
    pub events: Vec<ParseEvent>,
}

impl ParseOutput {
    pub fn errors(&self) -> impl Iterator<Item = &ScriptDiagnostic> + '_ {
        self.events.iter().filter_map(|event| match event {
            ParseEvent::ParseError(error) => Some(error),
            _ => None,
        })
    }

    pub fn scopes(&self, kind: ScopeKind) -> impl Iterator<Item = Span> + '_ {
        self.events.iter().filter_map(move |event| match event {
            ParseEvent::Scope { kind: found, span } if *found == kind => Some(*span),
            _ => None,
        })
    }
}

/// Parse a whole document. `is_startup` enables the startup-only commands.
pub fn parse(text: &str, is_startup: bool) -> ParseOutput {
    let mut parser = Parser {
        text,
        is_startup,
        quiet_until: 0,
        events: Vec::new(),
    };
    parser.scan();
    log::trace!(
        "parsed {} bytes into {} events",
        text.len(),
        parser.events.len()
    );
    ParseOutput {
        events: parser.events,
    }
}

struct Parser<'a> {
    text: &'a str,
    is_startup: bool,
    /// Text before this offset belongs to a command's arguments and is not
    /// reported as prose.
    quiet_until: usize,
    events: Vec<ParseEvent>,
}

impl<'a> Parser<'a> {
    fn scan(&mut self) {
        let mut cursor = 0;
        for token in lex(self.text, 0, true) {
            match token.kind {
                ScanTokenKind::TextRun => {
                    let start = token.span.start.max(cursor);
                    if start < token.span.end {
                        self.prose(Span::new(start, token.span.end));
                    }
                }
                _ if token.span.start < cursor => {}
                ScanTokenKind::ReplacementStart => {
                    let (end, found) = interpolation::parse_replacement(
                        &self.text[token.span.start..],
                        token.span.start,
                        false,
                    );
                    self.absorb(found);
                    cursor = end;
                }
                ScanTokenKind::MultireplaceStart => {
                    let (end, found) = interpolation::parse_multireplace(
                        &self.text[token.span.start..],
                        token.span.start,
                        false,
                    );
                    self.absorb(found);
                    cursor = end;
                }
                ScanTokenKind::CommandStart if token.line_start => {
                    cursor = self.command(token.span);
                }
                ScanTokenKind::CommandStart => {
                    self.events.push(ParseEvent::Command {
                        name: self.text[token.span.start + 1..token.span.end].to_string(),
                        span: token.span,
                        line_start: false,
                    });
                }
            }
            cursor = cursor.max(token.span.end);
        }
    }

    fn prose(&mut self, span: Span) {
        let span = Span::new(span.start.max(self.quiet_until), span.end);
        if !span.is_empty() && !self.text[span.start..span.end].trim().is_empty() {
            self.events.push(ParseEvent::Prose { span });
        }
    }

    fn absorb(&mut self, found: Interpolations) {
        for expression in &found.expressions {
            self.references(expression);
        }
        for error in found.errors {
            self.events.push(ParseEvent::ParseError(error));
        }
        for span in found.text_runs {
            self.prose(span);
        }
    }

    fn references(&mut self, expression: &Expression) {
        for (name, span) in expression.variable_references() {
            self.events
                .push(ParseEvent::VariableReference { name, span });
        }
    }

    /// Tokenize `span` and record its references and errors.
    fn expression(&mut self, span: Span) -> Expression {
        let expression = Expression::parse(&self.text[span.start..span.end], span.start);
        self.record(&expression);
        expression
    }

    fn implied_expression(&mut self, span: Span) -> Expression {
        let expression =
            Expression::parse_with_implied_operand(&self.text[span.start..span.end], span.start);
        self.record(&expression);
        expression
    }

    fn record(&mut self, expression: &Expression) {
        self.references(expression);
        for error in &expression.errors {
            self.events.push(ParseEvent::ParseError(error.clone()));
        }
    }

    fn reference(&mut self, name: &str, span: Span) {
        self.events.push(ParseEvent::VariableReference {
            name: name.to_string(),
            span,
        });
    }

    fn error(&mut self, code: DiagnosticCode, span: Span) {
        self.events
            .push(ParseEvent::ParseError(ScriptDiagnostic::new(code, span)));
    }

    fn error_with(&mut self, code: DiagnosticCode, span: Span, message: impl Into<String>) {
        self.events.push(ParseEvent::ParseError(ScriptDiagnostic::with_message(
            code, span, message,
        )));
    }
}
