//! Expression tokenizer and type inference.
//!
//! An [`Expression`] is built from a bounded slice of a document. Tokenizing
//! never fails: malformed input turns into `Unknown`/`UnknownOperator` tokens
//! and entries in [`Expression::errors`]. Types are inferred from the token
//! kinds alone using the operator and function tables in [`crate::language`].

use crate::diagnostics::{DiagnosticCode, ScriptDiagnostic};
use crate::language::{ArgType, EvalType, Function, Operator, OPERATOR_CHARACTERS};
use crate::parser::interpolation::scan_interpolations;
use crate::text::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    String,
    Variable,
    /// `{expr}`: the variable named by the value of `expr`.
    VariableReference,
    /// `[expr]` directly after a variable.
    ArrayIndex,
    /// A variable or variable reference together with its array indices.
    ArrayElement,
    Operator(Operator),
    UnknownOperator,
    Function(Function),
    /// A function name together with its parenthesized argument.
    FunctionCall(Function),
    /// `true` or `false`.
    NamedValue,
    Parentheses,
    Unknown,
}

impl TokenKind {
    fn is_operator(self) -> bool {
        matches!(self, TokenKind::Operator(_) | TokenKind::UnknownOperator)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    /// Position of the token within its list.
    pub index: usize,
    /// Sub-expressions: a group's contents, a call's argument, a reference's
    /// target, or the interpolations inside a string.
    pub nested: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub text: String,
    pub span: Span,
    pub tokens: Vec<Token>,
    /// `tokens` with calls and array accesses collapsed into single tokens.
    pub combined: Vec<Token>,
    pub eval_type: EvalType,
    /// Errors found in this expression and everything nested in it.
    pub errors: Vec<ScriptDiagnostic>,
}

impl Expression {
    pub fn parse(text: &str, offset: usize) -> Self {
        Self::build(text, offset, false, false)
    }

    /// Parse an expression that sits inside a multireplace option, where
    /// string literals may not open another multireplace.
    pub(crate) fn parse_in(text: &str, offset: usize, in_multireplace: bool) -> Self {
        Self::build(text, offset, false, in_multireplace)
    }

    /// Parse the value of a `*set`, where a leading operator applies to the
    /// variable being set (`*set strength +10`).
    pub fn parse_with_implied_operand(text: &str, offset: usize) -> Self {
        Self::build(text, offset, true, false)
    }

    fn build(text: &str, offset: usize, allow_implied: bool, in_multireplace: bool) -> Self {
        let mut lexer = Lexer {
            text,
            offset,
            pos: 0,
            allow_implied,
            in_multireplace,
            tokens: Vec::new(),
            errors: Vec::new(),
        };
        lexer.run();
        let Lexer {
            tokens, mut errors, ..
        } = lexer;

        let span = Span::new(offset, offset + text.len());
        let combined = combine(&tokens, text, offset, &mut errors);
        let implied = allow_implied
            && combined
                .first()
                .map(|token| token.kind.is_operator())
                .unwrap_or(false);
        let eval_type = infer(&combined, implied, span, &mut errors);

        Self {
            text: text.to_string(),
            span,
            tokens,
            combined,
            eval_type,
            errors,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The whole expression is a single parenthesized group.
    pub fn is_parenthesized(&self) -> bool {
        self.combined.len() == 1 && self.combined[0].kind == TokenKind::Parentheses
    }

    /// `Some` when the expression is a constant `true`/`false`, possibly
    /// wrapped in parentheses or `not()`.
    pub fn constant_truth(&self) -> Option<bool> {
        if self.combined.len() != 1 {
            return None;
        }
        let token = &self.combined[0];
        match token.kind {
            TokenKind::NamedValue => Some(token.text.eq_ignore_ascii_case("true")),
            TokenKind::Parentheses => token.nested.first()?.constant_truth(),
            TokenKind::FunctionCall(Function::Not) => {
                token.nested.first()?.constant_truth().map(|value| !value)
            }
            _ => None,
        }
    }

    /// Every variable named directly in the expression or anything nested in it.
    ///
    /// The base of an array access is skipped since the element actually read
    /// depends on the index.
    pub fn variable_references(&self) -> Vec<(String, Span)> {
        let mut found = Vec::new();
        collect_variables(&self.tokens, &mut found);
        found
    }
}

fn collect_variables(tokens: &[Token], found: &mut Vec<(String, Span)>) {
    for (idx, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Variable {
            let indexed = tokens
                .get(idx + 1)
                .map(|next| next.kind == TokenKind::ArrayIndex)
                .unwrap_or(false);
            if !indexed {
                found.push((token.text.clone(), token.span));
            }
        }
        for nested in &token.nested {
            collect_variables(&nested.tokens, found);
        }
    }
}

struct Lexer<'a> {
    text: &'a str,
    offset: usize,
    pos: usize,
    allow_implied: bool,
    in_multireplace: bool,
    tokens: Vec<Token>,
    errors: Vec<ScriptDiagnostic>,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.offset + start, self.offset + end)
    }

    fn push(&mut self, kind: TokenKind, start: usize, nested: Vec<Expression>) {
        let index = self.tokens.len();
        self.tokens.push(Token {
            kind,
            text: self.text[start..self.pos].to_string(),
            span: self.span(start, self.pos),
            index,
            nested,
        });
    }

    fn error(&mut self, code: DiagnosticCode, start: usize, end: usize, message: Option<String>) {
        let span = self.span(start, end);
        self.errors.push(match message {
            Some(message) => ScriptDiagnostic::with_message(code, span, message),
            None => ScriptDiagnostic::new(code, span),
        });
    }

    fn run(&mut self) {
        while let Some(ch) = self.peek() {
            let start = self.pos;
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
            } else if ch.is_ascii_digit() || (ch == '-' && self.negative_number_allowed()) {
                self.number(start);
            } else if ch == '"' {
                self.string(start);
            } else if ch == '(' {
                self.group(start, '(', ')', TokenKind::Parentheses);
            } else if ch == '{' {
                self.group(start, '{', '}', TokenKind::VariableReference);
            } else if ch == '[' {
                self.group(start, '[', ']', TokenKind::ArrayIndex);
            } else if matches!(ch, ')' | '}' | ']') {
                self.pos += 1;
                self.push(TokenKind::Unknown, start, Vec::new());
                self.error(
                    DiagnosticCode::UnbalancedBrackets,
                    start,
                    self.pos,
                    Some(format!("Unexpected {}", ch)),
                );
            } else if ch.is_ascii_alphabetic() || ch == '_' {
                self.word(start);
            } else if OPERATOR_CHARACTERS.contains(ch) {
                self.operator(start);
            } else {
                self.pos += ch.len_utf8();
                self.push(TokenKind::Unknown, start, Vec::new());
                self.error(DiagnosticCode::UnrecognizedCharacter, start, self.pos, None);
            }
        }
    }

    fn negative_number_allowed(&self) -> bool {
        let next_is_digit = self.text[self.pos + 1..]
            .chars()
            .next()
            .map(|ch| ch.is_ascii_digit())
            .unwrap_or(false);
        if !next_is_digit {
            return false;
        }
        match self.tokens.last() {
            None => !self.allow_implied,
            Some(token) => token.kind.is_operator(),
        }
    }

    fn number(&mut self, start: usize) {
        if self.text[self.pos..].starts_with('-') {
            self.pos += 1;
        }
        self.consume_while(|ch| ch.is_ascii_digit());
        let rest = &self.text[self.pos..];
        if rest.starts_with('.') && rest[1..].starts_with(|ch: char| ch.is_ascii_digit()) {
            self.pos += 1;
            self.consume_while(|ch| ch.is_ascii_digit());
        }
        self.push(TokenKind::Number, start, Vec::new());
    }

    fn string(&mut self, start: usize) {
        let content_start = start + 1;
        let close = find_string_end(self.text, content_start);
        let (content_end, terminated) = match close {
            Some(idx) => (idx, true),
            None => (self.text.len(), false),
        };

        let content = &self.text[content_start..content_end];
        let interpolations =
            scan_interpolations(content, self.offset + content_start, self.in_multireplace);
        self.errors.extend(interpolations.errors);

        self.pos = if terminated { content_end + 1 } else { content_end };
        self.push(TokenKind::String, start, interpolations.expressions);
        if !terminated {
            self.error(DiagnosticCode::UnterminatedString, start, self.pos, None);
        }
    }

    fn group(&mut self, start: usize, open: char, close: char, kind: TokenKind) {
        let inner_start = start + 1;
        let (inner_end, terminated) = match find_closing(self.text, inner_start, open, close, true) {
            Some(idx) => (idx, true),
            None => (self.text.len(), false),
        };

        let inner = Expression::parse_in(
            &self.text[inner_start..inner_end],
            self.offset + inner_start,
            self.in_multireplace,
        );
        self.errors.extend(inner.errors.iter().cloned());

        self.pos = if terminated { inner_end + 1 } else { inner_end };
        self.push(kind, start, vec![inner]);
        if !terminated {
            let what = match close {
                ')' => "parenthesis",
                '}' => "curly brace",
                _ => "bracket",
            };
            self.error(
                DiagnosticCode::UnbalancedBrackets,
                start,
                self.pos,
                Some(format!("Missing close {}", what)),
            );
        }
    }

    fn word(&mut self, start: usize) {
        self.consume_while(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        let word = &self.text[start..self.pos];

        if let Some(op) = Operator::from_word(word) {
            self.push(TokenKind::Operator(op), start, Vec::new());
        } else if word.eq_ignore_ascii_case("true") || word.eq_ignore_ascii_case("false") {
            self.push(TokenKind::NamedValue, start, Vec::new());
        } else if let Some(function) = Function::from_name(word) {
            self.push(TokenKind::Function(function), start, Vec::new());
            let called = self.text[self.pos..].trim_start().starts_with('(');
            if !called {
                self.error(DiagnosticCode::FunctionMissingArguments, start, self.pos, None);
            }
        } else {
            self.push(TokenKind::Variable, start, Vec::new());
        }
    }

    fn operator(&mut self, start: usize) {
        self.consume_while(|ch| OPERATOR_CHARACTERS.contains(ch));
        let run = &self.text[start..self.pos];
        match Operator::match_symbol(run) {
            Some((op, len)) if len == run.len() => {
                self.push(TokenKind::Operator(op), start, Vec::new());
            }
            _ => {
                self.push(TokenKind::UnknownOperator, start, Vec::new());
                self.error(
                    DiagnosticCode::UnknownOperator,
                    start,
                    self.pos,
                    Some(format!("Unknown operator {}", run)),
                );
            }
        }
    }

    fn consume_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }
}

/// Index of the quote closing a string whose content starts at `from`.
pub(crate) fn find_string_end(text: &str, from: usize) -> Option<usize> {
    let mut escaped = false;
    for (idx, ch) in text[from..].char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            return Some(from + idx);
        }
    }
    None
}

/// Index of the `close` matching an `open` that ends just before `from`.
pub(crate) fn find_closing(
    text: &str,
    from: usize,
    open: char,
    close: char,
    skip_strings: bool,
) -> Option<usize> {
    let mut depth = 1usize;
    let mut idx = from;
    while idx < text.len() {
        let ch = text[idx..].chars().next()?;
        if skip_strings && ch == '"' {
            idx = find_string_end(text, idx + 1)? + 1;
            continue;
        }
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
        }
        idx += ch.len_utf8();
    }
    None
}

fn combine(
    tokens: &[Token],
    source: &str,
    offset: usize,
    errors: &mut Vec<ScriptDiagnostic>,
) -> Vec<Token> {
    let mut combined: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut idx = 0;

    while idx < tokens.len() {
        let token = &tokens[idx];
        let mut merged = token.clone();

        match token.kind {
            TokenKind::Function(function) => {
                if let Some(args) = tokens.get(idx + 1) {
                    if args.kind == TokenKind::Parentheses {
                        merged.kind = TokenKind::FunctionCall(function);
                        merged.span = Span::new(token.span.start, args.span.end);
                        merged.nested = args.nested.clone();
                        idx += 1;
                    }
                }
            }
            TokenKind::Variable | TokenKind::VariableReference => {
                while let Some(index) = tokens.get(idx + 1) {
                    if index.kind != TokenKind::ArrayIndex {
                        break;
                    }
                    merged.kind = TokenKind::ArrayElement;
                    merged.span.end = index.span.end;
                    merged.nested.extend(index.nested.iter().cloned());
                    idx += 1;
                }
            }
            TokenKind::ArrayIndex => {
                errors.push(ScriptDiagnostic::with_message(
                    DiagnosticCode::IncompleteExpression,
                    token.span,
                    "An array index must follow a variable",
                ));
            }
            _ => {}
        }

        merged.text = source[merged.span.start - offset..merged.span.end - offset].to_string();
        merged.index = combined.len();
        combined.push(merged);
        idx += 1;
    }

    combined
}

fn operand_type(token: &Token, errors: &mut Vec<ScriptDiagnostic>) -> EvalType {
    match token.kind {
        TokenKind::Number => EvalType::Number,
        TokenKind::String => EvalType::String,
        TokenKind::NamedValue => EvalType::Boolean,
        TokenKind::Variable | TokenKind::VariableReference | TokenKind::ArrayElement => {
            EvalType::Unknown
        }
        TokenKind::Parentheses => match token.nested.first().map(|inner| inner.eval_type) {
            Some(EvalType::Empty) | None => {
                errors.push(ScriptDiagnostic::with_message(
                    DiagnosticCode::IncompleteExpression,
                    token.span,
                    "Empty parentheses",
                ));
                EvalType::Error
            }
            Some(eval_type) => eval_type,
        },
        TokenKind::FunctionCall(function) => {
            let (expected, result) = function.signature();
            let argument = match token.nested.first() {
                Some(argument) => argument,
                None => return EvalType::Error,
            };
            match argument.eval_type {
                EvalType::Error => EvalType::Error,
                EvalType::Empty => {
                    errors.push(ScriptDiagnostic::with_message(
                        DiagnosticCode::IncompleteExpression,
                        token.span,
                        "Missing function argument",
                    ));
                    EvalType::Error
                }
                actual if !actual.satisfies(expected) => {
                    errors.push(ScriptDiagnostic::with_message(
                        DiagnosticCode::TypeMismatch,
                        argument.span,
                        format!("Must be {}", expected.label()),
                    ));
                    EvalType::Error
                }
                _ => result,
            }
        }
        TokenKind::Function(_)
        | TokenKind::Operator(_)
        | TokenKind::UnknownOperator
        | TokenKind::ArrayIndex
        | TokenKind::Unknown => EvalType::Error,
    }
}

fn check_operand(
    actual: EvalType,
    expected: ArgType,
    span: Span,
    errors: &mut Vec<ScriptDiagnostic>,
) -> bool {
    if actual.satisfies(expected) {
        return true;
    }
    errors.push(ScriptDiagnostic::with_message(
        DiagnosticCode::TypeMismatch,
        span,
        format!("Must be {}", expected.label()),
    ));
    false
}

fn is_known(eval_type: EvalType) -> bool {
    matches!(
        eval_type,
        EvalType::Number | EvalType::String | EvalType::Boolean
    )
}

fn infer(
    combined: &[Token],
    implied: bool,
    span: Span,
    errors: &mut Vec<ScriptDiagnostic>,
) -> EvalType {
    // `None` stands for the implied left operand of a `*set`.
    let slots: Vec<Option<&Token>> = implied
        .then_some(None)
        .into_iter()
        .chain(combined.iter().map(Some))
        .collect();

    let is_operator = |slot: &Option<&Token>| {
        slot.map(|token| token.kind.is_operator())
            .unwrap_or(false)
    };

    match slots.as_slice() {
        [] => EvalType::Empty,
        [single] => match single {
            Some(token) if token.kind.is_operator() => {
                if token.kind != TokenKind::UnknownOperator {
                    errors.push(ScriptDiagnostic::with_message(
                        DiagnosticCode::IncompleteExpression,
                        span,
                        "Operator is missing its values",
                    ));
                }
                EvalType::Error
            }
            Some(token) => operand_type(token, errors),
            None => EvalType::Unknown,
        },
        [first, second] => {
            let message = if is_operator(first) || is_operator(second) {
                "Incomplete expression"
            } else {
                "Missing operator between values"
            };
            errors.push(ScriptDiagnostic::with_message(
                DiagnosticCode::IncompleteExpression,
                span,
                message,
            ));
            EvalType::Error
        }
        [left, Some(op), Some(right)] => {
            let operator = match op.kind {
                TokenKind::Operator(operator) => operator,
                TokenKind::UnknownOperator => return EvalType::Error,
                _ => {
                    errors.push(ScriptDiagnostic::with_message(
                        DiagnosticCode::IncompleteExpression,
                        op.span,
                        "Missing operator between values",
                    ));
                    return EvalType::Error;
                }
            };
            if is_operator(left) || right.kind.is_operator() {
                errors.push(ScriptDiagnostic::with_message(
                    DiagnosticCode::IncompleteExpression,
                    span,
                    "Operator is missing a value",
                ));
                return EvalType::Error;
            }

            let left_type = left
                .map(|token| operand_type(token, errors))
                .unwrap_or(EvalType::Unknown);
            let right_type = operand_type(right, errors);
            if left_type == EvalType::Error || right_type == EvalType::Error {
                return EvalType::Error;
            }

            let (left_arg, right_arg, result) = operator.signature();
            let left_ok = match left {
                Some(token) => check_operand(left_type, left_arg, token.span, errors),
                None => true,
            };
            let right_ok = check_operand(right_type, right_arg, right.span, errors);
            if !(left_ok && right_ok) {
                return EvalType::Error;
            }

            if operator.requires_matching_operands()
                && is_known(left_type)
                && is_known(right_type)
                && left_type != right_type
            {
                errors.push(ScriptDiagnostic::with_message(
                    DiagnosticCode::TypeMismatch,
                    op.span,
                    format!(
                        "Can't compare {} with {}",
                        left_type.label(),
                        right_type.label()
                    ),
                ));
                return EvalType::Error;
            }

            result
        }
        [_, _, _] => EvalType::Error,
        [.., _] => {
            let extra_start = slots[3].map(|token| token.span.start).unwrap_or(span.start);
            let extra_end = slots
                .last()
                .and_then(|slot| slot.map(|token| token.span.end))
                .unwrap_or(span.end);
            errors.push(ScriptDiagnostic::new(
                DiagnosticCode::TooManyExpressionElements,
                Span::new(extra_start, extra_end),
            ));
            EvalType::Error
        }
    }
}
