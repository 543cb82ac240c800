//! Diagnostic catalog and the diagnostic value the analysis core emits.
//!
//! The core only ever produces `(code, span, optional message)` triples.
//! Severity and default wording come from the fixed catalog below and are
//! attached when a diagnostic is converted for the editor.

use crate::text::{Document, Span};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};

pub const SOURCE: &str = "choicescript";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // Commands
    UnknownCommand,
    ArgumentRequired,
    ArgumentDisallowed,
    ArgumentIgnored,
    StartupOnlyCommand,
    CommandNotOnOwnLine,
    InvalidVariableName,
    MissingValue,
    NotAVariable,
    SelectableIfWithoutOption,
    InvalidAchievement,
    EmptyChoice,
    InvalidStatChartCommand,
    IncompleteStatChartCommand,
    MixedIndentation,
    // Interpolation
    UnterminatedReplacement,
    EmptyReplacement,
    UnterminatedMultireplace,
    EmptyMultireplace,
    MultireplaceTooFewOptions,
    NestedMultireplace,
    InvalidMultireplaceTest,
    // Expressions
    UnterminatedString,
    UnknownOperator,
    UnrecognizedCharacter,
    UnbalancedBrackets,
    IncompleteExpression,
    TooManyExpressionElements,
    FunctionMissingArguments,
    TypeMismatch,
    NotBoolean,
    NotNumber,
    AlwaysTrue,
    NeverTrue,
    // Project-level
    NotDefined,
    UsedBeforeCreation,
    DefinedEarlier,
    ShadowsGlobal,
    SceneNotFound,
    LabelNotFound,
    AchievementNotFound,
    DuplicateAchievement,
    DuplicateAchievementTitle,
    TooManyAchievements,
    TooManyAchievementPoints,
    IndentationDrift,
    ImageNotFound,
    // Style
    StyleEllipsis,
    StyleEmDash,
    OptionTooLong,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::UnknownCommand => "unknown-command",
            DiagnosticCode::ArgumentRequired => "argument-required",
            DiagnosticCode::ArgumentDisallowed => "argument-disallowed",
            DiagnosticCode::ArgumentIgnored => "argument-ignored",
            DiagnosticCode::StartupOnlyCommand => "startup-only-command",
            DiagnosticCode::CommandNotOnOwnLine => "command-not-on-own-line",
            DiagnosticCode::InvalidVariableName => "invalid-variable-name",
            DiagnosticCode::MissingValue => "missing-value",
            DiagnosticCode::NotAVariable => "not-a-variable",
            DiagnosticCode::SelectableIfWithoutOption => "selectable-if-without-option",
            DiagnosticCode::InvalidAchievement => "invalid-achievement",
            DiagnosticCode::EmptyChoice => "empty-choice",
            DiagnosticCode::InvalidStatChartCommand => "invalid-stat-chart-command",
            DiagnosticCode::IncompleteStatChartCommand => "incomplete-stat-chart-command",
            DiagnosticCode::MixedIndentation => "mixed-indentation",
            DiagnosticCode::UnterminatedReplacement => "unterminated-replacement",
            DiagnosticCode::EmptyReplacement => "empty-replacement",
            DiagnosticCode::UnterminatedMultireplace => "unterminated-multireplace",
            DiagnosticCode::EmptyMultireplace => "empty-multireplace",
            DiagnosticCode::MultireplaceTooFewOptions => "multireplace-too-few-options",
            DiagnosticCode::NestedMultireplace => "nested-multireplace",
            DiagnosticCode::InvalidMultireplaceTest => "invalid-multireplace-test",
            DiagnosticCode::UnterminatedString => "unterminated-string",
            DiagnosticCode::UnknownOperator => "unknown-operator",
            DiagnosticCode::UnrecognizedCharacter => "unrecognized-character",
            DiagnosticCode::UnbalancedBrackets => "unbalanced-brackets",
            DiagnosticCode::IncompleteExpression => "incomplete-expression",
            DiagnosticCode::TooManyExpressionElements => "too-many-expression-elements",
            DiagnosticCode::FunctionMissingArguments => "function-missing-arguments",
            DiagnosticCode::TypeMismatch => "type-mismatch",
            DiagnosticCode::NotBoolean => "not-boolean",
            DiagnosticCode::NotNumber => "not-number",
            DiagnosticCode::AlwaysTrue => "always-true",
            DiagnosticCode::NeverTrue => "never-true",
            DiagnosticCode::NotDefined => "not-defined",
            DiagnosticCode::UsedBeforeCreation => "used-before-creation",
            DiagnosticCode::DefinedEarlier => "defined-earlier",
            DiagnosticCode::ShadowsGlobal => "shadows-global",
            DiagnosticCode::SceneNotFound => "scene-not-found",
            DiagnosticCode::LabelNotFound => "label-not-found",
            DiagnosticCode::AchievementNotFound => "achievement-not-found",
            DiagnosticCode::DuplicateAchievement => "duplicate-achievement",
            DiagnosticCode::DuplicateAchievementTitle => "duplicate-achievement-title",
            DiagnosticCode::TooManyAchievements => "too-many-achievements",
            DiagnosticCode::TooManyAchievementPoints => "too-many-achievement-points",
            DiagnosticCode::IndentationDrift => "indentation-drift",
            DiagnosticCode::ImageNotFound => "image-not-found",
            DiagnosticCode::StyleEllipsis => "style-ellipsis",
            DiagnosticCode::StyleEmDash => "style-em-dash",
            DiagnosticCode::OptionTooLong => "option-too-long",
        }
    }

    pub fn severity(self) -> DiagnosticSeverity {
        match self {
            DiagnosticCode::ArgumentIgnored
            | DiagnosticCode::CommandNotOnOwnLine
            | DiagnosticCode::AlwaysTrue
            | DiagnosticCode::NeverTrue
            | DiagnosticCode::DefinedEarlier
            | DiagnosticCode::IndentationDrift
            | DiagnosticCode::ImageNotFound => DiagnosticSeverity::WARNING,
            DiagnosticCode::ShadowsGlobal
            | DiagnosticCode::StyleEllipsis
            | DiagnosticCode::StyleEmDash
            | DiagnosticCode::OptionTooLong => DiagnosticSeverity::INFORMATION,
            _ => DiagnosticSeverity::ERROR,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            DiagnosticCode::UnknownCommand => "Unknown command",
            DiagnosticCode::ArgumentRequired => "Command is missing its arguments",
            DiagnosticCode::ArgumentDisallowed => "Command doesn't allow any arguments",
            DiagnosticCode::ArgumentIgnored => "This will be ignored",
            DiagnosticCode::StartupOnlyCommand => "Command can only be used in startup.txt",
            DiagnosticCode::CommandNotOnOwnLine => "Command must be on a line by itself",
            DiagnosticCode::InvalidVariableName => "Not a valid variable name",
            DiagnosticCode::MissingValue => "Missing value",
            DiagnosticCode::NotAVariable => "Not a variable or variable reference",
            DiagnosticCode::SelectableIfWithoutOption => {
                "*selectable_if must be followed by an #option"
            }
            DiagnosticCode::InvalidAchievement => "Invalid achievement definition",
            DiagnosticCode::EmptyChoice => "Choice has no options",
            DiagnosticCode::InvalidStatChartCommand => "Must be text, percent, or opposed_pair",
            DiagnosticCode::IncompleteStatChartCommand => {
                "opposed_pair must be followed by an indented label"
            }
            DiagnosticCode::MixedIndentation => "Indentation mixes tabs and spaces",
            DiagnosticCode::UnterminatedReplacement => "Replacement is missing its }",
            DiagnosticCode::EmptyReplacement => "Replacement is empty",
            DiagnosticCode::UnterminatedMultireplace => "Multireplace is missing its }",
            DiagnosticCode::EmptyMultireplace => "Multireplace is empty",
            DiagnosticCode::MultireplaceTooFewOptions => {
                "Multireplace must have at least two options separated by |"
            }
            DiagnosticCode::NestedMultireplace => "Multireplaces can't be nested",
            DiagnosticCode::InvalidMultireplaceTest => {
                "Multireplace test must be a boolean or a number"
            }
            DiagnosticCode::UnterminatedString => "Missing close quote",
            DiagnosticCode::UnknownOperator => "Unknown operator",
            DiagnosticCode::UnrecognizedCharacter => "Unrecognized character",
            DiagnosticCode::UnbalancedBrackets => "Missing close parenthesis",
            DiagnosticCode::IncompleteExpression => "Incomplete expression",
            DiagnosticCode::TooManyExpressionElements => {
                "Too many elements - are you missing parentheses?"
            }
            DiagnosticCode::FunctionMissingArguments => "Function must be followed by parentheses",
            DiagnosticCode::TypeMismatch => "Value has the wrong type",
            DiagnosticCode::NotBoolean => "Must be a boolean value",
            DiagnosticCode::NotNumber => "Must be a number",
            DiagnosticCode::AlwaysTrue => "This condition will always be true",
            DiagnosticCode::NeverTrue => "This condition will never be true",
            DiagnosticCode::NotDefined => "Variable was never created",
            DiagnosticCode::UsedBeforeCreation => "Variable used before it was created",
            DiagnosticCode::DefinedEarlier => "Variable was defined earlier",
            DiagnosticCode::ShadowsGlobal => "Local variable has the same name as a global variable",
            DiagnosticCode::SceneNotFound => "Scene wasn't found in the scene list",
            DiagnosticCode::LabelNotFound => "Label wasn't found",
            DiagnosticCode::AchievementNotFound => "Achievement wasn't defined",
            DiagnosticCode::DuplicateAchievement => "Achievement was already defined",
            DiagnosticCode::DuplicateAchievementTitle => "Achievement title is already used",
            DiagnosticCode::TooManyAchievements => "No more than 100 achievements are allowed",
            DiagnosticCode::TooManyAchievementPoints => {
                "Total achievement points can't be more than 1000"
            }
            DiagnosticCode::IndentationDrift => "Indentation switches between tabs and spaces",
            DiagnosticCode::ImageNotFound => "Couldn't find the image file",
            DiagnosticCode::StyleEllipsis => "Use an ellipsis (\u{2026}) instead of three periods",
            DiagnosticCode::StyleEmDash => "Use an em-dash (\u{2014}) instead of two hyphens",
            DiagnosticCode::OptionTooLong => "Option is more than 15 words long",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDiagnostic {
    pub code: DiagnosticCode,
    pub span: Span,
    pub message: Option<String>,
}

impl ScriptDiagnostic {
    pub fn new(code: DiagnosticCode, span: Span) -> Self {
        Self {
            code,
            span,
            message: None,
        }
    }

    pub fn with_message(code: DiagnosticCode, span: Span, message: impl Into<String>) -> Self {
        Self {
            code,
            span,
            message: Some(message.into()),
        }
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_else(|| self.code.message())
    }

    pub fn severity(&self) -> DiagnosticSeverity {
        self.code.severity()
    }

    pub fn to_lsp(&self, document: &Document) -> Diagnostic {
        Diagnostic {
            range: document.range_of(self.span),
            severity: Some(self.severity()),
            code: Some(NumberOrString::String(self.code.as_str().to_string())),
            source: Some(SOURCE.to_string()),
            message: self.message().to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::{Position, Url};

    #[test]
    fn message_override_wins_over_catalog_text() {
        let plain = ScriptDiagnostic::new(DiagnosticCode::NotDefined, Span::new(0, 3));
        assert_eq!(plain.message(), "Variable was never created");

        let custom = ScriptDiagnostic::with_message(
            DiagnosticCode::NotDefined,
            Span::new(0, 3),
            "Variable 'foo' was never created",
        );
        assert_eq!(custom.message(), "Variable 'foo' was never created");
    }

    #[test]
    fn converts_to_editor_diagnostic() {
        let document = Document::new(
            Url::parse("file:///game/intro.txt").unwrap(),
            0,
            "Hello\n*goto nowhere\n".to_string(),
        );
        let diagnostic = ScriptDiagnostic::new(DiagnosticCode::LabelNotFound, Span::new(12, 19));
        let converted = diagnostic.to_lsp(&document);

        assert_eq!(converted.range.start, Position { line: 1, character: 6 });
        assert_eq!(converted.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(
            converted.code,
            Some(NumberOrString::String("label-not-found".to_string()))
        );
        assert_eq!(converted.source.as_deref(), Some(SOURCE));
    }
}
