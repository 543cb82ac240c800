use super::blocks::{indent_at, read_block, Block};
use super::interpolation::scan_interpolations;
use super::{
    AchievementDefinition, FlowControl, ParseEvent, Parser, ScopeKind, Target, VariableScope,
};
use crate::diagnostics::DiagnosticCode;
use crate::expression::{find_closing, find_string_end, Expression, TokenKind};
use crate::language::{
    command_category, is_identifier, is_valid_command, CommandCategory, EvalType, Function,
    ARGUMENT_DISALLOWED_COMMANDS, ARGUMENT_IGNORED_COMMANDS, ARGUMENT_REQUIRED_COMMANDS,
    MAX_POINTS_PER_ACHIEVEMENT, REUSE_COMMANDS, STARTUP_COMMANDS,
};
use crate::text::{line_end, next_line_start, Span};

impl<'a> Parser<'a> {
    /// Handle the command whose `*name` covers `name_span`. Returns the offset
    /// where the main scan resumes.
    pub(super) fn command(&mut self, name_span: Span) -> usize {
        let text = self.text;
        let name = &text[name_span.start + 1..name_span.end];
        let line_end = line_end(text, name_span.end);
        let args = trim_span(text, Span::new(name_span.end, line_end));

        self.events.push(ParseEvent::Command {
            name: name.to_string(),
            span: name_span,
            line_start: true,
        });

        if !is_valid_command(name) {
            self.error_with(
                DiagnosticCode::UnknownCommand,
                name_span,
                format!("Unknown command *{}", name),
            );
            return line_end;
        }
        if !self.check_arguments(name, name_span, args) {
            return line_end;
        }
        if STARTUP_COMMANDS.contains(&name) && !self.is_startup {
            self.error_with(
                DiagnosticCode::StartupOnlyCommand,
                name_span,
                format!("*{} can only be used in the startup file", name),
            );
        }

        match command_category(name) {
            CommandCategory::SymbolCreating => self.symbol_creating(name, name_span, args, line_end),
            CommandCategory::SymbolReferencing => self.symbol_referencing(name, args, line_end),
            CommandCategory::Condition => self.condition(name, name_span, args, line_end),
            CommandCategory::FlowControl => self.flow_control(name, name_span, args, line_end),
            CommandCategory::Block => self.block(name, name_span, line_end),
            CommandCategory::Achievement => self.achievement(name, args, line_end),
            CommandCategory::Image => {
                if let Some(&file) = split_arguments(text, args).first() {
                    self.events.push(ParseEvent::ImageReference {
                        filename: text[file.start..file.end].to_string(),
                        span: file,
                    });
                }
                line_end
            }
            CommandCategory::CheckAchievements => {
                self.events.push(ParseEvent::Scope {
                    kind: ScopeKind::Achievement,
                    span: Span::new(name_span.start, text.len()),
                });
                line_end
            }
            CommandCategory::Comment => line_end,
            // The rest of the line may be option text.
            CommandCategory::Reuse => name_span.end,
            // Arguments are still scanned for interpolations, but aren't prose.
            CommandCategory::Other => {
                self.quiet_until = line_end;
                name_span.end
            }
        }
    }

    /// Returns false when the command can't be handled any further.
    fn check_arguments(&mut self, name: &str, name_span: Span, args: Span) -> bool {
        if args.is_empty() {
            if ARGUMENT_REQUIRED_COMMANDS.contains(&name) {
                self.error_with(
                    DiagnosticCode::ArgumentRequired,
                    name_span,
                    format!("*{} requires an argument", name),
                );
                return false;
            }
        } else if ARGUMENT_DISALLOWED_COMMANDS.contains(&name) {
            self.error_with(
                DiagnosticCode::ArgumentDisallowed,
                args,
                format!("*{} doesn't take any arguments", name),
            );
        } else if ARGUMENT_IGNORED_COMMANDS.contains(&name) {
            self.error(DiagnosticCode::ArgumentIgnored, args);
        }
        true
    }

    fn symbol_creating(&mut self, name: &str, name_span: Span, args: Span, line_end: usize) -> usize {
        let text = self.text;
        let words = split_arguments(text, args);
        match name {
            "create" | "temp" => {
                let Some(&variable) = words.first() else {
                    return line_end;
                };
                let variable_name = &text[variable.start..variable.end];
                if !is_identifier(variable_name) {
                    self.error(DiagnosticCode::InvalidVariableName, variable);
                    return line_end;
                }
                let scope = if name == "create" {
                    VariableScope::Global
                } else {
                    VariableScope::Local
                };
                self.events.push(ParseEvent::VariableCreate {
                    name: variable_name.to_string(),
                    span: variable,
                    scope,
                });

                let value = trim_span(text, Span::new(variable.end, args.end));
                if !value.is_empty() {
                    self.expression(value);
                } else if name == "create" {
                    self.error_with(
                        DiagnosticCode::MissingValue,
                        variable,
                        "*create needs an initial value",
                    );
                }
            }
            "label" => {
                if let Some(&label) = words.first() {
                    self.events.push(ParseEvent::LabelCreate {
                        name: text[label.start..label.end].to_string(),
                        span: label,
                    });
                }
            }
            "params" => {
                for word in words {
                    let param = &text[word.start..word.end];
                    if is_identifier(param) {
                        self.events.push(ParseEvent::SubroutineLocalCreate {
                            name: param.to_string(),
                            span: word,
                        });
                    } else {
                        self.error(DiagnosticCode::InvalidVariableName, word);
                    }
                }
                self.events.push(ParseEvent::Scope {
                    kind: ScopeKind::Params,
                    span: Span::new(name_span.start, next_label_line(text, line_end)),
                });
            }
            other => unhandled(other),
        }
        line_end
    }

    fn symbol_referencing(&mut self, name: &str, args: Span, line_end: usize) -> usize {
        let text = self.text;
        match name {
            "set" => {
                let target = Span::new(args.start, set_target_end(text, args));
                if !self.variable_target(target) {
                    return line_end;
                }
                let value = trim_span(text, Span::new(target.end, args.end));
                if value.is_empty() {
                    self.error_with(DiagnosticCode::MissingValue, target, "*set needs a value");
                } else {
                    self.implied_expression(value);
                }
            }
            "delete" | "input_text" => {
                if let Some(&target) = split_arguments(text, args).first() {
                    self.variable_target(target);
                }
            }
            "rand" | "input_number" => {
                let words = split_arguments(text, args);
                if !self.variable_target(words[0]) {
                    return line_end;
                }
                if words.len() < 3 {
                    self.error_with(
                        DiagnosticCode::MissingValue,
                        args,
                        format!("*{} needs a variable, a minimum and a maximum", name),
                    );
                    return line_end;
                }
                for &bound in &words[1..3] {
                    let expression = self.expression(bound);
                    if expression.errors.is_empty()
                        && matches!(expression.eval_type, EvalType::String | EvalType::Boolean)
                    {
                        self.error(DiagnosticCode::NotNumber, bound);
                    }
                }
            }
            other => unhandled(other),
        }
        line_end
    }

    /// A variable name, array element or `{reference}` being written to.
    fn variable_target(&mut self, span: Span) -> bool {
        let target = &self.text[span.start..span.end];
        if target.starts_with('{') {
            self.expression(span);
            return true;
        }
        let base_len = target.find('[').unwrap_or(target.len());
        if !is_identifier(&target[..base_len]) {
            self.error(DiagnosticCode::NotAVariable, span);
            return false;
        }
        if base_len == target.len() {
            self.reference(target, span);
        } else {
            self.expression(span);
        }
        true
    }

    fn condition(&mut self, name: &str, name_span: Span, args: Span, line_end: usize) -> usize {
        let text = self.text;
        let marker = option_marker(&text[args.start..args.end]).map(|idx| args.start + idx);
        let condition = match marker {
            Some(hash) => trim_span(text, Span::new(args.start, hash)),
            None => args,
        };

        if name == "selectable_if" && marker.is_none() {
            self.error(DiagnosticCode::SelectableIfWithoutOption, name_span);
        }

        let expression = self.expression(condition);
        if expression.errors.is_empty() {
            self.check_condition(&expression, marker.is_some());
        }
        marker.unwrap_or(line_end)
    }

    fn check_condition(&mut self, expression: &Expression, before_option: bool) {
        let leading_not = matches!(
            expression.combined.first().map(|token| token.kind),
            Some(TokenKind::FunctionCall(Function::Not))
        );
        if before_option && leading_not && !expression.is_parenthesized() {
            self.error_with(
                DiagnosticCode::AlwaysTrue,
                expression.span,
                "Without parentheses around it this condition is always true",
            );
            return;
        }

        match expression.constant_truth() {
            Some(true) => self.error(DiagnosticCode::AlwaysTrue, expression.span),
            Some(false) => self.error(DiagnosticCode::NeverTrue, expression.span),
            None => {
                if matches!(expression.eval_type, EvalType::Number | EvalType::String) {
                    self.error_with(
                        DiagnosticCode::NotBoolean,
                        expression.span,
                        format!(
                            "Must be a boolean value, not {}",
                            expression.eval_type.label()
                        ),
                    );
                }
            }
        }
    }

    fn flow_control(&mut self, name: &str, name_span: Span, args: Span, line_end: usize) -> usize {
        let mut words = split_arguments(self.text, args).into_iter();
        let (scene, label) = match name {
            "goto" | "gosub" => (None, words.next().map(|word| self.target(word))),
            "goto_scene" | "gosub_scene" => {
                let scene = words.next().map(|word| self.target(word));
                let label = words.next().map(|word| self.target(word));
                (scene, label)
            }
            "return" => (None, None),
            other => {
                unhandled(other);
                (None, None)
            }
        };

        if name.starts_with("gosub") {
            for parameter in words {
                self.expression(parameter);
            }
        }

        self.events.push(ParseEvent::FlowControl(FlowControl {
            command: name.to_string(),
            command_span: name_span,
            scene,
            label,
        }));
        line_end
    }

    fn target(&mut self, span: Span) -> Target {
        let name = &self.text[span.start..span.end];
        let dynamic = name.starts_with('{');
        if dynamic {
            self.expression(span);
        }
        Target {
            name: name.to_string(),
            span,
            dynamic,
        }
    }

    fn block(&mut self, name: &str, name_span: Span, line_end: usize) -> usize {
        let text = self.text;
        let (block, error) = read_block(text, line_end, indent_at(text, name_span.start));
        let mixed = error.is_some();
        if let Some(error) = error {
            self.events.push(ParseEvent::ParseError(error));
        }

        match name {
            "choice" | "fake_choice" => {
                if block.lines.is_empty() && !mixed {
                    self.error(DiagnosticCode::EmptyChoice, name_span);
                }
                self.events.push(ParseEvent::Scope {
                    kind: ScopeKind::Choice,
                    span: Span::new(name_span.start, block.end),
                });
                self.choice_options(&block);
                // Options are ordinary document text; keep scanning them.
                line_end
            }
            "scene_list" => {
                let scenes = block
                    .lines
                    .iter()
                    .filter_map(|line| {
                        let content = line.content(text).trim_end();
                        let name = content.trim_start_matches('$').trim_start();
                        if name.is_empty() {
                            return None;
                        }
                        let start = line.content_start() + (content.len() - name.len());
                        Some(Target {
                            name: name.to_string(),
                            span: Span::new(start, start + name.len()),
                            dynamic: false,
                        })
                    })
                    .collect();
                self.events.push(ParseEvent::SceneList { scenes });
                block.end.max(line_end)
            }
            "stat_chart" => {
                self.quiet_until = self.quiet_until.max(block.end);
                let mut lines = block.lines.iter().peekable();
                while let Some(line) = lines.next() {
                    if line.indent != block.indent {
                        // Labels of an opposed pair.
                        self.chart_label(trim_span(text, line.span));
                        continue;
                    }
                    let words = split_arguments(text, line.span);
                    let Some(&sub_command) = words.first() else {
                        continue;
                    };
                    match &text[sub_command.start..sub_command.end] {
                        "text" | "percent" | "opposed_pair" => {
                            if let Some(&variable) = words.get(1) {
                                self.variable_target(variable);
                                self.chart_label(trim_span(
                                    text,
                                    Span::new(variable.end, line.span.end),
                                ));
                            } else {
                                self.error_with(
                                    DiagnosticCode::MissingValue,
                                    sub_command,
                                    "Missing the variable to chart",
                                );
                            }
                            let paired = lines
                                .peek()
                                .map(|next| next.indent > line.indent)
                                .unwrap_or(false);
                            if &text[sub_command.start..sub_command.end] == "opposed_pair" && !paired {
                                self.error(DiagnosticCode::IncompleteStatChartCommand, sub_command);
                            }
                        }
                        _ => self.error(DiagnosticCode::InvalidStatChartCommand, sub_command),
                    }
                }
                block.end.max(line_end)
            }
            other => {
                unhandled(other);
                line_end
            }
        }
    }

    /// Emit an option for every `#` line of a choice, including options
    /// nested under a bare `*if`/`*elseif`/`*else`.
    fn choice_options(&mut self, block: &Block) {
        let text = self.text;
        let mut levels = vec![block.indent];
        let mut opener: Option<usize> = None;

        for line in &block.lines {
            while levels.len() > 1 && levels.last().is_some_and(|&level| level > line.indent) {
                levels.pop();
            }
            if let Some(parent) = opener.take() {
                if line.indent > parent {
                    levels.push(line.indent);
                }
            }
            if levels.last() != Some(&line.indent) {
                continue;
            }

            let content = line.content(text);
            if let Some(hash) = option_start(content) {
                self.events.push(ParseEvent::ChoiceOption {
                    span: Span::new(line.content_start() + hash + 1, line.span.end),
                });
            } else if opens_nested_options(content) {
                opener = Some(line.indent);
            }
        }
    }

    fn chart_label(&mut self, label: Span) {
        if label.is_empty() {
            return;
        }
        let found = scan_interpolations(&self.text[label.start..label.end], label.start, false);
        self.absorb(found);
    }

    fn achievement(&mut self, name: &str, args: Span, line_end: usize) -> usize {
        let text = self.text;
        let words = split_arguments(text, args);
        let codename = words[0];
        let codename_text = text[codename.start..codename.end].to_string();

        if name == "achieve" {
            self.events.push(ParseEvent::AchievementReference {
                codename: codename_text,
                span: codename,
            });
            return line_end;
        }

        let visibility = words.get(1).map(|word| &text[word.start..word.end]);
        let points = words
            .get(2)
            .and_then(|word| text[word.start..word.end].parse::<u32>().ok());
        let title = words
            .get(2)
            .map(|word| trim_span(text, Span::new(word.end, args.end)))
            .filter(|span| !span.is_empty())
            .map(|span| text[span.start..span.end].to_string());

        let problem = if !matches!(visibility, Some("visible") | Some("hidden")) {
            Some("Achievement visibility must be visible or hidden")
        } else if !points
            .map(|points| (1..=MAX_POINTS_PER_ACHIEVEMENT).contains(&points))
            .unwrap_or(false)
        {
            Some("Achievement points must be a number from 1 to 100")
        } else if title.is_none() {
            Some("Achievement is missing its title")
        } else {
            None
        };
        if let Some(message) = problem {
            self.error_with(DiagnosticCode::InvalidAchievement, args, message);
        }

        self.events
            .push(ParseEvent::AchievementCreate(AchievementDefinition {
                codename: codename_text,
                span: codename,
                points,
                title,
            }));
        line_end
    }
}

fn unhandled(name: &str) {
    debug_assert!(false, "*{} reached a handler that doesn't know it", name);
    log::error!("command tables out of sync for *{}", name);
}

/// `span` without surrounding whitespace.
pub(super) fn trim_span(text: &str, span: Span) -> Span {
    let slice = &text[span.start..span.end];
    let start = span.start + (slice.len() - slice.trim_start().len());
    let end = span.end - (slice.len() - slice.trim_end().len());
    Span::new(start, end.max(start))
}

/// Whitespace-separated arguments, keeping strings and bracketed groups whole.
pub(super) fn split_arguments(text: &str, span: Span) -> Vec<Span> {
    let mut words = Vec::new();
    let mut idx = span.start;

    while idx < span.end {
        let Some(ch) = text[idx..span.end].chars().next() else {
            break;
        };
        if ch.is_whitespace() {
            idx += ch.len_utf8();
            continue;
        }

        let start = idx;
        while idx < span.end {
            let Some(ch) = text[idx..span.end].chars().next() else {
                break;
            };
            if ch.is_whitespace() {
                break;
            }
            idx = match ch {
                '"' => find_string_end(&text[..span.end], idx + 1)
                    .map(|close| close + 1)
                    .unwrap_or(span.end),
                '(' => group_end(text, idx, span.end, '(', ')'),
                '{' => group_end(text, idx, span.end, '{', '}'),
                '[' => group_end(text, idx, span.end, '[', ']'),
                _ => idx + ch.len_utf8(),
            };
        }
        words.push(Span::new(start, idx));
    }

    words
}

fn group_end(text: &str, open_at: usize, limit: usize, open: char, close: char) -> usize {
    find_closing(&text[..limit], open_at + 1, open, close, true)
        .map(|close| close + 1)
        .unwrap_or(limit)
}

/// End of the variable written by `*set`: a name with optional `[...]`
/// indices, or a `{reference}`.
fn set_target_end(text: &str, args: Span) -> usize {
    let rest = &text[args.start..args.end];
    if rest.starts_with('{') {
        return group_end(text, args.start, args.end, '{', '}');
    }
    let mut end = args.start
        + rest
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
            .unwrap_or(rest.len());
    while text[end..args.end].starts_with('[') {
        end = group_end(text, end, args.end, '[', ']');
    }
    if end == args.start {
        // Not a name at all; take the whole first word for the diagnostic.
        end = args.start + rest.find(char::is_whitespace).unwrap_or(rest.len());
    }
    end
}

/// Index of the `#` that starts an option after a condition: a top-level `#`
/// preceded by whitespace. `name#2` is the character-at operator instead.
pub(super) fn option_marker(condition: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut idx = 0;
    let mut previous = ' ';
    while idx < condition.len() {
        let ch = condition[idx..].chars().next()?;
        match ch {
            '"' => {
                idx = find_string_end(condition, idx + 1)? + 1;
                previous = '"';
                continue;
            }
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth = depth.saturating_sub(1),
            '#' if depth == 0 && previous.is_whitespace() => return Some(idx),
            _ => {}
        }
        previous = ch;
        idx += ch.len_utf8();
    }
    None
}

/// Where the `#` of an option line is, past any reuse and condition commands.
fn option_start(content: &str) -> Option<usize> {
    let mut offset = 0;
    loop {
        let rest = &content[offset..];
        let trimmed = rest.trim_start();
        offset += rest.len() - trimmed.len();
        if trimmed.starts_with('#') {
            return Some(offset);
        }
        let command = trimmed.strip_prefix('*')?;
        let len = command
            .find(char::is_whitespace)
            .unwrap_or(command.len());
        match &command[..len] {
            "if" | "selectable_if" => {
                let after = offset + 1 + len;
                return option_marker(&content[after..]).map(|idx| after + idx);
            }
            name if REUSE_COMMANDS.contains(&name) => offset += 1 + len,
            _ => return None,
        }
    }
}

/// A conditional line with no option of its own, whose deeper lines are
/// options.
fn opens_nested_options(content: &str) -> bool {
    let mut rest = content.trim_start();
    loop {
        let Some(command) = rest.strip_prefix('*') else {
            return false;
        };
        let len = command
            .find(char::is_whitespace)
            .unwrap_or(command.len());
        match &command[..len] {
            "if" | "elseif" | "elsif" | "else" | "selectable_if" => return true,
            name if REUSE_COMMANDS.contains(&name) => rest = command[len..].trim_start(),
            _ => return false,
        }
    }
}

/// Start of the next `*label` line after `from`, or the end of the text.
fn next_label_line(text: &str, from: usize) -> usize {
    let mut pos = next_line_start(text, from);
    while pos < text.len() {
        let line = text[pos..line_end(text, pos)].trim_start();
        if let Some(rest) = line.strip_prefix("*label") {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return pos;
            }
        }
        pos = next_line_start(text, pos);
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use super::super::{parse, ParseEvent, ScopeKind};
    use super::*;
    use pretty_assertions::assert_eq;

    fn codes(text: &str, startup: bool) -> Vec<DiagnosticCode> {
        parse(text, startup).errors().map(|error| error.code).collect()
    }

    fn slices<'t>(text: &'t str, spans: &[Span]) -> Vec<&'t str> {
        spans.iter().map(|span| &text[span.start..span.end]).collect()
    }

    #[test]
    fn splits_arguments_around_groups() {
        let text = "label \"two words\" (a + b) {ref} x[1]";
        let words = split_arguments(text, Span::new(0, text.len()));
        assert_eq!(
            slices(text, &words),
            vec!["label", "\"two words\"", "(a + b)", "{ref}", "x[1]"]
        );
    }

    #[test]
    fn finds_option_markers() {
        assert_eq!(option_marker("(x) #Go"), Some(4));
        assert_eq!(option_marker("name#1 = \"a\""), None);
        assert_eq!(option_marker("(\"#\" = s) #Go"), Some(10));
        assert_eq!(option_start("*hide_reuse *if (x) #Go"), Some(20));
        assert_eq!(option_start("  #Plain"), Some(2));
        assert_eq!(option_start("*goto x"), None);
    }

    #[test]
    fn set_accepts_references_and_indices() {
        let output = parse("*set {which} 3\n*set stats[i] +1\n*set 5 4\n", false);
        let refs: Vec<String> = output
            .events
            .iter()
            .filter_map(|event| match event {
                ParseEvent::VariableReference { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(refs, vec!["which".to_string(), "i".to_string()]);
        let errors: Vec<DiagnosticCode> = output.errors().map(|error| error.code).collect();
        assert_eq!(errors, vec![DiagnosticCode::NotAVariable]);
    }

    #[test]
    fn set_needs_a_value() {
        assert_eq!(codes("*set x\n", false), vec![DiagnosticCode::MissingValue]);
    }

    #[test]
    fn create_rules() {
        assert_eq!(codes("*create x\n", true), vec![DiagnosticCode::MissingValue]);
        assert_eq!(
            codes("*create 9lives 9\n", true),
            vec![DiagnosticCode::InvalidVariableName]
        );
        assert_eq!(codes("*temp x\n", false), vec![]);
    }

    #[test]
    fn rand_bounds_must_be_numbers() {
        assert_eq!(codes("*rand roll 1 6\n", false), vec![]);
        assert_eq!(
            codes("*rand roll \"a\" 6\n", false),
            vec![DiagnosticCode::NotNumber]
        );
        assert_eq!(codes("*rand roll 1\n", false), vec![DiagnosticCode::MissingValue]);
    }

    #[test]
    fn flow_control_targets() {
        let text = "*goto_scene chapter2 {next} \"x\"\n*gosub_scene lib helper 1 (a)\n";
        let output = parse(text, false);
        let flows: Vec<(Option<(String, bool)>, Option<(String, bool)>)> = output
            .events
            .iter()
            .filter_map(|event| match event {
                ParseEvent::FlowControl(flow) => Some((
                    flow.scene.as_ref().map(|t| (t.name.clone(), t.dynamic)),
                    flow.label.as_ref().map(|t| (t.name.clone(), t.dynamic)),
                )),
                _ => None,
            })
            .collect();
        assert_eq!(
            flows,
            vec![
                (
                    Some(("chapter2".to_string(), false)),
                    Some(("{next}".to_string(), true))
                ),
                (
                    Some(("lib".to_string(), false)),
                    Some(("helper".to_string(), false))
                ),
            ]
        );
        let refs: Vec<String> = output
            .events
            .iter()
            .filter_map(|event| match event {
                ParseEvent::VariableReference { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(refs, vec!["next".to_string(), "a".to_string()]);
    }

    #[test]
    fn params_scope_runs_to_next_label() {
        let text = "*label helper\n*params who what\n${param_1}\n*return\n*label other\n";
        let output = parse(text, false);
        let scopes: Vec<Span> = output.scopes(ScopeKind::Params).collect();
        assert_eq!(scopes, vec![Span::new(14, text.find("*label other").unwrap())]);
        let params = output
            .events
            .iter()
            .filter(|event| matches!(event, ParseEvent::SubroutineLocalCreate { .. }))
            .count();
        assert_eq!(params, 2);
    }

    #[test]
    fn check_achievements_scope_runs_to_end() {
        let text = "Intro\n*check_achievements\n${choice_achieved_hero}";
        let scopes: Vec<Span> = parse(text, false).scopes(ScopeKind::Achievement).collect();
        assert_eq!(scopes, vec![Span::new(6, text.len())]);
    }

    #[test]
    fn scene_list_names_scenes() {
        let text = "*scene_list\n  startup\n  $ bonus\n  chapter1\n\nText";
        let output = parse(text, true);
        let scenes: Vec<String> = output
            .events
            .iter()
            .find_map(|event| match event {
                ParseEvent::SceneList { scenes } => {
                    Some(scenes.iter().map(|scene| scene.name.clone()).collect())
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(scenes, vec!["startup", "bonus", "chapter1"]);
    }

    #[test]
    fn stat_chart_sub_commands() {
        let good = "*stat_chart\n  text name\n  percent strength Strength\n  opposed_pair brave\n    Cowardly\n";
        assert_eq!(codes(good, false), vec![]);
        assert_eq!(
            codes("*stat_chart\n  bar strength\n", false),
            vec![DiagnosticCode::InvalidStatChartCommand]
        );
        assert_eq!(
            codes("*stat_chart\n  opposed_pair brave\n", false),
            vec![DiagnosticCode::IncompleteStatChartCommand]
        );
    }

    #[test]
    fn options_nested_under_conditionals() {
        let text = "*choice\n  #Leave\n    Bye.\n  *if (brave)\n    #Fight\n      Ow.\n    *if (armed)\n      #Stab\n        Ow.\n  *else\n    #Hide\n      You hide.\n  #Wait\n    Fine.\n";
        let output = parse(text, false);
        let options: Vec<&str> = output
            .events
            .iter()
            .filter_map(|event| match event {
                ParseEvent::ChoiceOption { span } => Some(&text[span.start..span.end]),
                _ => None,
            })
            .collect();
        assert_eq!(options, vec!["Leave", "Fight", "Stab", "Hide", "Wait"]);
    }

    #[test]
    fn stat_chart_labels_are_scanned() {
        let text = "*stat_chart\n  percent strength ${hero}'s strength...\n  opposed_pair brave\n    @{brave Bold|Brave}\n    Cowardly\n";
        let output = parse(text, false);
        let refs: Vec<String> = output
            .events
            .iter()
            .filter_map(|event| match event {
                ParseEvent::VariableReference { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(refs, vec!["strength", "hero", "brave", "brave"]);
        assert!(!output
            .events
            .iter()
            .any(|event| matches!(event, ParseEvent::Prose { .. })));
    }

    #[test]
    fn command_arguments_are_not_prose() {
        let text = "*sound rain--loop.mp3\n*page_break Next...\n*hide_reuse #Go on...\nJust text.\n";
        let output = parse(text, false);
        let prose: Vec<&str> = output
            .events
            .iter()
            .filter_map(|event| match event {
                ParseEvent::Prose { span } => Some(&text[span.start..span.end]),
                _ => None,
            })
            .collect();
        assert_eq!(prose, vec![" #Go on...\nJust text.\n"]);
    }

    #[test]
    fn empty_and_mixed_choices() {
        assert_eq!(codes("*choice\nText\n", false), vec![DiagnosticCode::EmptyChoice]);
        assert_eq!(
            codes("*choice\n \t#One\n", false),
            vec![DiagnosticCode::MixedIndentation]
        );
    }

    #[test]
    fn achievement_definitions() {
        let output = parse("*achievement hero visible 20 Saved the day\n", true);
        assert_eq!(output.errors().count(), 0);
        assert!(output.events.contains(&ParseEvent::AchievementCreate(
            AchievementDefinition {
                codename: "hero".to_string(),
                span: Span::new(13, 17),
                points: Some(20),
                title: Some("Saved the day".to_string()),
            }
        )));

        assert_eq!(
            codes("*achievement hero shown 20 Title\n", true),
            vec![DiagnosticCode::InvalidAchievement]
        );
        assert_eq!(
            codes("*achievement hero hidden 500 Title\n", true),
            vec![DiagnosticCode::InvalidAchievement]
        );
        assert_eq!(
            codes("*achievement hero hidden 5\n", true),
            vec![DiagnosticCode::InvalidAchievement]
        );
    }

    #[test]
    fn image_references() {
        let output = parse("*image cover.png center A cover\n*text_image logo.jpg\n", false);
        let files: Vec<String> = output
            .events
            .iter()
            .filter_map(|event| match event {
                ParseEvent::ImageReference { filename, .. } => Some(filename.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(files, vec!["cover.png", "logo.jpg"]);
    }
}
