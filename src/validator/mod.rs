//! Whole-document diagnostics.
//!
//! [`validate`] combines a document's parse errors with the checks that need
//! the project index: reference resolution, flow-control targets, achievement
//! limits and the style rules. The image check touches the file system and
//! lives apart in [`check_images`] so callers can bound it with a timeout.

mod achievements;
mod flow;
mod images;
mod references;
mod style;

pub use images::check_images;

use crate::config::ValidationOptions;
use crate::diagnostics::{DiagnosticCode, ScriptDiagnostic};
use crate::index::ProjectIndex;
use crate::language::is_valid_command;
use crate::parser::{parse, ParseEvent, ParseOutput};
use crate::text::Document;

/// Diagnostics for `document`, whose parse is `output`. `document` must
/// already be indexed.
pub fn validate(
    document: &Document,
    output: &ParseOutput,
    index: &ProjectIndex,
    options: ValidationOptions,
) -> Vec<ScriptDiagnostic> {
    let key = document.key();
    let mut diagnostics: Vec<ScriptDiagnostic> = output.errors().cloned().collect();

    diagnostics.extend(misplaced_commands(output));
    diagnostics.extend(references::check(document, index));
    diagnostics.extend(flow::check(key, index));
    diagnostics.extend(achievements::check(key, output, index));
    diagnostics.extend(style::indentation_drift(document.text()));
    if options.style_guide {
        diagnostics.extend(style::check(document.text(), output));
    }

    diagnostics.sort_by_key(|diagnostic| (diagnostic.span.start, diagnostic.span.end));
    log::debug!("{}: {} diagnostics", key, diagnostics.len());
    diagnostics
}

/// Parse and validate in one go.
pub fn generate_diagnostics(
    document: &Document,
    index: &ProjectIndex,
    options: ValidationOptions,
) -> Vec<ScriptDiagnostic> {
    let output = parse(document.text(), index.is_startup(document.key()));
    validate(document, &output, index, options)
}

/// Real commands written mid-line, where they are just text.
fn misplaced_commands(output: &ParseOutput) -> impl Iterator<Item = ScriptDiagnostic> + '_ {
    output.events.iter().filter_map(|event| match event {
        ParseEvent::Command {
            name,
            span,
            line_start: false,
        } if is_valid_command(name) => Some(ScriptDiagnostic::new(
            DiagnosticCode::CommandNotOnOwnLine,
            *span,
        )),
        _ => None,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::index::ProjectIndex;
    use crate::indexer::index_document;
    use crate::text::Document;
    use tower_lsp::lsp_types::Url;

    pub fn document(name: &str, text: &str) -> Document {
        Document::new(
            Url::parse(&format!("file:///game/scenes/{}", name)).unwrap(),
            1,
            text.to_string(),
        )
    }

    /// Index every file, startup first.
    pub fn project(files: &[(&str, &str)]) -> (ProjectIndex, Vec<Document>) {
        let index = ProjectIndex::new();
        let mut documents: Vec<Document> = files
            .iter()
            .map(|(name, text)| document(name, text))
            .collect();
        documents.sort_by_key(|doc| doc.key().file_name() != "startup.txt");
        for doc in &documents {
            index_document(&index, doc, doc.key().file_name() == "startup.txt");
        }
        (index, documents)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::project;
    use super::*;
    use crate::text::Span;
    use pretty_assertions::assert_eq;

    fn codes(files: &[(&str, &str)], target: &str) -> Vec<DiagnosticCode> {
        diagnostics(files, target)
            .into_iter()
            .map(|diagnostic| diagnostic.code)
            .collect()
    }

    fn diagnostics(files: &[(&str, &str)], target: &str) -> Vec<ScriptDiagnostic> {
        let (index, documents) = project(files);
        let document = documents
            .iter()
            .find(|doc| doc.key().file_name() == target)
            .unwrap();
        generate_diagnostics(document, &index, ValidationOptions::default())
    }

    #[test]
    fn startup_scenario_is_clean() {
        let files = [(
            "startup.txt",
            "*create var 3\n*if var > 1\n  *goto done\n*label done",
        )];
        assert_eq!(codes(&files, "startup.txt"), vec![]);
    }

    #[test]
    fn repeated_temp_is_defined_earlier_once() {
        let found = diagnostics(&[("intro.txt", "*temp a\n*temp a")], "intro.txt");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, DiagnosticCode::DefinedEarlier);
        assert_eq!(found[0].span, Span::new(14, 15));
    }

    #[test]
    fn use_before_creation() {
        assert_eq!(codes(&[("intro.txt", "*temp v\n*if v\n")], "intro.txt"), vec![]);
        assert_eq!(
            codes(&[("intro.txt", "*if v\n*temp v\n")], "intro.txt"),
            vec![DiagnosticCode::UsedBeforeCreation]
        );
        assert_eq!(
            codes(&[("intro.txt", "*if v\n*temp v\n*temp v\n")], "intro.txt"),
            vec![DiagnosticCode::DefinedEarlier]
        );
    }

    #[test]
    fn globals_used_in_scenes_are_exempt_from_ordering() {
        let files = [
            ("startup.txt", "*create strength 10\n"),
            ("intro.txt", "*if strength > 5\n  You are strong.\n"),
        ];
        assert_eq!(codes(&files, "intro.txt"), vec![]);
        assert_eq!(
            codes(&[("startup.txt", "*if strength > 5\n  Hi\n*create strength 10\n")], "startup.txt"),
            vec![DiagnosticCode::UsedBeforeCreation]
        );
    }

    #[test]
    fn undefined_variables() {
        let found = diagnostics(&[("intro.txt", "Hello ${namee}.\n")], "intro.txt");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, DiagnosticCode::NotDefined);
        assert_eq!(found[0].message(), "Variable 'namee' was never created");
    }

    #[test]
    fn variables_ignore_case_labels_do_not() {
        let files = [(
            "intro.txt",
            "*temp Foo 1\n*if foo = 1\n  *goto foo\n*label Foo\n",
        )];
        assert_eq!(codes(&files, "intro.txt"), vec![DiagnosticCode::LabelNotFound]);
    }

    #[test]
    fn builtins_resolve() {
        let files = [("intro.txt", "*if choice_is_web\n  Web!\n")];
        assert_eq!(codes(&files, "intro.txt"), vec![]);
    }

    #[test]
    fn non_boolean_condition() {
        assert_eq!(
            codes(&[("intro.txt", "*if 3 + 2\n  x\n")], "intro.txt"),
            vec![DiagnosticCode::NotBoolean]
        );
        assert_eq!(codes(&[("intro.txt", "*if 3 > 2\n  x\n")], "intro.txt"), vec![]);
    }

    #[test]
    fn scene_and_label_resolution() {
        let startup = ("startup.txt", "*scene_list\n  startup\n  known\n");
        let known = ("known.txt", "*label here\nHi.\n");

        assert_eq!(
            codes(&[startup, known, ("intro.txt", "*goto_scene unknown_scene\n")], "intro.txt"),
            vec![DiagnosticCode::SceneNotFound]
        );
        assert_eq!(
            codes(&[startup, known, ("intro.txt", "*goto_scene unknown_scene gone\n")], "intro.txt"),
            vec![DiagnosticCode::SceneNotFound]
        );
        assert_eq!(
            codes(&[startup, known, ("intro.txt", "*goto_scene known missing\n")], "intro.txt"),
            vec![DiagnosticCode::LabelNotFound]
        );
        assert_eq!(
            codes(&[startup, known, ("intro.txt", "*gosub_scene known here\n")], "intro.txt"),
            vec![]
        );
        assert_eq!(
            codes(&[startup, known, ("intro.txt", "*temp where \"here\"\n*goto_scene known {where}\n")], "intro.txt"),
            vec![]
        );
    }

    #[test]
    fn mid_line_commands() {
        let found = codes(&[("intro.txt", "Then *goto end happens. 5 *stars\n")], "intro.txt");
        assert_eq!(found, vec![DiagnosticCode::CommandNotOnOwnLine]);
    }

    #[test]
    fn achievement_variables_need_check_achievements() {
        let startup = ("startup.txt", "*achievement hero visible 10 Hero\n  Be a hero.\n");
        assert_eq!(
            codes(
                &[startup, ("intro.txt", "*check_achievements\n*if choice_achieved_hero\n  Yay\n")],
                "intro.txt"
            ),
            vec![]
        );
        assert_eq!(
            codes(&[startup, ("intro.txt", "*if choice_achieved_hero\n  Yay\n")], "intro.txt"),
            vec![DiagnosticCode::NotDefined]
        );
        assert_eq!(
            codes(
                &[startup, ("intro.txt", "*check_achievements\n*if choice_achieved_villain\n  Boo\n")],
                "intro.txt"
            ),
            vec![DiagnosticCode::NotDefined]
        );
    }

    #[test]
    fn parameters_only_inside_params_scope() {
        let text = "*gosub greet \"Bob\"\n*finish\n*label greet\n*params who\nHi ${who}, ${param_1}.\n*return\n*label after\n${param_1}\n";
        let found = diagnostics(&[("intro.txt", text)], "intro.txt");
        let codes: Vec<DiagnosticCode> = found.iter().map(|diagnostic| diagnostic.code).collect();
        assert_eq!(codes, vec![DiagnosticCode::NotDefined]);
        assert_eq!(found[0].span.start, text.rfind("param_1").unwrap());
    }

    #[test]
    fn shadowing_a_global() {
        let files = [
            ("startup.txt", "*create gold 0\n"),
            ("intro.txt", "*temp gold 5\n"),
        ];
        assert_eq!(codes(&files, "intro.txt"), vec![DiagnosticCode::ShadowsGlobal]);
    }

    #[test]
    fn duplicate_global_creation() {
        assert_eq!(
            codes(&[("startup.txt", "*create gold 0\n*create gold 1\n")], "startup.txt"),
            vec![DiagnosticCode::DefinedEarlier]
        );
    }

    #[test]
    fn style_rules_follow_options() {
        let files = [("intro.txt", "Wait... what--no.\n")];
        assert_eq!(
            codes(&files, "intro.txt"),
            vec![DiagnosticCode::StyleEllipsis, DiagnosticCode::StyleEmDash]
        );

        let (index, documents) = project(&files);
        let quiet = generate_diagnostics(
            &documents[0],
            &index,
            ValidationOptions { style_guide: false },
        );
        assert!(quiet.is_empty());
    }

    #[test]
    fn undefined_achieve() {
        let startup = ("startup.txt", "*achievement hero visible 10 Hero\n  Be a hero.\n");
        assert_eq!(codes(&[startup, ("intro.txt", "*achieve hero\n")], "intro.txt"), vec![]);
        assert_eq!(
            codes(&[startup, ("intro.txt", "*achieve villain\n")], "intro.txt"),
            vec![DiagnosticCode::AchievementNotFound]
        );
    }
}
