//! Folds a document's parse events into the [`ProjectIndex`].
//!
//! The startup document must be indexed before any other document for global
//! variable lookups in those documents to be correct. The caller owns that
//! ordering; [`index_document`] only records which document is the startup.

use crate::index::{Achievement, DocumentScope, NameTable, ProjectIndex};
use crate::parser::{parse, FlowControl, ParseEvent, ParseOutput, VariableScope};
use crate::text::{Document, DocumentKey, Location};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct DocumentTables {
    globals: NameTable,
    locals: NameTable,
    subroutine_locals: NameTable,
    references: NameTable,
    labels: HashMap<String, Location>,
    label_references: HashMap<String, Vec<Location>>,
    flow_control: Vec<FlowControl>,
    scopes: Vec<DocumentScope>,
    scenes: Vec<String>,
    achievements: Vec<Achievement>,
}

impl DocumentTables {
    fn collect(key: &DocumentKey, output: &ParseOutput, is_startup: bool) -> Self {
        let mut tables = Self::default();
        let at = |span| Location::new(key.clone(), span);

        for event in &output.events {
            match event {
                ParseEvent::VariableCreate { name, span, scope } => {
                    let table = if is_startup && *scope == VariableScope::Global {
                        &mut tables.globals
                    } else {
                        &mut tables.locals
                    };
                    table
                        .entry(name.to_ascii_lowercase())
                        .or_default()
                        .push(at(*span));
                }
                ParseEvent::SubroutineLocalCreate { name, span } => {
                    tables
                        .subroutine_locals
                        .entry(name.to_ascii_lowercase())
                        .or_default()
                        .push(at(*span));
                }
                ParseEvent::LabelCreate { name, span } => {
                    tables.labels.entry(name.clone()).or_insert_with(|| at(*span));
                }
                ParseEvent::VariableReference { name, span } => {
                    tables
                        .references
                        .entry(name.to_ascii_lowercase())
                        .or_default()
                        .push(at(*span));
                }
                ParseEvent::FlowControl(flow) => {
                    if let Some(label) = flow.label.as_ref().filter(|label| !label.dynamic) {
                        tables
                            .label_references
                            .entry(label.name.clone())
                            .or_default()
                            .push(at(label.span));
                    }
                    tables.flow_control.push(flow.clone());
                }
                ParseEvent::Scope { kind, span } => {
                    tables.scopes.push(DocumentScope {
                        kind: *kind,
                        span: *span,
                    });
                }
                ParseEvent::SceneList { scenes } if is_startup => {
                    tables
                        .scenes
                        .extend(scenes.iter().map(|scene| scene.name.clone()));
                }
                ParseEvent::AchievementCreate(definition) if is_startup => {
                    tables.achievements.push(Achievement {
                        codename: definition.codename.clone(),
                        location: at(definition.span),
                        points: definition.points,
                        title: definition.title.clone(),
                    });
                }
                _ => {}
            }
        }

        tables
    }
}

/// Parse `document` and replace its tables in `index`. Returns the parse so
/// callers can validate without parsing twice.
pub fn index_document(index: &ProjectIndex, document: &Document, is_startup: bool) -> ParseOutput {
    let key = document.key().clone();
    let output = parse(document.text(), is_startup);
    let tables = DocumentTables::collect(&key, &output, is_startup);

    log::debug!(
        "indexed {}: {} locals, {} references, {} labels",
        key,
        tables.locals.len(),
        tables.references.len(),
        tables.labels.len()
    );

    index.register_document(key.clone(), document.uri().clone());
    if is_startup {
        index.set_startup(key.clone());
        index.update_global_variables(tables.globals);
        index.update_scene_list(tables.scenes);
        index.update_achievements(tables.achievements);
    }
    index.update_local_variables(key.clone(), tables.locals);
    index.update_subroutine_local_variables(key.clone(), tables.subroutine_locals);
    index.update_variable_references(key.clone(), tables.references);
    index.update_labels(key.clone(), tables.labels);
    index.update_label_references(key.clone(), tables.label_references);
    index.update_flow_control_events(key.clone(), tables.flow_control);
    index.update_document_scopes(key, tables.scopes);

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::Span;
    use pretty_assertions::assert_eq;
    use tower_lsp::lsp_types::Url;

    fn document(name: &str, text: &str) -> Document {
        Document::new(
            Url::parse(&format!("file:///game/scenes/{}", name)).unwrap(),
            1,
            text.to_string(),
        )
    }

    #[test]
    fn indexes_the_startup_scenario() {
        let index = ProjectIndex::new();
        let doc = document(
            "startup.txt",
            "*create var 3\n*if var > 1\n  *goto done\n*label done",
        );
        index_document(&index, &doc, true);
        let key = doc.key();

        assert_eq!(
            index.global_creations("var"),
            vec![Location::new(key.clone(), Span::new(8, 11))]
        );
        assert_eq!(
            index.variable_references(key).get("var").cloned(),
            Some(vec![Location::new(key.clone(), Span::new(18, 21))])
        );

        let done = index.label(key, "done").unwrap();
        assert_eq!(done.span, Span::new(46, 50));

        let flows = index.flow_control_events(key);
        assert_eq!(flows.len(), 1);
        let label = flows[0].label.as_ref().unwrap();
        assert_eq!(index.label(key, &label.name), Some(done));
        assert!(index.is_startup(key));
    }

    #[test]
    fn repeated_temps_keep_every_location() {
        let index = ProjectIndex::new();
        let doc = document("intro.txt", "*temp a\n*temp a");
        index_document(&index, &doc, false);

        assert_eq!(
            index.local_creations(doc.key(), "a"),
            vec![
                Location::new(doc.key().clone(), Span::new(6, 7)),
                Location::new(doc.key().clone(), Span::new(14, 15)),
            ]
        );
    }

    #[test]
    fn reindexing_is_idempotent() {
        let index = ProjectIndex::new();
        let doc = document(
            "intro.txt",
            "*temp a 1\n*label top\n*set a +1\n*goto top\n*choice\n  #Go\n    *finish\n",
        );
        index_document(&index, &doc, false);
        let key = doc.key();
        let before = (
            index.local_variables(key),
            index.variable_references(key),
            index.labels(key),
            index.flow_control_events(key),
            index.document_scopes(key),
        );

        index_document(&index, &doc, false);
        let after = (
            index.local_variables(key),
            index.variable_references(key),
            index.labels(key),
            index.flow_control_events(key),
            index.document_scopes(key),
        );
        assert_eq!(before, after);
    }

    #[test]
    fn creates_outside_startup_stay_local() {
        let index = ProjectIndex::new();
        let doc = document("intro.txt", "*create stray 1\n");
        index_document(&index, &doc, false);

        assert!(index.global_variable("stray").is_none());
        assert_eq!(index.local_creations(doc.key(), "stray").len(), 1);
    }

    #[test]
    fn startup_feeds_scenes_and_achievements() {
        let index = ProjectIndex::new();
        let doc = document(
            "startup.txt",
            "*scene_list\n  startup\n  chapter1\n*achievement hero visible 10 Hero\n  Be a hero.\n",
        );
        index_document(&index, &doc, true);

        assert_eq!(index.scenes(), vec!["startup".to_string(), "chapter1".to_string()]);
        let hero = index.achievement("HERO").unwrap();
        assert_eq!(hero.points, Some(10));
        assert_eq!(hero.title.as_deref(), Some("Hero"));
    }
}
