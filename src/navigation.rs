//! Go-to-definition and find-references over the project index.

use crate::index::ProjectIndex;
use crate::parser::{parse, FlowControl, ParseEvent};
use crate::text::{Document, DocumentKey, DocumentStore, Location, Span};

/// What the cursor is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// Lowercased, since variables ignore case.
    Variable(String),
    /// A label inside `document`.
    Label { document: DocumentKey, name: String },
    Achievement(String),
}

/// The symbol at byte `offset` of `document`. The end of a name counts as on
/// it so a cursor just after a word still finds it.
pub fn symbol_at(index: &ProjectIndex, document: &Document, offset: usize) -> Option<Symbol> {
    let key = document.key();
    let output = parse(document.text(), index.is_startup(key));
    let touches = |span: Span| span.start <= offset && offset <= span.end;

    for event in &output.events {
        let (span, symbol) = match event {
            ParseEvent::VariableReference { name, span }
            | ParseEvent::VariableCreate { name, span, .. }
            | ParseEvent::SubroutineLocalCreate { name, span } => {
                (*span, Symbol::Variable(name.to_ascii_lowercase()))
            }
            ParseEvent::LabelCreate { name, span } => (
                *span,
                Symbol::Label {
                    document: key.clone(),
                    name: name.clone(),
                },
            ),
            ParseEvent::FlowControl(flow) => {
                let Some(label) = flow.label.as_ref().filter(|label| !label.dynamic) else {
                    continue;
                };
                let Some(document) = flow_target(index, key, flow) else {
                    continue;
                };
                (
                    label.span,
                    Symbol::Label {
                        document,
                        name: label.name.clone(),
                    },
                )
            }
            ParseEvent::AchievementReference { codename, span } => {
                (*span, Symbol::Achievement(codename.to_ascii_lowercase()))
            }
            ParseEvent::AchievementCreate(definition) => (
                definition.span,
                Symbol::Achievement(definition.codename.to_ascii_lowercase()),
            ),
            _ => continue,
        };
        if touches(span) {
            return Some(symbol);
        }
    }
    None
}

/// Where `symbol`, seen from document `key`, is created.
pub fn definition(index: &ProjectIndex, key: &DocumentKey, symbol: &Symbol) -> Option<Location> {
    match symbol {
        Symbol::Variable(name) => index
            .subroutine_local_variable(key, name)
            .or_else(|| index.local_creations(key, name).into_iter().next())
            .or_else(|| index.global_variable(name)),
        Symbol::Label { document, name } => index.label(document, name),
        Symbol::Achievement(codename) => index
            .achievement(codename)
            .map(|achievement| achievement.location),
    }
}

/// Every use of `symbol` across the project, in document order.
pub fn references(index: &ProjectIndex, documents: &DocumentStore, symbol: &Symbol) -> Vec<Location> {
    let mut found = match symbol {
        Symbol::Variable(name) => index.all_variable_references(name),
        Symbol::Label { document, name } => index
            .label_references(name)
            .into_iter()
            .filter(|location| {
                index
                    .flow_control_events(&location.document)
                    .iter()
                    .filter(|flow| {
                        flow.label
                            .as_ref()
                            .is_some_and(|label| label.span == location.span)
                    })
                    .any(|flow| flow_target(index, &location.document, flow).as_ref() == Some(document))
            })
            .collect(),
        Symbol::Achievement(codename) => achievement_references(index, documents, codename),
    };
    found.sort_by(|a, b| (&a.document, a.span).cmp(&(&b.document, b.span)));
    found
}

/// The document a flow-control command jumps into, if it can be known.
fn flow_target(index: &ProjectIndex, key: &DocumentKey, flow: &FlowControl) -> Option<DocumentKey> {
    match &flow.scene {
        Some(scene) if scene.dynamic => None,
        Some(scene) => index.document_for_scene(&scene.name),
        None => Some(key.clone()),
    }
}

// `*achieve` isn't kept in the index, so scan the known documents.
fn achievement_references(
    index: &ProjectIndex,
    documents: &DocumentStore,
    codename: &str,
) -> Vec<Location> {
    let snapshot: Vec<(DocumentKey, String)> = documents
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().text().to_string()))
        .collect();

    let mut found = Vec::new();
    for (key, text) in snapshot {
        for event in parse(&text, index.is_startup(&key)).events {
            if let ParseEvent::AchievementReference { codename: used, span } = event {
                if used.eq_ignore_ascii_case(codename) {
                    found.push(Location::new(key.clone(), span));
                }
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::test_support::project;
    use pretty_assertions::assert_eq;

    const STARTUP: &str = "*scene_list\n  startup\n  forest\n*create Gold 0\n*achievement hero visible 10 Hero\n  Be one.\n*goto_scene forest clearing\n";
    const FOREST: &str = "*label clearing\n*set gold +5\n*achieve hero\n*goto clearing\n";

    fn store(documents: &[Document]) -> DocumentStore {
        let store = DocumentStore::default();
        for document in documents {
            store.insert(document.key().clone(), document.clone());
        }
        store
    }

    fn find<'a>(documents: &'a [Document], name: &str) -> &'a Document {
        documents
            .iter()
            .find(|doc| doc.key().file_name() == name)
            .unwrap()
    }

    #[test]
    fn variables_resolve_to_their_global_creation() {
        let (index, documents) = project(&[("startup.txt", STARTUP), ("forest.txt", FOREST)]);
        let forest = find(&documents, "forest.txt");
        let offset = FOREST.find("gold").unwrap() + 1;

        let symbol = symbol_at(&index, forest, offset).unwrap();
        assert_eq!(symbol, Symbol::Variable("gold".to_string()));

        let created = definition(&index, forest.key(), &symbol).unwrap();
        let startup = find(&documents, "startup.txt");
        assert_eq!(created.document, *startup.key());
        assert_eq!(&STARTUP[created.span.start..created.span.end], "Gold");

        let uses = references(&index, &store(&documents), &symbol);
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].document, *forest.key());
    }

    #[test]
    fn labels_follow_scene_jumps() {
        let (index, documents) = project(&[("startup.txt", STARTUP), ("forest.txt", FOREST)]);
        let startup = find(&documents, "startup.txt");
        let forest = find(&documents, "forest.txt");
        let offset = STARTUP.find("clearing").unwrap();

        let symbol = symbol_at(&index, startup, offset).unwrap();
        assert_eq!(
            symbol,
            Symbol::Label {
                document: forest.key().clone(),
                name: "clearing".to_string(),
            }
        );
        assert_eq!(
            definition(&index, startup.key(), &symbol).map(|at| at.span),
            Some(Span::new(7, 15))
        );

        let uses = references(&index, &store(&documents), &symbol);
        let files: Vec<&str> = uses.iter().map(|at| at.document.file_name()).collect();
        assert_eq!(files, vec!["forest.txt", "startup.txt"]);
    }

    #[test]
    fn achievements_are_found_by_scanning() {
        let (index, documents) = project(&[("startup.txt", STARTUP), ("forest.txt", FOREST)]);
        let forest = find(&documents, "forest.txt");
        let offset = FOREST.find("hero").unwrap();

        let symbol = symbol_at(&index, forest, offset).unwrap();
        assert_eq!(symbol, Symbol::Achievement("hero".to_string()));
        assert_eq!(
            definition(&index, forest.key(), &symbol).map(|at| at.document.file_name().to_string()),
            Some("startup.txt".to_string())
        );
        assert_eq!(references(&index, &store(&documents), &symbol).len(), 1);
    }

    #[test]
    fn plain_text_has_no_symbol() {
        let (index, documents) = project(&[("forest.txt", "Just words.\n")]);
        assert_eq!(symbol_at(&index, &documents[0], 3), None);
    }
}
