use crate::diagnostics::{DiagnosticCode, ScriptDiagnostic};
use crate::index::ProjectIndex;
use crate::language::{achievement_codename, is_builtin_variable, is_parameter_variable};
use crate::parser::ScopeKind;
use crate::text::{Document, DocumentKey, Location};

pub(super) fn check(document: &Document, index: &ProjectIndex) -> Vec<ScriptDiagnostic> {
    let key = document.key();
    let text = document.text();
    let is_startup = index.is_startup(key);
    let mut diagnostics = Vec::new();

    let mut references: Vec<(String, Location)> = index
        .variable_references(key)
        .into_iter()
        .flat_map(|(name, locations)| {
            locations
                .into_iter()
                .map(move |location| (name.clone(), location))
        })
        .collect();
    references.sort_by_key(|(_, location)| location.span);

    let resolver = Resolver {
        key,
        text,
        index,
        is_startup,
    };
    for (name, reference) in &references {
        diagnostics.extend(resolver.resolve(name, reference));
    }

    diagnostics.extend(duplicate_creations(key, text, index, is_startup));
    diagnostics
}

struct Resolver<'a> {
    key: &'a DocumentKey,
    text: &'a str,
    index: &'a ProjectIndex,
    is_startup: bool,
}

impl Resolver<'_> {
    /// Lookup order: subroutine parameters, this document's temps, globals,
    /// then the implicit variables.
    fn resolve(&self, name: &str, reference: &Location) -> Option<ScriptDiagnostic> {
        let offset = reference.span.start;
        if self.index.subroutine_local_variable(self.key, name).is_some() {
            return None;
        }

        let locals = self.index.local_creations(self.key, name);
        if !locals.is_empty() {
            return self.ordering(reference, &locals);
        }

        let globals = self.index.global_creations(name);
        if !globals.is_empty() {
            // Scenes only ever run after startup has created everything.
            return if self.is_startup {
                self.ordering(reference, &globals)
            } else {
                None
            };
        }

        if is_builtin_variable(name) {
            return None;
        }

        if let Some(codename) = achievement_codename(name) {
            if self.index.achievement(codename).is_some() {
                if self.index.in_scope(self.key, ScopeKind::Achievement, offset) {
                    return None;
                }
                return Some(ScriptDiagnostic::with_message(
                    DiagnosticCode::NotDefined,
                    reference.span,
                    format!(
                        "'{}' can only be read after *check_achievements",
                        self.spelling(reference)
                    ),
                ));
            }
        }

        if is_parameter_variable(name) && self.index.in_scope(self.key, ScopeKind::Params, offset) {
            return None;
        }

        Some(ScriptDiagnostic::with_message(
            DiagnosticCode::NotDefined,
            reference.span,
            format!("Variable '{}' was never created", self.spelling(reference)),
        ))
    }

    /// A reference that precedes the only creation of its variable.
    fn ordering(&self, reference: &Location, creations: &[Location]) -> Option<ScriptDiagnostic> {
        // With several creations the order depends on control flow.
        let [creation] = creations else {
            return None;
        };
        if creation.document != reference.document || reference.span.end > creation.span.start {
            return None;
        }
        Some(ScriptDiagnostic::with_message(
            DiagnosticCode::UsedBeforeCreation,
            reference.span,
            format!(
                "'{}' is used before it is created",
                self.spelling(reference)
            ),
        ))
    }

    fn spelling(&self, location: &Location) -> &str {
        self.text
            .get(location.span.start..location.span.end)
            .unwrap_or_default()
    }
}

fn duplicate_creations(
    key: &DocumentKey,
    text: &str,
    index: &ProjectIndex,
    is_startup: bool,
) -> Vec<ScriptDiagnostic> {
    let mut diagnostics = Vec::new();
    let mut tables = vec![index.local_variables(key)];
    if is_startup {
        tables.push(index.global_variables());
    }

    for (table_index, table) in tables.iter().enumerate() {
        let mut names: Vec<&String> = table.keys().collect();
        names.sort();
        for name in names {
            let creations = &table[name];
            let Some(first) = creations.first() else {
                continue;
            };
            let spelled = text.get(first.span.start..first.span.end).unwrap_or(name.as_str());

            if table_index == 0 && index.global_variable(name).is_some() {
                diagnostics.push(ScriptDiagnostic::with_message(
                    DiagnosticCode::ShadowsGlobal,
                    first.span,
                    format!("'{}' hides the global variable of the same name", spelled),
                ));
            }
            for later in creations.iter().skip(1).filter(|at| at.document == *key) {
                diagnostics.push(ScriptDiagnostic::with_message(
                    DiagnosticCode::DefinedEarlier,
                    later.span,
                    format!("'{}' was already created", spelled),
                ));
            }
        }
    }

    diagnostics
}
