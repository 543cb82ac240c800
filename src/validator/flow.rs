use crate::diagnostics::{DiagnosticCode, ScriptDiagnostic};
use crate::index::ProjectIndex;
use crate::text::DocumentKey;

/// Scene and label targets of `*goto`, `*gosub` and their scene variants.
/// An unknown scene hides any problem with its label.
pub(super) fn check(key: &DocumentKey, index: &ProjectIndex) -> Vec<ScriptDiagnostic> {
    let mut diagnostics = Vec::new();

    for flow in index.flow_control_events(key) {
        let target = match &flow.scene {
            Some(scene) if scene.dynamic => continue,
            Some(scene) => {
                if !index.has_scene(&scene.name) {
                    diagnostics.push(ScriptDiagnostic::with_message(
                        DiagnosticCode::SceneNotFound,
                        scene.span,
                        format!("Scene '{}' isn't in the scene list", scene.name),
                    ));
                    continue;
                }
                match index.document_for_scene(&scene.name) {
                    Some(document) => document,
                    None => continue,
                }
            }
            None => key.clone(),
        };

        let Some(label) = flow.label.as_ref().filter(|label| !label.dynamic) else {
            continue;
        };
        if index.label(&target, &label.name).is_none() {
            let message = if target == *key {
                format!("No label '{}' in this scene", label.name)
            } else {
                format!("No label '{}' in {}", label.name, target.file_name())
            };
            diagnostics.push(ScriptDiagnostic::with_message(
                DiagnosticCode::LabelNotFound,
                label.span,
                message,
            ));
        }
    }

    diagnostics
}
