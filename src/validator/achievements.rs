use crate::diagnostics::{DiagnosticCode, ScriptDiagnostic};
use crate::index::ProjectIndex;
use crate::language::{MAX_ACHIEVEMENTS, MAX_ACHIEVEMENT_POINTS};
use crate::parser::{ParseEvent, ParseOutput};
use crate::text::DocumentKey;
use std::collections::HashSet;

pub(super) fn check(
    key: &DocumentKey,
    output: &ParseOutput,
    index: &ProjectIndex,
) -> Vec<ScriptDiagnostic> {
    let mut diagnostics: Vec<ScriptDiagnostic> = output
        .events
        .iter()
        .filter_map(|event| match event {
            ParseEvent::AchievementReference { codename, span }
                if index.achievement(codename).is_none() =>
            {
                Some(ScriptDiagnostic::with_message(
                    DiagnosticCode::AchievementNotFound,
                    *span,
                    format!("No achievement named '{}'", codename),
                ))
            }
            _ => None,
        })
        .collect();

    if index.is_startup(key) {
        diagnostics.extend(limits(index));
    }
    diagnostics
}

/// Uniqueness and the game-wide totals, checked against the startup file.
fn limits(index: &ProjectIndex) -> Vec<ScriptDiagnostic> {
    let mut diagnostics = Vec::new();
    let mut codenames = HashSet::new();
    let mut titles = HashSet::new();
    let mut total_points = 0u32;

    for (position, achievement) in index.achievements().iter().enumerate() {
        let span = achievement.location.span;

        if !codenames.insert(achievement.codename.to_ascii_lowercase()) {
            diagnostics.push(ScriptDiagnostic::with_message(
                DiagnosticCode::DuplicateAchievement,
                span,
                format!("Achievement '{}' is already defined", achievement.codename),
            ));
        }
        if let Some(title) = &achievement.title {
            if !titles.insert(title.clone()) {
                diagnostics.push(ScriptDiagnostic::with_message(
                    DiagnosticCode::DuplicateAchievementTitle,
                    span,
                    format!("Another achievement is already titled '{}'", title),
                ));
            }
        }
        if position >= MAX_ACHIEVEMENTS {
            diagnostics.push(ScriptDiagnostic::new(DiagnosticCode::TooManyAchievements, span));
        }

        total_points += achievement.points.unwrap_or(0);
        if total_points > MAX_ACHIEVEMENT_POINTS {
            diagnostics.push(ScriptDiagnostic::with_message(
                DiagnosticCode::TooManyAchievementPoints,
                span,
                format!(
                    "Achievements are worth {} points so far, more than the {} allowed",
                    total_points, MAX_ACHIEVEMENT_POINTS
                ),
            ));
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::super::test_support::project;
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn startup_codes(text: &str) -> Vec<DiagnosticCode> {
        let (index, documents) = project(&[("startup.txt", text)]);
        let key = documents[0].key();
        check(key, &parse(text, true), &index)
            .into_iter()
            .map(|diagnostic| diagnostic.code)
            .collect()
    }

    #[test]
    fn duplicates() {
        let text = "*achievement hero visible 10 Hero\n  a\n*achievement HERO hidden 10 Champion\n  b\n*achievement saint visible 10 Hero\n  c\n";
        assert_eq!(
            startup_codes(text),
            vec![
                DiagnosticCode::DuplicateAchievement,
                DiagnosticCode::DuplicateAchievementTitle,
            ]
        );
    }

    #[test]
    fn points_total_is_capped() {
        let text: String = (0..11)
            .map(|n| format!("*achievement a{} visible 100 Title {}\n  d\n", n, n))
            .collect();
        assert_eq!(startup_codes(&text), vec![DiagnosticCode::TooManyAchievementPoints]);

        // Every achievement past the cap is flagged, not just the first.
        let text: String = (0..12)
            .map(|n| format!("*achievement a{} visible 100 Title {}\n  d\n", n, n))
            .collect();
        assert_eq!(
            startup_codes(&text),
            vec![
                DiagnosticCode::TooManyAchievementPoints,
                DiagnosticCode::TooManyAchievementPoints
            ]
        );
    }

    #[test]
    fn count_is_capped() {
        let text: String = (0..102)
            .map(|n| format!("*achievement a{} visible 1 Title {}\n  d\n", n, n))
            .collect();
        assert_eq!(
            startup_codes(&text),
            vec![DiagnosticCode::TooManyAchievements, DiagnosticCode::TooManyAchievements]
        );
    }
}
