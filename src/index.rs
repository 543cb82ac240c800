//! Project-wide symbol tables.
//!
//! Per-document tables live in `DashMap`s keyed by [`DocumentKey`] and are
//! only ever replaced as a whole. The startup document additionally feeds
//! the project-wide tables: global variables, the scene list and the
//! achievements. None of this knows how to parse; see [`crate::indexer`].

use crate::parser::{FlowControl, ScopeKind};
use crate::text::{DocumentKey, Location, Span};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::PathBuf;
use tower_lsp::lsp_types::Url;

/// Lowercased name to every location recorded for it, in source order.
pub type NameTable = HashMap<String, Vec<Location>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Achievement {
    pub codename: String,
    pub location: Location,
    pub points: Option<u32>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentScope {
    pub kind: ScopeKind,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct ProjectIndex {
    documents: DashMap<DocumentKey, Url>,
    startup: RwLock<Option<DocumentKey>>,
    global_variables: RwLock<NameTable>,
    local_variables: DashMap<DocumentKey, NameTable>,
    subroutine_local_variables: DashMap<DocumentKey, NameTable>,
    variable_references: DashMap<DocumentKey, NameTable>,
    labels: DashMap<DocumentKey, HashMap<String, Location>>,
    label_references: DashMap<DocumentKey, HashMap<String, Vec<Location>>>,
    flow_control_events: DashMap<DocumentKey, Vec<FlowControl>>,
    document_scopes: DashMap<DocumentKey, Vec<DocumentScope>>,
    scenes: RwLock<Vec<String>>,
    achievements: RwLock<Vec<Achievement>>,
    image_directory: Mutex<Option<PathBuf>>,
}

impl ProjectIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_document(&self, key: DocumentKey, uri: Url) {
        self.documents.insert(key, uri);
    }

    pub fn set_startup(&self, key: DocumentKey) {
        *self.startup.write() = Some(key);
    }

    pub fn is_startup(&self, key: &DocumentKey) -> bool {
        self.startup.read().as_ref() == Some(key)
    }

    pub fn startup(&self) -> Option<DocumentKey> {
        self.startup.read().clone()
    }

    pub fn update_global_variables(&self, table: NameTable) {
        *self.global_variables.write() = table;
    }

    pub fn update_local_variables(&self, key: DocumentKey, table: NameTable) {
        self.local_variables.insert(key, table);
    }

    pub fn update_subroutine_local_variables(&self, key: DocumentKey, table: NameTable) {
        self.subroutine_local_variables.insert(key, table);
    }

    pub fn update_variable_references(&self, key: DocumentKey, table: NameTable) {
        self.variable_references.insert(key, table);
    }

    pub fn update_labels(&self, key: DocumentKey, labels: HashMap<String, Location>) {
        self.labels.insert(key, labels);
    }

    pub fn update_label_references(&self, key: DocumentKey, table: HashMap<String, Vec<Location>>) {
        self.label_references.insert(key, table);
    }

    pub fn update_flow_control_events(&self, key: DocumentKey, events: Vec<FlowControl>) {
        self.flow_control_events.insert(key, events);
    }

    pub fn update_document_scopes(&self, key: DocumentKey, scopes: Vec<DocumentScope>) {
        self.document_scopes.insert(key, scopes);
    }

    pub fn update_scene_list(&self, scenes: Vec<String>) {
        *self.scenes.write() = scenes;
    }

    pub fn update_achievements(&self, achievements: Vec<Achievement>) {
        *self.achievements.write() = achievements;
    }

    /// First creation of a global variable.
    pub fn global_variable(&self, name: &str) -> Option<Location> {
        self.global_variables
            .read()
            .get(&name.to_ascii_lowercase())
            .and_then(|locations| locations.first().cloned())
    }

    /// Every `*create` of a global, duplicates included.
    pub fn global_creations(&self, name: &str) -> Vec<Location> {
        self.global_variables
            .read()
            .get(&name.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    pub fn global_variables(&self) -> NameTable {
        self.global_variables.read().clone()
    }

    pub fn local_variables(&self, key: &DocumentKey) -> NameTable {
        self.local_variables
            .get(key)
            .map(|table| table.value().clone())
            .unwrap_or_default()
    }

    pub fn local_creations(&self, key: &DocumentKey, name: &str) -> Vec<Location> {
        self.local_variables
            .get(key)
            .and_then(|table| table.get(&name.to_ascii_lowercase()).cloned())
            .unwrap_or_default()
    }

    pub fn subroutine_local_variable(&self, key: &DocumentKey, name: &str) -> Option<Location> {
        self.subroutine_local_variables
            .get(key)
            .and_then(|table| {
                table
                    .get(&name.to_ascii_lowercase())
                    .and_then(|locations| locations.first().cloned())
            })
    }

    pub fn variable_references(&self, key: &DocumentKey) -> NameTable {
        self.variable_references
            .get(key)
            .map(|table| table.value().clone())
            .unwrap_or_default()
    }

    /// References to a variable across every document.
    pub fn all_variable_references(&self, name: &str) -> Vec<Location> {
        let name = name.to_ascii_lowercase();
        let mut found: Vec<Location> = self
            .variable_references
            .iter()
            .filter_map(|table| table.value().get(&name).cloned())
            .flatten()
            .collect();
        found.sort_by(|a, b| (&a.document, a.span).cmp(&(&b.document, b.span)));
        found
    }

    pub fn labels(&self, key: &DocumentKey) -> HashMap<String, Location> {
        self.labels
            .get(key)
            .map(|table| table.value().clone())
            .unwrap_or_default()
    }

    /// Labels are case-sensitive.
    pub fn label(&self, key: &DocumentKey, name: &str) -> Option<Location> {
        self.labels
            .get(key)
            .and_then(|table| table.get(name).cloned())
    }

    /// References to a label name from every document.
    pub fn label_references(&self, name: &str) -> Vec<Location> {
        let mut found: Vec<Location> = self
            .label_references
            .iter()
            .filter_map(|table| table.value().get(name).cloned())
            .flatten()
            .collect();
        found.sort_by(|a, b| (&a.document, a.span).cmp(&(&b.document, b.span)));
        found
    }

    pub fn flow_control_events(&self, key: &DocumentKey) -> Vec<FlowControl> {
        self.flow_control_events
            .get(key)
            .map(|events| events.value().clone())
            .unwrap_or_default()
    }

    pub fn document_scopes(&self, key: &DocumentKey) -> Vec<DocumentScope> {
        self.document_scopes
            .get(key)
            .map(|scopes| scopes.value().clone())
            .unwrap_or_default()
    }

    /// Whether `offset` lies inside a scope of `kind` in the document.
    pub fn in_scope(&self, key: &DocumentKey, kind: ScopeKind, offset: usize) -> bool {
        self.document_scopes
            .get(key)
            .map(|scopes| {
                scopes
                    .iter()
                    .any(|scope| scope.kind == kind && scope.span.contains(offset))
            })
            .unwrap_or(false)
    }

    pub fn scenes(&self) -> Vec<String> {
        self.scenes.read().clone()
    }

    /// A scene is known when it's in the scene list or a document exists for it.
    pub fn has_scene(&self, scene: &str) -> bool {
        self.scenes
            .read()
            .iter()
            .any(|known| known.eq_ignore_ascii_case(scene))
            || self.document_for_scene(scene).is_some()
    }

    /// The document whose path names `scene`, e.g. `.../chapter1.txt`.
    pub fn document_for_scene(&self, scene: &str) -> Option<DocumentKey> {
        let needle = format!("/{}.", scene.to_ascii_lowercase());
        self.documents
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| key.as_str().to_ascii_lowercase().contains(&needle))
            .min()
    }

    pub fn achievements(&self) -> Vec<Achievement> {
        self.achievements.read().clone()
    }

    /// Achievement codenames are case-insensitive.
    pub fn achievement(&self, codename: &str) -> Option<Achievement> {
        self.achievements
            .read()
            .iter()
            .find(|achievement| achievement.codename.eq_ignore_ascii_case(codename))
            .cloned()
    }

    pub fn image_directory(&self) -> Option<PathBuf> {
        self.image_directory.lock().clone()
    }

    /// Remember where images were found. The first directory recorded wins.
    pub fn set_image_directory(&self, directory: PathBuf) {
        let mut cached = self.image_directory.lock();
        if cached.is_none() {
            *cached = Some(directory);
        }
    }
}
