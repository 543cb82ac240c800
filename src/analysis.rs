use crate::backend::Backend;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::indexer::index_document;
use crate::navigation::{self, Symbol};
use crate::parser::parse;
use crate::text::{Document, DocumentKey, Location};
use crate::validator::{check_images, validate};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tower_lsp::lsp_types::{self, InitializeParams, Position, Url};

impl Backend {
    pub(crate) fn update_workspace_roots(&self, params: &InitializeParams) {
        let mut roots = self.workspace_roots.write();
        roots.clear();

        if let Some(root_uri) = params.root_uri.as_ref() {
            if let Ok(path) = root_uri.to_file_path() {
                if !roots.iter().any(|existing| existing == &path) {
                    roots.push(path);
                }
            }
        }

        #[allow(deprecated)]
        if let Some(root_path) = params.root_path.as_ref() {
            if !root_path.is_empty() {
                let path = PathBuf::from(root_path);
                if !roots.iter().any(|existing| existing == &path) {
                    roots.push(path);
                }
            }
        }

        if let Some(folders) = params.workspace_folders.as_ref() {
            for folder in folders {
                if let Ok(path) = folder.uri.to_file_path() {
                    if !roots.iter().any(|existing| existing == &path) {
                        roots.push(path);
                    }
                }
            }
        }
    }

    pub(crate) fn update_config(&self, options: Option<serde_json::Value>) {
        let config = Config::from_initialization_options(options).unwrap_or_else(|err| {
            log::warn!("ignoring initializationOptions: {}", err);
            Config::default()
        });
        *self.config.write() = config;
    }

    fn is_startup_name(&self, file_name: &str) -> bool {
        self.config.read().is_startup_file(file_name)
    }

    /// Index every scene file under `roots`, the startup file first so globals
    /// are known before any other scene is read. Open documents are left
    /// alone. Returns how many files were indexed.
    pub(crate) async fn scan_workspace(&self, roots: &[PathBuf]) -> usize {
        let pattern = self.config.read().scene_file_pattern();
        let mut visited = HashSet::new();
        let mut paths: Vec<PathBuf> = Vec::new();

        for root in roots {
            if !visited.insert(root.clone()) {
                continue;
            }
            for path in self.fs.find_files(&pattern, root).await {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths.sort_by_key(|path| {
            !path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| self.is_startup_name(name))
                .unwrap_or(false)
        });

        let mut indexed = 0;
        for path in paths {
            let Ok(uri) = Url::from_file_path(&path) else {
                log::warn!("skipping {}: not an absolute path", path.display());
                continue;
            };
            if self.open_documents.contains(&DocumentKey::from_uri(&uri)) {
                continue;
            }
            match self.fs.read_file(&path).await {
                Ok(text) => {
                    self.analyze_document(uri, 0, text);
                    indexed += 1;
                }
                Err(err) => log::warn!("{}", err),
            }
        }

        log::info!("indexed {} scene files", indexed);
        indexed
    }

    pub(crate) fn analyze_document(&self, uri: Url, version: i32, text: String) -> DocumentKey {
        let document = Document::new(uri, version, text);
        let key = document.key().clone();
        let is_startup = self.is_startup_name(key.file_name());

        index_document(&self.index, &document, is_startup);
        self.documents.insert(key.clone(), document);
        key
    }

    /// Publish for `key`, or for every open document when the startup file
    /// changed since globals, scenes and achievements come from it.
    pub(crate) async fn after_change(&self, key: &DocumentKey) {
        if !self.index.is_startup(key) {
            self.publish_diagnostics(key).await;
            return;
        }

        let mut open: Vec<DocumentKey> = self
            .open_documents
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        open.sort();
        for other in open {
            self.publish_diagnostics(&other).await;
        }
    }

    pub(crate) async fn reload_from_disk(&self, uri: &Url) -> Result<()> {
        let path = uri
            .to_file_path()
            .map_err(|_| Error::InvalidUri(uri.to_string()))?;
        let text = self.fs.read_file(&path).await?;
        self.analyze_document(uri.clone(), 0, text);
        Ok(())
    }

    pub(crate) async fn publish_diagnostics(&self, key: &DocumentKey) {
        let Some(document) = self.documents.get(key).map(|entry| entry.value().clone()) else {
            return;
        };
        let (options, timeout) = {
            let config = self.config.read();
            (
                config.validation_options(),
                Duration::from_millis(config.image_check_timeout_ms),
            )
        };

        let output = parse(document.text(), self.index.is_startup(key));
        let mut diagnostics = validate(&document, &output, &self.index, options);

        let root = self.workspace_root_for(document.uri());
        let images = check_images(
            &document,
            &output,
            &self.index,
            self.fs.as_ref(),
            root.as_deref(),
        );
        match tokio::time::timeout(timeout, images).await {
            Ok(missing) => diagnostics.extend(missing),
            Err(_) => log::warn!("image check for {} timed out", key),
        }
        diagnostics.sort_by_key(|diagnostic| (diagnostic.span.start, diagnostic.span.end));

        let diagnostics = diagnostics
            .iter()
            .map(|diagnostic| diagnostic.to_lsp(&document))
            .collect();
        self.client
            .publish_diagnostics(document.uri().clone(), diagnostics, Some(document.version()))
            .await;
    }

    /// The innermost workspace root containing `uri`.
    fn workspace_root_for(&self, uri: &Url) -> Option<PathBuf> {
        let path = uri.to_file_path().ok()?;
        let roots = self.workspace_roots.read();
        let root = roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .cloned();
        root
    }

    pub(crate) fn symbol_at(&self, uri: &Url, position: Position) -> Option<(DocumentKey, Symbol)> {
        let key = DocumentKey::from_uri(uri);
        let document = self.documents.get(&key)?.value().clone();
        let offset = document.offset(position)?;
        navigation::symbol_at(&self.index, &document, offset).map(|symbol| (key, symbol))
    }

    pub(crate) fn definition(&self, key: &DocumentKey, symbol: &Symbol) -> Option<Location> {
        navigation::definition(&self.index, key, symbol)
    }

    pub(crate) fn references_to(&self, symbol: &Symbol) -> Vec<Location> {
        navigation::references(&self.index, &self.documents, symbol)
    }

    pub(crate) fn lsp_location(&self, location: &Location) -> Option<lsp_types::Location> {
        let document = self.documents.get(&location.document)?;
        Some(lsp_types::Location {
            uri: document.uri().clone(),
            range: document.range_of(location.span),
        })
    }
}
