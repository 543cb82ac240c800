use crate::config::Config;
use crate::fs::{FileSystem, LocalFileSystem};
use crate::index::ProjectIndex;
use crate::text::{DocumentKey, DocumentStore};
use dashmap::DashSet;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

pub struct Backend {
    pub(crate) client: Client,
    pub(crate) index: Arc<ProjectIndex>,
    /// Every known scene, open or scanned from disk.
    pub(crate) documents: Arc<DocumentStore>,
    pub(crate) open_documents: Arc<DashSet<DocumentKey>>,
    pub(crate) workspace_roots: Arc<RwLock<Vec<PathBuf>>>,
    pub(crate) config: Arc<RwLock<Config>>,
    pub(crate) fs: Arc<dyn FileSystem>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self::with_file_system(client, Arc::new(LocalFileSystem))
    }

    pub fn with_file_system(client: Client, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            client,
            index: Arc::new(ProjectIndex::new()),
            documents: Arc::new(DocumentStore::default()),
            open_documents: Arc::new(DashSet::new()),
            workspace_roots: Arc::new(RwLock::new(Vec::new())),
            config: Arc::new(RwLock::new(Config::default())),
            fs,
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        self.update_workspace_roots(&params);
        self.update_config(params.initialization_options.clone());

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "choicescript-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let roots = self.workspace_roots.read().clone();
        let indexed = self.scan_workspace(&roots).await;
        self.client
            .log_message(
                MessageType::INFO,
                format!("ChoiceScript LSP initialized, indexed {} scenes", indexed),
            )
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;

        let unrooted = self.workspace_roots.read().is_empty();
        if unrooted && self.index.startup().is_none() {
            if let Some(dir) = document
                .uri
                .to_file_path()
                .ok()
                .and_then(|path| path.parent().map(|dir| dir.to_path_buf()))
            {
                self.scan_workspace(&[dir]).await;
            }
        }

        let key = self.analyze_document(document.uri.clone(), document.version, document.text);
        self.open_documents.insert(key.clone());
        self.after_change(&key).await;

        self.client
            .log_message(MessageType::INFO, format!("Opened document: {}", document.uri))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let identifier = params.text_document;
        if let Some(change) = params.content_changes.into_iter().last() {
            let key = self.analyze_document(identifier.uri, identifier.version, change.text);
            self.after_change(&key).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        let key = DocumentKey::from_uri(&uri);
        self.open_documents.remove(&key);

        if let Err(err) = self.reload_from_disk(&uri).await {
            log::warn!("couldn't reload {} after closing it: {}", key, err);
        }
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some((key, symbol)) = self.symbol_at(&uri, position) else {
            return Ok(None);
        };
        Ok(self
            .definition(&key, &symbol)
            .and_then(|location| self.lsp_location(&location))
            .map(GotoDefinitionResponse::Scalar))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some((key, symbol)) = self.symbol_at(&uri, position) else {
            return Ok(None);
        };

        let mut found = Vec::new();
        if params.context.include_declaration {
            found.extend(self.definition(&key, &symbol));
        }
        found.extend(self.references_to(&symbol));

        Ok(Some(
            found
                .iter()
                .filter_map(|location| self.lsp_location(location))
                .collect(),
        ))
    }
}
