use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::emmet::{Emmet, ExtensionError, GrammarEngine};
use crate::fs::LocalFileService;
use crate::lsp::document::TextDocument;
use crate::lsp::handlers::HandleCompletion;
use crate::lsp::watcher::ExtensionWatcher;
use crate::matcher::{ElementMatcher, HtmlMatcher};
use crate::session::{SessionConfig, SessionState};
use crate::Config;

/// Characters after which editors should ask for completions
pub const TRIGGER_CHARACTERS: &[&str] = &[
    "!", ":", ">", "+", "^", "*", ")", ".", "]", "@", "}", "/",
];

/// The main LSP backend that holds state and implements the Language Server Protocol
pub struct Backend {
    pub client: Client,
    pub config: Config,
    pub session: SessionState,
    pub documents: Arc<Mutex<HashMap<Url, TextDocument>>>,
    pub engine: Arc<dyn GrammarEngine>,
    pub matcher: Arc<dyn ElementMatcher>,
    watcher: Mutex<Option<ExtensionWatcher>>,
}

impl Backend {
    pub fn new(client: Client, config: Config) -> Self {
        Self::with_engine(client, config, Arc::new(Emmet::new()), Arc::new(HtmlMatcher))
    }

    pub fn with_engine(
        client: Client,
        config: Config,
        engine: Arc<dyn GrammarEngine>,
        matcher: Arc<dyn ElementMatcher>,
    ) -> Self {
        Self {
            client,
            config,
            session: SessionState::default(),
            documents: Arc::new(Mutex::new(HashMap::new())),
            engine,
            matcher,
            watcher: Mutex::new(None),
        }
    }

    pub fn trigger_characters() -> Vec<String> {
        TRIGGER_CHARACTERS
            .iter()
            .map(|c| c.to_string())
            .chain(('a'..='z').map(String::from))
            .chain(('0'..='9').map(String::from))
            .collect()
    }

    /// The `--extensions-dir` / user directory, when it exists
    async fn default_extensions_dir(&self) -> Option<PathBuf> {
        let dir = self.config.default_extensions_dir.as_ref()?;
        match tokio::fs::metadata(dir).await {
            Ok(metadata) if metadata.is_dir() => Some(dir.clone()),
            _ => None,
        }
    }

    /// Load the default and configured extension directories into the
    /// engine. Returns the directories that were loaded.
    async fn load_extensions(
        &self,
        config: &SessionConfig,
    ) -> Result<Vec<PathBuf>, ExtensionError> {
        let configured = config.extension_directories(&self.config.working_dir);
        let mut dirs: Vec<PathBuf> = self.default_extensions_dir().await.into_iter().collect();
        let has_default = !dirs.is_empty();
        dirs.extend(configured.iter().cloned());

        match self.engine.load_extensions(&dirs, &LocalFileService).await {
            Ok(()) => Ok(dirs),
            Err(err) if has_default => {
                // Retry without the user directory
                log::warn!("Ignoring default extension directory: {}", err);
                self.engine
                    .load_extensions(&configured, &LocalFileService)
                    .await?;
                Ok(configured)
            }
            Err(err) => Err(err),
        }
    }

    /// Replace the extension watcher with one for `dirs`
    async fn watch_extensions(&self, dirs: Vec<PathBuf>) {
        let mut watcher = self.watcher.lock().await;
        *watcher = None;
        if dirs.is_empty() {
            return;
        }

        match ExtensionWatcher::start(dirs, Arc::clone(&self.engine), self.client.clone()) {
            Ok(started) => *watcher = Some(started),
            Err(err) => log::warn!("Not watching extension directories: {}", err),
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        let config = SessionConfig::from_initialization_options(params.initialization_options);

        let dirs = match self.load_extensions(&config).await {
            Ok(dirs) => dirs,
            Err(err) => {
                log::error!("Failed to load extensions: {}", err);
                let mut error = jsonrpc::Error::internal_error();
                error.message = format!("Failed to load extensions: {}", err).into();
                return Err(error);
            }
        };

        self.session.replace(config).await;
        self.watch_extensions(dirs).await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(Self::trigger_characters()),
                    work_done_progress_options: Default::default(),
                    all_commit_characters: None,
                    completion_item: None,
                }),
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "emmet-language-server initialized")
            .await;
    }

    async fn shutdown(&self) -> jsonrpc::Result<()> {
        *self.watcher.lock().await = None;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let item = params.text_document;
        let document = TextDocument::new(item.uri.clone(), item.language_id, item.version, item.text);
        self.documents.lock().await.insert(item.uri, document);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let mut docs = self.documents.lock().await;
        match docs.get_mut(&params.text_document.uri) {
            Some(document) => {
                document.apply_changes(params.content_changes, params.text_document.version)
            }
            None => log::warn!(
                "Change for unknown document {}",
                params.text_document.uri
            ),
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents
            .lock()
            .await
            .remove(&params.text_document.uri);
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let Some(config) = SessionConfig::from_settings(&params.settings) else {
            log::debug!("Configuration change without an emmet section, keeping session");
            return;
        };

        match self.load_extensions(&config).await {
            Ok(dirs) => self.watch_extensions(dirs).await,
            Err(err) => {
                log::error!("Failed to reload extensions: {}", err);
                self.client
                    .show_message(
                        MessageType::ERROR,
                        format!("Failed to reload Emmet extensions: {}", err),
                    )
                    .await;
            }
        }

        self.session.replace(config).await;
    }

    async fn completion(
        &self,
        params: CompletionParams,
    ) -> jsonrpc::Result<Option<CompletionResponse>> {
        self.handle_completion(params).await
    }
}
