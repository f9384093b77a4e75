use serde::{Deserialize, Serialize};
use tower_lsp::jsonrpc::{Error, Result as LspResult};
use tower_lsp::lsp_types::*;

use crate::emmet::ExpandOptions;
use crate::lsp::backend::Backend;
use crate::syntax::{resolve_grammar, resolve_language_grammar};

/// Method name of the expansion request
pub const EXPAND_ABBREVIATION: &str = "emmet/expandAbbreviation";

/// Parameters of `emmet/expandAbbreviation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandAbbreviationParams {
    pub abbreviation: String,
    /// Host language identifier, e.g. `html` or `elixir`
    pub language: String,
    #[serde(default)]
    pub options: Option<ExpandOptions>,
}

/// Trait for handling completion requests
#[tower_lsp::async_trait]
pub trait HandleCompletion {
    async fn handle_completion(
        &self,
        params: CompletionParams,
    ) -> LspResult<Option<CompletionResponse>>;
}

/// Trait for handling abbreviation expansion requests
#[tower_lsp::async_trait]
pub trait HandleExpandAbbreviation {
    async fn handle_expand_abbreviation(&self, params: ExpandAbbreviationParams)
        -> LspResult<String>;
}

#[tower_lsp::async_trait]
impl HandleCompletion for Backend {
    async fn handle_completion(
        &self,
        params: CompletionParams,
    ) -> LspResult<Option<CompletionResponse>> {
        let tdp = params.text_document_position;
        let uri = tdp.text_document.uri;
        let pos = tdp.position;

        let config = self.session.snapshot().await;
        let docs = self.documents.lock().await;
        let document = match docs.get(&uri) {
            Some(document) => document,
            None => return Ok(None),
        };

        let grammar = resolve_grammar(
            document,
            pos,
            &config,
            self.engine.as_ref(),
            self.matcher.as_ref(),
        );
        log::trace!("Completing {} at {:?} as {}", uri, pos, grammar);

        Ok(self
            .engine
            .complete(document, pos, &grammar, &config.emmet)
            .map(CompletionResponse::List))
    }
}

#[tower_lsp::async_trait]
impl HandleExpandAbbreviation for Backend {
    async fn handle_expand_abbreviation(
        &self,
        params: ExpandAbbreviationParams,
    ) -> LspResult<String> {
        let config = self.session.snapshot().await;
        let grammar = resolve_language_grammar(&params.language, &config, self.engine.as_ref());

        // An explicit `syntax` from the caller beats the resolved grammar
        let options = params
            .options
            .unwrap_or_default()
            .with_default_syntax(grammar);

        self.engine
            .expand(&params.abbreviation, &options)
            .map_err(|err| Error::invalid_params(err.to_string()))
    }
}

impl Backend {
    /// Entry point registered for [`EXPAND_ABBREVIATION`]
    pub async fn expand_abbreviation(&self, params: ExpandAbbreviationParams) -> LspResult<String> {
        self.handle_expand_abbreviation(params).await
    }
}
