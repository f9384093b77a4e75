//! Built-in Emmet engine.
//!
//! The router only sees the [`GrammarEngine`] trait. [`Emmet`] implements it
//! with the markup and stylesheet expanders of this module and a snippet
//! registry loaded from extension directories.

pub mod abbreviation;
pub mod completion;
pub mod extensions;
pub mod markup;
pub mod mode;
pub mod options;
pub mod snippets;
pub mod stylesheet;

mod extract;

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tower_lsp::lsp_types::{CompletionList, Position};

use crate::fs::FileService;
use crate::lsp::document::TextDocument;

pub use extensions::ExtensionError;
pub use mode::{emmet_mode, syntax_kind, SyntaxKind};
pub use options::{EmmetOptions, ExpandOptions, ShowExpandedAbbreviation};
pub use snippets::SnippetRegistry;

/// Syntax used when the caller names none
pub const DEFAULT_SYNTAX: &str = "html";

/// Errors produced while expanding an abbreviation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("empty abbreviation")]
    Empty,

    #[error("unexpected end of abbreviation")]
    UnexpectedEnd,

    #[error("unclosed '{0}'")]
    Unclosed(char),

    #[error("unexpected '{found}' at position {pos}")]
    Unexpected { found: char, pos: usize },

    #[error("unknown syntax: {0}")]
    UnknownSyntax(String),

    #[error("syntax {0} is not supported by the built-in engine")]
    UnsupportedSyntax(String),

    #[error("abbreviation nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("abbreviation expands to more than {0} elements")]
    TooLarge(usize),
}

/// Abbreviation engine the router delegates to
#[tower_lsp::async_trait]
pub trait GrammarEngine: Send + Sync {
    /// Grammar name for a host language, `None` when unknown
    fn syntax_for_language(&self, language: &str) -> Option<String>;

    /// Completion list for the abbreviation ending at `position`
    fn complete(
        &self,
        document: &TextDocument,
        position: Position,
        syntax: &str,
        options: &EmmetOptions,
    ) -> Option<CompletionList>;

    fn expand(&self, abbreviation: &str, options: &ExpandOptions) -> Result<String, ExpandError>;

    /// Replace custom snippets with the contents of `paths`
    async fn load_extensions(
        &self,
        paths: &[PathBuf],
        files: &dyn FileService,
    ) -> Result<(), ExtensionError>;
}

/// Expand `abbreviation` with `options.syntax`, `html` when unset
pub fn expand(
    abbreviation: &str,
    options: &ExpandOptions,
    registry: &SnippetRegistry,
) -> Result<String, ExpandError> {
    let syntax = options
        .syntax
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SYNTAX);

    match syntax_kind(syntax) {
        Some(SyntaxKind::Markup) => markup::expand(abbreviation, syntax, registry, options),
        Some(SyntaxKind::Stylesheet) => stylesheet::expand(abbreviation, syntax, registry, options),
        None => Err(ExpandError::UnknownSyntax(syntax.to_string())),
    }
}

/// The built-in engine
#[derive(Debug, Default)]
pub struct Emmet {
    registry: RwLock<Arc<SnippetRegistry>>,
}

impl Emmet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snippet tables
    pub fn registry(&self) -> Arc<SnippetRegistry> {
        match self.registry.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    fn set_registry(&self, registry: SnippetRegistry) {
        let mut guard = match self.registry.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(registry);
    }
}

#[tower_lsp::async_trait]
impl GrammarEngine for Emmet {
    fn syntax_for_language(&self, language: &str) -> Option<String> {
        emmet_mode(language).map(str::to_string)
    }

    fn complete(
        &self,
        document: &TextDocument,
        position: Position,
        syntax: &str,
        options: &EmmetOptions,
    ) -> Option<CompletionList> {
        completion::complete(document, position, syntax, options, &self.registry())
    }

    fn expand(&self, abbreviation: &str, options: &ExpandOptions) -> Result<String, ExpandError> {
        expand(abbreviation, options, &self.registry())
    }

    async fn load_extensions(
        &self,
        paths: &[PathBuf],
        files: &dyn FileService,
    ) -> Result<(), ExtensionError> {
        let registry = extensions::load_snippet_registry(paths, files).await?;
        log::info!(
            "Loaded custom snippets from {} extension director{}",
            paths.len(),
            if paths.len() == 1 { "y" } else { "ies" }
        );
        self.set_registry(registry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_dispatches_on_syntax() {
        let registry = SnippetRegistry::new();
        assert_eq!(
            expand("p", &ExpandOptions::default(), &registry).unwrap(),
            "<p>${1}</p>"
        );
        assert_eq!(
            expand("p10", &ExpandOptions::with_syntax("css"), &registry).unwrap(),
            "padding: 10px;"
        );
        assert_eq!(
            expand("p", &ExpandOptions::with_syntax("cobol"), &registry),
            Err(ExpandError::UnknownSyntax("cobol".into()))
        );
    }

    #[test]
    fn test_engine_maps_languages() {
        let engine = Emmet::new();
        assert_eq!(engine.syntax_for_language("html").as_deref(), Some("html"));
        assert_eq!(
            engine.syntax_for_language("typescriptreact").as_deref(),
            Some("jsx")
        );
        assert_eq!(engine.syntax_for_language("elixir"), None);
    }

    #[test]
    fn test_registry_swap() {
        let engine = Emmet::new();
        let before = engine.registry();
        assert!(before.is_empty());

        let mut registry = SnippetRegistry::new();
        registry.add_snippet("html", "x", "div.x");
        engine.set_registry(registry);

        assert!(before.is_empty());
        assert_eq!(engine.registry().snippet("html", "x"), Some("div.x"));
    }
}
