//! Language-Mode Resolution
//!
//! Decides which abbreviation grammar applies at a position:
//!
//! 1. inside a `<style>` element the grammar is `css`
//! 2. otherwise the engine's grammar for the document language, or `html`
//! 3. an `includeLanguages` entry for the document language overrides both,
//!    as long as the engine knows its target
//!
//! Nothing here is cached. The grammar can change from one position to the
//! next, for example when the cursor crosses into a `<style>` block.

use tower_lsp::lsp_types::Position;

use crate::emmet::GrammarEngine;
use crate::lsp::document::TextDocument;
use crate::matcher::ElementMatcher;
use crate::session::SessionConfig;

/// Grammar used when nothing else applies
pub const DEFAULT_SYNTAX: &str = "html";

/// Grammar of the body of a `<style>` element
pub const EMBEDDED_STYLE_SYNTAX: &str = "css";

const STYLE_ELEMENT: &str = "style";

/// Grammar at `position` in `document`
pub fn resolve_grammar(
    document: &TextDocument,
    position: Position,
    config: &SessionConfig,
    engine: &dyn GrammarEngine,
    matcher: &dyn ElementMatcher,
) -> String {
    let offset = document.offset_at(position);

    let base = embedded_style(document, offset, matcher)
        .or_else(|| engine.syntax_for_language(&document.language_id))
        .unwrap_or_else(|| DEFAULT_SYNTAX.to_string());

    remap(&document.language_id, config, engine).unwrap_or(base)
}

/// Grammar for a bare language identifier, with no document to inspect
pub fn resolve_language_grammar(
    language_id: &str,
    config: &SessionConfig,
    engine: &dyn GrammarEngine,
) -> String {
    remap(language_id, config, engine)
        .or_else(|| engine.syntax_for_language(language_id))
        .unwrap_or_else(|| DEFAULT_SYNTAX.to_string())
}

fn embedded_style(
    document: &TextDocument,
    offset: usize,
    matcher: &dyn ElementMatcher,
) -> Option<String> {
    matcher
        .match_at(document.text(), offset)
        .filter(|element| element.name.eq_ignore_ascii_case(STYLE_ELEMENT))
        .map(|_| EMBEDDED_STYLE_SYNTAX.to_string())
}

/// `includeLanguages` override, when its target is a grammar the engine knows
fn remap(language_id: &str, config: &SessionConfig, engine: &dyn GrammarEngine) -> Option<String> {
    let target = config
        .include_languages
        .get(language_id)
        .filter(|target| !target.is_empty())?;

    let grammar = engine.syntax_for_language(target);
    if grammar.is_none() {
        log::debug!(
            "includeLanguages maps {} to unknown grammar {}, keeping default",
            language_id,
            target
        );
    }
    grammar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emmet::Emmet;
    use crate::matcher::HtmlMatcher;
    use tower_lsp::lsp_types::Url;

    fn doc(language: &str, text: &str) -> TextDocument {
        TextDocument::new(Url::parse("file:///t").unwrap(), language, 1, text)
    }

    fn config(pairs: &[(&str, &str)]) -> SessionConfig {
        SessionConfig {
            include_languages: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_style_block_is_css() {
        let d = doc("html", "<style>a{}</style>");
        let grammar = resolve_grammar(&d, Position::new(0, 8), &config(&[]), &Emmet::new(), &HtmlMatcher);
        assert_eq!(grammar, "css");

        let grammar = resolve_grammar(&d, Position::new(0, 0), &config(&[]), &Emmet::new(), &HtmlMatcher);
        assert_eq!(grammar, "html");
    }

    #[test]
    fn test_remap_overrides_style() {
        let d = doc("elixir", "<style>a{}</style>");
        let grammar = resolve_grammar(
            &d,
            Position::new(0, 8),
            &config(&[("elixir", "html")]),
            &Emmet::new(),
            &HtmlMatcher,
        );
        assert_eq!(grammar, "html");
    }

    #[test]
    fn test_unknown_remap_target_keeps_base() {
        let d = doc("elixir", "div");
        let grammar = resolve_grammar(
            &d,
            Position::new(0, 3),
            &config(&[("elixir", "nonsense"), ("other", "")]),
            &Emmet::new(),
            &HtmlMatcher,
        );
        assert_eq!(grammar, "html");

        assert_eq!(
            resolve_language_grammar("other", &config(&[("other", "")]), &Emmet::new()),
            "html"
        );
    }

    #[test]
    fn test_language_grammar() {
        let engine = Emmet::new();
        assert_eq!(resolve_language_grammar("scss", &config(&[]), &engine), "scss");
        assert_eq!(resolve_language_grammar("unknown", &config(&[]), &engine), "html");
        assert_eq!(
            resolve_language_grammar("php", &config(&[("php", "css")]), &engine),
            "css"
        );
    }
}
