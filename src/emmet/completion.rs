//! Completion items for the abbreviation under the cursor.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionList, CompletionTextEdit, Documentation,
    InsertTextFormat, Position, Range, TextEdit,
};

use super::extract::extract_abbreviation;
use super::mode::{syntax_kind, SyntaxKind};
use super::options::{EmmetOptions, ShowExpandedAbbreviation};
use super::snippets::{SnippetRegistry, MARKUP_SNIPPETS};
use super::{markup, stylesheet};
use crate::lsp::document::TextDocument;

const DETAIL: &str = "Emmet Abbreviation";

/// Syntaxes that count as markup or stylesheet files for
/// `inMarkupAndStylesheetFilesOnly`
const MARKUP_AND_STYLESHEET_FILES: &[&str] = &[
    "html", "xml", "xsl", "pug", "slim", "haml", "css", "scss", "sass", "less", "stylus", "sss",
];

static TAB_STOP: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{\d+(?::([^}]*))?\}").ok());

/// Completion list for the abbreviation ending at `position`
pub fn complete(
    document: &TextDocument,
    position: Position,
    syntax: &str,
    options: &EmmetOptions,
    registry: &SnippetRegistry,
) -> Option<CompletionList> {
    if options
        .exclude_languages
        .iter()
        .any(|language| *language == document.language_id)
    {
        return None;
    }
    let kind = syntax_kind(syntax)?;

    let prefix = document.line_prefix(position);
    let (start, abbreviation) = extract_abbreviation(prefix)?;

    // A word right after `<` is a tag being typed by hand
    if kind == SyntaxKind::Markup && prefix[..start].ends_with('<') {
        return None;
    }

    let line_start = document.offset_at(position) - prefix.len();
    let range = Range::new(document.position_at(line_start + start), position);
    let bare_word = abbreviation
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | ':' | '!' | '+'));

    let mut items = Vec::new();

    if show_expanded(options.show_expanded_abbreviation, syntax) {
        let worth_expanding = match kind {
            SyntaxKind::Markup => !bare_word || markup::is_known_name(abbreviation, syntax, registry),
            SyntaxKind::Stylesheet => stylesheet::is_known_abbreviation(abbreviation, syntax, registry),
        };
        if worth_expanding {
            match super::expand(abbreviation, &options.expand_options(syntax), registry) {
                Ok(expanded) => items.push(item(abbreviation, &expanded, range, options)),
                Err(err) => log::debug!("Not expanding {abbreviation:?}: {err}"),
            }
        }
    }

    if options.show_abbreviation_suggestions && kind == SyntaxKind::Markup && bare_word {
        let mut names: Vec<&str> = MARKUP_SNIPPETS.iter().map(|(name, _)| *name).collect();
        names.extend(registry.snippet_names(syntax));
        names.sort_unstable();
        names.dedup();

        for name in names {
            if name == abbreviation || !name.starts_with(abbreviation) {
                continue;
            }
            if let Ok(expanded) = super::expand(name, &options.expand_options(syntax), registry) {
                items.push(item(name, &expanded, range, options));
            }
        }
    }

    if items.is_empty() {
        return None;
    }
    Some(CompletionList {
        is_incomplete: true,
        items,
    })
}

fn show_expanded(setting: ShowExpandedAbbreviation, syntax: &str) -> bool {
    match setting {
        ShowExpandedAbbreviation::Always => true,
        ShowExpandedAbbreviation::InMarkupAndStylesheetFilesOnly => {
            MARKUP_AND_STYLESHEET_FILES.contains(&syntax)
        }
        ShowExpandedAbbreviation::Never => false,
    }
}

fn item(label: &str, expanded: &str, range: Range, options: &EmmetOptions) -> CompletionItem {
    let kind = if options.show_suggestions_as_snippets {
        CompletionItemKind::SNIPPET
    } else {
        CompletionItemKind::PROPERTY
    };

    CompletionItem {
        label: label.to_string(),
        kind: Some(kind),
        detail: Some(DETAIL.to_string()),
        documentation: Some(Documentation::String(preview(expanded))),
        filter_text: Some(label.to_string()),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit::new(
            range,
            expanded.to_string(),
        ))),
        insert_text_format: Some(InsertTextFormat::SNIPPET),
        ..Default::default()
    }
}

/// Expanded text with tab stops removed, keeping placeholders
pub fn preview(expanded: &str) -> String {
    match TAB_STOP.as_ref() {
        Some(re) => re
            .replace_all(expanded, |caps: &Captures| {
                caps.get(1).map_or("", |m| m.as_str()).to_string()
            })
            .into_owned(),
        None => expanded.to_string(),
    }
}
