//! Mapping from editor language identifiers to Emmet syntaxes.

/// Syntaxes rendered as markup
pub const MARKUP_SYNTAXES: &[&str] = &[
    "html", "xml", "xsl", "jsx", "js", "pug", "slim", "haml", "vue", "svelte",
];

/// Syntaxes rendered as stylesheet declarations
pub const STYLESHEET_SYNTAXES: &[&str] = &["css", "sass", "scss", "less", "sss", "stylus"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    Markup,
    Stylesheet,
}

/// Classify a syntax name
pub fn syntax_kind(syntax: &str) -> Option<SyntaxKind> {
    if MARKUP_SYNTAXES.contains(&syntax) {
        Some(SyntaxKind::Markup)
    } else if STYLESHEET_SYNTAXES.contains(&syntax) {
        Some(SyntaxKind::Stylesheet)
    } else {
        None
    }
}

/// Syntax used for documents of the given language, if Emmet supports it
pub fn emmet_mode(language: &str) -> Option<&'static str> {
    let language = match language {
        "jsx-tags" | "javascriptreact" | "typescriptreact" => "jsx",
        "sass-indented" => "sass",
        "jade" => "pug",
        other => other,
    };

    MARKUP_SYNTAXES
        .iter()
        .chain(STYLESHEET_SYNTAXES)
        .find(|syntax| **syntax == language)
        .copied()
}

/// Root syntax whose snippets a syntax inherits
pub fn base_syntax(syntax: &str) -> &'static str {
    match syntax_kind(syntax) {
        Some(SyntaxKind::Stylesheet) => "css",
        _ => "html",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_languages_map_to_themselves() {
        for language in ["html", "css", "scss", "xml", "vue", "stylus"] {
            assert_eq!(emmet_mode(language), Some(language));
        }
    }

    #[test]
    fn test_language_aliases() {
        assert_eq!(emmet_mode("javascriptreact"), Some("jsx"));
        assert_eq!(emmet_mode("typescriptreact"), Some("jsx"));
        assert_eq!(emmet_mode("jsx-tags"), Some("jsx"));
        assert_eq!(emmet_mode("sass-indented"), Some("sass"));
        assert_eq!(emmet_mode("jade"), Some("pug"));
    }

    #[test]
    fn test_unknown_languages() {
        assert_eq!(emmet_mode("elixir"), None);
        assert_eq!(emmet_mode("rust"), None);
        assert_eq!(emmet_mode(""), None);
    }

    #[test]
    fn test_syntax_kind_and_base() {
        assert_eq!(syntax_kind("less"), Some(SyntaxKind::Stylesheet));
        assert_eq!(syntax_kind("jsx"), Some(SyntaxKind::Markup));
        assert_eq!(syntax_kind("python"), None);
        assert_eq!(base_syntax("scss"), "css");
        assert_eq!(base_syntax("vue"), "html");
    }
}
