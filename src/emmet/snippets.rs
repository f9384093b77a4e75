//! Snippet tables.
//!
//! Built-in snippets ship with the engine. Custom snippets and syntax
//! profiles come from extension directories and are held in a
//! [`SnippetRegistry`] that is replaced as a whole on every load.

use std::collections::HashMap;

use serde_json::Value;

use super::mode::base_syntax;

/// Markup snippets. Values are abbreviations; `${lang}` and `${charset}`
/// are filled from variables before parsing.
pub const MARKUP_SNIPPETS: &[(&str, &str)] = &[
    (
        "!",
        "{<!DOCTYPE html>}+html[lang=${lang}]>(head>meta[charset=${charset}]+meta:vp+title{Document})+body",
    ),
    ("doc", "html[lang=${lang}]>(head>meta[charset=${charset}]+meta:vp+title{Document})+body"),
    ("!!!", "{<!DOCTYPE html>}"),
    ("a", "a[href]"),
    ("a:link", "a[href=\"http://\"]"),
    ("a:mail", "a[href=\"mailto:\"]"),
    ("abbr", "abbr[title]"),
    ("base", "base[href]"),
    ("bdo", "bdo[dir]"),
    ("btn", "button"),
    ("btn:s", "button[type=submit]"),
    ("btn:r", "button[type=reset]"),
    ("form", "form[action]"),
    ("form:get", "form[action method=get]"),
    ("form:post", "form[action method=post]"),
    ("iframe", "iframe[src frameborder=0]"),
    ("img", "img[src alt]"),
    ("input", "input[type=text]"),
    ("inp", "input[type=text name id]"),
    ("input:hidden", "input[type=hidden name]"),
    ("input:h", "input[type=hidden name]"),
    ("input:email", "input[type=email name id]"),
    ("input:password", "input[type=password name id]"),
    ("input:checkbox", "input[type=checkbox name id]"),
    ("input:c", "input[type=checkbox name id]"),
    ("input:radio", "input[type=radio name id]"),
    ("input:r", "input[type=radio name id]"),
    ("input:submit", "input[type=submit value]"),
    ("input:s", "input[type=submit value]"),
    ("label", "label[for]"),
    ("link", "link[rel=stylesheet href]"),
    ("link:css", "link[rel=stylesheet href=style.css]"),
    ("meta:utf", "meta[http-equiv=Content-Type content=\"text/html;charset=UTF-8\"]"),
    ("meta:vp", "meta[name=viewport content=\"width=device-width, initial-scale=1.0\"]"),
    ("opt", "option[value]"),
    ("option", "option[value]"),
    ("script:src", "script[src]"),
    ("select", "select[name id]"),
    ("textarea", "textarea[name cols=30 rows=10]"),
    ("ol+", "ol>li"),
    ("ul+", "ul>li"),
    ("dl+", "dl>dt+dd"),
    ("table+", "table>tr>td"),
    ("tr+", "tr>td"),
    ("select+", "select>option"),
];

/// Known HTML element names, used to decide whether a bare word is worth
/// completing
pub const HTML_TAGS: &[&str] = &[
    "a", "abbr", "address", "area", "article", "aside", "audio", "b", "base", "bdi", "bdo",
    "blockquote", "body", "br", "button", "canvas", "caption", "cite", "code", "col",
    "colgroup", "data", "datalist", "dd", "del", "details", "dfn", "dialog", "div", "dl", "dt",
    "em", "embed", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4",
    "h5", "h6", "head", "header", "hgroup", "hr", "html", "i", "iframe", "img", "input", "ins",
    "kbd", "label", "legend", "li", "link", "main", "map", "mark", "menu", "meta", "meter",
    "nav", "noscript", "object", "ol", "optgroup", "option", "output", "p", "picture", "pre",
    "progress", "q", "rp", "rt", "ruby", "s", "samp", "script", "section", "select", "slot",
    "small", "source", "span", "strong", "style", "sub", "summary", "sup", "table", "tbody",
    "td", "template", "textarea", "tfoot", "th", "thead", "time", "title", "tr", "track", "u",
    "ul", "var", "video", "wbr",
];

pub fn builtin_markup_snippet(name: &str) -> Option<&'static str> {
    MARKUP_SNIPPETS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| *value)
}

/// Snippets and profiles loaded from extension directories
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnippetRegistry {
    snippets: HashMap<String, HashMap<String, String>>,
    profiles: HashMap<String, HashMap<String, Value>>,
    variables: HashMap<String, String>,
}

impl SnippetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.values().all(HashMap::is_empty)
            && self.profiles.is_empty()
            && self.variables.is_empty()
    }

    pub fn add_snippet(&mut self, syntax: &str, name: &str, value: &str) {
        self.snippets
            .entry(syntax.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
    }

    pub fn add_profile(&mut self, syntax: &str, profile: HashMap<String, Value>) {
        self.profiles
            .entry(syntax.to_string())
            .or_default()
            .extend(profile);
    }

    pub fn add_variable(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
    }

    /// Custom snippet for `syntax`, falling back to its base syntax
    pub fn snippet(&self, syntax: &str, name: &str) -> Option<&str> {
        [syntax, base_syntax(syntax)]
            .into_iter()
            .find_map(|s| self.snippets.get(s)?.get(name))
            .map(String::as_str)
    }

    /// Names of custom snippets visible from `syntax`
    pub fn snippet_names(&self, syntax: &str) -> Vec<&str> {
        let mut names: Vec<&str> = [syntax, base_syntax(syntax)]
            .into_iter()
            .filter_map(|s| self.snippets.get(s))
            .flat_map(|table| table.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn profile(&self, syntax: &str) -> Option<&HashMap<String, Value>> {
        self.profiles.get(syntax)
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }
}
