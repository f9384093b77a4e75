//! Markup expansion: snippet resolution, numbering and rendering.

use std::collections::HashMap;

use super::abbreviation::{parse, Element, Node};
use super::options::{ExpandOptions, INDENT, SELF_CLOSING_STYLE};
use super::snippets::{builtin_markup_snippet, SnippetRegistry};
use super::ExpandError;
use crate::matcher::VOID_ELEMENTS;

/// Nesting limit when snippets refer to other snippets
const MAX_SNIPPET_DEPTH: usize = 8;

/// Upper bound for the elements one expansion may produce
pub const MAX_NODES: usize = 10_000;

/// Elements kept on one line with their siblings
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdi", "bdo", "big", "br", "button", "cite", "code", "del",
    "dfn", "em", "i", "img", "input", "ins", "kbd", "label", "mark", "q", "s", "samp", "select",
    "small", "span", "strike", "strong", "sub", "sup", "textarea", "time", "tt", "u", "var",
];

/// Children rendered at the parent's indentation
const FORMAT_SKIP: &[&str] = &["html"];

/// Always rendered as a block, even when empty
const FORMAT_FORCE: &[&str] = &["body"];

const DEFAULT_VARIABLES: &[(&str, &str)] = &[("lang", "en"), ("charset", "UTF-8")];

/// Syntaxes whose output is not tag based
const UNSUPPORTED_SYNTAXES: &[&str] = &["pug", "slim", "haml"];

/// Expand a markup abbreviation
pub fn expand(
    abbreviation: &str,
    syntax: &str,
    registry: &SnippetRegistry,
    options: &ExpandOptions,
) -> Result<String, ExpandError> {
    let abbreviation = abbreviation.trim();
    if abbreviation.is_empty() {
        return Err(ExpandError::Empty);
    }
    if UNSUPPORTED_SYNTAXES.contains(&syntax) {
        return Err(ExpandError::UnsupportedSyntax(syntax.to_string()));
    }

    let resolver = SnippetResolver::new(syntax, registry, options);

    // Snippet names such as `ul+` are not valid abbreviations on their own
    let nodes = match resolver.lookup(abbreviation) {
        Some(Snippet::Raw(text)) => return Ok(text),
        Some(Snippet::Abbreviation(source)) => {
            resolver.resolve(parse(&source)?, 1, Some(abbreviation))?
        }
        None => resolver.resolve(parse(abbreviation)?, 0, None)?,
    };

    let mut tree = Vec::new();
    let mut budget = MAX_NODES;
    unroll(&nodes, None, Counter::default(), &mut budget, &mut tree)?;

    let mut renderer = Renderer::new(syntax, registry, options);
    Ok(renderer.render(&tree))
}

/// Whether a bare word names a tag or snippet worth expanding
pub fn is_known_name(name: &str, syntax: &str, registry: &SnippetRegistry) -> bool {
    super::snippets::HTML_TAGS.contains(&name)
        || builtin_markup_snippet(name).is_some()
        || registry.snippet(syntax, name).is_some()
}

enum Snippet {
    Raw(String),
    Abbreviation(String),
}

struct SnippetResolver<'a> {
    syntax: &'a str,
    registry: &'a SnippetRegistry,
    variables: HashMap<String, String>,
}

impl<'a> SnippetResolver<'a> {
    fn new(syntax: &'a str, registry: &'a SnippetRegistry, options: &ExpandOptions) -> Self {
        let mut variables: HashMap<String, String> = DEFAULT_VARIABLES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        variables.extend(registry.variables().clone());
        variables.extend(options.variables.clone());

        Self {
            syntax,
            registry,
            variables,
        }
    }

    fn substitute(&self, source: &str) -> String {
        self.variables
            .iter()
            .fold(source.to_string(), |acc, (name, value)| {
                acc.replace(&format!("${{{name}}}"), value)
            })
    }

    fn lookup(&self, name: &str) -> Option<Snippet> {
        if let Some(custom) = self.registry.snippet(self.syntax, name) {
            let custom = self.substitute(custom);
            return Some(if custom.trim_start().starts_with('<') {
                Snippet::Raw(custom)
            } else {
                Snippet::Abbreviation(custom)
            });
        }
        builtin_markup_snippet(name).map(|source| Snippet::Abbreviation(self.substitute(source)))
    }

    /// Replace elements named after snippets with the snippet's tree.
    /// `skip` stops a snippet from expanding into itself (`a` is `a[href]`).
    fn resolve(
        &self,
        nodes: Vec<Node>,
        depth: usize,
        skip: Option<&str>,
    ) -> Result<Vec<Node>, ExpandError> {
        let mut resolved = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                Node::Group { children, repeat } => resolved.push(Node::Group {
                    children: self.resolve(children, depth, skip)?,
                    repeat,
                }),
                Node::Element(mut element) => {
                    element.children =
                        self.resolve(std::mem::take(&mut element.children), depth, skip)?;

                    let snippet = element
                        .name
                        .as_deref()
                        .filter(|name| Some(*name) != skip && depth < MAX_SNIPPET_DEPTH)
                        .and_then(|name| self.lookup(name).map(|s| (name.to_string(), s)));

                    match snippet {
                        None => resolved.push(Node::Element(element)),
                        Some((_, Snippet::Raw(text))) => resolved.push(Node::Element(Element {
                            text: Some(text),
                            repeat: element.repeat,
                            ..Default::default()
                        })),
                        Some((name, Snippet::Abbreviation(source))) => {
                            let expanded = self.resolve(parse(&source)?, depth + 1, Some(name.as_str()))?;
                            resolved.push(merge(element, expanded));
                        }
                    }
                }
            }
        }

        Ok(resolved)
    }
}

/// Combine what the user typed with the snippet it names
fn merge(user: Element, mut snippet: Vec<Node>) -> Node {
    if let [Node::Element(_)] = snippet.as_slice() {
        if let Some(Node::Element(mut merged)) = snippet.pop() {
            for attribute in user.attributes {
                match (attribute.name.as_str(), attribute.value) {
                    ("class", Some(class)) if !class.is_empty() => merged.add_class(&class),
                    (name, value) => merged.set_attribute(name, value),
                }
            }
            if user.text.is_some() {
                merged.text = user.text;
            }
            merged.children.extend(user.children);
            merged.repeat = user.repeat.or(merged.repeat);
            merged.self_closing |= user.self_closing;
            return Node::Element(merged);
        }
    }

    let mut group = Node::Group {
        children: snippet,
        repeat: user.repeat,
    };
    if !user.children.is_empty() {
        group.append_children(user.children);
    }
    group
}

/// Position inside the closest repeated ancestor
#[derive(Debug, Clone, Copy)]
struct Counter {
    index: usize,
    total: usize,
}

impl Default for Counter {
    fn default() -> Self {
        Self { index: 0, total: 1 }
    }
}

/// Concrete output tree
#[derive(Debug, Clone, PartialEq)]
enum Tree {
    Element {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        text: Option<String>,
        self_closing: bool,
        children: Vec<Tree>,
    },
    Text(String),
}

/// Expand repeats into concrete nodes. Every produced node is charged
/// against `budget`.
fn unroll(
    nodes: &[Node],
    parent: Option<&str>,
    counter: Counter,
    budget: &mut usize,
    out: &mut Vec<Tree>,
) -> Result<(), ExpandError> {
    for node in nodes {
        match node {
            Node::Group { children, repeat } => {
                let total = repeat.unwrap_or(1);
                for index in 0..total {
                    let counter = repeat.map_or(counter, |_| Counter { index, total });
                    unroll(children, parent, counter, budget, out)?;
                }
            }
            Node::Element(element) => {
                let total = element.repeat.unwrap_or(1);
                for index in 0..total {
                    *budget = budget
                        .checked_sub(1)
                        .ok_or(ExpandError::TooLarge(MAX_NODES))?;
                    let counter = element.repeat.map_or(counter, |_| Counter { index, total });
                    out.push(instantiate(element, parent, counter, budget)?);
                }
            }
        }
    }
    Ok(())
}

fn instantiate(
    element: &Element,
    parent: Option<&str>,
    counter: Counter,
    budget: &mut usize,
) -> Result<Tree, ExpandError> {
    if element.is_text_only() {
        return Ok(Tree::Text(number(
            element.text.as_deref().unwrap_or_default(),
            counter,
        )));
    }

    let name = match &element.name {
        Some(name) => number(name, counter),
        None => implicit_name(parent).to_string(),
    };
    let attributes = element
        .attributes
        .iter()
        .map(|attr| {
            (
                number(&attr.name, counter),
                attr.value.as_deref().map(|v| number(v, counter)),
            )
        })
        .collect();

    let mut children = Vec::new();
    unroll(&element.children, Some(name.as_str()), counter, budget, &mut children)?;

    Ok(Tree::Element {
        attributes,
        text: element.text.as_deref().map(|t| number(t, counter)),
        self_closing: element.self_closing,
        children,
        name,
    })
}

fn implicit_name(parent: Option<&str>) -> &'static str {
    let Some(parent) = parent else {
        return "div";
    };
    match parent.to_ascii_lowercase().as_str() {
        "ul" | "ol" => "li",
        "table" | "tbody" | "thead" | "tfoot" => "tr",
        "tr" => "td",
        "select" | "optgroup" => "option",
        "audio" | "video" => "source",
        "map" => "area",
        "colgroup" => "col",
        other if INLINE_ELEMENTS.contains(&other) => "span",
        _ => "div",
    }
}

/// Replace `$` runs with the repeat counter. `$$` pads, `@-` counts down,
/// `@N` starts at N. `${` is a tab stop and `\$` a literal dollar.
fn number(source: &str, counter: Counter) -> String {
    if !source.contains('$') {
        return source.to_string();
    }

    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' if chars.get(i + 1) == Some(&'$') => {
                out.push('$');
                i += 2;
            }
            '$' if chars.get(i + 1) == Some(&'{') => {
                out.push('$');
                i += 1;
            }
            '$' => {
                let mut width = 0;
                while chars.get(i) == Some(&'$') {
                    width += 1;
                    i += 1;
                }

                let mut reverse = false;
                let mut base: usize = 1;
                if chars.get(i) == Some(&'@') {
                    i += 1;
                    if chars.get(i) == Some(&'-') {
                        reverse = true;
                        i += 1;
                    }
                    let start = i;
                    while chars.get(i).is_some_and(char::is_ascii_digit) {
                        i += 1;
                    }
                    if i > start {
                        base = chars[start..i]
                            .iter()
                            .collect::<String>()
                            .parse()
                            .unwrap_or(1);
                    }
                }

                let value = if reverse {
                    base.saturating_add(counter.total - counter.index - 1)
                } else {
                    base.saturating_add(counter.index)
                };
                out.push_str(&format!("{value:0width$}"));
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelfClosingStyle {
    Html,
    Xhtml,
    Xml,
}

impl SelfClosingStyle {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "html" => Some(Self::Html),
            "xhtml" => Some(Self::Xhtml),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }

    fn default_for(syntax: &str) -> Self {
        match syntax {
            "jsx" => Self::Xhtml,
            "xml" | "xsl" => Self::Xml,
            _ => Self::Html,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Html => "",
            Self::Xhtml => " /",
            Self::Xml => "/",
        }
    }
}

struct Renderer {
    jsx: bool,
    self_closing: SelfClosingStyle,
    indent: String,
    field: usize,
}

impl Renderer {
    fn new(syntax: &str, registry: &SnippetRegistry, options: &ExpandOptions) -> Self {
        let self_closing = options
            .option_str(SELF_CLOSING_STYLE)
            .or_else(|| {
                registry
                    .profile(syntax)?
                    .get("selfClosingStyle")?
                    .as_str()
            })
            .and_then(SelfClosingStyle::parse)
            .unwrap_or_else(|| SelfClosingStyle::default_for(syntax));

        Self {
            jsx: syntax == "jsx",
            self_closing,
            indent: options.option_str(INDENT).unwrap_or("\t").to_string(),
            field: 0,
        }
    }

    fn next_field(&mut self) -> String {
        self.field += 1;
        format!("${{{}}}", self.field)
    }

    fn render(&mut self, nodes: &[Tree]) -> String {
        if nodes.iter().all(is_inline) {
            nodes.iter().map(|node| self.render_node(node, 0)).collect()
        } else {
            nodes
                .iter()
                .map(|node| self.render_node(node, 0))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }

    fn render_node(&mut self, node: &Tree, level: usize) -> String {
        match node {
            Tree::Text(text) => text.clone(),
            Tree::Element {
                name,
                attributes,
                text,
                self_closing,
                children,
            } => self.render_element(name, attributes, text.as_deref(), *self_closing, children, level),
        }
    }

    fn render_attribute(&mut self, name: &str, value: Option<&str>) -> String {
        let name = match (self.jsx, name) {
            (true, "class") => "className",
            (true, "for") => "htmlFor",
            (_, other) => other,
        };

        match value {
            Some(v) if self.jsx && v.starts_with('{') && v.ends_with('}') => format!("{name}={v}"),
            Some(v) if !v.is_empty() => format!("{name}=\"{v}\""),
            _ => format!("{name}=\"{}\"", self.next_field()),
        }
    }

    fn render_element(
        &mut self,
        name: &str,
        attributes: &[(String, Option<String>)],
        text: Option<&str>,
        self_closing: bool,
        children: &[Tree],
        level: usize,
    ) -> String {
        let mut out = format!("<{name}");
        for (attr, value) in attributes {
            out.push(' ');
            out.push_str(&self.render_attribute(attr, value.as_deref()));
        }

        let is_void = VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str());
        if self_closing || (is_void && text.is_none() && children.is_empty()) {
            out.push_str(self.self_closing.suffix());
            out.push('>');
            return out;
        }
        out.push('>');

        let force_block = FORMAT_FORCE.contains(&name);
        let child_level = if FORMAT_SKIP.contains(&name) {
            level
        } else {
            level + 1
        };

        if !force_block && children.iter().all(is_inline) {
            match text {
                Some(text) if !text.is_empty() => out.push_str(text),
                _ if children.is_empty() => {
                    let field = self.next_field();
                    out.push_str(&field);
                }
                _ => {}
            }
            for child in children {
                let rendered = self.render_node(child, level);
                out.push_str(&rendered);
            }
        } else {
            let pad = self.indent.repeat(child_level);
            if let Some(text) = text.filter(|t| !t.is_empty()) {
                out.push('\n');
                out.push_str(&pad);
                out.push_str(text);
            }
            for child in children {
                let rendered = self.render_node(child, child_level);
                out.push('\n');
                out.push_str(&pad);
                out.push_str(&rendered);
            }
            if children.is_empty() && text.is_none_or(str::is_empty) {
                let field = self.next_field();
                out.push('\n');
                out.push_str(&pad);
                out.push_str(&field);
            }
            out.push('\n');
            out.push_str(&self.indent.repeat(level));
        }

        out.push_str(&format!("</{name}>"));
        out
    }
}

fn is_inline(node: &Tree) -> bool {
    match node {
        Tree::Text(_) => true,
        Tree::Element { name, children, .. } => {
            INLINE_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
                && children.iter().all(is_inline)
        }
    }
}
