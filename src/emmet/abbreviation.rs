//! Markup abbreviation parser.
//!
//! Turns `ul#nav>li.item$*3>a{Link}` into a tree of [`Node`]s. Numbering,
//! snippets and implicit tag names are resolved later by the renderer.

use super::ExpandError;

/// Upper bound for `*N`
pub const MAX_REPEAT: usize = 1000;

/// Upper bound for nesting through `>` and groups
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: Option<String>,
    pub attributes: Vec<Attribute>,
    pub text: Option<String>,
    pub repeat: Option<usize>,
    pub self_closing: bool,
    pub children: Vec<Node>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Set an attribute, replacing an existing one of the same name
    pub fn set_attribute(&mut self, name: &str, value: Option<String>) {
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn add_class(&mut self, class: &str) {
        match self.attributes.iter_mut().find(|attr| attr.name == "class") {
            Some(Attribute {
                value: Some(existing),
                ..
            }) if !existing.is_empty() => {
                existing.push(' ');
                existing.push_str(class);
            }
            Some(existing) => existing.value = Some(class.to_string()),
            None => self.attributes.push(Attribute {
                name: "class".to_string(),
                value: Some(class.to_string()),
            }),
        }
    }

    /// `{text}` with nothing else around it
    pub fn is_text_only(&self) -> bool {
        self.name.is_none()
            && self.attributes.is_empty()
            && self.text.is_some()
            && self.children.is_empty()
            && !self.self_closing
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Group {
        children: Vec<Node>,
        repeat: Option<usize>,
    },
}

impl Node {
    /// Attach children the way `>` does: groups forward them to their
    /// last member
    pub fn append_children(&mut self, children: Vec<Node>) {
        match self {
            Node::Element(element) => element.children.extend(children),
            Node::Group {
                children: members, ..
            } => match members.last_mut() {
                Some(last) => last.append_children(children),
                None => members.extend(children),
            },
        }
    }
}

/// Parse a markup abbreviation
pub fn parse(abbreviation: &str) -> Result<Vec<Node>, ExpandError> {
    let abbreviation = abbreviation.trim();
    if abbreviation.is_empty() {
        return Err(ExpandError::Empty);
    }

    let mut parser = Parser {
        chars: abbreviation.chars().collect(),
        pos: 0,
    };
    let nodes = parser.parse_sequence(false, 0)?;

    match parser.peek() {
        None => Ok(nodes),
        Some(_) => Err(parser.unexpected()),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '!' | '$' | '@')
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> ExpandError {
        match self.peek() {
            Some(found) => ExpandError::Unexpected {
                found,
                pos: self.pos,
            },
            None => ExpandError::UnexpectedEnd,
        }
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&predicate) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Siblings and descendants up to the end of input or a closing `)`.
    /// `depth` is the nesting level of the sequence's first node.
    fn parse_sequence(&mut self, nested: bool, depth: usize) -> Result<Vec<Node>, ExpandError> {
        // levels[k + 1] holds the children of the last node in levels[k]
        let mut levels: Vec<Vec<Node>> = vec![Vec::new()];

        loop {
            let node = self.parse_item(depth + levels.len() - 1)?;
            if let Some(level) = levels.last_mut() {
                level.push(node);
            }

            match self.peek() {
                None => break,
                Some(')') if nested => break,
                Some('>') => {
                    self.pos += 1;
                    levels.push(Vec::new());
                }
                Some('+') => self.pos += 1,
                Some('^') => {
                    while self.eat('^') {
                        if levels.len() > 1 {
                            fold_level(&mut levels);
                        }
                    }
                }
                Some(_) => return Err(self.unexpected()),
            }
        }

        while levels.len() > 1 {
            fold_level(&mut levels);
        }
        Ok(levels.pop().unwrap_or_default())
    }

    fn parse_item(&mut self, depth: usize) -> Result<Node, ExpandError> {
        if depth >= MAX_DEPTH {
            return Err(ExpandError::TooDeep(MAX_DEPTH));
        }

        if self.eat('(') {
            let children = self.parse_sequence(true, depth + 1)?;
            if !self.eat(')') {
                return Err(ExpandError::Unclosed('('));
            }
            let repeat = self.parse_repeat();
            return Ok(Node::Group { children, repeat });
        }

        self.parse_element().map(Node::Element)
    }

    fn parse_repeat(&mut self) -> Option<usize> {
        if !self.eat('*') {
            return None;
        }
        let digits = self.take_while(|c| c.is_ascii_digit());
        let count = digits.parse::<usize>().unwrap_or(1);
        Some(count.clamp(1, MAX_REPEAT))
    }

    fn parse_element(&mut self) -> Result<Element, ExpandError> {
        let start = self.pos;
        let mut element = Element::default();

        let name = self.take_while(is_name_char);
        if !name.is_empty() {
            element.name = Some(name);
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    let id = self.take_while(is_name_char);
                    element.set_attribute("id", Some(id));
                }
                Some('.') => {
                    self.pos += 1;
                    let class = self.take_while(is_name_char);
                    if class.is_empty() {
                        return Err(self.unexpected());
                    }
                    element.add_class(&class);
                }
                Some('[') => {
                    self.pos += 1;
                    self.parse_attributes(&mut element)?;
                }
                Some('{') => {
                    self.pos += 1;
                    let text = self.parse_text()?;
                    element.text.get_or_insert_with(String::new).push_str(&text);
                }
                Some('*') if element.repeat.is_none() => {
                    element.repeat = self.parse_repeat();
                }
                Some('/') => {
                    self.pos += 1;
                    element.self_closing = true;
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(element)
    }

    fn parse_attributes(&mut self, element: &mut Element) -> Result<(), ExpandError> {
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ExpandError::Unclosed('[')),
                Some(']') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => {
                    let name = self.take_while(|c| {
                        !c.is_whitespace() && !matches!(c, '=' | ']' | '"' | '\'')
                    });
                    if name.is_empty() {
                        return Err(self.unexpected());
                    }
                    let value = if self.eat('=') {
                        Some(self.parse_attribute_value()?)
                    } else {
                        None
                    };
                    element.set_attribute(&name, value);
                }
            }
        }
    }

    fn parse_attribute_value(&mut self) -> Result<String, ExpandError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let value = self.take_while(|c| c != quote);
                if !self.eat(quote) {
                    return Err(ExpandError::Unclosed(quote));
                }
                Ok(value)
            }
            Some('{') => {
                self.pos += 1;
                let inner = self.parse_text()?;
                Ok(format!("{{{inner}}}"))
            }
            _ => Ok(self.take_while(|c| !c.is_whitespace() && c != ']')),
        }
    }

    /// Body of `{...}` after the opening brace, nested braces included
    fn parse_text(&mut self) -> Result<String, ExpandError> {
        let mut depth = 1;
        let mut text = String::new();

        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    if let Some(escaped) = self.bump() {
                        text.push(escaped);
                    }
                }
                '{' => {
                    depth += 1;
                    text.push(c);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(text);
                    }
                    text.push(c);
                }
                _ => text.push(c),
            }
        }

        Err(ExpandError::Unclosed('{'))
    }
}

fn fold_level(levels: &mut Vec<Vec<Node>>) {
    if let Some(children) = levels.pop() {
        if let Some(parent) = levels.last_mut().and_then(|level| level.last_mut()) {
            parent.append_children(children);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &Node) -> &Element {
        match node {
            Node::Element(element) => element,
            Node::Group { .. } => panic!("expected an element, got {:?}", node),
        }
    }

    #[test]
    fn test_parse_child_and_repeat() {
        let nodes = parse("ul>li*3").unwrap();
        assert_eq!(nodes.len(), 1);

        let ul = element(&nodes[0]);
        assert_eq!(ul.name.as_deref(), Some("ul"));
        assert_eq!(ul.children.len(), 1);

        let li = element(&ul.children[0]);
        assert_eq!(li.name.as_deref(), Some("li"));
        assert_eq!(li.repeat, Some(3));
    }

    #[test]
    fn test_parse_id_classes_and_attributes() {
        let nodes = parse("div#main.a.b[title=\"x y\" data-id=3 hidden]").unwrap();
        let div = element(&nodes[0]);

        assert_eq!(div.attribute("id").unwrap().value.as_deref(), Some("main"));
        assert_eq!(div.attribute("class").unwrap().value.as_deref(), Some("a b"));
        assert_eq!(div.attribute("title").unwrap().value.as_deref(), Some("x y"));
        assert_eq!(div.attribute("data-id").unwrap().value.as_deref(), Some("3"));
        assert_eq!(div.attribute("hidden").unwrap().value, None);
    }

    #[test]
    fn test_parse_siblings_and_climb_up() {
        let nodes = parse("header>nav^main+footer").unwrap();
        let names: Vec<_> = nodes
            .iter()
            .map(|n| element(n).name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["header", "main", "footer"]);
        assert_eq!(element(&nodes[0]).children.len(), 1);
    }

    #[test]
    fn test_parse_groups() {
        let nodes = parse("(dt+dd)*2+p").unwrap();
        assert_eq!(nodes.len(), 2);
        match &nodes[0] {
            Node::Group { children, repeat } => {
                assert_eq!(children.len(), 2);
                assert_eq!(*repeat, Some(2));
            }
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_text_with_nested_braces() {
        let nodes = parse("p{a {b} c}").unwrap();
        assert_eq!(element(&nodes[0]).text.as_deref(), Some("a {b} c"));

        let nodes = parse("{plain}").unwrap();
        assert!(element(&nodes[0]).is_text_only());
    }

    #[test]
    fn test_parse_self_closing() {
        let nodes = parse("div/").unwrap();
        assert!(element(&nodes[0]).self_closing);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse(""), Err(ExpandError::Empty));
        assert_eq!(parse("ul>"), Err(ExpandError::UnexpectedEnd));
        assert_eq!(parse("(a+b"), Err(ExpandError::Unclosed('(')));
        assert_eq!(parse("a[href"), Err(ExpandError::Unclosed('[')));
        assert_eq!(parse("p{text"), Err(ExpandError::Unclosed('{')));
        assert!(matches!(
            parse("a b"),
            Err(ExpandError::Unexpected { found: ' ', .. })
        ));
    }

    #[test]
    fn test_repeat_is_clamped() {
        let nodes = parse("li*100000").unwrap();
        assert_eq!(element(&nodes[0]).repeat, Some(MAX_REPEAT));
    }

    #[test]
    fn test_nesting_is_limited() {
        let groups = format!("{}a{}", "(".repeat(2000), ")".repeat(2000));
        assert_eq!(parse(&groups), Err(ExpandError::TooDeep(MAX_DEPTH)));

        let children = vec!["div"; 2000].join(">");
        assert_eq!(parse(&children), Err(ExpandError::TooDeep(MAX_DEPTH)));

        let mixed = format!("{}(a>b)", "p>".repeat(MAX_DEPTH - 1));
        assert_eq!(parse(&mixed), Err(ExpandError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_nesting_below_limit_parses() {
        let children = vec!["div"; MAX_DEPTH].join(">");
        assert!(parse(&children).is_ok());

        let groups = format!("{}a{}", "(".repeat(MAX_DEPTH - 1), ")".repeat(MAX_DEPTH - 1));
        assert!(parse(&groups).is_ok());
    }
}
