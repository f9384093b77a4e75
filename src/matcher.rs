//! Element Matcher
//!
//! Finds the markup element enclosing an offset. The resolver only uses it
//! to tell whether the cursor sits inside a `<style>` block.

/// Tags whose body is raw text and never contains markup
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements that never have a closing tag
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// An element found around an offset. Ranges are byte offsets, end exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedElement {
    pub name: String,
    pub open: (usize, usize),
    pub close: Option<(usize, usize)>,
}

/// Locates the element enclosing a byte offset in a document
pub trait ElementMatcher: Send + Sync {
    fn match_at(&self, text: &str, offset: usize) -> Option<MatchedElement>;
}

/// Tag-pair matcher for HTML-like documents
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlMatcher;

impl HtmlMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl ElementMatcher for HtmlMatcher {
    fn match_at(&self, text: &str, offset: usize) -> Option<MatchedElement> {
        let mut stack: Vec<Tag> = Vec::new();

        for tag in TagScanner::new(text) {
            match tag.kind {
                TagKind::Open => stack.push(tag),
                TagKind::SelfClosing => {
                    if tag.start < offset && offset < tag.end {
                        return Some(MatchedElement {
                            name: tag.name,
                            open: (tag.start, tag.end),
                            close: None,
                        });
                    }
                }
                TagKind::Close => {
                    // A closing tag only pairs with the innermost open tag
                    if stack.last().is_some_and(|open| open.name == tag.name) {
                        let open = stack.pop()?;
                        if open.start < offset && offset < tag.end {
                            return Some(MatchedElement {
                                name: open.name,
                                open: (open.start, open.end),
                                close: Some((tag.start, tag.end)),
                            });
                        }
                    }
                }
            }
        }

        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    SelfClosing,
}

#[derive(Debug, Clone)]
struct Tag {
    name: String,
    kind: TagKind,
    start: usize,
    end: usize,
}

/// Yields tags left to right, skipping comments, declarations and the
/// bodies of raw text elements
struct TagScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> TagScanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn skip_past(&self, from: usize, terminator: &str) -> usize {
        self.text
            .get(from..)
            .and_then(|rest| rest.find(terminator))
            .map(|idx| from + idx + terminator.len())
            .unwrap_or(self.text.len())
    }

    /// Position right after the `>` closing a tag, honouring quoted values
    fn tag_end(&self, from: usize) -> Option<usize> {
        let mut quote: Option<u8> = None;
        for (idx, byte) in self.text.as_bytes()[from..].iter().enumerate() {
            match (quote, *byte) {
                (Some(q), b) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(*byte),
                (None, b'>') => return Some(from + idx + 1),
                (None, b'<') => return None,
                _ => {}
            }
        }
        None
    }

    /// Start of the closing tag of a raw text element
    fn raw_text_end(&self, from: usize, name: &str) -> usize {
        let closing = format!("</{}", name.to_ascii_lowercase());
        self.text
            .get(from..)
            .map(|rest| rest.to_ascii_lowercase())
            .and_then(|rest| rest.find(&closing))
            .map(|idx| from + idx)
            .unwrap_or(self.text.len())
    }
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':' | b'.')
}

impl Iterator for TagScanner<'_> {
    type Item = Tag;

    fn next(&mut self) -> Option<Tag> {
        loop {
            let start = self.pos + self.text.get(self.pos..)?.find('<')?;
            let rest = &self.text[start..];

            if rest.starts_with("<!--") {
                self.pos = self.skip_past(start + 4, "-->");
                continue;
            }
            if rest.starts_with("<![CDATA[") {
                self.pos = self.skip_past(start + 9, "]]>");
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.pos = self.skip_past(start + 2, ">");
                continue;
            }

            let closing = rest.starts_with("</");
            let name_start = if closing { start + 2 } else { start + 1 };
            let name_len = self.text.as_bytes()[name_start..]
                .iter()
                .take_while(|b| is_name_byte(**b))
                .count();
            let starts_alpha = self
                .text
                .as_bytes()
                .get(name_start)
                .is_some_and(u8::is_ascii_alphabetic);

            if name_len == 0 || !starts_alpha {
                self.pos = start + 1;
                continue;
            }

            let name = self.text[name_start..name_start + name_len].to_string();
            let Some(end) = self.tag_end(name_start + name_len) else {
                self.pos = start + 1;
                continue;
            };

            let kind = if closing {
                TagKind::Close
            } else if self.text[..end].ends_with("/>")
                || VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(&name))
            {
                TagKind::SelfClosing
            } else {
                TagKind::Open
            };

            self.pos = if kind == TagKind::Open
                && RAW_TEXT_ELEMENTS
                    .iter()
                    .any(|raw| raw.eq_ignore_ascii_case(&name))
            {
                self.raw_text_end(end, &name)
            } else {
                end
            };

            return Some(Tag {
                name,
                kind,
                start,
                end,
            });
        }
    }
}
