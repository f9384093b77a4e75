use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent, Url};

/// An open document
#[derive(Debug, Clone)]
pub struct TextDocument {
    pub uri: Url,
    pub language_id: String,
    pub version: i32,
    text: String,
    line_offsets: Vec<usize>,
}

impl TextDocument {
    pub fn new(uri: Url, language_id: impl Into<String>, version: i32, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_offsets = line_offsets(&text);
        Self {
            uri,
            language_id: language_id.into(),
            version,
            text,
            line_offsets,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_offsets.len()
    }

    /// Byte offset of an LSP position. Columns count UTF-16 code units and
    /// are clamped to the end of the line.
    pub fn offset_at(&self, position: Position) -> usize {
        let line = position.line as usize;
        let Some(&start) = self.line_offsets.get(line) else {
            return self.text.len();
        };
        let end = self.line_end(line);

        let mut units = 0;
        for (i, c) in self.text[start..end].char_indices() {
            if units >= position.character as usize {
                return start + i;
            }
            units += c.len_utf16();
        }
        end
    }

    /// LSP position of a byte offset
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = match self.line_offsets.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_offsets[line];
        let character: usize = self.text[start..offset]
            .chars()
            .map(char::len_utf16)
            .sum();
        Position::new(line as u32, character as u32)
    }

    /// Text of the line holding `position`, up to `position`
    pub fn line_prefix(&self, position: Position) -> &str {
        let offset = self.offset_at(position);
        let start = self
            .line_offsets
            .get(position.line as usize)
            .copied()
            .unwrap_or(offset)
            .min(offset);
        &self.text[start..offset]
    }

    pub fn apply_changes(&mut self, changes: Vec<TextDocumentContentChangeEvent>, version: i32) {
        for change in changes {
            match change.range {
                Some(range) => self.replace(range, &change.text),
                None => self.text = change.text,
            }
            self.line_offsets = line_offsets(&self.text);
        }
        self.version = version;
    }

    fn replace(&mut self, range: Range, text: &str) {
        let start = self.offset_at(range.start);
        let end = self.offset_at(range.end).max(start);
        self.text.replace_range(start..end, text);
    }

    /// Byte offset of the end of `line`, before its line break
    fn line_end(&self, line: usize) -> usize {
        let next = self
            .line_offsets
            .get(line + 1)
            .copied()
            .unwrap_or(self.text.len());
        let content = &self.text[self.line_offsets[line]..next];
        let trimmed = content.trim_end_matches(['\n', '\r']);
        self.line_offsets[line] + trimmed.len()
    }
}

fn line_offsets(text: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                offsets.push(i + 2);
                i += 2;
                continue;
            }
            b'\r' | b'\n' => offsets.push(i + 1),
            _ => {}
        }
        i += 1;
    }
    offsets
}
