//! Find the abbreviation that ends at the cursor.

use std::sync::LazyLock;

use regex::Regex;

/// A `>` that closes a tag rather than descending into a child
static TAG_CLOSE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"</?[A-Za-z][\w:.-]*(?:\s[^<>]*)?/?>$"#).ok());

const OPERATORS: &[char] = &['#', '.', '*', ':', '$', '-', '_', '!', '@', '%', '^', '+', '>', '/'];

/// Abbreviation ending at the end of `line`, with its byte offset in `line`
pub fn extract_abbreviation(line: &str) -> Option<(usize, &str)> {
    let mut start = line.len();
    let mut closers: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut groups = 0usize;

    for (i, c) in line.char_indices().rev() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            start = i;
            continue;
        }

        if let Some(&closer) = closers.last() {
            match c {
                '"' | '\'' => quote = Some(c),
                ']' | '}' => closers.push(c),
                '[' | '{' => {
                    let expected = if c == '[' { ']' } else { '}' };
                    if closer != expected {
                        return None;
                    }
                    closers.pop();
                }
                _ => {}
            }
            start = i;
            continue;
        }

        match c {
            ']' | '}' => closers.push(c),
            '[' | '{' => break,
            ')' => groups += 1,
            // An unmatched `(` belongs to the surrounding code
            '(' if groups == 0 => break,
            '(' => groups -= 1,
            '>' if TAG_CLOSE
                .as_ref()
                .is_some_and(|re| re.is_match(&line[..=i])) =>
            {
                break;
            }
            c if c.is_alphanumeric() || OPERATORS.contains(&c) => {}
            _ => break,
        }
        start = i;
    }

    if quote.is_some() || !closers.is_empty() {
        return None;
    }

    let abbreviation = &line[start..];
    if abbreviation.is_empty() || abbreviation.starts_with(['>', '+', '^', '*', '/', ')']) {
        return None;
    }
    Some((start, abbreviation))
}
