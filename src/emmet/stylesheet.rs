//! Stylesheet expansion.
//!
//! `m10-20+c#f!` becomes one declaration per `+` separated part:
//! `margin: 10px 20px;` and `color: #fff !important;`.

use super::options::{ExpandOptions, FLOAT_UNIT, INT_UNIT};
use super::snippets::SnippetRegistry;
use super::ExpandError;

/// Abbreviation to property name
const PROPERTIES: &[(&str, &str)] = &[
    ("pos", "position"),
    ("t", "top"),
    ("r", "right"),
    ("b", "bottom"),
    ("l", "left"),
    ("z", "z-index"),
    ("d", "display"),
    ("fl", "float"),
    ("cl", "clear"),
    ("v", "visibility"),
    ("ov", "overflow"),
    ("ovx", "overflow-x"),
    ("ovy", "overflow-y"),
    ("bxz", "box-sizing"),
    ("w", "width"),
    ("h", "height"),
    ("maw", "max-width"),
    ("mah", "max-height"),
    ("miw", "min-width"),
    ("mih", "min-height"),
    ("m", "margin"),
    ("mt", "margin-top"),
    ("mr", "margin-right"),
    ("mb", "margin-bottom"),
    ("ml", "margin-left"),
    ("p", "padding"),
    ("pt", "padding-top"),
    ("pr", "padding-right"),
    ("pb", "padding-bottom"),
    ("pl", "padding-left"),
    ("bd", "border"),
    ("bdt", "border-top"),
    ("bdr", "border-right"),
    ("bdb", "border-bottom"),
    ("bdl", "border-left"),
    ("bdc", "border-color"),
    ("bds", "border-style"),
    ("bdw", "border-width"),
    ("bdrs", "border-radius"),
    ("bg", "background"),
    ("bgc", "background-color"),
    ("bgi", "background-image"),
    ("bgr", "background-repeat"),
    ("bgp", "background-position"),
    ("bgsz", "background-size"),
    ("c", "color"),
    ("op", "opacity"),
    ("ff", "font-family"),
    ("fz", "font-size"),
    ("fw", "font-weight"),
    ("fs", "font-style"),
    ("lh", "line-height"),
    ("ta", "text-align"),
    ("td", "text-decoration"),
    ("tt", "text-transform"),
    ("ti", "text-indent"),
    ("tsh", "text-shadow"),
    ("lts", "letter-spacing"),
    ("ws", "white-space"),
    ("va", "vertical-align"),
    ("cur", "cursor"),
    ("ol", "outline"),
    ("trf", "transform"),
    ("trs", "transition"),
    ("anim", "animation"),
    ("bsh", "box-shadow"),
    ("cnt", "content"),
    ("lis", "list-style"),
    ("list", "list-style-type"),
    ("fx", "flex"),
    ("fxd", "flex-direction"),
    ("fxw", "flex-wrap"),
    ("fxg", "flex-grow"),
    ("fxsh", "flex-shrink"),
    ("fxb", "flex-basis"),
    ("jc", "justify-content"),
    ("ai", "align-items"),
    ("ac", "align-content"),
    ("as", "align-self"),
    ("ord", "order"),
    ("gap", "gap"),
    ("g", "grid"),
    ("gtc", "grid-template-columns"),
    ("gtr", "grid-template-rows"),
    ("zm", "zoom"),
];

/// Abbreviations that expand to a complete declaration
const DECLARATIONS: &[(&str, &str)] = &[
    ("d:n", "display: none"),
    ("d:b", "display: block"),
    ("d:i", "display: inline"),
    ("d:ib", "display: inline-block"),
    ("d:f", "display: flex"),
    ("d:if", "display: inline-flex"),
    ("d:g", "display: grid"),
    ("dn", "display: none"),
    ("db", "display: block"),
    ("dib", "display: inline-block"),
    ("df", "display: flex"),
    ("dg", "display: grid"),
    ("pos:a", "position: absolute"),
    ("pos:r", "position: relative"),
    ("pos:f", "position: fixed"),
    ("pos:s", "position: static"),
    ("posa", "position: absolute"),
    ("posr", "position: relative"),
    ("fl:l", "float: left"),
    ("fl:r", "float: right"),
    ("fl:n", "float: none"),
    ("cl:b", "clear: both"),
    ("ta:c", "text-align: center"),
    ("ta:l", "text-align: left"),
    ("ta:r", "text-align: right"),
    ("ta:j", "text-align: justify"),
    ("tac", "text-align: center"),
    ("fw:b", "font-weight: bold"),
    ("fw:n", "font-weight: normal"),
    ("fwb", "font-weight: bold"),
    ("fs:i", "font-style: italic"),
    ("td:n", "text-decoration: none"),
    ("td:u", "text-decoration: underline"),
    ("tt:u", "text-transform: uppercase"),
    ("ov:h", "overflow: hidden"),
    ("ov:a", "overflow: auto"),
    ("ov:s", "overflow: scroll"),
    ("v:h", "visibility: hidden"),
    ("bxz:bb", "box-sizing: border-box"),
    ("cur:p", "cursor: pointer"),
    ("jc:c", "justify-content: center"),
    ("jc:sb", "justify-content: space-between"),
    ("ai:c", "align-items: center"),
    ("fxd:c", "flex-direction: column"),
    ("fxd:r", "flex-direction: row"),
    ("fxw:w", "flex-wrap: wrap"),
    ("m:a", "margin: auto"),
    ("bd:n", "border: none"),
];

/// Value aliases accepted after `property:`
const KEYWORDS: &[(&str, &str)] = &[
    ("a", "auto"),
    ("n", "none"),
    ("i", "inherit"),
    ("t", "transparent"),
];

const UNITLESS: &[&str] = &[
    "z-index",
    "opacity",
    "line-height",
    "font-weight",
    "flex-grow",
    "flex-shrink",
    "order",
    "zoom",
    "flex",
];

const DEFAULT_INT_UNIT: &str = "px";
const DEFAULT_FLOAT_UNIT: &str = "em";

/// Indentation based syntaxes that end declarations without `;`
const NO_SEMICOLON: &[&str] = &["sass", "stylus", "sss"];

/// Expand a stylesheet abbreviation
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

    let units = Units {
        int: options.option_str(INT_UNIT).unwrap_or(DEFAULT_INT_UNIT),
        float: options.option_str(FLOAT_UNIT).unwrap_or(DEFAULT_FLOAT_UNIT),
    };
    let terminator = if NO_SEMICOLON.contains(&syntax) { "" } else { ";" };

    let mut field = 0;
    let mut lines = Vec::new();
    for part in abbreviation.split('+') {
        if part.is_empty() {
            return Err(ExpandError::UnexpectedEnd);
        }
        let (part, important) = match part.strip_suffix('!') {
            Some(rest) => (rest, true),
            None => (part, false),
        };

        let Declaration { property, value } =
            declaration(part, syntax, registry, &units, Lookup::Fuzzy)?;
        let value = value.unwrap_or_else(|| {
            field += 1;
            format!("${{{field}}}")
        });

        let line = match property {
            Some(property) => format!("{property}: {value}"),
            None => value,
        };
        let important = if important { " !important" } else { "" };
        lines.push(format!("{line}{important}{terminator}"));
    }

    Ok(lines.join("\n"))
}

/// Whether every part of the abbreviation resolves to a known property
pub fn is_known_abbreviation(abbreviation: &str, syntax: &str, registry: &SnippetRegistry) -> bool {
    let units = Units {
        int: DEFAULT_INT_UNIT,
        float: DEFAULT_FLOAT_UNIT,
    };
    !abbreviation.is_empty()
        && abbreviation.split('+').all(|part| {
            let part = part.strip_suffix('!').unwrap_or(part);
            matches!(
                declaration(part, syntax, registry, &units, Lookup::Exact),
                Ok(Declaration {
                    property: Some(_),
                    ..
                })
            )
        })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Exact,
    Fuzzy,
}

struct Units<'a> {
    int: &'a str,
    float: &'a str,
}

/// A declaration before formatting. A missing value becomes a tab stop.
struct Declaration {
    property: Option<String>,
    value: Option<String>,
}

impl Declaration {
    fn from_text(text: &str) -> Self {
        let text = text.trim().trim_end_matches(';');
        match text.split_once(':') {
            Some((property, value)) if !value.trim().is_empty() => Self {
                property: Some(property.trim().to_string()),
                value: Some(value.trim().to_string()),
            },
            Some((property, _)) => Self {
                property: Some(property.trim().to_string()),
                value: None,
            },
            None => Self {
                property: None,
                value: Some(text.to_string()),
            },
        }
    }
}

fn declaration(
    part: &str,
    syntax: &str,
    registry: &SnippetRegistry,
    units: &Units<'_>,
    lookup: Lookup,
) -> Result<Declaration, ExpandError> {
    if let Some(custom) = registry.snippet(syntax, part) {
        return Ok(Declaration::from_text(custom));
    }
    if let Some(text) = find(DECLARATIONS, part) {
        return Ok(Declaration::from_text(text));
    }
    if let Some(property) = find(PROPERTIES, part) {
        return Ok(Declaration {
            property: Some(property.to_string()),
            value: None,
        });
    }

    if let Some((name, value)) = part.split_once(':') {
        let Some(property) = property_for(name, lookup) else {
            return Ok(unknown(part, lookup));
        };
        let value = match find(KEYWORDS, value) {
            Some(keyword) => Some(keyword.to_string()),
            None if value.is_empty() => None,
            None if starts_value(value) => Some(parse_values(value, &property, units)?),
            None => Some(value.to_string()),
        };
        return Ok(Declaration {
            property: Some(property),
            value,
        });
    }

    let split = value_start(part);
    let (name, values) = part.split_at(split);
    let Some(property) = property_for(name, lookup) else {
        return Ok(unknown(part, lookup));
    };
    let value = if values.is_empty() {
        None
    } else {
        Some(parse_values(values, &property, units)?)
    };

    Ok(Declaration {
        property: Some(property),
        value,
    })
}

/// Words nobody knows expand to themselves with an empty value
fn unknown(part: &str, lookup: Lookup) -> Declaration {
    Declaration {
        property: (lookup == Lookup::Fuzzy).then(|| part.to_string()),
        value: None,
    }
}

fn find(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(abbr, _)| *abbr == key)
        .map(|(_, value)| *value)
}

fn property_for(name: &str, lookup: Lookup) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    if let Some(property) = find(PROPERTIES, name) {
        return Some(property.to_string());
    }
    if PROPERTIES.iter().any(|(_, property)| *property == name) {
        return Some(name.to_string());
    }
    if lookup == Lookup::Fuzzy {
        return PROPERTIES
            .iter()
            .find(|(_, property)| property.starts_with(name))
            .map(|(_, property)| property.to_string());
    }
    None
}

fn starts_value(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() || c == '.' || c == '#' => true,
        Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit() || c == '.'),
        _ => false,
    }
}

/// Byte offset where the property name ends and values begin
fn value_start(part: &str) -> usize {
    part.char_indices()
        .find(|(i, _)| starts_value(&part[*i..]))
        .map_or(part.len(), |(i, _)| i)
}

fn parse_values(text: &str, property: &str, units: &Units<'_>) -> Result<String, ExpandError> {
    let chars: Vec<char> = text.chars().collect();
    let mut values = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let start = i;
        if chars[i] == '#' {
            i += 1;
            while chars.get(i).is_some_and(char::is_ascii_hexdigit) {
                i += 1;
            }
            let hex: String = chars[start + 1..i].iter().collect();
            values.push(color(&hex));
        } else {
            if chars[i] == '-' {
                i += 1;
            }
            while chars.get(i).is_some_and(|c| c.is_ascii_digit() || *c == '.') {
                i += 1;
            }
            let number: String = chars[start..i].iter().collect();
            let unit_start = i;
            while chars.get(i).is_some_and(|c| c.is_ascii_alphabetic() || *c == '%') {
                i += 1;
            }
            let unit: String = chars[unit_start..i].iter().collect();
            if number.is_empty() || number == "-" {
                return Err(unexpected(&chars, start));
            }
            values.push(number_value(&number, &unit, property, units));
        }

        match chars.get(i) {
            None => break,
            Some('-') if chars.get(i + 1).is_some() => {
                // `10--20` separates 10 from -20
                i += 1;
            }
            Some('#') => {}
            Some(_) => return Err(unexpected(&chars, i)),
        }
    }

    Ok(values.join(" "))
}

fn unexpected(chars: &[char], pos: usize) -> ExpandError {
    match chars.get(pos) {
        Some(found) => ExpandError::Unexpected { found: *found, pos },
        None => ExpandError::UnexpectedEnd,
    }
}

fn number_value(number: &str, unit: &str, property: &str, units: &Units<'_>) -> String {
    let is_float = number.contains('.');
    let number = match number.strip_prefix("-.") {
        Some(rest) => format!("-0.{rest}"),
        None => match number.strip_prefix('.') {
            Some(rest) => format!("0.{rest}"),
            None => number.to_string(),
        },
    };

    let unit = match unit {
        "p" => "%",
        "e" => "em",
        "x" => "ex",
        "r" => "rem",
        "" if UNITLESS.contains(&property) => "",
        "" if number.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') => "",
        "" if is_float => units.float,
        "" => units.int,
        other => other,
    };

    format!("{number}{unit}")
}

fn color(hex: &str) -> String {
    let hex = hex.to_ascii_lowercase();
    match hex.len() {
        0 => "#000".to_string(),
        1 => format!("#{}", hex.repeat(3)),
        2 => format!("#{}", hex.repeat(3)),
        _ => format!("#{hex}"),
    }
}
