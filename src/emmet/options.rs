//! Engine options.
//!
//! [`EmmetOptions`] is the client-facing configuration forwarded with every
//! completion request. [`ExpandOptions`] is what a single expansion sees.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub(crate) const SELF_CLOSING_STYLE: &str = "output.selfClosingStyle";
pub(crate) const INDENT: &str = "output.indent";
pub(crate) const INT_UNIT: &str = "stylesheet.intUnit";
pub(crate) const FLOAT_UNIT: &str = "stylesheet.floatUnit";

/// Treat an explicit `null` like a missing field
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn default_true() -> bool {
    true
}

/// Like [`nullable`] for flags that default to `true`
fn nullable_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer).map(|flag| flag.unwrap_or(true))
}

/// When the expanded abbreviation is offered as a completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShowExpandedAbbreviation {
    #[default]
    Always,
    InMarkupAndStylesheetFilesOnly,
    Never,
}

/// Client configuration for completions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmmetOptions {
    #[serde(default, deserialize_with = "nullable")]
    pub show_expanded_abbreviation: ShowExpandedAbbreviation,
    #[serde(default = "default_true", deserialize_with = "nullable_true")]
    pub show_abbreviation_suggestions: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub show_suggestions_as_snippets: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub syntax_profiles: HashMap<String, Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub variables: HashMap<String, String>,
    #[serde(default, deserialize_with = "nullable")]
    pub preferences: HashMap<String, Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub exclude_languages: Vec<String>,
    /// Fields the engine does not interpret, kept for round-tripping
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for EmmetOptions {
    fn default() -> Self {
        Self {
            show_expanded_abbreviation: ShowExpandedAbbreviation::default(),
            show_abbreviation_suggestions: true,
            show_suggestions_as_snippets: false,
            syntax_profiles: HashMap::new(),
            variables: HashMap::new(),
            preferences: HashMap::new(),
            exclude_languages: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl EmmetOptions {
    /// Options for expanding an abbreviation of `syntax` during completion
    pub fn expand_options(&self, syntax: &str) -> ExpandOptions {
        let mut options = HashMap::new();

        for (key, value) in &self.preferences {
            let key = match key.as_str() {
                "css.intUnit" => INT_UNIT.to_string(),
                "css.floatUnit" => FLOAT_UNIT.to_string(),
                other => other.to_string(),
            };
            options.insert(key, value.clone());
        }

        if let Some(Value::Object(profile)) = self.syntax_profiles.get(syntax) {
            if let Some(style) = profile.get("selfClosingStyle") {
                options.insert(SELF_CLOSING_STYLE.to_string(), style.clone());
            }
        }

        ExpandOptions {
            syntax: Some(syntax.to_string()),
            variables: self.variables.clone(),
            options,
            extra: Map::new(),
        }
    }
}

/// Options for a single expansion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpandOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub variables: HashMap<String, String>,
    /// Output options keyed like `output.selfClosingStyle`
    #[serde(default, deserialize_with = "nullable")]
    pub options: HashMap<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExpandOptions {
    pub fn with_syntax(syntax: impl Into<String>) -> Self {
        Self {
            syntax: Some(syntax.into()),
            ..Default::default()
        }
    }

    /// Fill in `syntax` unless the caller already set one
    pub fn with_default_syntax(mut self, syntax: impl Into<String>) -> Self {
        if self.syntax.as_deref().is_none_or(str::is_empty) {
            self.syntax = Some(syntax.into());
        }
        self
    }

    pub(crate) fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }
}
