//! Session Configuration
//!
//! The configuration a client hands over in `initializationOptions`, kept
//! for the lifetime of the connection. Requests read an immutable snapshot;
//! a reconfiguration swaps in a new one.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::emmet::options::nullable;
use crate::emmet::EmmetOptions;

/// Per-session settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Options forwarded to the engine with every completion
    #[serde(flatten)]
    pub emmet: EmmetOptions,

    /// Directories holding `snippets.json` / `syntaxProfiles.json`
    #[serde(default, deserialize_with = "nullable")]
    pub extensions_path: Vec<String>,

    /// Host language to grammar overrides, e.g. `{"elixir": "html"}`
    #[serde(default, deserialize_with = "nullable")]
    pub include_languages: HashMap<String, String>,
}

impl SessionConfig {
    /// Build from the `initializationOptions` of an `initialize` request
    pub fn from_initialization_options(options: Option<Value>) -> Self {
        match options {
            None | Some(Value::Null) => Self::default(),
            Some(value) => serde_json::from_value(value).unwrap_or_else(|err| {
                log::warn!("Ignoring malformed initialization options: {}", err);
                Self::default()
            }),
        }
    }

    /// Build from the `emmet` section of a `workspace/didChangeConfiguration`
    /// payload. `None` when the payload carries no such section.
    pub fn from_settings(settings: &Value) -> Option<Self> {
        let section = match settings.get("emmet") {
            Some(section @ Value::Object(_)) => section,
            _ => return None,
        };

        match serde_json::from_value(section.clone()) {
            Ok(config) => Some(config),
            Err(err) => {
                log::warn!("Ignoring malformed configuration change: {}", err);
                None
            }
        }
    }

    /// Extension directories as absolute paths
    pub fn extension_directories(&self, cwd: &Path) -> Vec<PathBuf> {
        normalize_extensions_path(&self.extensions_path, cwd)
    }
}

/// Resolve extension directories against `cwd`. Blank entries are dropped.
pub fn normalize_extensions_path(paths: &[String], cwd: &Path) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| {
            let path = Path::new(p);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                normalize(&cwd.join(path))
            }
        })
        .collect()
}

/// Lexical normalisation: drops `.` and folds `..` without touching the disk
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Shared holder for the current [`SessionConfig`]
#[derive(Debug, Default)]
pub struct SessionState {
    current: RwLock<Arc<SessionConfig>>,
}

impl SessionState {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// The configuration in effect right now
    pub async fn snapshot(&self) -> Arc<SessionConfig> {
        Arc::clone(&*self.current.read().await)
    }

    /// Replace the configuration as a whole
    pub async fn replace(&self, config: SessionConfig) {
        *self.current.write().await = Arc::new(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_options_default() {
        let config = SessionConfig::from_initialization_options(None);
        assert_eq!(config, SessionConfig::default());
        assert!(config.include_languages.is_empty());
        assert!(config.extensions_path.is_empty());
    }

    #[test]
    fn test_parse_initialization_options() {
        let config = SessionConfig::from_initialization_options(Some(json!({
            "includeLanguages": { "elixir": "html" },
            "extensionsPath": ["./snippets"],
            "showSuggestionsAsSnippets": true,
            "somethingElse": 1
        })));

        assert_eq!(
            config.include_languages.get("elixir").map(String::as_str),
            Some("html")
        );
        assert_eq!(config.extensions_path, vec!["./snippets".to_string()]);
        assert!(config.emmet.show_suggestions_as_snippets);
        assert_eq!(config.emmet.extra.get("somethingElse"), Some(&json!(1)));
    }

    #[test]
    fn test_null_fields_default() {
        let config = SessionConfig::from_initialization_options(Some(json!({
            "includeLanguages": null,
            "extensionsPath": null
        })));
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_null_suggestion_flag_keeps_payload() {
        let config = SessionConfig::from_initialization_options(Some(json!({
            "showAbbreviationSuggestions": null,
            "includeLanguages": { "elixir": "html" }
        })));
        assert!(config.emmet.show_abbreviation_suggestions);
        assert_eq!(config.include_languages.len(), 1);
    }

    #[test]
    fn test_malformed_options_default() {
        let config = SessionConfig::from_initialization_options(Some(json!({
            "includeLanguages": ["not", "a", "map"]
        })));
        assert_eq!(config, SessionConfig::default());

        let config = SessionConfig::from_initialization_options(Some(json!("text")));
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_settings_section() {
        let wrapped = json!({ "emmet": { "includeLanguages": { "php": "html" } } });
        let config = SessionConfig::from_settings(&wrapped).unwrap();
        assert_eq!(config.include_languages.len(), 1);

        let wrapped = json!({ "emmet": { "excludeLanguages": ["markdown"] } });
        let config = SessionConfig::from_settings(&wrapped).unwrap();
        assert_eq!(config.emmet.exclude_languages, vec!["markdown".to_string()]);

        assert!(SessionConfig::from_settings(&json!(null)).is_none());
    }

    #[test]
    fn test_settings_without_emmet_section_are_ignored() {
        assert!(SessionConfig::from_settings(&json!({})).is_none());
        assert!(SessionConfig::from_settings(&json!({ "emmet": null })).is_none());
        assert!(
            SessionConfig::from_settings(&json!({
                "tailwindCSS": { "includeLanguages": { "elixir": "html" } },
                "excludeLanguages": ["markdown"]
            }))
            .is_none()
        );
    }

    #[test]
    fn test_normalize_extensions_path() {
        let cwd = Path::new("/proj");
        let paths = vec![
            "./snippets".to_string(),
            "/abs/dir".to_string(),
            "../shared/./emmet".to_string(),
            "  ".to_string(),
        ];
        assert_eq!(
            normalize_extensions_path(&paths, cwd),
            vec![
                PathBuf::from("/proj/snippets"),
                PathBuf::from("/abs/dir"),
                PathBuf::from("/shared/emmet"),
            ]
        );
    }

    #[tokio::test]
    async fn test_snapshots_survive_replacement() {
        let state = SessionState::new(SessionConfig::default());
        let before = state.snapshot().await;

        let mut next = SessionConfig::default();
        next.include_languages.insert("elixir".into(), "html".into());
        state.replace(next).await;

        assert!(before.include_languages.is_empty());
        assert_eq!(state.snapshot().await.include_languages.len(), 1);
    }
}
