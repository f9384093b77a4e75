//! Loading custom snippets and syntax profiles from extension directories.
//!
//! Each directory may hold a `snippets.json` and a `syntaxProfiles.json`.
//! Both are optional. Directories are applied in order, so a later one
//! overrides snippets of the same name from an earlier one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tower_lsp::lsp_types::Url;

use super::snippets::SnippetRegistry;
use crate::fs::{FileError, FileService, FileType};

pub const SNIPPETS_FILE: &str = "snippets.json";
pub const PROFILES_FILE: &str = "syntaxProfiles.json";

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error("extension path {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("extension path {} is not absolute", .0.display())]
    InvalidPath(PathBuf),

    #[error("invalid JSON in {}: {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read every directory in `paths` into a fresh registry
pub async fn load_snippet_registry(
    paths: &[PathBuf],
    files: &dyn FileService,
) -> Result<SnippetRegistry, ExtensionError> {
    let mut registry = SnippetRegistry::new();

    for dir in paths {
        let uri = Url::from_directory_path(dir)
            .map_err(|_| ExtensionError::InvalidPath(dir.clone()))?;
        if !files.stat(&uri).await?.is_directory() {
            return Err(ExtensionError::NotADirectory(dir.clone()));
        }

        if let Some(snippets) = read_json(&dir.join(SNIPPETS_FILE), files).await? {
            apply_snippets(&mut registry, snippets);
        }
        if let Some(profiles) = read_json(&dir.join(PROFILES_FILE), files).await? {
            apply_profiles(&mut registry, profiles);
        }
        log::debug!("Read extension directory {}", dir.display());
    }

    Ok(registry)
}

/// Parse an optional JSON object. `None` when the file does not exist.
async fn read_json(
    path: &Path,
    files: &dyn FileService,
) -> Result<Option<Map<String, Value>>, ExtensionError> {
    let uri =
        Url::from_file_path(path).map_err(|_| ExtensionError::InvalidPath(path.to_path_buf()))?;

    if files.stat(&uri).await?.kind == FileType::Unknown {
        return Ok(None);
    }

    let bytes = files.read_file(&uri).await?;
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
    let value: Value =
        serde_json::from_slice(bytes).map_err(|source| ExtensionError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;

    match value {
        Value::Object(map) => Ok(Some(map)),
        _ => {
            log::warn!("Ignoring {}: expected a JSON object", path.display());
            Ok(None)
        }
    }
}

fn apply_snippets(registry: &mut SnippetRegistry, root: Map<String, Value>) {
    for (key, value) in root {
        let Value::Object(section) = value else {
            continue;
        };

        if key == "variables" {
            for (name, value) in section {
                if let Value::String(value) = value {
                    registry.add_variable(&name, &value);
                }
            }
            continue;
        }

        let Some(Value::Object(snippets)) = section.get("snippets") else {
            continue;
        };
        for (name, value) in snippets {
            match value {
                Value::String(value) => registry.add_snippet(&key, name, value),
                _ => log::warn!("Ignoring snippet {key}/{name}: value is not a string"),
            }
        }
    }
}

fn apply_profiles(registry: &mut SnippetRegistry, root: Map<String, Value>) {
    for (syntax, value) in root {
        if let Value::Object(profile) = value {
            let profile: HashMap<String, Value> = profile.into_iter().collect();
            registry.add_profile(&syntax, profile);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFileService;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_snippets_and_profiles() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SNIPPETS_FILE),
            r#"{
                "variables": { "lang": "fr" },
                "html": { "snippets": { "card": "div.card>h2" } },
                "css": { "snippets": { "cen": "text-align: center" } }
            }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(PROFILES_FILE),
            r#"{ "html": { "selfClosingStyle": "xhtml" }, "xml": "ignored" }"#,
        )
        .unwrap();

        let registry = load_snippet_registry(&[dir.path().to_path_buf()], &LocalFileService)
            .await
            .unwrap();

        assert_eq!(registry.snippet("html", "card"), Some("div.card>h2"));
        assert_eq!(registry.snippet("scss", "cen"), Some("text-align: center"));
        assert_eq!(registry.variables().get("lang").map(String::as_str), Some("fr"));
        assert_eq!(
            registry.profile("html").and_then(|p| p.get("selfClosingStyle")),
            Some(&Value::from("xhtml"))
        );
        assert!(registry.profile("xml").is_none());
    }

    #[tokio::test]
    async fn test_empty_directory_is_fine() {
        let dir = TempDir::new().unwrap();
        let registry = load_snippet_registry(&[dir.path().to_path_buf()], &LocalFileService)
            .await
            .unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_later_directories_override() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(
            first.path().join(SNIPPETS_FILE),
            r#"{ "html": { "snippets": { "x": "div", "y": "p" } } }"#,
        )
        .unwrap();
        fs::write(
            second.path().join(SNIPPETS_FILE),
            r#"{ "html": { "snippets": { "x": "span" } } }"#,
        )
        .unwrap();

        let paths = [first.path().to_path_buf(), second.path().to_path_buf()];
        let registry = load_snippet_registry(&paths, &LocalFileService).await.unwrap();
        assert_eq!(registry.snippet("html", "x"), Some("span"));
        assert_eq!(registry.snippet("html", "y"), Some("p"));
    }

    #[tokio::test]
    async fn test_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let err = load_snippet_registry(&[missing.clone()], &LocalFileService)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtensionError::NotADirectory(path) if path == missing));

        let err = load_snippet_registry(&[PathBuf::from("relative")], &LocalFileService)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtensionError::InvalidPath(_)));

        fs::write(dir.path().join(SNIPPETS_FILE), "{ not json").unwrap();
        let err = load_snippet_registry(&[dir.path().to_path_buf()], &LocalFileService)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtensionError::InvalidJson { .. }));
    }
}
