use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use emmet_language_server::emmet::{
    EmmetOptions, ExpandError, ExpandOptions, ExtensionError, GrammarEngine,
};
use emmet_language_server::fs::FileService;
use emmet_language_server::lsp::{build_service, Backend, ExpandAbbreviationParams, TextDocument};
use emmet_language_server::{Config, Emmet, HtmlMatcher};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower_lsp::lsp_types::*;
use tower_lsp::{LanguageServer, LspService};

fn initialize_params(options: Value) -> InitializeParams {
    serde_json::from_value(json!({
        "processId": null,
        "rootUri": null,
        "capabilities": {},
        "initializationOptions": options
    }))
    .unwrap()
}

fn completion_params(uri: &Url, line: u32, character: u32) -> CompletionParams {
    CompletionParams {
        text_document_position: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position: Position::new(line, character),
        },
        work_done_progress_params: Default::default(),
        partial_result_params: Default::default(),
        context: None,
    }
}

async fn open(backend: &Backend, uri: &Url, language: &str, text: &str) {
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: language.to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
}

fn first_edit(response: Option<CompletionResponse>) -> String {
    let list = match response {
        Some(CompletionResponse::List(list)) => list,
        other => panic!("expected a completion list, got {:?}", other),
    };
    match &list.items[0].text_edit {
        Some(CompletionTextEdit::Edit(edit)) => edit.new_text.clone(),
        other => panic!("unexpected edit {:?}", other),
    }
}

/// Engine double that records what the router hands it
#[derive(Default)]
struct RecordingEngine {
    loaded: Mutex<Vec<Vec<PathBuf>>>,
    completed: Mutex<Vec<String>>,
    expanded: Mutex<Vec<ExpandOptions>>,
}

#[tower_lsp::async_trait]
impl GrammarEngine for RecordingEngine {
    fn syntax_for_language(&self, language: &str) -> Option<String> {
        Emmet::new().syntax_for_language(language)
    }

    fn complete(
        &self,
        _document: &TextDocument,
        _position: Position,
        syntax: &str,
        _options: &EmmetOptions,
    ) -> Option<CompletionList> {
        self.completed.lock().unwrap().push(syntax.to_string());
        Some(CompletionList {
            is_incomplete: false,
            items: vec![CompletionItem::new_simple(syntax.to_string(), "recorded".into())],
        })
    }

    fn expand(&self, abbreviation: &str, options: &ExpandOptions) -> Result<String, ExpandError> {
        self.expanded.lock().unwrap().push(options.clone());
        Ok(abbreviation.to_string())
    }

    async fn load_extensions(
        &self,
        paths: &[PathBuf],
        _files: &dyn FileService,
    ) -> Result<(), ExtensionError> {
        self.loaded.lock().unwrap().push(paths.to_vec());
        Ok(())
    }
}

fn recording_service(working_dir: &str) -> (LspService<Backend>, Arc<RecordingEngine>) {
    let engine = Arc::new(RecordingEngine::default());
    let shared = Arc::clone(&engine);
    let (service, _) = LspService::new(move |client| {
        Backend::with_engine(
            client,
            Config::new(working_dir),
            shared.clone(),
            Arc::new(HtmlMatcher),
        )
    });
    (service, engine)
}

#[tokio::test]
async fn test_extension_paths_are_normalized() {
    let (service, engine) = recording_service("/proj");
    let backend = service.inner();

    backend
        .initialize(initialize_params(json!({
            "extensionsPath": ["./snippets", "/abs/other"]
        })))
        .await
        .unwrap();

    let loaded = engine.loaded.lock().unwrap().clone();
    assert_eq!(
        loaded,
        vec![vec![
            PathBuf::from("/proj/snippets"),
            PathBuf::from("/abs/other")
        ]]
    );
}

#[tokio::test]
async fn test_completion_for_unknown_document_is_none() {
    let (service, _) = build_service(Config::new("/"));
    let backend = service.inner();
    backend.initialize(initialize_params(json!({}))).await.unwrap();

    let uri = Url::parse("file:///nowhere.html").unwrap();
    let response = backend.completion(completion_params(&uri, 0, 0)).await;
    assert!(matches!(response, Ok(None)));
}

#[tokio::test]
async fn test_completion_receives_resolved_grammar() {
    let (service, engine) = recording_service("/");
    let backend = service.inner();
    backend
        .initialize(initialize_params(json!({ "includeLanguages": { "elixir": "html" } })))
        .await
        .unwrap();

    let html = Url::parse("file:///a.html").unwrap();
    open(backend, &html, "html", "<style>.a{c:r}</style>").await;
    backend.completion(completion_params(&html, 0, 10)).await.unwrap();
    backend.completion(completion_params(&html, 0, 0)).await.unwrap();

    let elixir = Url::parse("file:///a.ex").unwrap();
    open(backend, &elixir, "elixir", "<style>x</style>").await;
    backend.completion(completion_params(&elixir, 0, 8)).await.unwrap();

    let completed = engine.completed.lock().unwrap().clone();
    assert_eq!(completed, vec!["css", "html", "html"]);
}

#[tokio::test]
async fn test_expansion_syntax_precedence() {
    let (service, engine) = recording_service("/");
    let backend = service.inner();
    backend.initialize(initialize_params(json!(null))).await.unwrap();

    backend
        .expand_abbreviation(ExpandAbbreviationParams {
            abbreviation: "m10".into(),
            language: "scss".into(),
            options: None,
        })
        .await
        .unwrap();
    backend
        .expand_abbreviation(ExpandAbbreviationParams {
            abbreviation: "div".into(),
            language: "scss".into(),
            options: Some(ExpandOptions::with_syntax("html")),
        })
        .await
        .unwrap();

    let syntaxes: Vec<_> = engine
        .expanded
        .lock()
        .unwrap()
        .iter()
        .map(|o| o.syntax.clone())
        .collect();
    assert_eq!(
        syntaxes,
        vec![Some("scss".to_string()), Some("html".to_string())]
    );
}

#[tokio::test]
async fn test_expand_ul_li() {
    let (service, _) = build_service(Config::new("/"));
    let backend = service.inner();
    backend.initialize(initialize_params(json!({}))).await.unwrap();

    let expanded = backend
        .expand_abbreviation(ExpandAbbreviationParams {
            abbreviation: "ul>li*3".into(),
            language: "html".into(),
            options: None,
        })
        .await
        .unwrap();

    let direct = Emmet::new()
        .expand("ul>li*3", &ExpandOptions::with_syntax("html"))
        .unwrap();
    assert_eq!(expanded, direct);
    assert_eq!(
        expanded,
        "<ul>\n\t<li>${1}</li>\n\t<li>${2}</li>\n\t<li>${3}</li>\n</ul>"
    );
}

#[tokio::test]
async fn test_expand_errors_are_invalid_params() {
    let (service, _) = build_service(Config::new("/"));
    let backend = service.inner();
    backend.initialize(initialize_params(json!({}))).await.unwrap();

    let err = backend
        .expand_abbreviation(ExpandAbbreviationParams {
            abbreviation: "(ul>li".into(),
            language: "html".into(),
            options: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, tower_lsp::jsonrpc::ErrorCode::InvalidParams);
}

#[tokio::test]
async fn test_initialize_fails_on_missing_extension_dir() {
    let dir = TempDir::new().unwrap();
    let (service, _) = build_service(Config::new(dir.path()));
    let backend = service.inner();

    let err = backend
        .initialize(initialize_params(json!({ "extensionsPath": ["./missing"] })))
        .await
        .unwrap_err();
    assert_eq!(err.code, tower_lsp::jsonrpc::ErrorCode::InternalError);
    assert!(err.message.contains("not a directory"));
}

#[tokio::test]
async fn test_custom_snippets_end_to_end() {
    let dir = TempDir::new().unwrap();
    let snippets = dir.path().join("snippets");
    fs::create_dir(&snippets).unwrap();
    fs::write(
        snippets.join("snippets.json"),
        r#"{ "html": { "snippets": { "card": "div.card>h2+p" } } }"#,
    )
    .unwrap();

    let (service, _) = build_service(Config::new(dir.path()));
    let backend = service.inner();
    backend
        .initialize(initialize_params(json!({ "extensionsPath": ["snippets"] })))
        .await
        .unwrap();

    let uri = Url::parse("file:///page.html").unwrap();
    open(backend, &uri, "html", "card").await;
    let edit = first_edit(backend.completion(completion_params(&uri, 0, 4)).await.unwrap());
    assert_eq!(edit, "<div class=\"card\">\n\t<h2>${1}</h2>\n\t<p>${2}</p>\n</div>");
}

#[tokio::test]
async fn test_incremental_changes_feed_completion() {
    let (service, _) = build_service(Config::new("/"));
    let backend = service.inner();
    backend.initialize(initialize_params(json!({}))).await.unwrap();

    let uri = Url::parse("file:///style.css").unwrap();
    open(backend, &uri, "css", "a {\n  \n}").await;
    backend
        .did_change(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version: 2,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: Some(Range::new(Position::new(1, 2), Position::new(1, 2))),
                range_length: None,
                text: "m10-20".into(),
            }],
        })
        .await;

    let edit = first_edit(backend.completion(completion_params(&uri, 1, 8)).await.unwrap());
    assert_eq!(edit, "margin: 10px 20px;");

    backend
        .did_close(DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
        })
        .await;
    let response = backend.completion(completion_params(&uri, 1, 8)).await.unwrap();
    assert!(response.is_none());
}

#[tokio::test]
async fn test_configuration_change_replaces_session() {
    let (service, engine) = recording_service("/");
    let backend = service.inner();
    backend.initialize(initialize_params(json!({}))).await.unwrap();

    backend
        .did_change_configuration(DidChangeConfigurationParams {
            settings: json!({ "emmet": { "includeLanguages": { "elixir": "css" } } }),
        })
        .await;

    let uri = Url::parse("file:///a.ex").unwrap();
    open(backend, &uri, "elixir", "m10").await;
    backend.completion(completion_params(&uri, 0, 3)).await.unwrap();

    assert_eq!(engine.completed.lock().unwrap().clone(), vec!["css"]);
    assert_eq!(backend.session.snapshot().await.include_languages.len(), 1);
}

#[tokio::test]
async fn test_unrelated_settings_keep_initialization_config() {
    let (service, engine) = recording_service("/proj");
    let backend = service.inner();
    backend
        .initialize(initialize_params(json!({
            "includeLanguages": { "elixir": "css" },
            "extensionsPath": ["./snippets"]
        })))
        .await
        .unwrap();

    for settings in [json!({}), json!({ "tailwindCSS": { "emmetCompletions": true } })] {
        backend
            .did_change_configuration(DidChangeConfigurationParams { settings })
            .await;
    }

    let uri = Url::parse("file:///a.ex").unwrap();
    open(backend, &uri, "elixir", "m10").await;
    backend.completion(completion_params(&uri, 0, 3)).await.unwrap();

    assert_eq!(engine.completed.lock().unwrap().clone(), vec!["css"]);
    let session = backend.session.snapshot().await;
    assert_eq!(session.extensions_path, vec!["./snippets".to_string()]);
    assert_eq!(engine.loaded.lock().unwrap().len(), 1);
}
