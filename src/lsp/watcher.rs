//! Live reload of extension directories.
//!
//! Watches each directory non-recursively and reloads every directory into
//! the engine when a `snippets.json` or `syntaxProfiles.json` changes. A
//! failed reload is reported and the previous snippets stay active.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_lsp::lsp_types::MessageType;
use tower_lsp::Client;

use crate::emmet::extensions::{PROFILES_FILE, SNIPPETS_FILE};
use crate::emmet::GrammarEngine;
use crate::fs::LocalFileService;

/// Events bursting in within this window trigger a single reload
const SETTLE_TIME: Duration = Duration::from_millis(100);

/// Events from the file watcher
#[derive(Debug)]
enum WatcherEvent {
    ExtensionFileChanged(PathBuf),
    WatcherError(notify::Error),
}

/// Running watcher; dropping it stops watching
pub struct ExtensionWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for ExtensionWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionWatcher").finish_non_exhaustive()
    }
}

impl Drop for ExtensionWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn is_extension_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name == SNIPPETS_FILE || name == PROFILES_FILE)
}

impl ExtensionWatcher {
    /// Watch `dirs` and reload them into `engine` on change
    pub fn start(
        dirs: Vec<PathBuf>,
        engine: Arc<dyn GrammarEngine>,
        client: Client,
    ) -> notify::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if let EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) =
                        event.kind
                    {
                        for path in event.paths {
                            if is_extension_file(&path) {
                                let _ = tx.send(WatcherEvent::ExtensionFileChanged(path));
                            }
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(WatcherEvent::WatcherError(e));
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(1)),
        )?;

        for dir in &dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }
        log::debug!("Watching {} extension directories", dirs.len());

        let task = tokio::spawn(run(rx, dirs, engine, client));

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<WatcherEvent>,
    dirs: Vec<PathBuf>,
    engine: Arc<dyn GrammarEngine>,
    client: Client,
) {
    while let Some(event) = rx.recv().await {
        match event {
            WatcherEvent::ExtensionFileChanged(path) => {
                tokio::time::sleep(SETTLE_TIME).await;
                while rx.try_recv().is_ok() {}

                log::info!("Extension file changed: {}", path.display());
                match engine.load_extensions(&dirs, &LocalFileService).await {
                    Ok(()) => {
                        client
                            .log_message(
                                MessageType::INFO,
                                format!("Reloaded snippets after change to {}", path.display()),
                            )
                            .await;
                    }
                    Err(err) => {
                        log::error!("Failed to reload extensions: {}", err);
                        client
                            .log_message(
                                MessageType::ERROR,
                                format!("Failed to reload extensions: {}", err),
                            )
                            .await;
                    }
                }
            }
            WatcherEvent::WatcherError(e) => {
                log::warn!("Extension watcher error: {}", e);
                client
                    .log_message(
                        MessageType::ERROR,
                        format!("Extension file watcher error: {}", e),
                    )
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_extension_files_trigger_reload() {
        assert!(is_extension_file(Path::new("/x/snippets.json")));
        assert!(is_extension_file(Path::new("/x/syntaxProfiles.json")));
        assert!(!is_extension_file(Path::new("/x/other.json")));
        assert!(!is_extension_file(Path::new("/x/")));
    }
}
