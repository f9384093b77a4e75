use anyhow::Result;
use tokio::io::{stdin, stdout};
use tower_lsp::{ClientSocket, LspService, Server};

use crate::lsp::backend::Backend;
use crate::lsp::handlers::EXPAND_ABBREVIATION;
use crate::Config;

/// Build the service with the custom Emmet request registered
pub fn build_service(config: Config) -> (LspService<Backend>, ClientSocket) {
    LspService::build(move |client| Backend::new(client, config.clone()))
        .custom_method(EXPAND_ABBREVIATION, Backend::expand_abbreviation)
        .finish()
}

/// Start the LSP server on stdin/stdout
pub async fn serve(config: Config) -> Result<()> {
    log::info!(
        "Starting emmet-language-server {} in {}",
        env!("CARGO_PKG_VERSION"),
        config.working_dir.display()
    );

    let (service, socket) = build_service(config);
    Server::new(stdin(), stdout(), socket).serve(service).await;

    Ok(())
}
