//! Emmet Language Server
//!
//! A Language Server Protocol implementation that expands Emmet
//! abbreviations in markup and stylesheet documents.
//!
//! This library provides:
//! - Grammar resolution for a cursor position (`syntax`)
//! - Session configuration from the client (`session`)
//! - LSP request routing (`lsp`)
//! - A built-in abbreviation engine (`emmet`) and tag matcher (`matcher`)

pub mod config;
pub mod emmet;
pub mod fs;
pub mod lsp;
pub mod matcher;
pub mod session;
pub mod syntax;

// Re-exports for clean public API
pub use config::Config;
pub use emmet::{Emmet, GrammarEngine};
pub use matcher::{ElementMatcher, HtmlMatcher};
pub use session::{SessionConfig, SessionState};
pub use syntax::{resolve_grammar, resolve_language_grammar};
