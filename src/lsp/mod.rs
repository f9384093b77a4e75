//! LSP Protocol Implementation
//!
//! Request routing and document tracking. Grammar decisions live in
//! [`crate::syntax`], expansion in [`crate::emmet`].

pub mod backend;
pub mod document;
pub mod handlers;
pub mod server;
pub mod watcher;

pub use backend::Backend;
pub use document::TextDocument;
pub use handlers::{ExpandAbbreviationParams, EXPAND_ABBREVIATION};
pub use server::{build_service, serve};
