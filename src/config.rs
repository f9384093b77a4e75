//! Configuration management for the Emmet language server.
//!
//! Handles:
//! - Command-line argument parsing
//! - The default user snippet directory

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Directory name under the user configuration directory
const APP_DIR: &str = "emmet-language-server";

/// Command-line arguments for the Emmet language server
#[derive(Debug, Parser)]
#[command(name = "emmet-language-server")]
#[command(about = "Language server for Emmet abbreviations")]
#[command(version)]
pub struct Args {
    /// Communicate over stdin/stdout (the only transport; accepted for
    /// editors that always pass it)
    #[arg(long)]
    pub stdio: bool,

    /// Directory with snippets.json / syntaxProfiles.json loaded for every
    /// session
    #[arg(long, help = "Directory containing snippets.json and syntaxProfiles.json")]
    pub extensions_dir: Option<PathBuf>,

    /// Log level for the language server
    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    /// Snippet directory loaded before the client's `extensionsPath`
    pub default_extensions_dir: Option<PathBuf>,
    /// Log level
    pub log_level: String,
    /// Base for relative `extensionsPath` entries
    pub working_dir: PathBuf,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args) -> Result<Self> {
        let working_dir =
            std::env::current_dir().context("Could not determine the working directory")?;

        let default_extensions_dir = args
            .extensions_dir
            .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_DIR)));

        Ok(Config {
            default_extensions_dir,
            log_level: args.log_level,
            working_dir,
        })
    }

    /// Configuration with no default snippet directory
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Config {
            default_extensions_dir: None,
            log_level: "info".to_string(),
            working_dir: working_dir.into(),
        }
    }
}
