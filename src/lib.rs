//! wikidump: resumable wiki dump sessions
//!
//! This crate identifies the engine behind an arbitrary wiki, manages the
//! on-disk dump session for it, and recovers partially written dump files so
//! that an interrupted crawl can be resumed without corrupting what was
//! already downloaded.

pub mod config;
pub mod crawler;
pub mod engine;
pub mod recovery;
pub mod session;
pub mod state;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for dump sessions
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(
        "Could not identify the wiki engine behind {site}. Check that the URL points at the \
         wiki front page; unrecognized engines cannot be dumped automatically"
    )]
    ClassificationFailed { site: String },

    #[error(
        "Path {path} already holds a dump and no resume was requested. Use --resume, pick \
         another --path, or remove the directory"
    )]
    PathCollision { path: PathBuf },

    #[error(
        "No session state found in {path}, so there is nothing to resume. Start a new dump \
         or point --path at the directory of an earlier session"
    )]
    MissingSessionState { path: PathBuf },

    #[error("Corrupt session state in {path}: {source}")]
    StateParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize session state: {0}")]
    StateSerialize(#[from] toml::ser::Error),

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("No dump adapter is available for engine '{engine}'")]
    UnsupportedEngine { engine: engine::Engine },

    #[error("The adapter for '{engine}' does not support {operation}")]
    UnsupportedOperation {
        engine: engine::Engine,
        operation: &'static str,
    },

    #[error("Adapter for '{engine}' failed: {message}")]
    Adapter {
        engine: engine::Engine,
        message: String,
    },

    #[error("Invalid session transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::SessionState,
        to: state::SessionState,
    },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid namespace values '{0}'. Valid format is integer(s) separated by commas")]
    InvalidNamespaces(String),
}

/// Result type alias for dump operations
pub type Result<T> = std::result::Result<T, DumpError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{CrawlConfig, CrawlConfigBuilder};
pub use engine::{classify, Engine};
pub use recovery::{recover_tail, TailRecovery};
pub use state::SessionState;
