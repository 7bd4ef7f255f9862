//! Configuration module
//!
//! Two kinds of configuration live here:
//!
//! - [`CrawlConfig`], the per-session description of a dump, assembled by
//!   [`CrawlConfigBuilder`] and persisted in the session directory;
//! - [`Settings`], optional machine-wide client settings loaded from TOML.
//!
//! # Example
//!
//! ```
//! use std::path::PathBuf;
//! use wikidump::config::{ContentSelection, CrawlConfigBuilder, EntryPoints};
//! use wikidump::Engine;
//!
//! let builder = CrawlConfigBuilder::new("https://wiki.example.org").content(ContentSelection {
//!     pages: true,
//!     ..Default::default()
//! });
//! builder.validate().unwrap();
//!
//! let config = builder.build(Engine::MediaWiki, PathBuf::from("dump"), EntryPoints::default());
//! assert_eq!(config.engine(), Engine::MediaWiki);
//! ```

mod builder;
mod parser;
mod types;
mod validation;

pub use builder::CrawlConfigBuilder;
pub use parser::{load_settings, HttpConfig, Settings, UserAgentConfig};
pub use types::{
    ContentSelection, CrawlConfig, Credentials, EntryPoints, NamespaceFilter, NamespaceSelection,
    NetworkPolicy,
};
pub use validation::{
    is_wikimedia_project, parse_excluded_namespaces, parse_namespaces, validate_request,
    validate_wiki_url,
};
