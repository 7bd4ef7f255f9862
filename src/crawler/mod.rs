//! Crawler module for driving dump sessions
//!
//! This module contains everything between the operator's request and the
//! engine adapter doing the actual crawl:
//! - The adapter and probe traits, and the adapter registry
//! - HTTP fetching with retries and status diagnostics
//! - MediaWiki endpoint discovery
//! - Session orchestration

mod adapter;
mod entry_points;
mod fetcher;
mod orchestrator;

pub use adapter::{
    AdapterRegistry, ArtifactState, ArtifactStatus, EngineAdapter, ResumeCursor, SiteProbe,
    WikiNamespace,
};
pub use entry_points::discover_mediawiki_entry_points;
pub use fetcher::{
    build_http_client, load_cookie_jar, parse_netscape_cookies, status_action, HttpProbe,
    NetscapeCookie, StatusAction,
};
pub use orchestrator::{recover_artifacts, DumpOrchestrator, PreparedSession, SessionReport};
