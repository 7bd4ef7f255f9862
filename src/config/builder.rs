//! Construction phase of a [`CrawlConfig`]
//!
//! Everything the operator asks for is collected here. The builder is the
//! only mutable representation of a session's configuration; once
//! [`CrawlConfigBuilder::build`] is called with the classified engine and the
//! resolved entry points the result is frozen.

use crate::config::types::{
    ContentSelection, CrawlConfig, Credentials, EntryPoints, NamespaceFilter, NetworkPolicy,
};
use crate::config::validation::validate_request;
use crate::engine::Engine;
use crate::session::default_dump_path;
use crate::ConfigResult;
use std::path::PathBuf;

/// Collects the operator's intent for a new dump
#[derive(Debug, Clone)]
pub struct CrawlConfigBuilder {
    wiki: String,
    date: String,
    path: Option<PathBuf>,
    cookies: Option<PathBuf>,
    entry_points: EntryPoints,
    content: ContentSelection,
    namespaces: NamespaceFilter,
    network: NetworkPolicy,
    credentials: Option<Credentials>,
}

impl CrawlConfigBuilder {
    /// Starts a builder for the given wiki URL, stamped with today's date
    pub fn new(wiki: impl Into<String>) -> Self {
        Self {
            wiki: wiki.into(),
            date: chrono::Local::now().format("%Y%m%d").to_string(),
            path: None,
            cookies: None,
            entry_points: EntryPoints::default(),
            content: ContentSelection::default(),
            namespaces: NamespaceFilter::default(),
            network: NetworkPolicy::default(),
            credentials: None,
        }
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn cookies(mut self, cookies: impl Into<PathBuf>) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    /// Endpoints supplied by the operator; these win over discovered ones
    pub fn entry_points(mut self, entry_points: EntryPoints) -> Self {
        self.entry_points = entry_points;
        self
    }

    pub fn content(mut self, content: ContentSelection) -> Self {
        self.content = content;
        self
    }

    pub fn namespaces(mut self, namespaces: NamespaceFilter) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn network(mut self, network: NetworkPolicy) -> Self {
        self.network = network;
        self
    }

    pub fn credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn wiki(&self) -> &str {
        &self.wiki
    }

    pub fn content_selection(&self) -> &ContentSelection {
        &self.content
    }

    pub fn network_policy(&self) -> &NetworkPolicy {
        &self.network
    }

    pub fn operator_entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    pub fn transient_credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Directory the operator asked for, or `./<prefix>-<date>-wikidump`
    pub fn target_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| default_dump_path(&self.wiki, &self.date))
    }

    /// Checks the collected intent without freezing it
    pub fn validate(&self) -> ConfigResult<()> {
        validate_request(self)
    }

    /// Freezes the configuration
    ///
    /// # Arguments
    ///
    /// * `engine` - The classified engine
    /// * `path` - The session directory chosen by the path resolver
    /// * `resolved` - Entry points discovered by the engine adapter; fields the
    ///   operator set explicitly are kept
    pub fn build(self, engine: Engine, path: PathBuf, resolved: EntryPoints) -> CrawlConfig {
        CrawlConfig {
            wiki: self.wiki,
            engine,
            date: self.date,
            path,
            cookies: self.cookies,
            entry_points: self.entry_points.or(resolved),
            content: self.content,
            namespaces: self.namespaces,
            network: self.network,
            credentials: self.credentials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_target_path() {
        let builder = CrawlConfigBuilder::new("https://wiki.example.org/index.php").date("20240101");
        assert_eq!(
            builder.target_path(),
            PathBuf::from("./wikiexampleorg-20240101-wikidump")
        );
    }

    #[test]
    fn test_explicit_target_path() {
        let builder = CrawlConfigBuilder::new("https://wiki.example.org").path("/tmp/dump");
        assert_eq!(builder.target_path(), PathBuf::from("/tmp/dump"));
    }

    #[test]
    fn test_build_prefers_operator_entry_points() {
        let config = CrawlConfigBuilder::new("https://wiki.example.org")
            .entry_points(EntryPoints {
                api: Some("https://wiki.example.org/w/api.php".to_string()),
                browse: None,
            })
            .build(
                Engine::MediaWiki,
                PathBuf::from("/tmp/dump"),
                EntryPoints {
                    api: Some("https://wiki.example.org/api.php".to_string()),
                    browse: Some("https://wiki.example.org/index.php".to_string()),
                },
            );

        assert_eq!(config.engine(), Engine::MediaWiki);
        assert_eq!(
            config.entry_points().api.as_deref(),
            Some("https://wiki.example.org/w/api.php")
        );
        assert_eq!(
            config.entry_points().browse.as_deref(),
            Some("https://wiki.example.org/index.php")
        );
        assert_eq!(config.path(), PathBuf::from("/tmp/dump").as_path());
    }

    #[test]
    fn test_date_is_stamped() {
        let builder = CrawlConfigBuilder::new("https://wiki.example.org");
        let config = builder.build(Engine::DokuWiki, PathBuf::from("d"), EntryPoints::default());
        assert_eq!(config.date().len(), 8);
        assert!(config.date().chars().all(|c| c.is_ascii_digit()));
    }
}
