//! Names of everything a session writes to disk

use crate::config::CrawlConfig;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

/// File holding the persisted [`CrawlConfig`] inside a session directory
pub const STATE_FILE_NAME: &str = "config.toml";

/// Terminal line written at the end of a finished title or image list
pub const LIST_END_SENTINEL: &str = "--END--";

/// Closing tag written at the end of a finished XML dump
pub const XML_END_SENTINEL: &str = "</mediawiki>";

/// Closing tag of one page record in an XML dump
pub const PAGE_END_MARKER: &str = "</page>";

static URL_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(https?://|www\.|/index\.php|/api\.php)").expect("hardcoded regex pattern is valid")
});

/// Converts a wiki URL into a prefix usable in file names
///
/// # Examples
///
/// ```
/// use wikidump::session::domain_to_prefix;
///
/// assert_eq!(domain_to_prefix("https://www.Example.org/w/index.php"), "exampleorg_w");
/// ```
pub fn domain_to_prefix(wiki: &str) -> String {
    let lowered = wiki.to_lowercase();
    let stripped = URL_NOISE.replace_all(&lowered, "");

    let prefix: String = stripped
        .chars()
        .filter(|c| *c != '.')
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    prefix.trim_matches('_').to_string()
}

/// Default session directory for a wiki: `./<prefix>-<date>-wikidump`
pub fn default_dump_path(wiki: &str, date: &str) -> PathBuf {
    PathBuf::from(format!("./{}-{}-wikidump", domain_to_prefix(wiki), date))
}

/// Output artifacts a session can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DumpArtifact {
    /// One page title per line
    Titles,
    /// One `filename<TAB>url<TAB>uploader` line per file
    Images,
    /// Page revisions as `<page>` records
    Pages { current_only: bool },
}

impl DumpArtifact {
    /// Returns the artifacts a session with this configuration writes
    pub fn for_config(config: &CrawlConfig) -> Vec<DumpArtifact> {
        let content = config.content();
        let mut artifacts = Vec::new();
        if content.pages {
            artifacts.push(Self::Titles);
            artifacts.push(Self::Pages {
                current_only: content.current_only,
            });
        }
        if content.images {
            artifacts.push(Self::Images);
        }
        artifacts
    }

    /// File name of this artifact inside the session directory
    pub fn file_name(&self, config: &CrawlConfig) -> String {
        let prefix = domain_to_prefix(config.wiki());
        match self {
            Self::Titles => format!("{}-{}-titles.txt", prefix, config.date()),
            Self::Images => format!("{}-{}-images.txt", prefix, config.date()),
            Self::Pages { current_only } => format!(
                "{}-{}-{}.xml",
                prefix,
                config.date(),
                if *current_only { "current" } else { "history" }
            ),
        }
    }

    /// Full path of this artifact for the given session
    pub fn path(&self, config: &CrawlConfig) -> PathBuf {
        config.path().join(self.file_name(config))
    }

    /// Last line of a finished artifact
    pub fn end_sentinel(&self) -> &'static str {
        match self {
            Self::Titles | Self::Images => LIST_END_SENTINEL,
            Self::Pages { .. } => XML_END_SENTINEL,
        }
    }

    /// Byte sequence that closes one record of this artifact
    pub fn record_end_marker(&self) -> &'static str {
        match self {
            Self::Titles | Self::Images => "\n",
            Self::Pages { .. } => PAGE_END_MARKER,
        }
    }
}
