use crate::engine::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Complete description of one dump session
///
/// A `CrawlConfig` is produced once by [`crate::config::CrawlConfigBuilder`]
/// and is read-only afterwards. It is persisted verbatim in the session
/// directory, so the engine and entry points chosen at the start of a dump are
/// the ones every later resume uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub(crate) wiki: String,
    pub(crate) engine: Engine,
    /// Dump date stamp (YYYYMMDD), part of every artifact name
    pub(crate) date: String,
    pub(crate) path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) cookies: Option<PathBuf>,
    #[serde(rename = "entry-points")]
    pub(crate) entry_points: EntryPoints,
    pub(crate) content: ContentSelection,
    pub(crate) namespaces: NamespaceFilter,
    pub(crate) network: NetworkPolicy,
    #[serde(skip)]
    pub(crate) credentials: Option<Credentials>,
}

impl CrawlConfig {
    /// URL of the wiki as given by the operator
    pub fn wiki(&self) -> &str {
        &self.wiki
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// Session directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cookies(&self) -> Option<&Path> {
        self.cookies.as_deref()
    }

    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    pub fn content(&self) -> &ContentSelection {
        &self.content
    }

    pub fn namespaces(&self) -> &NamespaceFilter {
        &self.namespaces
    }

    pub fn network(&self) -> &NetworkPolicy {
        &self.network
    }

    /// Credentials for this process only; never persisted
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Attaches credentials to a config loaded from session state
    ///
    /// Credentials are not part of the persisted session, so a resumed
    /// process has to supply them again.
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Engine-specific endpoints, resolved once per fresh session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoints {
    /// Machine API endpoint (e.g. MediaWiki's api.php)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,

    /// Browse/export endpoint (e.g. MediaWiki's index.php)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse: Option<String>,
}

impl EntryPoints {
    pub fn is_empty(&self) -> bool {
        self.api.is_none() && self.browse.is_none()
    }

    /// Fills unset endpoints from `other`, keeping the ones already set
    pub fn or(self, other: EntryPoints) -> EntryPoints {
        EntryPoints {
            api: self.api.or(other.api),
            browse: self.browse.or(other.browse),
        }
    }
}

/// What kind of content the dump should contain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSelection {
    /// Dump page revisions
    pub pages: bool,

    /// Only the current revision of each page instead of the full history
    #[serde(rename = "current-only")]
    pub current_only: bool,

    /// Dump uploaded files
    pub images: bool,
}

impl ContentSelection {
    pub fn is_empty(&self) -> bool {
        !self.pages && !self.images
    }
}

/// Namespaces to include
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceSelection {
    #[default]
    All,
    Only(Vec<i32>),
}

/// Namespace include/exclude sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceFilter {
    pub include: NamespaceSelection,

    #[serde(default)]
    pub exclude: Vec<i32>,
}

impl NamespaceFilter {
    /// Returns true if pages in `namespace` belong in the dump
    pub fn allows(&self, namespace: i32) -> bool {
        if self.exclude.contains(&namespace) {
            return false;
        }
        match &self.include {
            NamespaceSelection::All => true,
            NamespaceSelection::Only(ids) => ids.contains(&namespace),
        }
    }
}

/// Retry and pacing policy for requests made on behalf of this session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkPolicy {
    /// Maximum number of retries per request
    pub retries: u32,

    /// Delay between requests (seconds)
    #[serde(rename = "delay-secs")]
    pub delay_secs: f64,
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            delay_secs: 0.0,
        }
    }
}

/// Login credentials, kept in memory only
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
