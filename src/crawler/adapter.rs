//! Seams between the session core and the network
//!
//! The core never speaks a wiki protocol itself. It fetches one page through a
//! [`SiteProbe`] to classify the site, then hands the crawl to the
//! [`EngineAdapter`] registered for the detected engine.

use crate::config::{CrawlConfig, EntryPoints, NamespaceFilter};
use crate::engine::Engine;
use crate::recovery::TailRecovery;
use crate::session::DumpArtifact;
use crate::DumpError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Fetches the HTML sample used for engine classification
#[async_trait]
pub trait SiteProbe: Send + Sync {
    /// Returns the body of the wiki's front page
    async fn fetch_front_page(&self, site: &str) -> Result<String, DumpError>;
}

/// Engine-specific crawler
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    /// Engine this adapter speaks
    fn engine(&self) -> Engine;

    /// Discovers the endpoints of `site`; called once per fresh session
    async fn resolve_entry_points(&self, site: &str) -> Result<EntryPoints, DumpError>;

    /// Lists the namespaces of `site`
    async fn list_namespaces(&self, _site: &str) -> Result<Vec<WikiNamespace>, DumpError> {
        Err(DumpError::UnsupportedOperation {
            engine: self.engine(),
            operation: "namespace listing",
        })
    }

    /// Lists the page titles of `site` allowed by `namespaces`
    async fn list_page_titles(
        &self,
        _site: &str,
        _namespaces: &NamespaceFilter,
    ) -> Result<Vec<String>, DumpError> {
        Err(DumpError::UnsupportedOperation {
            engine: self.engine(),
            operation: "page title listing",
        })
    }

    /// Lists the names of the files uploaded to `site`
    async fn list_image_names(&self, _site: &str) -> Result<Vec<String>, DumpError> {
        Err(DumpError::UnsupportedOperation {
            engine: self.engine(),
            operation: "image name listing",
        })
    }

    /// Runs the crawl until everything selected by `config` is downloaded
    ///
    /// Returning `Ok` means the adapter has exhausted the wiki and written the
    /// end sentinels of its artifacts. Any error aborts the session; the files
    /// written so far stay on disk for a later resume.
    async fn enumerate_and_fetch(
        &self,
        config: &CrawlConfig,
        cursor: &ResumeCursor,
    ) -> Result<(), DumpError>;
}

/// A namespace as reported by the wiki
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiNamespace {
    pub id: i32,
    pub name: String,
}

/// What a resume found for one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Not written yet
    Missing,
    /// Ends with its sentinel; left untouched
    Complete,
    /// Unfinished; cut back to its last complete record
    Recovered(TailRecovery),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStatus {
    pub artifact: DumpArtifact,
    pub path: PathBuf,
    pub state: ArtifactState,
}

/// Where an adapter should pick up an interrupted crawl
///
/// A fresh session gets the default cursor, which has no artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeCursor {
    pub artifacts: Vec<ArtifactStatus>,

    /// Title of the last complete page in the XML dump
    pub last_page_title: Option<String>,

    /// Last title in the title list, if the list is unfinished
    pub last_listed_title: Option<String>,

    pub titles_complete: bool,
    pub images_complete: bool,
}

impl ResumeCursor {
    /// Returns true if there is nothing to continue from
    pub fn is_fresh(&self) -> bool {
        self.artifacts
            .iter()
            .all(|status| status.state == ArtifactState::Missing)
    }

    pub fn status(&self, artifact: DumpArtifact) -> Option<&ArtifactStatus> {
        self.artifacts.iter().find(|status| status.artifact == artifact)
    }

    /// Returns true if every artifact already ends with its sentinel
    pub fn all_complete(&self) -> bool {
        !self.artifacts.is_empty()
            && self
                .artifacts
                .iter()
                .all(|status| status.state == ArtifactState::Complete)
    }
}

/// Adapters available to the orchestrator, keyed by engine
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Engine, Arc<dyn EngineAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` for its engine, replacing any earlier one
    pub fn register(&mut self, adapter: Arc<dyn EngineAdapter>) {
        let engine = adapter.engine();
        if self.adapters.insert(engine, adapter).is_some() {
            tracing::debug!("Replaced adapter for {}", engine);
        }
    }

    pub fn with(mut self, adapter: Arc<dyn EngineAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, engine: Engine) -> Option<Arc<dyn EngineAdapter>> {
        self.adapters.get(&engine).cloned()
    }

    /// Returns the adapter for `engine` or the reason there is none
    pub fn require(&self, engine: Engine) -> Result<Arc<dyn EngineAdapter>, DumpError> {
        self.get(engine)
            .ok_or(DumpError::UnsupportedEngine { engine })
    }

    /// Engines with a registered adapter, in classifier order
    pub fn engines(&self) -> Vec<Engine> {
        Engine::all()
            .iter()
            .copied()
            .filter(|engine| self.adapters.contains_key(engine))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("engines", &self.engines())
            .finish()
    }
}
