//! Session orchestration
//!
//! The orchestrator ties the pieces together:
//! - Resolving the session directory and collisions with earlier dumps
//! - Classifying the site once, on a fresh session only
//! - Persisting the session before any content is written
//! - Recovering unfinished artifacts before a resumed crawl appends to them
//! - Handing the crawl to the engine's adapter and tracking its outcome

use crate::config::{CrawlConfig, CrawlConfigBuilder, EntryPoints};
use crate::crawler::adapter::{
    AdapterRegistry, ArtifactState, ArtifactStatus, EngineAdapter, ResumeCursor, SiteProbe,
};
use crate::engine::{classify, Engine};
use crate::recovery::{
    is_artifact_complete, last_nonblank_line, last_page_title, recover_tail, TailRecovery,
};
use crate::session::{
    load_session_state_with_hash, save_session_state, CollisionPolicy, DumpArtifact,
    SessionPathResolver,
};
use crate::state::SessionState;
use crate::DumpError;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// A session that is ready for its adapter
pub struct PreparedSession {
    config: CrawlConfig,
    cursor: ResumeCursor,
    adapter: Arc<dyn EngineAdapter>,
    resumed: bool,
}

impl std::fmt::Debug for PreparedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedSession")
            .field("config", &self.config)
            .field("cursor", &self.cursor)
            .field("adapter", &self.adapter.engine())
            .field("resumed", &self.resumed)
            .finish()
    }
}

impl PreparedSession {
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn cursor(&self) -> &ResumeCursor {
        &self.cursor
    }

    pub fn resumed(&self) -> bool {
        self.resumed
    }
}

/// Outcome of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub path: PathBuf,
    pub engine: Engine,
    pub state: SessionState,
    pub resumed: bool,
    pub cursor: ResumeCursor,
}

/// Drives one dump session from path resolution to completion
pub struct DumpOrchestrator<P, C> {
    probe: P,
    registry: AdapterRegistry,
    resolver: SessionPathResolver<C>,
    state: SessionState,
    history: Vec<SessionState>,
}

impl<P: SiteProbe, C: CollisionPolicy> DumpOrchestrator<P, C> {
    pub fn new(probe: P, registry: AdapterRegistry, policy: C) -> Self {
        Self {
            probe,
            registry,
            resolver: SessionPathResolver::new(policy),
            state: SessionState::Fresh,
            history: vec![SessionState::Fresh],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state this session has been in, oldest first
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// Prepares and runs a session
    ///
    /// # Arguments
    ///
    /// * `request` - The operator's request
    /// * `resume` - Whether the operator asked to resume an earlier session
    ///
    /// # Returns
    ///
    /// * `Ok(SessionReport)` - The adapter exhausted the wiki
    /// * `Err(DumpError)` - The session was aborted
    pub async fn run(
        &mut self,
        request: CrawlConfigBuilder,
        resume: bool,
    ) -> Result<SessionReport, DumpError> {
        let session = self.prepare(request, resume).await?;
        self.execute(session).await
    }

    /// Brings a session to [`SessionState::Active`] without starting the crawl
    pub async fn prepare(
        &mut self,
        request: CrawlConfigBuilder,
        resume: bool,
    ) -> Result<PreparedSession, DumpError> {
        let outcome = self.prepare_inner(request, resume).await;
        self.abort_on_error(outcome)
    }

    /// Hands a prepared session to its adapter
    pub async fn execute(&mut self, session: PreparedSession) -> Result<SessionReport, DumpError> {
        let outcome = self.execute_inner(session).await;
        self.abort_on_error(outcome)
    }

    async fn prepare_inner(
        &mut self,
        request: CrawlConfigBuilder,
        resume: bool,
    ) -> Result<PreparedSession, DumpError> {
        if self.state != SessionState::Fresh {
            return Err(DumpError::InvalidTransition {
                from: self.state,
                to: SessionState::Active,
            });
        }

        request.validate()?;
        let resolved = self.resolver.resolve(&request.target_path(), resume)?;

        if resolved.resume {
            self.advance(SessionState::Resuming)?;
            self.resume_session(request, resolved.path).await
        } else {
            self.start_session(request, resolved.path).await
        }
    }

    async fn start_session(
        &mut self,
        request: CrawlConfigBuilder,
        path: PathBuf,
    ) -> Result<PreparedSession, DumpError> {
        let site = request.wiki().to_string();
        let sample = self.probe.fetch_front_page(&site).await?;

        let engine = classify(&sample);
        if !engine.is_known() {
            return Err(DumpError::ClassificationFailed { site });
        }
        tracing::info!("{} looks like a {} wiki", site, engine);

        let adapter = self.registry.require(engine)?;

        let operator = request.operator_entry_points();
        let resolved = if operator.api.is_some() && operator.browse.is_some() {
            EntryPoints::default()
        } else {
            adapter.resolve_entry_points(&site).await?
        };

        let config = request.build(engine, path, resolved);
        fs::create_dir_all(config.path())?;
        save_session_state(&config)?;

        self.advance(SessionState::Active)?;
        tracing::info!("Started new session in {}", config.path().display());

        Ok(PreparedSession {
            config,
            cursor: ResumeCursor::default(),
            adapter,
            resumed: false,
        })
    }

    async fn resume_session(
        &mut self,
        request: CrawlConfigBuilder,
        path: PathBuf,
    ) -> Result<PreparedSession, DumpError> {
        let (config, hash) = load_session_state_with_hash(&path)?;
        let config = config.with_credentials(request.transient_credentials().cloned());
        tracing::debug!("Session state hash: {}", hash);

        if config.wiki() != request.wiki() {
            tracing::warn!(
                "Session in {} was started for {}; continuing with that URL instead of {}",
                path.display(),
                config.wiki(),
                request.wiki()
            );
        }
        if config.content() != request.content_selection() {
            tracing::warn!("Content selection differs from the stored session; using the stored one");
        }

        tracing::info!(
            "Resuming {} dump of {} (classified when the session started)",
            config.engine(),
            config.wiki()
        );
        let adapter = self.registry.require(config.engine())?;
        let cursor = recover_artifacts(&config)?;

        self.advance(SessionState::Active)?;

        Ok(PreparedSession {
            config,
            cursor,
            adapter,
            resumed: true,
        })
    }

    async fn execute_inner(&mut self, session: PreparedSession) -> Result<SessionReport, DumpError> {
        if session.cursor.all_complete() {
            tracing::info!("Every artifact is already complete; nothing left to fetch");
        } else {
            tracing::info!(
                "Handing {} to the {} adapter",
                session.config.wiki(),
                session.config.engine()
            );
            session
                .adapter
                .enumerate_and_fetch(&session.config, &session.cursor)
                .await?;
        }

        self.advance(SessionState::Complete)?;
        tracing::info!("Dump in {} is complete", session.config.path().display());

        Ok(SessionReport {
            path: session.config.path().to_path_buf(),
            engine: session.config.engine(),
            state: self.state,
            resumed: session.resumed,
            cursor: session.cursor,
        })
    }

    fn advance(&mut self, next: SessionState) -> Result<(), DumpError> {
        let from = self.state;
        self.state = from.transition(next)?;
        self.history.push(next);
        tracing::debug!("Session state {} -> {}", from, next);
        Ok(())
    }

    fn abort_on_error<T>(&mut self, outcome: Result<T, DumpError>) -> Result<T, DumpError> {
        if let Err(e) = &outcome {
            if self.advance(SessionState::Aborted).is_ok() {
                tracing::error!("Session aborted: {}", e);
            }
        }
        outcome
    }
}

/// Checks every artifact of a session and repairs the unfinished ones
///
/// Artifacts ending with their sentinel are left untouched. Unfinished ones
/// are cut back to their last complete record so the adapter can append.
pub fn recover_artifacts(config: &CrawlConfig) -> Result<ResumeCursor, DumpError> {
    let mut cursor = ResumeCursor::default();

    for artifact in DumpArtifact::for_config(config) {
        let path = artifact.path(config);

        let state = if !path.is_file() {
            tracing::debug!("{} not written yet", path.display());
            ArtifactState::Missing
        } else if is_artifact_complete(&path, artifact.end_sentinel())? {
            tracing::info!("{} is complete", path.display());
            ArtifactState::Complete
        } else {
            let outcome = recover_tail(&path, artifact.record_end_marker())?;
            if let TailRecovery::NoCompleteRecord { discarded } = outcome {
                tracing::warn!(
                    "Truncated record not recoverable in {}: no complete record, {} bytes dropped; it will be downloaded again",
                    path.display(),
                    discarded
                );
            }
            ArtifactState::Recovered(outcome)
        };

        match (artifact, state) {
            (DumpArtifact::Titles, ArtifactState::Complete) => cursor.titles_complete = true,
            (DumpArtifact::Titles, ArtifactState::Recovered(_)) => {
                cursor.last_listed_title = last_nonblank_line(&path)?;
            }
            (DumpArtifact::Images, ArtifactState::Complete) => cursor.images_complete = true,
            (DumpArtifact::Pages { .. }, ArtifactState::Recovered(_)) => {
                cursor.last_page_title = last_page_title(&path)?;
                if let Some(title) = &cursor.last_page_title {
                    tracing::info!("Last complete page: {}", title);
                }
            }
            _ => {}
        }

        cursor.artifacts.push(ArtifactStatus {
            artifact,
            path,
            state,
        });
    }

    Ok(cursor)
}
