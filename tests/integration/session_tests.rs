//! Integration tests for dump sessions
//!
//! These tests use wiremock as the wiki and a scripted adapter that writes
//! real dump files, so whole fresh, interrupted and resumed sessions run
//! end-to-end against the filesystem.

use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wikidump::config::{
    ContentSelection, CrawlConfig, CrawlConfigBuilder, EntryPoints, NetworkPolicy, Settings,
};
use wikidump::crawler::{
    AdapterRegistry, DumpOrchestrator, EngineAdapter, HttpProbe, ResumeCursor, SiteProbe,
};
use wikidump::session::{CollisionDecision, DumpArtifact, FixedPolicy};
use wikidump::{DumpError, Engine, SessionState};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MEDIAWIKI_FRONT_PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<meta charset="UTF-8"/>
<title>Example Wiki</title>
<meta name="generator" content="MediaWiki 1.39.5"/>
</head><body><p>Welcome</p></body></html>"#;

const DOKUWIKI_FRONT_PAGE: &str = r#"<html><head>
<meta name="generator" content="DokuWiki"/>
</head><body></body></html>"#;

/// Adapter that writes a title list and an XML dump for a fixed set of pages
///
/// With `crash_at` set, the first run stops in the middle of that page, the
/// way a killed process would.
struct ScriptedAdapter {
    titles: Vec<String>,
    crash_at: Mutex<Option<usize>>,
    cursors: Mutex<Vec<ResumeCursor>>,
}

impl ScriptedAdapter {
    fn new(count: usize, crash_at: Option<usize>) -> Self {
        Self {
            titles: (1..=count).map(|i| format!("Page {}", i)).collect(),
            crash_at: Mutex::new(crash_at),
            cursors: Mutex::new(Vec::new()),
        }
    }

    fn write_titles(&self, path: &Path) -> std::io::Result<()> {
        let mut body = self.titles.join("\n");
        body.push_str("\n--END--\n");
        fs::write(path, body)
    }
}

#[async_trait]
impl EngineAdapter for ScriptedAdapter {
    fn engine(&self) -> Engine {
        Engine::MediaWiki
    }

    async fn resolve_entry_points(&self, site: &str) -> Result<EntryPoints, DumpError> {
        Ok(EntryPoints {
            api: Some(format!("{}/api.php", site)),
            browse: Some(format!("{}/index.php", site)),
        })
    }

    async fn enumerate_and_fetch(
        &self,
        config: &CrawlConfig,
        cursor: &ResumeCursor,
    ) -> Result<(), DumpError> {
        self.cursors.lock().unwrap().push(cursor.clone());

        if !cursor.titles_complete {
            self.write_titles(&DumpArtifact::Titles.path(config))?;
        }

        let xml_path = DumpArtifact::Pages {
            current_only: config.content().current_only,
        }
        .path(config);
        let mut xml = OpenOptions::new().create(true).append(true).open(&xml_path)?;
        if xml.metadata()?.len() == 0 {
            xml.write_all(b"<mediawiki>\n")?;
        }

        let start = cursor
            .last_page_title
            .as_ref()
            .and_then(|last| self.titles.iter().position(|t| t == last))
            .map(|i| i + 1)
            .unwrap_or(0);
        let crash_at = self.crash_at.lock().unwrap().take();

        for (i, title) in self.titles.iter().enumerate().skip(start) {
            if crash_at == Some(i) {
                write!(xml, "  <page>\n    <title>{}</title>\n    <revision><text>cut", title)?;
                return Err(DumpError::Adapter {
                    engine: Engine::MediaWiki,
                    message: "connection lost".to_string(),
                });
            }
            write!(
                xml,
                "  <page>\n    <title>{}</title>\n    <revision><text>body of {}</text></revision>\n  </page>\n",
                title, title
            )?;
        }

        xml.write_all(b"</mediawiki>\n")?;
        Ok(())
    }
}

fn probe() -> HttpProbe {
    HttpProbe::from_settings(
        &Settings::default(),
        NetworkPolicy {
            retries: 0,
            delay_secs: 0.0,
        },
        None,
    )
    .unwrap()
}

fn request(server: &MockServer, dir: &Path) -> CrawlConfigBuilder {
    CrawlConfigBuilder::new(format!("{}/wiki", server.uri()))
        .date("20240101")
        .path(dir)
        .content(ContentSelection {
            pages: true,
            ..Default::default()
        })
}

async fn mount_front_page(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/wiki"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

fn orchestrator(
    adapter: Arc<ScriptedAdapter>,
    decision: CollisionDecision,
) -> DumpOrchestrator<HttpProbe, FixedPolicy> {
    DumpOrchestrator::new(
        probe(),
        AdapterRegistry::new().with(adapter),
        FixedPolicy(decision),
    )
}

fn xml_of(dir: &Path) -> String {
    let xml = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|p| p.extension().map(|e| e == "xml").unwrap_or(false))
        .expect("xml dump exists");
    fs::read_to_string(xml).unwrap()
}

#[tokio::test]
async fn test_fresh_session_classifies_and_persists() {
    let server = MockServer::start().await;
    mount_front_page(&server, MEDIAWIKI_FRONT_PAGE).await;
    let tmp = TempDir::new().unwrap();
    let dump = tmp.path().join("dump");

    let adapter = Arc::new(ScriptedAdapter::new(3, None));
    let mut orchestrator = orchestrator(adapter.clone(), CollisionDecision::Abort);

    let session = orchestrator
        .prepare(request(&server, &dump), false)
        .await
        .unwrap();

    assert_eq!(orchestrator.state(), SessionState::Active);
    assert_eq!(session.config().engine(), Engine::MediaWiki);

    let state = fs::read_to_string(dump.join("config.toml")).unwrap();
    assert!(state.contains(r#"engine = "mediawiki""#));
    assert!(state.contains("/wiki/api.php"));

    let report = orchestrator.execute(session).await.unwrap();
    assert_eq!(report.state, SessionState::Complete);
    assert!(!report.resumed);

    let xml = xml_of(&dump);
    assert_eq!(xml.matches("</page>").count(), 3);
    assert!(xml.ends_with("</mediawiki>\n"));
}

#[tokio::test]
async fn test_interrupted_dump_is_repaired_and_resumed() {
    let server = MockServer::start().await;
    mount_front_page(&server, MEDIAWIKI_FRONT_PAGE).await;
    let tmp = TempDir::new().unwrap();
    let dump = tmp.path().join("dump");

    // Crash while writing the fourth page
    let adapter = Arc::new(ScriptedAdapter::new(6, Some(3)));

    let mut first = orchestrator(adapter.clone(), CollisionDecision::Abort);
    let err = first.run(request(&server, &dump), false).await.unwrap_err();
    assert!(matches!(err, DumpError::Adapter { .. }));
    assert_eq!(first.state(), SessionState::Aborted);

    let broken = xml_of(&dump);
    assert_eq!(broken.matches("<page>").count(), 4);
    assert_eq!(broken.matches("</page>").count(), 3);

    let mut second = orchestrator(adapter.clone(), CollisionDecision::Abort);
    let report = second.run(request(&server, &dump), true).await.unwrap();

    assert!(report.resumed);
    assert_eq!(report.state, SessionState::Complete);
    assert!(report.cursor.titles_complete);
    assert_eq!(report.cursor.last_page_title.as_deref(), Some("Page 3"));

    let xml = xml_of(&dump);
    assert_eq!(xml.matches("<page>").count(), 6);
    assert_eq!(xml.matches("</page>").count(), 6);
    assert!(!xml.contains("cut"));
    for i in 1..=6 {
        assert_eq!(xml.matches(&format!("<title>Page {}</title>", i)).count(), 1);
    }
}

#[tokio::test]
async fn test_resume_never_reclassifies() {
    let server = MockServer::start().await;
    mount_front_page(&server, MEDIAWIKI_FRONT_PAGE).await;
    let tmp = TempDir::new().unwrap();
    let dump = tmp.path().join("dump");

    let adapter = Arc::new(ScriptedAdapter::new(2, Some(1)));
    let mut first = orchestrator(adapter.clone(), CollisionDecision::Abort);
    assert!(first.run(request(&server, &dump), false).await.is_err());

    // The site now looks like DokuWiki and must not even be asked
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/wiki"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DOKUWIKI_FRONT_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let mut second = orchestrator(adapter.clone(), CollisionDecision::Abort);
    let report = second.run(request(&server, &dump), true).await.unwrap();

    assert_eq!(report.engine, Engine::MediaWiki);
    assert_eq!(second.state(), SessionState::Complete);
}

#[tokio::test]
async fn test_existing_dump_is_resumed_through_collision_policy() {
    let server = MockServer::start().await;
    mount_front_page(&server, MEDIAWIKI_FRONT_PAGE).await;
    let tmp = TempDir::new().unwrap();
    let dump = tmp.path().join("dump");

    let adapter = Arc::new(ScriptedAdapter::new(3, Some(2)));
    let mut first = orchestrator(adapter.clone(), CollisionDecision::Abort);
    assert!(first.run(request(&server, &dump), false).await.is_err());

    // No --resume, but the operator chooses to resume when asked
    let mut second = orchestrator(adapter.clone(), CollisionDecision::Resume);
    let report = second.run(request(&server, &dump), false).await.unwrap();

    assert!(report.resumed);
    assert_eq!(report.path, dump);
    assert_eq!(xml_of(&dump).matches("</page>").count(), 3);
}

#[tokio::test]
async fn test_collision_without_resume_picks_free_directory() {
    let server = MockServer::start().await;
    mount_front_page(&server, MEDIAWIKI_FRONT_PAGE).await;
    let tmp = TempDir::new().unwrap();
    let dump = tmp.path().join("dump");

    fs::create_dir(&dump).unwrap();
    fs::write(dump.join("notes.txt"), "keep me").unwrap();
    let taken = tmp.path().join("dump-2");
    fs::create_dir(&taken).unwrap();
    fs::write(taken.join("notes.txt"), "keep me too").unwrap();

    let adapter = Arc::new(ScriptedAdapter::new(1, None));
    let mut orchestrator = orchestrator(adapter, CollisionDecision::Rename);
    let report = orchestrator
        .run(request(&server, &dump), false)
        .await
        .unwrap();

    assert_eq!(report.path, tmp.path().join("dump-3"));
    assert_eq!(fs::read_to_string(dump.join("notes.txt")).unwrap(), "keep me");
    assert!(!dump.join("config.toml").exists());
}

#[tokio::test]
async fn test_collision_abort_leaves_directory_untouched() {
    let server = MockServer::start().await;
    mount_front_page(&server, MEDIAWIKI_FRONT_PAGE).await;
    let tmp = TempDir::new().unwrap();
    let dump = tmp.path().join("dump");
    fs::create_dir(&dump).unwrap();
    fs::write(dump.join("notes.txt"), "keep me").unwrap();

    let mut orchestrator = orchestrator(
        Arc::new(ScriptedAdapter::new(1, None)),
        CollisionDecision::Abort,
    );
    let err = orchestrator
        .run(request(&server, &dump), false)
        .await
        .unwrap_err();

    assert!(matches!(err, DumpError::PathCollision { .. }));
    assert_eq!(fs::read_dir(&dump).unwrap().count(), 1);
}

#[tokio::test]
async fn test_unknown_engine_halts() {
    let server = MockServer::start().await;
    mount_front_page(&server, "<html><body>Just a blog</body></html>").await;
    let tmp = TempDir::new().unwrap();
    let dump = tmp.path().join("dump");

    let mut orchestrator = orchestrator(
        Arc::new(ScriptedAdapter::new(1, None)),
        CollisionDecision::Abort,
    );
    let err = orchestrator
        .run(request(&server, &dump), false)
        .await
        .unwrap_err();

    assert!(matches!(err, DumpError::ClassificationFailed { .. }));
    assert!(!dump.exists());
}

#[tokio::test]
async fn test_resume_without_state() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    let mut orchestrator = orchestrator(
        Arc::new(ScriptedAdapter::new(1, None)),
        CollisionDecision::Abort,
    );
    let err = orchestrator
        .run(request(&server, &tmp.path().join("nothing-here")), true)
        .await
        .unwrap_err();

    assert!(matches!(err, DumpError::MissingSessionState { .. }));
    assert_eq!(orchestrator.state(), SessionState::Aborted);
}

#[tokio::test]
async fn test_probe_reports_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = probe()
        .fetch_front_page(&format!("{}/wiki", server.uri()))
        .await
        .unwrap_err();

    match err {
        DumpError::Transport { message, .. } => assert!(message.contains("404")),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_probe_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let probe = HttpProbe::from_settings(
        &Settings::default(),
        NetworkPolicy {
            retries: 1,
            delay_secs: 0.0,
        },
        None,
    )
    .unwrap();

    let err = probe
        .fetch_front_page(&format!("{}/wiki", server.uri()))
        .await
        .unwrap_err();

    match err {
        DumpError::Transport { message, .. } => assert!(message.contains("gave up after 2 attempts")),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_probe_sends_configured_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::header(
            "user-agent",
            format!("wikidump/{}", env!("CARGO_PKG_VERSION")).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(MEDIAWIKI_FRONT_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let body = probe()
        .fetch_front_page(&format!("{}/wiki", server.uri()))
        .await
        .unwrap();
    assert!(body.contains("MediaWiki"));
}
