//! wikidump main entry point
//!
//! This is the command-line interface for creating and resuming wiki dumps.

use anyhow::Context;
use clap::{ArgGroup, Parser, ValueEnum};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wikidump::config::{
    is_wikimedia_project, load_settings, parse_excluded_namespaces, parse_namespaces,
    validate_wiki_url, ContentSelection, CrawlConfigBuilder, Credentials, EntryPoints,
    NamespaceFilter, NetworkPolicy, Settings,
};
use wikidump::crawler::{
    discover_mediawiki_entry_points, AdapterRegistry, DumpOrchestrator, HttpProbe, SiteProbe,
};
use wikidump::engine::matching_engines;
use wikidump::session::{CollisionDecision, CollisionPolicy, FixedPolicy, InteractivePrompt};
use wikidump::{classify, Engine};

/// wikidump: resumable dumps of wikis of any engine
///
/// wikidump identifies the engine behind a wiki, keeps the dump parameters
/// in the dump directory, and repairs partially written files so an
/// interrupted dump can be resumed safely.
#[derive(Parser, Debug)]
#[command(name = "wikidump")]
#[command(version)]
#[command(about = "Resumable wiki dumps", long_about = None)]
#[command(group(
    ArgGroup::new("download")
        .args(["pages", "images"])
        .multiple(true)
        .conflicts_with("meta")
))]
#[command(group(
    ArgGroup::new("meta")
        .args([
            "get_wiki_engine",
            "get_api",
            "get_index",
            "get_namespaces",
            "get_page_titles",
            "get_image_names",
        ])
        .multiple(true)
))]
#[command(group(
    ArgGroup::new("mode")
        .args([
            "pages",
            "images",
            "get_wiki_engine",
            "get_api",
            "get_index",
            "get_namespaces",
            "get_page_titles",
            "get_image_names",
        ])
        .multiple(true)
        .required(true)
))]
struct Cli {
    /// URL of the wiki (front page, api.php or index.php)
    #[arg(value_name = "WIKI")]
    wiki: String,

    /// Dump directory (default: ./<domain>-<date>-wikidump)
    #[arg(long, value_name = "DIR")]
    path: Option<PathBuf>,

    /// Resume the dump stored in the dump directory
    #[arg(long)]
    resume: bool,

    /// What to do when the dump directory is already in use
    #[arg(long, value_enum, default_value_t = OnCollision::Ask)]
    on_collision: OnCollision,

    /// Dump page titles and page revisions
    #[arg(long)]
    pages: bool,

    /// Only the current revision of each page
    #[arg(long, requires = "pages")]
    curonly: bool,

    /// Dump uploaded files
    #[arg(long)]
    images: bool,

    /// Namespaces to dump: "all" or comma-separated ids
    #[arg(long, value_name = "LIST", default_value = "all")]
    namespaces: String,

    /// Namespaces to skip: comma-separated ids
    #[arg(long, value_name = "LIST")]
    exnamespaces: Option<String>,

    /// Print the engine of the wiki and exit
    #[arg(long)]
    get_wiki_engine: bool,

    /// Print the api.php URL of a MediaWiki site and exit
    #[arg(long)]
    get_api: bool,

    /// Print the index.php URL of a MediaWiki site and exit
    #[arg(long)]
    get_index: bool,

    /// Print the namespaces of the wiki and exit
    #[arg(long)]
    get_namespaces: bool,

    /// Print the page titles of the wiki (filtered by --namespaces/--exnamespaces) and exit
    #[arg(long)]
    get_page_titles: bool,

    /// Print the names of the uploaded files and exit
    #[arg(long)]
    get_image_names: bool,

    /// URL of api.php, skipping discovery
    #[arg(long, value_name = "URL")]
    mwapi: Option<String>,

    /// URL of index.php, skipping discovery
    #[arg(long, value_name = "URL")]
    mwindex: Option<String>,

    /// Maximum retries per request
    #[arg(long, default_value_t = 5)]
    retries: u32,

    /// Seconds to wait between requests
    #[arg(long, default_value_t = 0.0)]
    delay: f64,

    /// Username for wikis that require login
    #[arg(long, requires = "pass")]
    user: Option<String>,

    /// Password for --user
    #[arg(long = "pass", requires = "user")]
    pass: Option<String>,

    /// Netscape-format cookie file
    #[arg(long, value_name = "FILE")]
    cookies: Option<PathBuf>,

    /// Client settings file (user agent, timeouts)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn is_meta_query(&self) -> bool {
        self.get_wiki_engine || self.get_api || self.get_index || self.wants_listing()
    }

    fn wants_listing(&self) -> bool {
        self.get_namespaces || self.get_page_titles || self.get_image_names
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OnCollision {
    /// Ask on the terminal
    Ask,
    Resume,
    /// Use the next free <dir>-N
    Rename,
    Abort,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);
    if !cli.quiet {
        welcome();
    }

    let settings = match &cli.settings {
        Some(path) => {
            tracing::info!("Loading settings from: {}", path.display());
            load_settings(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?
        }
        None => Settings::default(),
    };

    validate_wiki_url(&cli.wiki)?;
    if is_wikimedia_project(&cli.wiki) {
        tracing::warn!(
            "{} is a Wikimedia project. Wikimedia publishes complete dumps at \
             https://dumps.wikimedia.org; please use those instead of crawling",
            cli.wiki
        );
    }

    let policy = NetworkPolicy {
        retries: cli.retries,
        delay_secs: cli.delay,
    };
    let probe = HttpProbe::from_settings(&settings, policy, cli.cookies.as_deref())?;

    if cli.is_meta_query() {
        handle_meta(&cli, &probe).await?;
    } else {
        let request = build_request(&cli, policy)?;
        handle_dump(&cli, request, probe).await?;
    }

    if !cli.quiet {
        bye();
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wikidump=info,warn"),
            1 => EnvFilter::new("wikidump=debug,info"),
            2 => EnvFilter::new("wikidump=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn welcome() {
    eprintln!("wikidump {}", env!("CARGO_PKG_VERSION"));
    eprintln!("Resumable dumps of public wikis. Please be gentle with small servers.\n");
}

fn bye() {
    eprintln!("\nFinished. Consider sharing your dump with a public archive.");
}

/// Assembles the operator's request from the command line
fn build_request(cli: &Cli, policy: NetworkPolicy) -> anyhow::Result<CrawlConfigBuilder> {
    let exclude = match &cli.exnamespaces {
        Some(list) => parse_excluded_namespaces(list)?,
        None => Vec::new(),
    };

    let credentials = match (&cli.user, &cli.pass) {
        (Some(user), Some(password)) => Some(Credentials {
            user: user.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    let mut builder = CrawlConfigBuilder::new(cli.wiki.clone())
        .content(ContentSelection {
            pages: cli.pages,
            current_only: cli.curonly,
            images: cli.images,
        })
        .namespaces(NamespaceFilter {
            include: parse_namespaces(&cli.namespaces)?,
            exclude,
        })
        .network(policy)
        .entry_points(EntryPoints {
            api: cli.mwapi.clone(),
            browse: cli.mwindex.clone(),
        })
        .credentials(credentials);

    if let Some(path) = &cli.path {
        builder = builder.path(path.clone());
    }
    if let Some(cookies) = &cli.cookies {
        builder = builder.cookies(cookies.clone());
    }

    builder.validate()?;
    Ok(builder)
}

/// Adapters compiled into this build
fn adapter_registry() -> AdapterRegistry {
    let registry = AdapterRegistry::new();
    if registry.is_empty() {
        tracing::debug!("No engine adapters registered in this build");
    }
    registry
}

/// Handles --get-wiki-engine, --get-api, --get-index and the listing queries
async fn handle_meta(cli: &Cli, probe: &HttpProbe) -> anyhow::Result<()> {
    let sample = probe.fetch_front_page(&cli.wiki).await?;
    let engine = classify(&sample);

    let candidates = matching_engines(&sample);
    if candidates.len() > 1 {
        tracing::debug!("Signatures of {:?} matched; the first one wins", candidates);
    }

    if cli.get_wiki_engine {
        println!("{}", engine);
    }

    if cli.get_api || cli.get_index {
        if engine != Engine::MediaWiki {
            tracing::warn!(
                "{} does not look like MediaWiki ({}); endpoint discovery may fail",
                cli.wiki,
                engine
            );
        }

        let points = EntryPoints {
            api: cli.mwapi.clone(),
            browse: cli.mwindex.clone(),
        }
        .or(discover_mediawiki_entry_points(&sample, &cli.wiki));

        if cli.get_api {
            let api = points.api.as_deref().with_context(|| {
                format!("No api.php found for {}; pass it with --mwapi", cli.wiki)
            })?;
            println!("{}", api);
        }
        if cli.get_index {
            let index = points.browse.as_deref().with_context(|| {
                format!("No index.php found for {}; pass it with --mwindex", cli.wiki)
            })?;
            println!("{}", index);
        }
    }

    if cli.wants_listing() {
        handle_listing(cli, engine).await?;
    }

    Ok(())
}

/// Handles --get-namespaces, --get-page-titles and --get-image-names
async fn handle_listing(cli: &Cli, engine: Engine) -> anyhow::Result<()> {
    let adapter = adapter_registry().require(engine)?;

    if cli.get_namespaces {
        for namespace in adapter.list_namespaces(&cli.wiki).await? {
            println!("{}\t{}", namespace.id, namespace.name);
        }
    }
    if cli.get_page_titles {
        let filter = NamespaceFilter {
            include: parse_namespaces(&cli.namespaces)?,
            exclude: match &cli.exnamespaces {
                Some(list) => parse_excluded_namespaces(list)?,
                None => Vec::new(),
            },
        };
        for title in adapter.list_page_titles(&cli.wiki, &filter).await? {
            println!("{}", title);
        }
    }
    if cli.get_image_names {
        for name in adapter.list_image_names(&cli.wiki).await? {
            println!("{}", name);
        }
    }

    Ok(())
}

/// Handles the dump operation
async fn handle_dump(cli: &Cli, request: CrawlConfigBuilder, probe: HttpProbe) -> anyhow::Result<()> {
    let policy: Box<dyn CollisionPolicy> = match cli.on_collision {
        OnCollision::Ask => Box::new(InteractivePrompt::new(io::stdin().lock(), io::stderr())),
        OnCollision::Resume => Box::new(FixedPolicy(CollisionDecision::Resume)),
        OnCollision::Rename => Box::new(FixedPolicy(CollisionDecision::Rename)),
        OnCollision::Abort => Box::new(FixedPolicy(CollisionDecision::Abort)),
    };

    let mut orchestrator = DumpOrchestrator::new(probe, adapter_registry(), policy);
    match orchestrator.run(request, cli.resume).await {
        Ok(report) => {
            tracing::info!(
                "{} dump {} in {}",
                report.engine,
                if report.resumed { "resumed and completed" } else { "completed" },
                report.path.display()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Dump failed: {}", e);
            Err(e.into())
        }
    }
}
