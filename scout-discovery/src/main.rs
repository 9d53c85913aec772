//! scout-discovery - run one discovery job and exit
//!
//! Invoked by an external scheduler once per tick:
//! - `scout-discovery catalog` finds artists similar to the library
//! - `scout-discovery recommendations` pulls ListenBrainz recommendations

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scout_common::config::{self, LoggingConfig, TomlConfig};
use scout_discovery::clients::{
    CoverArtArchive, LastFmClient, ListenBrainzClient, MusicBrainzClient, SubsonicClient,
};
use scout_discovery::db::SqliteStore;
use scout_discovery::discovery::{CatalogDiscoveryJob, DiscoveryCollaborators};
use scout_discovery::providers::{LastFmProvider, ListenBrainzProvider, SimilarityProvider};
use scout_discovery::recommendations::{
    RecommendationCollaborators, RecommendationJob, RecommendationSettings,
};
use scout_discovery::types::SourceRegistry;
use scout_discovery::{JobOutcome, JobRegistry, CATALOG_DISCOVERY_JOB, LISTENBRAINZ_FETCH_JOB};

/// Command-line arguments for scout-discovery
#[derive(Parser, Debug)]
#[command(name = "scout-discovery")]
#[command(about = "Music discovery jobs for Scout")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "SCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding scout.db
    #[arg(short, long, env = "SCOUT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    job: Job,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Job {
    /// Discover artists similar to the library and queue their albums
    Catalog,
    /// Queue ListenBrainz recommendations
    Recommendations,
}

/// Shared clients and storage for either job
///
/// `jobs` only sees this process. Exclusivity across scheduler ticks comes
/// from the `job_locks` row each run holds in the shared database, which is
/// also what the catalog job consults before deferring.
struct Services {
    user_agent: String,
    musicbrainz: Arc<MusicBrainzClient>,
    store: Arc<SqliteStore>,
    cover_art: Arc<CoverArtArchive>,
    jobs: JobRegistry,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logging level may come from the config file, so load it first
    let loaded = config::load_or_default(args.config.as_deref());
    let default_filter = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| LoggingConfig::default().level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = loaded.context("Failed to load configuration")?;

    info!("Starting scout-discovery {}", env!("CARGO_PKG_VERSION"));

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &config);
    let db_path = config::database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let pool = scout_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let user_agent = config::get_user_agent();
    let services = Services {
        musicbrainz: Arc::new(
            MusicBrainzClient::new(&user_agent).context("Failed to build MusicBrainz client")?,
        ),
        store: Arc::new(SqliteStore::new(pool)),
        cover_art: Arc::new(CoverArtArchive::default()),
        jobs: JobRegistry::new(),
        user_agent,
    };

    match args.job {
        Job::Catalog => run_catalog(&config, &services).await,
        Job::Recommendations => run_recommendations(&config, &services).await,
    }
}

async fn run_catalog(config: &TomlConfig, services: &Services) -> Result<()> {
    let settings = &config.catalog_discovery;

    let source = match &settings.subsonic {
        Some(subsonic) => Some(Arc::new(
            SubsonicClient::new(
                &services.user_agent,
                &subsonic.host,
                &subsonic.username,
                &subsonic.password,
            )
            .context("Failed to build Subsonic client")?,
        ) as Arc<dyn SourceRegistry>),
        None => None,
    };

    let mut providers: Vec<Arc<dyn SimilarityProvider>> = Vec::new();
    if let Some(api_key) = settings.lastfm_api_key() {
        let client = LastFmClient::new(&services.user_agent, api_key)
            .context("Failed to build Last.fm client")?;
        providers.push(Arc::new(LastFmProvider::new(client)));
    }
    if settings.listenbrainz_enabled() {
        let client = ListenBrainzClient::new(&services.user_agent)
            .context("Failed to build ListenBrainz client")?;
        providers.push(Arc::new(ListenBrainzProvider::new(
            client,
            services.musicbrainz.clone(),
        )));
    }

    let collaborators = DiscoveryCollaborators {
        source,
        naming: services.musicbrainz.clone(),
        details: services.musicbrainz.clone(),
        cover_art: services.cover_art.clone(),
        store: services.store.clone(),
        pending: services.store.clone(),
        jobs: services.store.clone(),
    };
    let job = CatalogDiscoveryJob::new(settings.clone(), collaborators, providers);

    let guard = services
        .jobs
        .start(CATALOG_DISCOVERY_JOB)
        .context("Catalog discovery is already running")?;
    cancel_on_ctrl_c(&services.jobs, CATALOG_DISCOVERY_JOB);

    acquire_lock(services, CATALOG_DISCOVERY_JOB).await?;
    let outcome = job.run(guard.token()).await;
    release_lock(services, CATALOG_DISCOVERY_JOB).await;

    report_outcome(CATALOG_DISCOVERY_JOB, outcome?)
}

async fn run_recommendations(config: &TomlConfig, services: &Services) -> Result<()> {
    let feed = ListenBrainzClient::new(&services.user_agent)
        .context("Failed to build ListenBrainz client")?;

    let collaborators = RecommendationCollaborators {
        feed: Arc::new(feed),
        resolver: services.musicbrainz.clone(),
        pending: services.store.clone(),
        processed: services.store.clone(),
        cover_art: services.cover_art.clone(),
    };
    let job = RecommendationJob::new(RecommendationSettings::from_config(config), collaborators);

    let guard = services
        .jobs
        .start(LISTENBRAINZ_FETCH_JOB)
        .context("ListenBrainz fetch is already running")?;
    cancel_on_ctrl_c(&services.jobs, LISTENBRAINZ_FETCH_JOB);

    acquire_lock(services, LISTENBRAINZ_FETCH_JOB).await?;
    let outcome = job.run(guard.token()).await;
    release_lock(services, LISTENBRAINZ_FETCH_JOB).await;

    report_outcome(LISTENBRAINZ_FETCH_JOB, outcome?)
}

/// Take the shared database lock for `job_name`
async fn acquire_lock(services: &Services, job_name: &str) -> Result<()> {
    let acquired = services
        .store
        .acquire_job_lock(job_name)
        .await
        .context("Failed to take job lock")?;
    if !acquired {
        bail!("{} is already running in another process", job_name);
    }
    Ok(())
}

async fn release_lock(services: &Services, job_name: &str) {
    if let Err(e) = services.store.release_job_lock(job_name).await {
        tracing::warn!(job = job_name, error = %e, "Failed to release job lock");
    }
}

/// Cancel `job_name` on Ctrl+C
fn cancel_on_ctrl_c(jobs: &JobRegistry, job_name: &'static str) {
    let jobs = jobs.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling {}", job_name);
            jobs.cancel(job_name);
        }
    });
}

fn report_outcome<R: Serialize>(job_name: &str, outcome: JobOutcome<R>) -> Result<()> {
    match outcome {
        JobOutcome::Completed(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        JobOutcome::Skipped(reason) => info!("{} skipped: {}", job_name, reason),
        JobOutcome::Deferred(reason) => info!("{} deferred: {}", job_name, reason),
        JobOutcome::Cancelled => info!("{} cancelled", job_name),
    }
    Ok(())
}
