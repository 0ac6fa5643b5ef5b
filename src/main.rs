mod aggregate;
mod api_types;
mod backend;
mod budget;
mod catalog;
mod export;
mod extract;
mod fetch;
mod models;
mod orchestrator;
mod parse;
mod prompts;
mod render;
mod resolve;
mod similarity;

use anyhow::{bail, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use backend::{resolve_awful_config_path, AwfulJadeBackend, Backend, GeminiBackend, DEFAULT_GEMINI_MODEL};
use catalog::Catalogs;
use export::{run_stamp, OutputPaths};
use extract::RetryPolicy;
use fetch::{fetch_manifest_items, YtDlp, BUNGIE_ROOT};
use orchestrator::{run_playlist, PipelineSettings};
use resolve::Resolver;

/// God Roll Agent - extracts weapon recommendations from video transcripts
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the Destiny 2 manifest and write weapon/perk lookup files
    BuildCatalog {
        /// Directory for weapon_lookup.json and perk_lookup.json
        #[arg(long, default_value = ".")]
        catalog_dir: PathBuf,

        /// Bungie API key, sent as X-API-Key when present
        #[arg(long, env = "BUNGIE_API_KEY")]
        bungie_api_key: Option<String>,
    },

    /// Process a playlist and write the import and review documents
    Run(RunArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Google Gemini (GEMINI_API_KEY)
    Gemini,
    /// OpenAI-compatible endpoint configured through awful_aj
    Awful,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Playlist URL to scan
    #[arg(short, long)]
    playlist: String,

    /// 1-based index of the first video to process
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    start: u64,

    /// Output directory for generated files
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Directory holding weapon_lookup.json and perk_lookup.json
    #[arg(long, default_value = ".")]
    catalog_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = BackendKind::Gemini)]
    backend: BackendKind,

    /// Gemini model name
    #[arg(long, env = "GODROLL_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    model: String,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// awful_aj config file (overrides AJ_CONFIG environment variable)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// awful_aj template name for the awful backend
    #[arg(long, env = "AJ_TEMPLATE", default_value = "simple_question")]
    template: String,

    /// Minimum fuzzy similarity (0-100) for a name to resolve
    #[arg(long, default_value_t = resolve::DEFAULT_THRESHOLD, value_parser = clap::value_parser!(u8).range(0..=100))]
    threshold: u8,

    /// Disable fuzzy matching; only exact catalog names resolve
    #[arg(long)]
    no_fuzzy: bool,

    /// Attempts per video when the backend is rate limited
    #[arg(long, default_value_t = extract::DEFAULT_MAX_RETRIES, value_parser = clap::value_parser!(u32).range(1..))]
    max_retries: u32,

    /// Base backoff in seconds; attempt n waits base * n
    #[arg(long, default_value_t = extract::DEFAULT_BASE_WAIT_SECS)]
    base_wait: u64,

    /// Pause in seconds between videos
    #[arg(long, default_value_t = orchestrator::DEFAULT_COOLDOWN_SECS)]
    cooldown: u64,

    /// Maximum transcript characters sent to the model
    #[arg(long, default_value_t = budget::DEFAULT_TRANSCRIPT_CAP)]
    transcript_cap: usize,

    /// yt-dlp executable
    #[arg(long, default_value = "yt-dlp")]
    yt_dlp: PathBuf,
}

async fn build_catalog(catalog_dir: PathBuf, api_key: Option<String>) -> Result<()> {
    let client = reqwest::Client::builder().build()?;
    let items = fetch_manifest_items(&client, BUNGIE_ROOT, api_key.as_deref()).await?;
    let catalogs = Catalogs::from_manifest(items);
    catalogs.save(&catalog_dir)?;
    info!(
        "Catalog build completed - weapons={}, perks={}, dir={}",
        catalogs.weapons.len(),
        catalogs.perks.len(),
        catalog_dir.display()
    );
    Ok(())
}

async fn make_backend(args: &RunArgs) -> Result<Box<dyn Backend>> {
    match args.backend {
        BackendKind::Gemini => {
            let Some(key) = args.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
                bail!("No API key found! Set GEMINI_API_KEY or pass --api-key.");
            };
            Ok(Box::new(GeminiBackend::new(key, &args.model)?))
        }
        BackendKind::Awful => {
            let cfg_path = resolve_awful_config_path(args.config.as_deref())?;
            debug!("Using awful_aj config: {}", cfg_path.display());
            Ok(Box::new(AwfulJadeBackend::load(&cfg_path, &args.template).await?))
        }
    }
}

async fn run(args: RunArgs) -> Result<()> {
    // Catalog availability is the only run-fatal precondition.
    let catalogs = Catalogs::load(&args.catalog_dir)?;

    let resolver = if args.no_fuzzy {
        warn!("Fuzzy matching disabled - only exact names will resolve");
        Resolver::exact_only()
    } else {
        Resolver::fuzzy(args.threshold)
    };

    let backend = make_backend(&args).await?;
    let settings = PipelineSettings {
        transcript_cap: args.transcript_cap,
        retry: RetryPolicy {
            max_retries: args.max_retries,
            base_wait: Duration::from_secs(args.base_wait),
        },
        cooldown: Duration::from_secs(args.cooldown),
        ..PipelineSettings::default()
    };

    let paths = OutputPaths::new(&args.output_dir, &run_stamp(&Local::now()));
    info!(
        "Output files - import={}, review={}",
        paths.import_json.display(),
        paths.review_md.display()
    );

    let source = YtDlp::new(args.yt_dlp.clone());
    let start_index = usize::try_from(args.start - 1)?;
    run_playlist(
        &source,
        backend.as_ref(),
        &catalogs,
        &resolver,
        &settings,
        &args.playlist,
        start_index,
        &paths,
    )
    .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    let args = Args::parse();

    match args.command {
        Command::BuildCatalog { catalog_dir, bungie_api_key } => build_catalog(catalog_dir, bungie_api_key).await,
        Command::Run(run_args) => run(run_args).await,
    }
}
