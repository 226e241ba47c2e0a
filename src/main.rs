//! CLI entry point for the air-quality pipeline.
//!
//! Each stage is a subcommand; `run` chains collect, transform, mirror and
//! aggregate and stops at the first fatal error.

use anyhow::{Context, Result};
use aq_pipeline::config::{DataPaths, RetryPolicy, SinkConfig, default_locations, load_locations};
use aq_pipeline::fetch::auth::UrlParam;
use aq_pipeline::fetch::{BasicClient, HttpClient};
use aq_pipeline::infra::open_meteo::{DEFAULT_BASE_URL, OpenMeteoSource};
use aq_pipeline::infra::sink::build_sink_or_noop;
use aq_pipeline::model::Location;
use aq_pipeline::pipeline;
use aq_pipeline::samples::write_samples;
use aq_pipeline::store::Store;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "aq_pipeline")]
#[command(about = "Collect, classify and summarize city air-quality data", long_about = None)]
struct Cli {
    /// Root directory for raw, staged and report files
    #[arg(short, long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// JSON file mapping location names to [latitude, longitude]
    #[arg(short, long, global = true)]
    locations: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct CollectArgs {
    /// Attempts per location before giving up
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Fixed pause between attempts, in seconds
    #[arg(long, default_value_t = 5)]
    retry_delay_secs: u64,

    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[derive(Args, Clone)]
struct MirrorArgs {
    /// Optional: S3 bucket to mirror raw payloads to (e.g., "my-bucket")
    #[arg(long)]
    s3_bucket: Option<String>,

    /// Optional: Gzip compress objects before uploading to S3
    #[arg(long, default_value_t = false)]
    gzip: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every location and save raw payloads
    Collect(CollectArgs),
    /// Normalize and classify raw payloads into the dataset
    Transform,
    /// Mirror raw payloads to the configured sink
    Mirror(MirrorArgs),
    /// Recompute summary reports from the dataset
    Aggregate,
    /// Write synthetic raw payloads for offline runs
    Samples,
    /// Run every stage in order
    Run {
        #[command(flatten)]
        collect: CollectArgs,

        #[command(flatten)]
        mirror: MirrorArgs,

        /// Use generated samples instead of the remote source
        #[arg(long, default_value_t = false)]
        offline: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_logging();

    let cli = Cli::parse();

    if let Err(e) = dispatch(cli).await {
        error!(error = %format!("{e:#}"), "Pipeline failed");
        return Err(e);
    }
    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/aq_pipeline.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("aq_pipeline.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(LevelFilter::INFO.into()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive(LevelFilter::DEBUG.into()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}

async fn dispatch(cli: Cli) -> Result<()> {
    let paths = DataPaths::new(&cli.data_dir);
    let locations = match &cli.locations {
        Some(path) => load_locations(path)?,
        None => default_locations(),
    };

    match cli.command {
        Commands::Collect(args) => collect(&args, &locations, &paths).await,
        Commands::Transform => transform(&paths),
        Commands::Mirror(args) => mirror(&args, &paths).await,
        Commands::Aggregate => aggregate(&paths),
        Commands::Samples => samples(&locations, &paths),
        Commands::Run {
            collect: collect_args,
            mirror: mirror_args,
            offline,
        } => {
            pipeline::ensure_dirs(&paths)?;
            if offline {
                samples(&locations, &paths)?;
            } else {
                collect(&collect_args, &locations, &paths).await?;
            }
            transform(&paths)?;
            mirror(&mirror_args, &paths).await?;
            aggregate(&paths)?;
            info!("Pipeline finished successfully");
            Ok(())
        }
    }
}

/// Open-Meteo client. `OPEN_METEO_API_KEY` switches to the commercial
/// endpoint (or `OPEN_METEO_BASE_URL` when set).
fn measurement_source(timeout: Duration) -> Result<OpenMeteoSource> {
    let client = BasicClient::with_timeout(timeout).context("Failed to build HTTP client")?;
    let base_url = std::env::var("OPEN_METEO_BASE_URL").ok();

    let source = match std::env::var("OPEN_METEO_API_KEY").ok().filter(|k| !k.is_empty()) {
        Some(key) => {
            let client: Box<dyn HttpClient> = Box::new(UrlParam::new(client, "apikey", key));
            let base_url = base_url
                .unwrap_or_else(|| "https://customer-air-quality-api.open-meteo.com".to_string());
            OpenMeteoSource::with_base_url(client, base_url)
        }
        None => OpenMeteoSource::with_base_url(
            Box::new(client),
            base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        ),
    };
    Ok(source)
}

async fn collect(args: &CollectArgs, locations: &[Location], paths: &DataPaths) -> Result<()> {
    let policy = RetryPolicy::new(args.max_attempts, args.retry_delay_secs, args.timeout_secs)?;
    let source = measurement_source(policy.timeout)?;

    let summary = pipeline::collect(&source, locations, &policy, paths).await?;

    info!(saved = summary.saved.len(), "Extraction completed");
    for path in &summary.saved {
        info!(path = %path.display(), "Saved file");
    }
    for location in &summary.failed {
        info!(location = %location, "No data saved");
    }
    Ok(())
}

fn transform(paths: &DataPaths) -> Result<()> {
    let store = Store::local(paths.dataset_file());
    let summary = pipeline::transform(paths, &store)?;
    info!(
        dataset = %store.path().display(),
        appended = summary.appended,
        "Transform step complete"
    );
    Ok(())
}

async fn mirror(args: &MirrorArgs, paths: &DataPaths) -> Result<()> {
    let sink_config = SinkConfig::from_env(args.s3_bucket.clone(), args.gzip);
    if sink_config == SinkConfig::Disabled {
        info!("Mirror sink not configured, raw payloads stay local");
    }
    let sink = build_sink_or_noop(&sink_config).await;
    let store = Store::new(paths.dataset_file(), sink);

    pipeline::mirror(paths, &store).await?;
    Ok(())
}

fn aggregate(paths: &DataPaths) -> Result<()> {
    let store = Store::local(paths.dataset_file());
    for path in pipeline::analyze(paths, &store)? {
        info!(path = %path.display(), "Saved report");
    }
    Ok(())
}

fn samples(locations: &[Location], paths: &DataPaths) -> Result<()> {
    for path in write_samples(locations, &paths.raw_dir, Utc::now())? {
        info!(path = %path.display(), "Wrote sample");
    }
    Ok(())
}
