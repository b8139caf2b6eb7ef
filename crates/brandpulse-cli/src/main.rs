mod pipeline;
mod report;

use brandpulse_core::{load_brands, ConfigError, PipelineConfig, SourcePlatform, Stage};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::pipeline::{AtStage, RunOptions};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/brandpulse.db";

#[derive(Debug, Parser)]
#[command(name = "brandpulse")]
#[command(about = "Brand sentiment ETL: extract, normalize, classify and load social mentions")]
struct Cli {
    /// Warehouse location
    #[arg(
        long,
        global = true,
        env = "BRANDPULSE_DATABASE_URL",
        default_value = DEFAULT_DATABASE_URL
    )]
    database_url: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full pipeline: extract, normalize, classify, load
    Run {
        /// Use synthetic content and the offline lexicon classifier
        #[arg(long)]
        demo: bool,

        /// Restrict extraction to these topics (repeatable); defaults to every brand
        #[arg(long = "topic")]
        topics: Vec<String>,

        /// Items per topic and platform
        #[arg(long)]
        limit: Option<u32>,

        /// Drop items created before this RFC 3339 timestamp
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
    /// Extract and append to the raw record store only
    Extract {
        /// Use synthetic content
        #[arg(long)]
        demo: bool,

        /// Restrict extraction to these topics (repeatable)
        #[arg(long = "topic")]
        topics: Vec<String>,

        /// Items per topic and platform
        #[arg(long)]
        limit: Option<u32>,

        /// Drop items created before this RFC 3339 timestamp
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
    /// Show warehouse row counts, aggregates and recent runs
    Status,
    /// Generate a markdown sentiment report
    Report {
        /// Filter to one brand keyword
        #[arg(long)]
        brand: Option<String>,

        /// Filter to one platform (reddit or youtube)
        #[arg(long)]
        platform: Option<SourcePlatform>,

        /// Number of recent mentions to list
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

/// Load pipeline configuration, letting command-line flags take precedence
/// over the environment.
fn load_config(database_url: &str, demo: bool) -> Result<PipelineConfig, ConfigError> {
    brandpulse_core::build_pipeline_config(|key| match key {
        "BRANDPULSE_DATABASE_URL" => Ok(database_url.to_string()),
        "BRANDPULSE_DEMO_MODE" if demo => Ok("true".to_string()),
        _ => std::env::var(key),
    })
}

fn init_tracing(fallback_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

fn fallback_log_level() -> String {
    std::env::var("BRANDPULSE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
}

async fn run_command(
    database_url: &str,
    demo: bool,
    options: RunOptions,
    extract_only: bool,
) -> anyhow::Result<()> {
    let config = load_config(database_url, demo).at_stage(Stage::Config)?;
    init_tracing(&config.log_level)?;
    tracing::debug!(?config, "configuration loaded");

    let brands = load_brands(&config.brands_path).at_stage(Stage::Config)?;
    let pool = pipeline::open_store(&config.database_url).await?;

    if extract_only {
        let summary = pipeline::run_extract(&pool, &config, &brands, &options).await?;
        println!(
            "extracted {} records from {} requests ({} failed); {} new in raw store",
            summary.fetched, summary.requests, summary.failed_requests, summary.inserted
        );
    } else {
        let summary = pipeline::run_pipeline(&pool, &config, &brands, &options).await?;
        println!("run {}", summary.run_id);
        println!(
            "  extracted:  {} fetched, {} new, {} failed requests",
            summary.extract.fetched, summary.extract.inserted, summary.extract.failed_requests
        );
        println!("  scored:     {}", summary.scored);
        println!(
            "  loaded:     rows_written={} kpi_rows_written={} duplicates_collapsed={}",
            summary.load.rows_written,
            summary.load.kpi_rows_written,
            summary.load.duplicates_collapsed
        );
    }

    pool.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Run {
            demo,
            topics,
            limit,
            since,
        }) => {
            let options = RunOptions {
                topics,
                limit,
                since,
            };
            run_command(&cli.database_url, demo, options, false).await?;
        }
        Some(Commands::Extract {
            demo,
            topics,
            limit,
            since,
        }) => {
            let options = RunOptions {
                topics,
                limit,
                since,
            };
            run_command(&cli.database_url, demo, options, true).await?;
        }
        Some(Commands::Status) => {
            init_tracing(&fallback_log_level())?;
            let pool = pipeline::open_store(&cli.database_url).await?;
            report::run_status(&pool).await?;
            pool.close().await;
        }
        Some(Commands::Report {
            brand,
            platform,
            limit,
        }) => {
            init_tracing(&fallback_log_level())?;
            let pool = pipeline::open_store(&cli.database_url).await?;
            report::run_report(&pool, brand.as_deref(), platform, limit).await?;
            pool.close().await;
        }
        None => println!("brandpulse: run `brandpulse --help` for commands"),
    }

    Ok(())
}
