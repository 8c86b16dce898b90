//! CLI entry point for flat_finder.
//!
//! Provides subcommands for searching resale listings with affordability
//! tiers, classifying a single price, and looking up one transaction.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use flat_finder::{
    affordability::classify_text,
    config::Settings,
    fetch::{BasicClient, HttpClient, auth::ApiKey},
    geocode::{GeocodeFailurePolicy, GeocodingBatcher},
    infra::{datagov::DataGovClient, onemap::OneMapClient},
    listings::{ListingFetcher, SearchCriteria},
    output::{write_csv, write_csv_file, write_json},
    pipeline::{AggregationPipeline, TierSummary},
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "flat_finder")]
#[command(about = "Find HDB resale listings and rate their affordability", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Search listings in a town and tag each with coordinates and a tier
    Search {
        /// Town to search in (e.g. "ANG MO KIO")
        #[arg(long)]
        area: String,

        /// Price the buyer is aiming for
        #[arg(long, default_value_t = 0.0)]
        preferred_price: f64,

        /// Monthly household salary
        #[arg(long, default_value_t = 0.0)]
        salary: f64,

        /// Flat type for grant eligibility (e.g. "4-Room")
        #[arg(long, default_value = "")]
        flat_type: String,

        /// CPF Ordinary Account balance
        #[arg(long, default_value_t = 0.0)]
        cpf_balance: f64,

        /// Flat category to filter on (e.g. "4-room")
        #[arg(long, default_value = "")]
        hdb_category: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// CSV file to write (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Override GEOCODE_BATCH_SIZE
        #[arg(long)]
        batch_size: Option<usize>,

        /// Override LISTING_LIMIT
        #[arg(long)]
        limit: Option<usize>,

        /// Leave coordinates empty for failed lookups instead of aborting
        #[arg(long, default_value_t = false)]
        isolate_failures: bool,
    },
    /// Classify one listing price against a buyer profile
    Classify {
        #[arg(long)]
        preferred_price: String,

        #[arg(long)]
        listing_price: String,

        #[arg(long)]
        salary: f64,

        #[arg(long)]
        flat_type: String,

        #[arg(long, default_value = "0")]
        cpf_balance: String,
    },
    /// Show one transaction by block, street and month, with its postal code
    Details {
        #[arg(long)]
        block: String,

        #[arg(long)]
        street: String,

        /// Month of the transaction (YYYY-MM)
        #[arg(long)]
        month: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/flat_finder.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("flat_finder.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;

    match cli.command {
        Commands::Search {
            area,
            preferred_price,
            salary,
            flat_type,
            cpf_balance,
            hdb_category,
            format,
            output,
            batch_size,
            limit,
            isolate_failures,
        } => {
            if let Some(batch_size) = batch_size {
                settings.batch_size = batch_size;
            }
            if let Some(limit) = limit {
                settings.listing_limit = limit;
            }
            if isolate_failures {
                settings.failure_policy = GeocodeFailurePolicy::Isolate;
            }
            settings.validate()?;

            let criteria = SearchCriteria {
                area,
                preferred_price,
                salary,
                flat_type,
                cpf_balance,
                hdb_category,
            };

            let pipeline = build_pipeline(&settings)?;
            let listings = pipeline.aggregate(&criteria).await?;
            let summary = TierSummary::from_listings(&listings);

            match (format, output) {
                (Format::Json, _) => write_json(std::io::stdout().lock(), &listings)?,
                (Format::Csv, Some(path)) => {
                    write_csv_file(&path, &listings)?;
                    info!(path = %path, rows = listings.len(), "CSV written");
                }
                (Format::Csv, None) => write_csv(std::io::stdout().lock(), &listings)?,
            }

            info!(
                total = summary.total,
                located = summary.located,
                "Search finished"
            );
        }
        Commands::Classify {
            preferred_price,
            listing_price,
            salary,
            flat_type,
            cpf_balance,
        } => {
            let tier = classify_text(
                &preferred_price,
                &listing_price,
                salary,
                &flat_type,
                &cpf_balance,
            );
            write_json(
                std::io::stdout().lock(),
                &serde_json::json!({ "tier": tier, "color": tier.color() }),
            )?;
        }
        Commands::Details {
            block,
            street,
            month,
        } => {
            let pipeline = build_pipeline(&settings)?;
            let details = pipeline.details(&block, &street, &month).await?;
            write_json(std::io::stdout().lock(), &details)?;
        }
    }

    Ok(())
}

/// Wires the HTTP transports and upstream clients into a pipeline.
fn build_pipeline(settings: &Settings) -> Result<AggregationPipeline> {
    let datagov_http: Arc<dyn HttpClient> = {
        let basic = BasicClient::new(settings.request_timeout, settings.connect_timeout)?;
        match &settings.datagov_api_key {
            Some(key) => Arc::new(ApiKey::x_api_key(basic, key)?) as Arc<dyn HttpClient>,
            None => Arc::new(basic),
        }
    };
    let onemap_http: Arc<dyn HttpClient> = Arc::new(BasicClient::new(
        settings.request_timeout,
        settings.connect_timeout,
    )?);

    let dataset = DataGovClient::new(datagov_http, &settings.datagov_base_url, &settings.dataset_id);
    let search = OneMapClient::new(onemap_http, &settings.onemap_base_url);

    info!(
        dataset = %settings.dataset_id,
        batch_size = settings.batch_size,
        limit = settings.listing_limit,
        policy = ?settings.failure_policy,
        "Pipeline configured"
    );

    let fetcher = ListingFetcher::new(Arc::new(dataset), settings.listing_limit);
    let geocoder = GeocodingBatcher::new(Arc::new(search))
        .with_batch_size(settings.batch_size)
        .with_timeout(settings.request_timeout)
        .with_policy(settings.failure_policy);

    Ok(AggregationPipeline::new(fetcher, geocoder))
}
