use alerter::AlertScanner;
use analytics::{AggregateReporter, PositionAnalyzer, RepricingAdvisor, daily_series};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use configuration::{Config, load_config};
use core_types::TimeWindow;
use serde::Serialize;
use std::path::PathBuf;
use store::{ObservationStore, SourceFilter};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod ingest;
mod render;

/// The main entry point for the pricewatch command-line tool.
fn main() -> Result<()> {
    // A missing .env file is fine; it only carries optional overrides.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_ref())?;

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let store = build_store(&config, cli.observations.as_ref())?;

    // Execute the appropriate command
    match &cli.command {
        Commands::Report(args) => handle_report(&cli, &config, &store, args),
        Commands::Alerts(args) => handle_alerts(&cli, &config, &store, args),
        Commands::Suggest(args) => handle_suggest(&cli, &config, &store, args),
        Commands::History(args) => handle_history(&cli, &config, &store, args),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Competitive price analytics over a catalog and a file of price observations.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration holding the catalog and analysis settings.
    #[arg(long, default_value = "pricewatch.toml")]
    config: PathBuf,

    /// JSON file of price observations to load before running the command.
    #[arg(long)]
    observations: Option<PathBuf>,

    /// Print results as JSON instead of tables.
    #[arg(long)]
    json: bool,

    /// Also write logs to a daily-rolling file in this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Competitive position and margin for every product, plus a summary.
    Report(WindowArgs),
    /// MAP violations, competitor price drops, stock-outs and low margins.
    Alerts(WindowArgs),
    /// Advisory prices from the configured pricing rules.
    Suggest(WindowArgs),
    /// Daily average prices per source for one product.
    History(HistoryArgs),
}

#[derive(Args)]
struct WindowArgs {
    /// First day of the window (format: YYYY-MM-DD, inclusive).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day of the window (format: YYYY-MM-DD, inclusive). Defaults to now.
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Window length in days when --from is not given. Defaults to analysis.window_days.
    #[arg(long)]
    days: Option<i64>,
}

#[derive(Args)]
struct HistoryArgs {
    /// The product SKU (case-insensitive).
    #[arg(long)]
    sku: String,

    #[command(flatten)]
    window: WindowArgs,
}

impl WindowArgs {
    /// Turns the day-granular arguments into a half-open window.
    fn resolve(&self, default_days: i64, now: DateTime<Utc>) -> Result<TimeWindow> {
        let end = match self.to {
            Some(to) => start_of_day(to.succ_opt().ok_or_else(|| anyhow!("--to is out of range"))?),
            None => now,
        };
        let start = match self.from {
            Some(from) => start_of_day(from),
            None => {
                let days = self.days.unwrap_or(default_days);
                Duration::try_days(days)
                    .and_then(|length| end.checked_sub_signed(length))
                    .ok_or_else(|| anyhow!("a window of {days} days is out of range"))?
            }
        };
        Ok(TimeWindow::new(start, end)?)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

// ==============================================================================
// Setup
// ==============================================================================

/// Logs go to stderr (and optionally a file) so stdout stays clean for tables and JSON.
fn init_tracing(log_dir: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "pricewatch.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(guard)
}

fn build_store(config: &Config, observations: Option<&PathBuf>) -> Result<ObservationStore> {
    let store = ObservationStore::from_parts(config.catalog.products.clone(), config.catalog.sources())
        .context("Invalid catalog")?;
    if let Some(path) = observations {
        ingest::ingest_file(&store, path)?;
    } else {
        tracing::warn!("No observation file given; every product will report No Data.");
    }
    Ok(store)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ==============================================================================
// Command Handlers
// ==============================================================================

fn handle_report(cli: &Cli, config: &Config, store: &ObservationStore, args: &WindowArgs) -> Result<()> {
    let window = args.resolve(config.analysis.window_days, Utc::now())?;
    let reporter = AggregateReporter::new(PositionAnalyzer::new(store, config.analysis));
    let summary = reporter.summarize(&store.products()?, window)?;

    if cli.json {
        return print_json(&summary);
    }
    println!("{}", render::summary_table(&summary));
    println!("{}", render::positions_table(&summary));
    println!("{}", render::margin_distribution_table(&summary));
    println!("{}", render::categories_table(&summary));
    Ok(())
}

fn handle_alerts(cli: &Cli, config: &Config, store: &ObservationStore, args: &WindowArgs) -> Result<()> {
    let window = args.resolve(config.analysis.window_days, Utc::now())?;
    let scanner = AlertScanner::new(store, config.alerts, &config.map_prices);
    let alerts = scanner.scan(&store.products()?, window)?;

    if cli.json {
        return print_json(&alerts);
    }
    if alerts.is_empty() {
        println!("No alerts for {window}.");
    } else {
        println!("{}", render::alerts_table(&alerts));
    }
    Ok(())
}

fn handle_suggest(cli: &Cli, config: &Config, store: &ObservationStore, args: &WindowArgs) -> Result<()> {
    let window = args.resolve(config.analysis.window_days, Utc::now())?;
    let analyzer = PositionAnalyzer::new(store, config.analysis);
    let advisor = RepricingAdvisor::new();

    let mut suggestions = Vec::new();
    for rule in config.pricing_rules.iter().filter(|r| r.active) {
        let Some(product) = store.product_by_sku(&rule.sku)? else {
            tracing::warn!(rule = rule.id, sku = %rule.sku, "Pricing rule targets an unknown SKU; skipped.");
            continue;
        };
        let position = analyzer.analyze(&product, window)?;
        if let Some(suggestion) = advisor.suggest(rule, &product, &position)? {
            suggestions.push(suggestion);
        }
    }

    if cli.json {
        return print_json(&suggestions);
    }
    if suggestions.is_empty() {
        println!("No price suggestions for {window}.");
    } else {
        println!("{}", render::suggestions_table(&suggestions));
    }
    Ok(())
}

fn handle_history(cli: &Cli, config: &Config, store: &ObservationStore, args: &HistoryArgs) -> Result<()> {
    let window = args.window.resolve(config.analysis.window_days, Utc::now())?;
    let product = store
        .product_by_sku(&args.sku)?
        .ok_or_else(|| anyhow!("Unknown SKU '{}'", args.sku))?;
    let points = daily_series(store, product.id, window, SourceFilter::All)?;

    if cli.json {
        return print_json(&points);
    }
    println!("{} ({})", product.name, product.sku);
    println!("{}", render::history_table(&points));
    Ok(())
}
