// ABOUTME: CLI for scraping a horoscope article into the dated CSV log.
// ABOUTME: Fetches a URL (or reads a saved page), extracts per-sign predictions, and appends or prints them.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use horoscopo_core::{
    extract_predictions_with, BlockPolicy, CsvLog, ExtractOptions, HttpSession, Prediction,
    DEFAULT_SECTION_MARKER, DEFAULT_USER_AGENT,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Scrape today's horoscope and append it to a CSV log.
#[derive(Parser, Debug)]
#[command(name = "horoscopo", version)]
#[command(about = "Scrape per-sign horoscope predictions into a CSV log", long_about = None)]
struct Args {
    /// Article URL to fetch.
    #[arg(long, env = "HOROSCOPO_URL", required_unless_present = "html", conflicts_with = "html")]
    url: Option<String>,

    /// Saved HTML page to read instead of fetching.
    #[arg(long)]
    html: Option<PathBuf>,

    /// CSV log to append to (created with a header if missing or empty).
    #[arg(long, env = "HOROSCOPO_CSV", default_value = "horoscopo.csv")]
    csv: PathBuf,

    /// Date stamped on every row (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Print predictions as JSON instead of writing the CSV log.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Use the first heading block that yields predictions instead of only the first heading.
    #[arg(long, default_value_t = false)]
    fall_through: bool,

    /// Class substring identifying the article body container.
    #[arg(long, default_value = DEFAULT_SECTION_MARKER)]
    section_marker: String,

    /// Retries for transient HTTP failures.
    #[arg(long, default_value_t = 5)]
    retries: u32,

    /// Exponential backoff factor in seconds.
    #[arg(long, default_value_t = 0.5, value_parser = parse_backoff_factor)]
    backoff_factor: f64,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// User-Agent header sent with the request.
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
}

fn parse_backoff_factor(s: &str) -> std::result::Result<f64, String> {
    let factor: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !factor.is_finite() || factor < 0.0 {
        return Err(format!("expected a finite, non-negative number of seconds, got {s}"));
    }
    Ok(factor)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("horoscopo=info,horoscopo_core=info")),
        )
        .init();
}

fn load_html(args: &Args) -> Result<String> {
    if let Some(path) = &args.html {
        return fs::read_to_string(path)
            .with_context(|| format!("reading HTML file {}", path.display()));
    }

    // clap guarantees one of --url/--html
    let url = args.url.as_deref().unwrap_or_default();
    let session = HttpSession::builder()
        .user_agent(args.user_agent.clone())
        .timeout(Duration::from_secs(args.timeout))
        .retries(args.retries)
        .backoff_factor(args.backoff_factor)
        .build()
        .context("building HTTP session")?;
    session
        .get_text(url)
        .with_context(|| format!("fetching {}", url))
}

fn emit(args: &Args, predictions: &[Prediction]) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(predictions)?);
        return Ok(());
    }

    let fecha = args.date.unwrap_or_else(|| Local::now().date_naive());
    let log = CsvLog::new(&args.csv);
    let written = log
        .record(fecha, predictions)
        .with_context(|| format!("writing {}", args.csv.display()))?;
    info!(
        path = %args.csv.display(),
        fecha = %fecha,
        rows = written,
        "horoscope recorded"
    );
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let html = load_html(args)?;

    let opts = ExtractOptions {
        section_marker: args.section_marker.clone(),
        block_policy: if args.fall_through {
            BlockPolicy::FirstProductive
        } else {
            BlockPolicy::FirstHeading
        },
    };
    let predictions = extract_predictions_with(&html, &opts);
    if predictions.is_empty() {
        warn!("no predictions extracted");
    } else {
        info!(count = predictions.len(), "predictions extracted");
    }

    emit(args, &predictions)
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
