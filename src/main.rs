mod config;
mod dataset;
mod export;
mod extract;
mod fetch;
mod parser;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use config::ScrapeConfig;
use fetch::{HttpFetcher, OfflineFetcher};

#[derive(Parser)]
#[command(
    name = "concorrencia_scraper",
    about = "Medical-residency competition table scraper"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, extract, and regenerate artifacts when the data changed
    Run {
        /// Output directory for JSON/CSV artifacts
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Rewrite artifacts even when nothing changed
        #[arg(long)]
        force: bool,
        /// Override the source page URL
        #[arg(long)]
        url: Option<String>,
        /// Max concurrent detail-page fetches
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
    },
    /// Fetch and extract, report whether artifacts would change (writes nothing)
    Check {
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Extract from a local HTML file and print a summary (no fetching)
    Parse {
        /// Saved page to read instead of the live portal
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { out, force, url, concurrency } => {
            let cfg = build_config(out, url, concurrency);
            let fetcher = Arc::new(HttpFetcher::new()?);
            let ds = extract::run(&cfg, fetcher).await?;

            let old_fp = export::load_previous_tables(&cfg.output_dir)
                .map(|tables| dataset::fingerprint(&tables));
            if should_rewrite(force, old_fp.as_deref(), &ds) {
                export::write_artifacts(&ds, &cfg)?;
                print_summary(&ds, &cfg);
            } else {
                println!("No data changes detected; nothing rewritten.");
            }
            Ok(())
        }
        Commands::Check { out, url } => {
            let cfg = build_config(out, url, None);
            let fetcher = Arc::new(HttpFetcher::new()?);
            let ds = extract::run(&cfg, fetcher).await?;

            let old_fp = export::load_previous_tables(&cfg.output_dir)
                .map(|tables| dataset::fingerprint(&tables));
            if dataset::has_changed(old_fp.as_deref(), &ds) {
                println!("Changed: {} tables would be regenerated.", ds.tables.len());
            } else {
                println!("Unchanged: artifacts are current.");
            }
            Ok(())
        }
        Commands::Parse { file } => {
            let cfg = ScrapeConfig::default();
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Reading {}", file.display()))?;
            let ds = extract::extract_from_html(&html, &cfg, Arc::new(OfflineFetcher)).await?;
            print_summary(&ds, &cfg);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Artifacts are rewritten when forced or when the data actually changed.
/// Either way the run falls through to the elapsed-time report.
fn should_rewrite(force: bool, old_fp: Option<&str>, ds: &dataset::Dataset) -> bool {
    force || dataset::has_changed(old_fp, ds)
}

fn build_config(
    out: Option<PathBuf>,
    url: Option<String>,
    concurrency: Option<usize>,
) -> ScrapeConfig {
    let mut cfg = ScrapeConfig::default();
    if let Some(out) = out {
        cfg.output_dir = out;
    }
    if let Some(url) = url {
        cfg.source_url = url;
    }
    if let Some(n) = concurrency {
        cfg.detail_concurrency = n.max(1);
    }
    cfg
}

fn print_summary(ds: &dataset::Dataset, cfg: &ScrapeConfig) {
    println!(
        "{:>3} | {:<48} | {:>5} | {:>4}",
        "#", "Tabela", "Cols", "Rows"
    );
    println!("{}", "-".repeat(70));
    for (i, t) in ds.tables.iter().enumerate() {
        println!(
            "{:>3} | {:<48} | {:>5} | {:>4}",
            i + 1,
            truncate(&t.title, 48),
            t.columns.len(),
            t.rows.len()
        );
    }

    let groups = dataset::group_by(ds, cfg);
    println!(
        "\n{} tables across {} institutions | fingerprint {}",
        ds.tables.len(),
        groups.len(),
        ds.fingerprint()
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
