mod aggregate;
mod config;
mod db;
mod error;
mod fetch;
mod output;
mod parser;
mod sitemap;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use config::ScrapeConfig;

#[derive(Parser)]
#[command(name = "bilingual_scraper", about = "English/Khmer bilingual page scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch pages, extract bilingual text and tables, write CSV + JSON
    Scrape(ScrapeArgs),
    /// Collect page URLs from a site's sitemaps into a text file
    Discover {
        /// Site root, e.g. https://www.aupp.edu.kh
        base_url: String,
        /// Directory for the URL list
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Show totals stored in a results database
    Stats {
        #[arg(long, default_value = "data/scraper.sqlite")]
        db: PathBuf,
    },
}

#[derive(Args)]
struct ScrapeArgs {
    /// URLs to scrape (read from stdin when neither these nor --urls-file are given)
    urls: Vec<String>,
    /// File with one URL per line
    #[arg(short = 'f', long)]
    urls_file: Option<PathBuf>,
    /// Max requests in flight
    #[arg(short = 'c', long, default_value_t = config::DEFAULT_CONCURRENCY)]
    concurrency: usize,
    /// Idle keep-alive connections kept per host; also caps --concurrency
    #[arg(long, default_value_t = config::DEFAULT_POOL_SIZE)]
    pool_size: usize,
    /// Per-request timeout in seconds
    #[arg(short, long, value_parser = parse_secs, default_value = "20")]
    timeout: Duration,
    /// Pause after each successful fetch, in seconds
    #[arg(short, long, value_parser = parse_secs, default_value = "1")]
    delay: Duration,
    /// Expected host (repeatable); other hosts are warned about
    #[arg(long = "allow-host", default_value = config::DEFAULT_ALLOWED_HOST)]
    allow_hosts: Vec<String>,
    /// JSON file of cookie name -> value, merged over env cookies
    #[arg(long)]
    cookies: Option<PathBuf>,
    /// Where CSV and table JSON go
    #[arg(short, long, default_value = config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,
    /// Also record the run in this SQLite database
    #[arg(long)]
    db: Option<PathBuf>,
}

fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{}", e))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape(args) => run_scrape(args).await,
        Commands::Discover { base_url, output_dir } => {
            let client = fetch::build_client(&ScrapeConfig::default())?;
            let urls = sitemap::discover_page_urls(&client, &base_url).await;
            if urls.is_empty() {
                println!("No URLs found in sitemaps.");
                return Ok(());
            }
            let path = sitemap::write_url_list(&urls, &output_dir, &sitemap::urls_filename(&base_url))?;
            println!("Found {} pages, saved to {}", urls.len(), path.display());
            Ok(())
        }
        Commands::Stats { db } => {
            let conn = db::connect(&db)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Runs:          {}", s.runs);
            println!("Fetched pages: {}", s.fetched);
            println!("Failed URLs:   {}", s.failed);
            println!("English rows:  {}", s.english_rows);
            println!("Khmer rows:    {}", s.khmer_rows);
            println!("Tables:        {}", s.tables);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run_scrape(args: ScrapeArgs) -> anyhow::Result<()> {
    let config = ScrapeConfig {
        concurrency: args.concurrency,
        pool_size: args.pool_size,
        timeout: args.timeout,
        delay: args.delay,
        host_allowlist: args.allow_hosts,
        cookies: config::load_cookies(args.cookies.as_deref()).context("Failed to load cookies")?,
        output_dir: args.output_dir,
    };

    let mut raw = args.urls;
    if let Some(path) = &args.urls_file {
        raw.extend(
            config::load_urls_file(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        );
    }
    if raw.is_empty() {
        raw = prompt_urls()?;
    }

    let urls: Vec<String> = config::dedup_urls(raw)
        .into_iter()
        .filter(|u| match fetch::parse_page_url(u) {
            Ok(_) => true,
            Err(e) => {
                warn!("{}", e);
                false
            }
        })
        .collect();

    if urls.is_empty() {
        println!("No valid URLs provided. Nothing to do.");
        return Ok(());
    }

    let started_at = chrono::Local::now();
    info!(
        "Starting scraping {} URLs at {}",
        urls.len(),
        started_at.format("%Y-%m-%d %H:%M:%S")
    );

    let url_count = urls.len();
    let scraper = fetch::Scraper::new(config).context("Failed to build scraper")?;
    let run = scraper.fetch_all(urls).await;
    let output_dir = &scraper.config().output_dir;

    let tables = output::write_tables_json(&run.pages, output_dir)
        .context("Failed to write tables")?
        .len();

    let result = aggregate::aggregate(run.pages.iter().map(|p| p.page.clone()));
    if result.is_empty() {
        warn!("No English or Khmer text extracted from any page");
    }
    let rows = result.to_rows();
    let csv_path = output::write_csv(&rows, output_dir, None).context("Failed to write CSV")?;

    if let Some(db_path) = &args.db {
        let conn = db::connect(db_path)?;
        db::init_schema(&conn)?;
        let run_id = db::save_run(
            &conn,
            &started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            url_count,
            &run.pages,
            &run.failures,
            &rows,
        )?;
        info!("Saved run {} to {}", run_id, db_path.display());
    }

    let stats = run.stats();
    println!(
        "Scraped {} URLs ({} ok, {} errors); {} pages with unique text, {} rows, {} tables.",
        stats.total,
        stats.ok,
        stats.errors,
        result.pages.len(),
        rows.len(),
        tables
    );
    println!("Results saved to {}", csv_path.display());
    Ok(())
}

/// Read URLs from stdin, one per line, until an empty line or EOF.
fn prompt_urls() -> anyhow::Result<Vec<String>> {
    println!("Enter URLs to scrape (e.g., https://www.aupp.edu.kh/about/).");
    println!("Press Enter on an empty line to start scraping:\n");

    let stdin = std::io::stdin();
    let mut urls = Vec::new();
    loop {
        print!("  > ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        urls.push(line.to_string());
    }
    Ok(urls)
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
