use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use url::Url;

use crate::config::{ScrapeConfig, USER_AGENT};
use crate::error::{Result, ScrapeError};
use crate::parser::language::{Classifier, LanguageDetector, WhatlangDetector};
use crate::parser::{process_page, PageExtraction};

/// A URL that produced no page, and why.
#[derive(Debug)]
pub struct FetchFailure {
    pub url: String,
    pub error: ScrapeError,
}

/// Everything a run produced, in arrival order.
#[derive(Debug, Default)]
pub struct ScrapeRun {
    pub pages: Vec<PageExtraction>,
    pub failures: Vec<FetchFailure>,
}

/// Scrape stats returned after completion.
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

impl ScrapeRun {
    pub fn stats(&self) -> ScrapeStats {
        ScrapeStats {
            total: self.pages.len() + self.failures.len(),
            ok: self.pages.len(),
            errors: self.failures.len(),
        }
    }
}

/// Parse `raw` as an absolute http(s) URL with a host.
pub fn parse_page_url(raw: &str) -> Result<Url> {
    let invalid = |reason: &str| ScrapeError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("scheme must be http or https"));
    }
    match url.host_str() {
        Some(h) if !h.is_empty() => Ok(url),
        _ => Err(invalid("missing host")),
    }
}

/// [`parse_page_url`] plus the allowlist check. Hosts outside the allowlist
/// are warned about and still accepted.
pub fn validate_url(raw: &str, allowlist: &[String]) -> Result<Url> {
    let url = parse_page_url(raw)?;
    if !is_expected_host(&url, allowlist) {
        warn!("URL {} is not from expected domains", raw);
    }
    Ok(url)
}

fn is_expected_host(url: &Url, allowlist: &[String]) -> bool {
    let host = url.host_str().unwrap_or_default();
    allowlist.is_empty() || allowlist.iter().any(|allowed| host_matches(host, allowed))
}

fn host_matches(host: &str, allowed: &str) -> bool {
    host == allowed || host.ends_with(&format!(".{}", allowed))
}

fn default_headers(config: &ScrapeConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    if let Some(cookie) = config.cookie_header() {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| ScrapeError::Config(format!("bad cookie value: {}", e)))?;
        headers.insert(header::COOKIE, value);
    }
    Ok(headers)
}

/// HTTP client with browser-like headers, configured cookies and the idle pool size.
pub fn build_client(config: &ScrapeConfig) -> Result<Client> {
    Client::builder()
        .default_headers(default_headers(config)?)
        .timeout(config.timeout)
        // Idle keep-alive connections only; in-flight requests are capped by the admission gate.
        .pool_max_idle_per_host(config.pool_size)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| ScrapeError::Config(format!("failed to create HTTP client: {}", e)))
}

/// Bounded-concurrency page fetcher. Each fetched page is parsed and
/// classified inside the task that fetched it.
pub struct Scraper<D = WhatlangDetector> {
    client: Client,
    classifier: Arc<Classifier<D>>,
    config: ScrapeConfig,
}

impl Scraper<WhatlangDetector> {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        Self::with_classifier(config, Classifier::default())
    }
}

impl<D: LanguageDetector + 'static> Scraper<D> {
    pub fn with_classifier(config: ScrapeConfig, classifier: Classifier<D>) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self {
            client,
            classifier: Arc::new(classifier),
            config,
        })
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Fetch every URL with at most `admission_limit()` requests in flight.
    ///
    /// A fixed pool of workers drains a shared queue; every fetch holds a gate
    /// permit until its pacing delay has elapsed. One URL failing never
    /// affects the others. Returns once every worker has joined.
    pub async fn fetch_all(&self, urls: Vec<String>) -> ScrapeRun {
        let total = urls.len();
        let mut run = ScrapeRun::default();
        if total == 0 {
            return run;
        }

        let limit = self.config.admission_limit();
        let gate = Arc::new(Semaphore::new(limit));
        let queue = Arc::new(Mutex::new(urls.into_iter().collect::<VecDeque<_>>()));

        let pb = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }

        // Channel: workers send outcomes, this task collects them
        let (tx, mut rx) = mpsc::channel::<std::result::Result<PageExtraction, FetchFailure>>(limit * 2);
        let mut workers = JoinSet::new();

        for _ in 0..limit.min(total) {
            let queue = Arc::clone(&queue);
            let gate = Arc::clone(&gate);
            let tx = tx.clone();
            let client = self.client.clone();
            let classifier = Arc::clone(&self.classifier);
            let allowlist = self.config.host_allowlist.clone();
            let timeout = self.config.timeout;
            let delay = self.config.delay;

            workers.spawn(async move {
                while let Some(url) = next_url(&queue) {
                    let Ok(_permit) = gate.acquire().await else {
                        break;
                    };
                    let outcome =
                        scrape_one(&client, &*classifier, &url, &allowlist, timeout, delay)
                            .await
                            .map_err(|error| FetchFailure { url, error });
                    if tx.send(outcome).await.is_err() {
                        break;
                    }
                }
            });
        }

        // Drop our copy of tx so rx closes when all workers finish
        drop(tx);

        while let Some(outcome) = rx.recv().await {
            match outcome {
                Ok(page) => run.pages.push(page),
                Err(failure) => {
                    log_failure(&failure);
                    run.failures.push(failure);
                }
            }
            pb.inc(1);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Fetch worker aborted: {}", e);
            }
        }

        pb.finish_and_clear();
        let stats = run.stats();
        info!(
            "Scraped {} URLs ({} ok, {} errors)",
            total, stats.ok, stats.errors
        );
        run
    }
}

fn next_url(queue: &Mutex<VecDeque<String>>) -> Option<String> {
    match queue.lock() {
        Ok(mut q) => q.pop_front(),
        Err(poisoned) => poisoned.into_inner().pop_front(),
    }
}

fn log_failure(failure: &FetchFailure) {
    match &failure.error {
        ScrapeError::HttpNonSuccess { status, url } => warn!("HTTP {} for {}", status, url),
        ScrapeError::InvalidUrl { .. } => warn!("{}", failure.error),
        ScrapeError::TransportTimeout(url) => error!("Timeout scraping {}", url),
        other => error!("Error scraping {}: {}", failure.url, other),
    }
}

async fn scrape_one<D: LanguageDetector>(
    client: &Client,
    classifier: &Classifier<D>,
    url: &str,
    allowlist: &[String],
    timeout: Duration,
    delay: Duration,
) -> Result<PageExtraction> {
    validate_url(url, allowlist)?;
    info!("Scraping: {}", url);

    let markup = fetch_markup(client, url, timeout).await?;
    let extraction = process_page(url, &markup, classifier);

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Ok(extraction)
}

async fn fetch_markup(client: &Client, url: &str, timeout: Duration) -> Result<String> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| ScrapeError::from_transport(url, e))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(ScrapeError::HttpNonSuccess {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| {
        if e.is_timeout() {
            ScrapeError::TransportTimeout(url.to_string())
        } else {
            ScrapeError::Body {
                url: url.to_string(),
                source: e,
            }
        }
    })
}
