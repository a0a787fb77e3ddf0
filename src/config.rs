use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_POOL_SIZE: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DEFAULT_ALLOWED_HOST: &str = "aupp.edu.kh";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";

/// (env var, cookie name) pairs picked up from the environment.
const COOKIE_ENV_VARS: &[(&str, &str)] = &[
    ("GA", "_ga"),
    ("GA_4PDMBFF7QV", "_ga_4PDMBFF7QV"),
    ("CF_CLEARANCE", "cf_clearance"),
    ("I_COOKIE", "_I_"),
];

/// Everything a scrape run needs to know.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Ceiling on simultaneously in-flight fetches.
    pub concurrency: usize,
    /// Idle keep-alive connections the HTTP client keeps per host. reqwest
    /// does not cap open connections with it, so `admission_limit` does.
    pub pool_size: usize,
    pub timeout: Duration,
    /// Pause enforced after every successful fetch.
    pub delay: Duration,
    /// Hosts we expect to scrape. Anything else is warned about, not rejected.
    pub host_allowlist: Vec<String>,
    pub cookies: BTreeMap<String, String>,
    pub output_dir: PathBuf,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            pool_size: DEFAULT_POOL_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            host_allowlist: vec![DEFAULT_ALLOWED_HOST.to_string()],
            cookies: BTreeMap::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl ScrapeConfig {
    /// Admission gate size: at least one, never wider than the idle pool, so
    /// every in-flight request can reuse a kept-alive connection.
    pub fn admission_limit(&self) -> usize {
        self.concurrency.clamp(1, self.pool_size.max(1))
    }

    /// `Cookie` header value, or `None` when no cookies are configured.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        Some(pairs.join("; "))
    }
}

/// Collect cookies from the environment, then overlay a JSON cookie file if given.
pub fn load_cookies(cookie_file: Option<&Path>) -> Result<BTreeMap<String, String>> {
    let mut cookies = BTreeMap::new();
    for (var, name) in COOKIE_ENV_VARS {
        match std::env::var(var) {
            Ok(value) if !value.is_empty() => {
                cookies.insert(name.to_string(), value);
            }
            _ => debug!("Cookie env var {} not set", var),
        }
    }

    if let Some(path) = cookie_file {
        let raw = std::fs::read_to_string(path)?;
        let from_file: BTreeMap<String, String> = serde_json::from_str(&raw)?;
        debug!("Loaded {} cookies from {}", from_file.len(), path.display());
        cookies.extend(from_file);
    }

    Ok(cookies)
}

/// Read URLs from a file: one per line, blank lines and `#` comments skipped.
pub fn load_urls_file(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(parse_url_lines(&raw))
}

pub fn parse_url_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Drop duplicate input URLs, keeping first occurrence.
pub fn dedup_urls(urls: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let before = urls.len();
    let kept: Vec<String> = urls.into_iter().filter(|u| seen.insert(u.clone())).collect();
    if kept.len() < before {
        warn!("Dropped {} duplicate input URLs", before - kept.len());
    }
    kept
}
