use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use reqwest::Client;
use tracing::{error, info, warn};
use url::Url;

use crate::error::{Result, ScrapeError};

/// Page URLs listed by a site's sitemaps. Tries `/sitemap_index.xml` first,
/// falls back to `/sitemap.xml`, then walks every sitemap it lists.
pub async fn discover_page_urls(client: &Client, base_url: &str) -> Vec<String> {
    let base = base_url.trim().trim_end_matches('/');

    let mut sitemaps = fetch_locs(client, &format!("{}/sitemap_index.xml", base)).await;
    if sitemaps.is_empty() {
        warn!("Falling back to /sitemap.xml");
        sitemaps = fetch_locs(client, &format!("{}/sitemap.xml", base)).await;
    }
    if sitemaps.is_empty() {
        warn!("No sitemaps found for {}", base);
        return Vec::new();
    }

    let mut pages = Vec::new();
    for sitemap in &sitemaps {
        info!("Parsing sitemap: {}", sitemap);
        pages.extend(fetch_locs(client, sitemap).await);
    }
    info!("Total pages found: {}", pages.len());
    pages
}

/// Fetch one sitemap and return its `<loc>` entries. Failures are logged and yield nothing.
async fn fetch_locs(client: &Client, url: &str) -> Vec<String> {
    let body = match fetch_xml(client, url).await {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to fetch {}: {}", url, e);
            return Vec::new();
        }
    };
    match parse_locs(&body) {
        Ok(locs) => locs,
        Err(e) => {
            error!("Failed to parse XML from {}: {}", url, e);
            Vec::new()
        }
    }
}

async fn fetch_xml(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ScrapeError::from_transport(url, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::HttpNonSuccess {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.text().await.map_err(|e| ScrapeError::Body {
        url: url.to_string(),
        source: e,
    })
}

/// Every `<loc>` value in a urlset or sitemap index, in document order.
pub fn parse_locs(xml: &str) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut locs = Vec::new();
    let mut in_loc = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"loc" => in_loc = true,
            Ok(Event::Text(e)) if in_loc => {
                let text = e.unescape().map_err(|e| ScrapeError::Xml(e.to_string()))?;
                let text = text.trim();
                if !text.is_empty() {
                    locs.push(text.to_string());
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => in_loc = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(ScrapeError::Xml(e.to_string())),
            _ => {}
        }
    }
    Ok(locs)
}

/// `{domain}_page_urls.txt`, with any leading `www.` dropped from the domain.
pub fn urls_filename(base_url: &str) -> String {
    let domain = Url::parse(base_url.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "site".to_string());
    let domain = domain.strip_prefix("www.").unwrap_or(&domain);
    format!("{}_page_urls.txt", domain)
}

pub fn write_url_list(urls: &[String], dir: &Path, filename: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    let mut body = urls.join("\n");
    body.push('\n');
    std::fs::write(&path, body)?;
    info!("URLs saved to {}", path.display());
    Ok(path)
}
