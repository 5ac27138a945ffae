use crate::error::{Result, ScanError};
use crate::normalize::{is_same_domain, resolve};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// Fetches a page and pulls out the same-domain links it points at.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    client: Client,
    max_response_bytes: usize,
}

impl LinkExtractor {
    pub fn new(client: Client, max_response_bytes: usize) -> Self {
        Self {
            client,
            max_response_bytes,
        }
    }

    /// Links on `page_url` that share a host with `base`. A page that cannot
    /// be fetched or parsed is a dead end and yields no links.
    pub async fn extract(&self, page_url: &str, base: &Url) -> Vec<String> {
        let (final_url, body) = match self.fetch_page(page_url).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to fetch page {}: {}", page_url, e);
                return Vec::new();
            }
        };

        if !is_same_domain(final_url.as_str(), base) {
            debug!(
                "{} redirected off-domain to {}, not extracting",
                page_url, final_url
            );
            return Vec::new();
        }

        match parse_links(&body, &final_url, base) {
            Ok(links) => {
                debug!("Found {} same-domain links on {}", links.len(), page_url);
                links
            }
            Err(e) => {
                warn!("Failed to parse HTML from {}: {}", page_url, e);
                Vec::new()
            }
        }
    }

    /// GET the page, keeping at most `max_response_bytes` of the body.
    async fn fetch_page(&self, page_url: &str) -> Result<(Url, String)> {
        let mut response = self.client.get(page_url).send().await?.error_for_status()?;
        let final_url = response.url().clone();

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let remaining = self.max_response_bytes - body.len();
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                debug!(
                    "Truncated body of {} at {} bytes",
                    page_url, self.max_response_bytes
                );
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok((final_url, String::from_utf8_lossy(&body).into_owned()))
    }
}

/// Collect every `a[href]` in `html`, resolved against `page_url` and filtered
/// to the host of `base`. Duplicates are removed, first occurrence wins.
pub fn parse_links(html: &str, page_url: &Url, base: &Url) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let link_selector =
        Selector::parse("a[href]").map_err(|e| ScanError::ParseError(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&link_selector) {
        if let Some(href) = element.value().attr("href")
            && let Some(absolute_url) = resolve(href, page_url)
            && is_same_domain(&absolute_url, base)
            && seen.insert(absolute_url.clone())
        {
            links.push(absolute_url);
        }
    }

    Ok(links)
}
