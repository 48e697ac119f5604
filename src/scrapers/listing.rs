//! Listing page fetch and identifier extraction.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

use super::{write_debug_artifact, HttpClient};
use crate::config::Settings;

/// Listing page snapshot filename for post-hoc inspection.
const DEBUG_PAGE: &str = "debug_page.html";

/// Fetches the listing page that seeds document identifiers.
pub struct ListingFetcher<'a> {
    client: &'a HttpClient,
    settings: &'a Settings,
}

impl<'a> ListingFetcher<'a> {
    pub fn new(client: &'a HttpClient, settings: &'a Settings) -> Self {
        Self { client, settings }
    }

    /// Fetch the configured listing page.
    ///
    /// Retries transport errors and non-200 statuses up to the
    /// configured budget with a fixed backoff, then gives up with
    /// `None`. Failure here is reported, not fatal.
    pub async fn fetch(&self) -> Option<String> {
        let url = &self.settings.listing_url;

        for attempt in 1..=self.settings.fetch_retries {
            match self.client.get(url, self.settings.page_timeout()).await {
                Ok(response) if response.is_success() => match response.text().await {
                    Ok(body) => {
                        info!("fetched listing page ({} bytes)", body.len());
                        write_debug_artifact(&self.settings.save_dir, DEBUG_PAGE, body.as_bytes());
                        return Some(body);
                    }
                    Err(e) => {
                        warn!("listing body read failed (attempt {}): {}", attempt, e);
                    }
                },
                Ok(response) => {
                    warn!(
                        "listing fetch returned HTTP {} (attempt {})",
                        response.status, attempt
                    );
                }
                Err(e) => {
                    warn!("listing fetch failed (attempt {}): {}", attempt, e);
                }
            }

            if attempt < self.settings.fetch_retries {
                tokio::time::sleep(self.settings.retry_backoff()).await;
            }
        }

        None
    }
}

/// Extract document identifiers from listing HTML.
///
/// The listing embeds one `showInfo('<hcno>')` call per row. Duplicates
/// collapse; first-seen order is preserved so logs stay reproducible.
/// No matches is "nothing to do", not an error.
pub fn extract_identifiers(html: &str) -> Vec<String> {
    static SHOW_INFO: OnceLock<Regex> = OnceLock::new();
    let pattern = SHOW_INFO
        .get_or_init(|| Regex::new(r"showInfo\('([^']+)'\)").expect("static pattern compiles"));

    let mut seen = std::collections::HashSet::new();
    let mut identifiers = Vec::new();
    for capture in pattern.captures_iter(html) {
        let hcno = capture[1].to_string();
        if seen.insert(hcno.clone()) {
            identifiers.push(hcno);
        }
    }

    identifiers
}
