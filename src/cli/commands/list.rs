//! List identifiers on the current listing page.

use console::style;

use crate::config::Settings;
use crate::scrapers::{extract_identifiers, HttpClient, ListingFetcher};

pub async fn cmd_list(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let client = HttpClient::new(settings.request_delay());
    let fetcher = ListingFetcher::new(&client, settings);

    let Some(html) = fetcher.fetch().await else {
        anyhow::bail!("could not fetch the listing page: {}", settings.listing_url);
    };

    let identifiers = extract_identifiers(&html);
    if identifiers.is_empty() {
        println!("{} No identifiers found on the listing page", style("!").yellow());
        return Ok(());
    }

    println!(
        "{} {} identifiers on the listing page:",
        style("→").cyan(),
        identifiers.len()
    );
    for (index, hcno) in identifiers.iter().enumerate() {
        println!("{:>4}. {}", index + 1, hcno);
    }

    Ok(())
}
