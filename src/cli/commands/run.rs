//! Full pipeline run over the listing page.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::{outcome_line, select_prompt, warn_if_ocr_unavailable};
use crate::config::Settings;
use crate::scrapers::HttpClient;
use crate::services::AcquireService;

pub async fn cmd_run(settings: &Settings, non_interactive: bool) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    warn_if_ocr_unavailable(settings);

    let client = HttpClient::new(settings.request_delay());
    let service = AcquireService::new(&client, settings, select_prompt(non_interactive));

    let Some(identifiers) = service.discover().await else {
        println!(
            "{} Could not fetch the listing page: {}",
            style("✗").red(),
            settings.listing_url
        );
        return Ok(());
    };

    if identifiers.is_empty() {
        println!("{} No identifiers found; nothing to do", style("!").yellow());
        return Ok(());
    }

    println!(
        "{} Acquiring {} documents into {}",
        style("→").cyan(),
        identifiers.len(),
        settings.save_dir.display()
    );

    // The bar stays on the last line; per-identifier results and
    // captcha prompts print above it.
    let progress = ProgressBar::new(identifiers.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut downloaded = 0usize;
    for hcno in &identifiers {
        progress.set_message(hcno.clone());
        let outcome = service.acquire(hcno).await;
        progress.println(outcome_line(hcno, &outcome));
        if outcome.is_downloaded() {
            downloaded += 1;
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!(
        "{} {} of {} documents downloaded",
        if downloaded == identifiers.len() {
            style("✓").green()
        } else {
            style("!").yellow()
        },
        downloaded,
        identifiers.len()
    );

    Ok(())
}
