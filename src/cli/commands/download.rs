//! Single-identifier download.

use console::style;

use super::{outcome_line, select_prompt, warn_if_ocr_unavailable};
use crate::config::Settings;
use crate::scrapers::HttpClient;
use crate::services::{AcquireOutcome, AcquireService};

pub async fn cmd_download(
    settings: &Settings,
    hcno: &str,
    non_interactive: bool,
) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    warn_if_ocr_unavailable(settings);

    println!("{} Acquiring {}", style("→").cyan(), hcno);

    let client = HttpClient::new(settings.request_delay());
    let service = AcquireService::new(&client, settings, select_prompt(non_interactive));

    let outcome = service.acquire(hcno).await;
    println!("{}", outcome_line(hcno, &outcome));

    match outcome {
        AcquireOutcome::Downloaded { .. } => Ok(()),
        AcquireOutcome::DownloadFailed => {
            anyhow::bail!("verified download link failed to transfer for {}", hcno)
        }
        AcquireOutcome::Exhausted => {
            anyhow::bail!("could not acquire {} after all attempts and fallbacks", hcno)
        }
    }
}
