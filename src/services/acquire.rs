//! Acquisition orchestrator.
//!
//! Drives the per-identifier captcha loop and the top-level run over
//! every identifier on the listing page. Identifiers are processed
//! strictly sequentially; the portal is pacing-sensitive and the
//! session cookie is shared.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::captcha::{is_plausible_code, CaptchaAcquirer, CaptchaVerifier, CAPTCHA_IMAGE};
use crate::config::Settings;
use crate::ocr::TesseractOcr;
use crate::prompt::CaptchaPrompt;
use crate::scrapers::{extract_identifiers, HttpClient, ListingFetcher};
use crate::services::{DownloadOutcome, FileDownloader};

/// Direct-download URL paths probed once captcha attempts are
/// exhausted, in order. The identifier is appended.
const DIRECT_DOWNLOAD_PATHS: [&str; 4] = [
    "/bzgk/gb/getGbFile?type=download&hcno=",
    "/bzgk/gb/downloadGb?hcno=",
    "/bzgk/gb/fileDownload?hcno=",
    "/bzgk/gb/download?hcno=",
];

/// Terminal outcome for one identifier.
#[derive(Debug, Clone)]
pub enum AcquireOutcome {
    /// The document is on disk.
    Downloaded { path: PathBuf, bytes: u64 },
    /// Verification succeeded but the final transfer failed. The
    /// captcha cycle is not retried for this.
    DownloadFailed,
    /// Captcha attempts and fallback probing were all exhausted.
    Exhausted,
}

impl AcquireOutcome {
    pub fn is_downloaded(&self) -> bool {
        matches!(self, AcquireOutcome::Downloaded { .. })
    }
}

/// One identifier's result within a run.
#[derive(Debug, Clone)]
pub struct IdentifierReport {
    pub hcno: String,
    pub outcome: AcquireOutcome,
}

/// Full-run result: every identifier discovered, and what happened to
/// each.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub identifiers: Vec<String>,
    pub reports: Vec<IdentifierReport>,
}

/// Orchestrates listing discovery, captcha negotiation, and downloads
/// over one shared session.
pub struct AcquireService<'a> {
    client: &'a HttpClient,
    settings: &'a Settings,
    ocr: TesseractOcr,
    prompt: Box<dyn CaptchaPrompt + 'a>,
}

impl<'a> AcquireService<'a> {
    pub fn new(
        client: &'a HttpClient,
        settings: &'a Settings,
        prompt: Box<dyn CaptchaPrompt + 'a>,
    ) -> Self {
        let ocr = TesseractOcr::new(settings.tesseract_cmd.clone(), &settings.ocr_language);
        Self {
            client,
            settings,
            ocr,
            prompt,
        }
    }

    /// Fetch the listing page and extract identifiers. `None` means
    /// the listing itself could not be fetched; an empty vec means the
    /// page held no identifiers.
    pub async fn discover(&self) -> Option<Vec<String>> {
        let fetcher = ListingFetcher::new(self.client, self.settings);
        let html = fetcher.fetch().await?;
        let identifiers = extract_identifiers(&html);
        info!("extracted {} unique identifiers", identifiers.len());
        Some(identifiers)
    }

    /// Acquire one document: up to the configured number of captcha
    /// attempts, then direct-download fallback probing.
    pub async fn acquire(&self, hcno: &str) -> AcquireOutcome {
        let acquirer = CaptchaAcquirer::new(self.client, self.settings, &self.ocr);
        let verifier = CaptchaVerifier::new(self.client, self.settings);
        let downloader = FileDownloader::new(self.client, self.settings);

        for attempt in 1..=self.settings.captcha_attempts {
            info!(
                "{}: captcha attempt {}/{}",
                hcno, attempt, self.settings.captcha_attempts
            );

            // Challenges are single-use and cookie-bound; every attempt
            // starts from a fresh one.
            let challenge = acquirer.acquire(hcno).await;
            let image_path = challenge
                .image
                .is_some()
                .then(|| self.settings.save_dir.join(CAPTCHA_IMAGE));

            let code = match self
                .prompt
                .resolve(image_path.as_deref(), challenge.guess.as_deref())
            {
                Ok(Some(code)) => code,
                Ok(None) => {
                    info!("{}: no code offered, attempt skipped", hcno);
                    continue;
                }
                Err(e) => {
                    warn!("{}: prompt failed: {}", hcno, e);
                    continue;
                }
            };

            if !is_plausible_code(&code) {
                warn!("{}: code {:?} is not 4-6 alphanumerics, not submitted", hcno, code);
                continue;
            }

            match verifier.verify(hcno, &code).await {
                Some(link) => {
                    // The link is single-use; a failed transfer here is
                    // terminal rather than burning more captcha rounds.
                    return match downloader.download(&link, hcno).await {
                        Some(DownloadOutcome { path, bytes }) => {
                            AcquireOutcome::Downloaded { path, bytes }
                        }
                        None => {
                            error!("{}: verified link failed to download", hcno);
                            AcquireOutcome::DownloadFailed
                        }
                    };
                }
                None => info!("{}: verification rejected the code", hcno),
            }
        }

        warn!(
            "{}: all captcha attempts failed, probing direct download URLs",
            hcno
        );
        self.probe_direct_downloads(hcno).await
    }

    /// Try the fixed direct-download templates, spaced out to stay
    /// under the portal's rate limiting.
    async fn probe_direct_downloads(&self, hcno: &str) -> AcquireOutcome {
        let downloader = FileDownloader::new(self.client, self.settings);

        for (index, path) in DIRECT_DOWNLOAD_PATHS.iter().enumerate() {
            let url = format!("{}{}{}", self.settings.download_host, path, hcno);
            info!("{}: probing {}", hcno, url);

            if let Some(DownloadOutcome { path, bytes }) = downloader.download(&url, hcno).await {
                return AcquireOutcome::Downloaded { path, bytes };
            }

            if index + 1 < DIRECT_DOWNLOAD_PATHS.len() {
                tokio::time::sleep(self.settings.probe_delay()).await;
            }
        }

        warn!(
            "{}: exhausted; to fetch manually, open {} in a browser, solve the \
             captcha, and save the file to {}",
            hcno,
            self.settings.challenge_page_url(hcno),
            self.settings.save_dir.display()
        );
        AcquireOutcome::Exhausted
    }

    /// Run the whole pipeline: one listing fetch, then each identifier
    /// in discovery order. A failed identifier never aborts the rest.
    pub async fn run(&self) -> RunReport {
        let Some(identifiers) = self.discover().await else {
            error!("could not fetch the listing page; nothing to process");
            return RunReport::default();
        };

        if identifiers.is_empty() {
            info!("listing page held no identifiers; nothing to do");
        }

        let mut reports = Vec::with_capacity(identifiers.len());
        for hcno in &identifiers {
            let outcome = self.acquire(hcno).await;
            reports.push(IdentifierReport {
                hcno: hcno.clone(),
                outcome,
            });
        }

        RunReport {
            identifiers,
            reports,
        }
    }
}
