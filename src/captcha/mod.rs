//! Captcha challenge acquisition.
//!
//! A challenge is cookie-bound and single-use: every download attempt
//! fetches the challenge page fresh, locates the captcha image,
//! downloads it, and runs the preprocessing + OCR pipeline for a
//! best-effort guess. Failures at any step degrade the challenge
//! (absent image or guess) instead of aborting; the orchestrator
//! decides how to proceed.

mod image;
mod verify;

pub use self::image::{encode_png, preprocess, CaptchaImageError};
pub use verify::{interpret_verify_response, CaptchaVerifier};

use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::ocr::{TesseractOcr, PSM_MODES};
use crate::scrapers::{write_debug_artifact, HttpClient};

/// Challenge page snapshot filename.
const DEBUG_CHALLENGE_PAGE: &str = "download_page.html";
/// Raw captcha image dump, overwritten per attempt.
pub const CAPTCHA_IMAGE: &str = "captcha.png";
/// Preprocessed captcha image dump, overwritten per attempt.
const PROCESSED_CAPTCHA_IMAGE: &str = "processed_captcha.png";

/// One captcha challenge for one download attempt.
pub struct CaptchaChallenge {
    pub hcno: String,
    /// Raw image bytes, when the image could be located and fetched.
    pub image: Option<Vec<u8>>,
    /// Best OCR candidate, when one passed the plausibility filter.
    pub guess: Option<String>,
}

/// A submittable captcha code is 4-6 alphanumeric characters. Anything
/// else is never sent to the verification endpoint.
pub fn is_plausible_code(code: &str) -> bool {
    (4..=6).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Strip OCR noise down to alphanumerics and keep the longest
/// candidate in the plausible length range.
pub fn select_guess<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let mut best: Option<String> = None;
    for raw in candidates {
        let cleaned: String = raw.chars().filter(char::is_ascii_alphanumeric).collect();
        if !is_plausible_code(&cleaned) {
            continue;
        }
        if best.as_ref().is_none_or(|b| cleaned.len() > b.len()) {
            best = Some(cleaned);
        }
    }
    best
}

/// Fetches and solves captcha challenges.
pub struct CaptchaAcquirer<'a> {
    client: &'a HttpClient,
    settings: &'a Settings,
    ocr: &'a TesseractOcr,
}

impl<'a> CaptchaAcquirer<'a> {
    pub fn new(client: &'a HttpClient, settings: &'a Settings, ocr: &'a TesseractOcr) -> Self {
        Self {
            client,
            settings,
            ocr,
        }
    }

    /// Acquire a fresh challenge for `hcno`.
    pub async fn acquire(&self, hcno: &str) -> CaptchaChallenge {
        let mut challenge = CaptchaChallenge {
            hcno: hcno.to_string(),
            image: None,
            guess: None,
        };

        // The challenge page fetch also binds the session cookie that
        // the verification endpoint later checks.
        let Some(page) = self.fetch_challenge_page(hcno).await else {
            return challenge;
        };

        let image = match locate_image_url(&page, &self.settings.download_host) {
            Some(url) => {
                debug!("captcha image element resolved to {}", url);
                self.fetch_image(&url).await
            }
            None => {
                debug!("no verifyCode image element, probing generate endpoint");
                self.probe_image().await
            }
        };

        let Some(image) = image else {
            warn!("could not obtain a captcha image for {}", hcno);
            return challenge;
        };

        write_debug_artifact(&self.settings.save_dir, CAPTCHA_IMAGE, &image);
        challenge.guess = self.recognize(&image);
        challenge.image = Some(image);

        challenge
    }

    async fn fetch_challenge_page(&self, hcno: &str) -> Option<String> {
        let url = self.settings.challenge_page_url(hcno);
        info!("fetching challenge page {}", url);

        match self.client.get(&url, self.settings.page_timeout()).await {
            Ok(response) if response.is_success() => match response.text().await {
                Ok(body) => {
                    write_debug_artifact(
                        &self.settings.save_dir,
                        DEBUG_CHALLENGE_PAGE,
                        body.as_bytes(),
                    );
                    Some(body)
                }
                Err(e) => {
                    warn!("challenge page body read failed: {}", e);
                    None
                }
            },
            Ok(response) => {
                warn!("challenge page returned HTTP {}", response.status);
                None
            }
            Err(e) => {
                warn!("challenge page fetch failed: {}", e);
                None
            }
        }
    }

    /// Download captcha image bytes, accepting only 200 + image
    /// content type.
    async fn fetch_image(&self, url: &str) -> Option<Vec<u8>> {
        match self.client.get(url, self.settings.probe_timeout()).await {
            Ok(response) if response.is_success() && response.is_image() => {
                match response.bytes().await {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        warn!("captcha image read failed: {}", e);
                        None
                    }
                }
            }
            Ok(response) => {
                warn!(
                    "captcha image fetch rejected: HTTP {}, content type {:?}",
                    response.status,
                    response.content_type()
                );
                None
            }
            Err(e) => {
                warn!("captcha image fetch failed: {}", e);
                None
            }
        }
    }

    /// Probe the generate-captcha endpoint used when the challenge page
    /// carries no image element. The timestamp query defeats caches.
    async fn probe_image(&self) -> Option<Vec<u8>> {
        let url = format!(
            "{}/bzgk/gb/gc?_={}",
            self.settings.download_host,
            chrono::Utc::now().timestamp_millis()
        );
        debug!("probing captcha endpoint {}", url);
        self.fetch_image(&url).await
    }

    /// Preprocess and OCR the image, returning the best plausible
    /// guess. `None` is a degraded result, not an error: the human
    /// prompt covers for it.
    fn recognize(&self, raw: &[u8]) -> Option<String> {
        let processed = match preprocess(raw) {
            Ok(img) => img,
            Err(e) => {
                warn!("captcha preprocessing failed: {}", e);
                return None;
            }
        };

        if let Ok(png) = encode_png(&processed) {
            write_debug_artifact(&self.settings.save_dir, PROCESSED_CAPTCHA_IMAGE, &png);
        }

        let processed_path = self.settings.save_dir.join(PROCESSED_CAPTCHA_IMAGE);
        if !processed_path.exists() {
            warn!("preprocessed captcha image was not written, skipping OCR");
            return None;
        }

        let mut candidates = Vec::new();
        for psm in PSM_MODES {
            match self.ocr.recognize(&processed_path, psm) {
                Ok(text) => {
                    debug!("psm {} read {:?}", psm, text.trim());
                    candidates.push(text);
                }
                Err(e) => debug!("psm {} failed: {}", psm, e),
            }
        }

        let guess = select_guess(candidates);
        match &guess {
            Some(g) => info!("OCR guess: {}", g),
            None => info!("OCR produced no plausible guess"),
        }
        guess
    }
}

/// Find the `img.verifyCode` element and resolve its source to an
/// absolute URL: absolute sources pass through, relative ones are
/// completed against the fixed image prefix on the download host.
fn locate_image_url(html: &str, host: &str) -> Option<String> {
    let selector = Selector::parse("img.verifyCode").ok()?;
    let document = Html::parse_document(html);

    let src = document
        .select(&selector)
        .find_map(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())?;

    if src.starts_with("http") {
        Some(src.to_string())
    } else {
        Some(format!("{}/c/{}", host, src))
    }
}
