//! Captcha verification.
//!
//! Submits a solved code and interprets the endpoint's loosely shaped
//! plain-text response into a download URL.

use tracing::{info, warn};

use super::is_plausible_code;
use crate::config::Settings;
use crate::scrapers::HttpClient;

/// Submits captcha codes and resolves download links.
pub struct CaptchaVerifier<'a> {
    client: &'a HttpClient,
    settings: &'a Settings,
}

impl<'a> CaptchaVerifier<'a> {
    pub fn new(client: &'a HttpClient, settings: &'a Settings) -> Self {
        Self { client, settings }
    }

    /// Submit `code` for `hcno` and resolve the response to a download
    /// URL, or `None` on rejection or transport failure.
    ///
    /// Codes outside the 4-6 alphanumeric shape are refused locally and
    /// never reach the endpoint.
    pub async fn verify(&self, hcno: &str, code: &str) -> Option<String> {
        if !is_plausible_code(code) {
            warn!("refusing to submit implausible code {:?}", code);
            return None;
        }

        let url = self.settings.verify_url();
        let referer = self.settings.challenge_page_url(hcno);
        info!("submitting captcha code for {}", hcno);

        let response = match self
            .client
            .post_form(&url, &referer, &[("verifyCode", code)], self.settings.page_timeout())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("verification request failed: {}", e);
                return None;
            }
        };

        if !response.is_success() {
            warn!("verification returned HTTP {}", response.status);
            return None;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("verification body read failed: {}", e);
                return None;
            }
        };

        let resolved = interpret_verify_response(&body, hcno, &self.settings.download_host);
        match &resolved {
            Some(link) => info!("verification resolved download link {}", link),
            None => info!(
                "verification rejected (body preview: {:?})",
                body.chars().take(80).collect::<String>()
            ),
        }
        resolved
    }
}

/// Interpret a verification response body.
///
/// The endpoint's response shape is not uniformly structured, so the
/// interpretation is liberal, in priority order:
/// - the literal sentinel `error` (any case) is a rejection
/// - a body starting with `http` is the download URL itself
/// - a body starting with `/` is a path on the download host
/// - any other non-empty body (`success`, `ok`, `true`, ...) is taken
///   as an implicit success and a download URL is synthesized from the
///   fixed viewGb template
/// - an empty body is a rejection
pub fn interpret_verify_response(body: &str, hcno: &str, host: &str) -> Option<String> {
    let body = body.trim();

    if body.is_empty() || body.eq_ignore_ascii_case("error") {
        None
    } else if body.starts_with("http") {
        Some(body.to_string())
    } else if body.starts_with('/') {
        Some(format!("{}{}", host, body))
    } else {
        Some(format!("{}/bzgk/gb/viewGb?hcno={}", host, hcno))
    }
}
