//! Configuration management for GBacquire.
//!
//! All tunable state lives in one [`Settings`] struct passed into the
//! services at construction time: endpoint URLs, the output directory,
//! the tesseract binary, retry budgets, timeouts, and pacing delays.
//! Values come from an optional TOML file with defaults in code.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default listing endpoint: first page of published standards,
/// newest circulation date first.
const DEFAULT_LISTING_URL: &str = "https://openstd.samr.gov.cn/bzgk/gb/std_list_type?r=0.25200845908185987&page=1&pageSize=50&p.p1=2&p.p90=circulation_date&p.p91=desc";

/// Default host serving challenge pages, verification, and downloads.
const DEFAULT_DOWNLOAD_HOST: &str = "http://c.gb688.cn";

/// Runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Listing page to seed identifiers from.
    pub listing_url: String,

    /// Host serving challenge pages, captcha verification, and files.
    pub download_host: String,

    /// Directory for downloaded documents and debug artifacts.
    pub save_dir: PathBuf,

    /// Explicit tesseract binary path. When unset, the binary is
    /// resolved from PATH.
    pub tesseract_cmd: Option<PathBuf>,

    /// OCR language passed to tesseract.
    pub ocr_language: String,

    /// Listing fetch attempts before giving up.
    pub fetch_retries: u32,

    /// Delay between listing fetch attempts, in seconds.
    pub retry_backoff_secs: u64,

    /// Captcha attempts per identifier before fallback probing.
    pub captcha_attempts: u32,

    /// Timeout for listing/challenge/verification requests, in seconds.
    pub page_timeout_secs: u64,

    /// Timeout for captcha-image and fallback probe requests, in seconds.
    pub probe_timeout_secs: u64,

    /// Timeout for document downloads, in seconds.
    pub download_timeout_secs: u64,

    /// Fixed pacing delay applied after every request, in milliseconds.
    /// The target site is sensitive to request pacing.
    pub request_delay_ms: u64,

    /// Spacing between direct-download fallback probes, in milliseconds.
    pub probe_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            download_host: DEFAULT_DOWNLOAD_HOST.to_string(),
            save_dir: PathBuf::from("downloads"),
            tesseract_cmd: None,
            ocr_language: "eng".to_string(),
            fetch_retries: 3,
            retry_backoff_secs: 2,
            captcha_attempts: 3,
            page_timeout_secs: 30,
            probe_timeout_secs: 10,
            download_timeout_secs: 60,
            request_delay_ms: 500,
            probe_delay_ms: 1000,
        }
    }
}

impl Settings {
    /// Challenge page URL for an identifier. Verification is
    /// cookie-bound to a fetch of this page, and it doubles as the
    /// Referer for the verification POST.
    pub fn challenge_page_url(&self, hcno: &str) -> String {
        format!(
            "{}/bzgk/gb/showGb?type=download&hcno={}",
            self.download_host, hcno
        )
    }

    /// Captcha verification endpoint.
    pub fn verify_url(&self) -> String {
        format!("{}/bzgk/gb/verifyCode", self.download_host)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }

    /// Create the output directory if it does not exist yet.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.save_dir)?;
        Ok(())
    }
}

/// Load settings from an explicit config file, from `gbstd.toml` in the
/// working directory, or fall back to defaults.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = match path {
        Some(path) => parse_settings_file(path)?,
        None => {
            let default_path = Path::new("gbstd.toml");
            if default_path.exists() {
                parse_settings_file(default_path)?
            } else {
                Settings::default()
            }
        }
    };

    // Expand ~ and environment references in the output directory.
    if let Some(dir) = settings.save_dir.to_str() {
        settings.save_dir = PathBuf::from(shellexpand::tilde(dir).into_owned());
    }

    Ok(settings)
}

fn parse_settings_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("failed to parse config {}: {}", path.display(), e))
}
