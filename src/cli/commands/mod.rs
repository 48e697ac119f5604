//! Command implementations.

mod download;
mod list;
mod run;

pub use download::cmd_download;
pub use list::cmd_list;
pub use run::cmd_run;

use console::style;

use crate::config::Settings;
use crate::ocr::TesseractOcr;
use crate::prompt::{AutoPrompt, CaptchaPrompt, StdinPrompt};
use crate::services::AcquireOutcome;

/// Pick the prompt implementation for this invocation.
fn select_prompt(non_interactive: bool) -> Box<dyn CaptchaPrompt> {
    if non_interactive {
        Box::new(AutoPrompt)
    } else {
        Box::new(StdinPrompt)
    }
}

/// Warn up front when OCR cannot run; the pipeline still works with
/// manual code entry.
fn warn_if_ocr_unavailable(settings: &Settings) {
    let ocr = TesseractOcr::new(settings.tesseract_cmd.clone(), &settings.ocr_language);
    if !ocr.is_available() {
        println!(
            "{} {} (captcha codes must be typed manually)",
            style("!").yellow(),
            ocr.availability_hint()
        );
    }
}

/// One styled summary line per identifier outcome.
fn outcome_line(hcno: &str, outcome: &AcquireOutcome) -> String {
    match outcome {
        AcquireOutcome::Downloaded { path, bytes } => format!(
            "{} {} → {} ({} bytes)",
            style("✓").green(),
            hcno,
            path.display(),
            bytes
        ),
        AcquireOutcome::DownloadFailed => format!(
            "{} {} verified but the transfer failed",
            style("✗").red(),
            hcno
        ),
        AcquireOutcome::Exhausted => format!(
            "{} {} exhausted all captcha attempts and fallbacks",
            style("✗").red(),
            hcno
        ),
    }
}
