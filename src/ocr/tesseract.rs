//! Tesseract invocation for captcha recognition.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::OcrError;

/// Page segmentation modes tried per captcha, in order: uniform block,
/// single word, single character, raw line. Short noisy captchas
/// respond differently to each.
pub const PSM_MODES: [u32; 4] = [6, 8, 10, 13];

/// Tesseract OCR engine handle.
pub struct TesseractOcr {
    cmd: PathBuf,
    language: String,
}

impl TesseractOcr {
    /// Create an engine handle. `cmd` pins an explicit binary path;
    /// otherwise `tesseract` is resolved from PATH.
    pub fn new(cmd: Option<PathBuf>, language: &str) -> Self {
        Self {
            cmd: cmd.unwrap_or_else(|| PathBuf::from("tesseract")),
            language: language.to_string(),
        }
    }

    /// Check if the engine can run (binary installed and reachable).
    pub fn is_available(&self) -> bool {
        if self.cmd.components().count() > 1 {
            self.cmd.exists()
        } else {
            which::which(&self.cmd).is_ok()
        }
    }

    /// Get a description of what's needed to make the engine available.
    pub fn availability_hint(&self) -> String {
        if self.is_available() {
            "Tesseract is available".to_string()
        } else {
            format!(
                "Tesseract not found at '{}'. Install with: apt install tesseract-ocr, \
                 or set tesseract_cmd in the config",
                self.cmd.display()
            )
        }
    }

    /// Run tesseract on an image file under one page segmentation mode.
    pub fn recognize(&self, image_path: &Path, psm: u32) -> Result<String, OcrError> {
        let output = Command::new(&self.cmd)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language, "--psm", &psm.to_string()])
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr)))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}
