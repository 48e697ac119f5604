//! OCR support for captcha images.
//!
//! Uses the system tesseract binary via command-line, the traditional,
//! widely-available option. The binary path can be pinned in
//! configuration; otherwise it is resolved from PATH.

mod tesseract;

pub use tesseract::{TesseractOcr, PSM_MODES};

use thiserror::Error;

/// Errors from the OCR engine.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
