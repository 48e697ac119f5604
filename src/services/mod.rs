//! Services tying the pipeline together.

mod acquire;
mod download;

pub use acquire::{AcquireOutcome, AcquireService, IdentifierReport, RunReport};
pub use download::{DownloadOutcome, FileDownloader};
