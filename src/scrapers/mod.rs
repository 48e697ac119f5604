//! Scraping support: the shared HTTP session and the listing page.

mod http_client;
mod listing;

pub use http_client::{parse_content_disposition_filename, HttpClient, HttpResponse};
pub use listing::{extract_identifiers, ListingFetcher};

use std::path::Path;

use tracing::debug;

/// Persist a raw response body next to the downloads for post-hoc
/// inspection. Fixed filenames, overwritten per call; failures are
/// logged and ignored.
pub(crate) fn write_debug_artifact(dir: &Path, name: &str, contents: &[u8]) {
    let path = dir.join(name);
    if let Err(e) = std::fs::write(&path, contents) {
        debug!("could not write debug artifact {}: {}", path.display(), e);
    }
}
