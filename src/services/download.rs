//! Document download service.
//!
//! Streams a resolved download link to disk chunk-wise so large
//! standards never sit fully in memory, names the file from
//! Content-Disposition when the server offers one, and re-checks the
//! written path before reporting success.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::Settings;
use crate::scrapers::HttpClient;

/// A completed download.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Downloads resolved links into the configured output directory.
pub struct FileDownloader<'a> {
    client: &'a HttpClient,
    settings: &'a Settings,
}

impl<'a> FileDownloader<'a> {
    pub fn new(client: &'a HttpClient, settings: &'a Settings) -> Self {
        Self { client, settings }
    }

    /// Download `url` for `hcno`. Returns `None` on any failure; the
    /// failure is logged with enough context to diagnose offline.
    pub async fn download(&self, url: &str, hcno: &str) -> Option<DownloadOutcome> {
        if let Err(e) = fs::create_dir_all(&self.settings.save_dir).await {
            warn!(
                "could not create output directory {}: {}",
                self.settings.save_dir.display(),
                e
            );
            return None;
        }

        info!("downloading {}", url);
        let response = match self
            .client
            .get(url, self.settings.download_timeout())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("download request failed for {}: {}", url, e);
                return None;
            }
        };

        if !response.is_success() {
            let status = response.status;
            let preview = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect::<String>();
            warn!(
                "download of {} returned HTTP {} (body preview: {:?})",
                url, status, preview
            );
            return None;
        }

        if let Some(length) = response.content_length() {
            info!("expected size {} bytes", length);
        }

        // Content-Disposition overrides the hcno-derived default.
        let filename = response
            .content_disposition_filename()
            .and_then(|name| safe_filename(&name))
            .unwrap_or_else(|| format!("{}.pdf", hcno));
        let path = self.settings.save_dir.join(&filename);

        if let Err(e) = self.stream_to_file(response, &path).await {
            warn!("writing {} failed: {}", path.display(), e);
            return None;
        }

        // A claimed save with no file behind it is a failure, not a
        // success with size zero.
        match fs::metadata(&path).await {
            Ok(meta) => {
                info!("saved {} ({} bytes)", path.display(), meta.len());
                Some(DownloadOutcome {
                    path,
                    bytes: meta.len(),
                })
            }
            Err(_) => {
                warn!("file missing after write: {}", path.display());
                None
            }
        }
    }

    async fn stream_to_file(
        &self,
        response: crate::scrapers::HttpResponse,
        path: &Path,
    ) -> anyhow::Result<()> {
        let mut body = response.into_inner();
        let mut file = fs::File::create(path).await?;
        while let Some(chunk) = body.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

/// Reduce a server-supplied filename to its final component so a
/// hostile header cannot traverse out of the output directory.
fn safe_filename(name: &str) -> Option<String> {
    let name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())?
        .trim()
        .to_string();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename_plain() {
        assert_eq!(safe_filename("std1.pdf"), Some("std1.pdf".to_string()));
    }

    #[test]
    fn test_safe_filename_strips_directories() {
        assert_eq!(
            safe_filename("../../etc/passwd"),
            Some("passwd".to_string())
        );
        assert_eq!(safe_filename("GB/T 1.1.pdf"), Some("T 1.1.pdf".to_string()));
    }

    #[test]
    fn test_safe_filename_rejects_empty() {
        assert_eq!(safe_filename(""), None);
        assert_eq!(safe_filename("/"), None);
        assert_eq!(safe_filename(".."), None);
    }
}
