//! HTTP client owning the session state for a run.
//!
//! One cookie jar and one fixed header set are shared by every request
//! in a run. The verification endpoint is cookie-bound to the challenge
//! fetch, so components must never create competing sessions.

mod response;

pub use response::{parse_content_disposition_filename, HttpResponse};

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;

/// Browser-like user agent expected by the portal.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36";

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Accept",
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("zh-CN,zh;q=0.8,zh-TW;q=0.7,zh-HK;q=0.5,en-US;q=0.3,en;q=0.2"),
    );
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers.insert("Cache-Control", HeaderValue::from_static("max-age=0"));
    headers
}

/// HTTP client with a persistent cookie jar and fixed request pacing.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    request_delay: Duration,
}

impl HttpClient {
    /// Create a new session. Timeouts are per-request, not global.
    pub fn new(request_delay: Duration) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(default_headers())
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            request_delay,
        }
    }

    /// Make a GET request with the given per-request timeout.
    pub async fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, reqwest::Error> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let wrapped = Self::wrap(response);

        // Fixed pacing between requests; the portal rate-limits bursts.
        tokio::time::sleep(self.request_delay).await;

        Ok(wrapped)
    }

    /// Make a form-encoded POST request with a Referer header. The
    /// verification endpoint validates session and Referer together.
    pub async fn post_form(
        &self,
        url: &str,
        referer: &str,
        form: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, reqwest::Error> {
        let response = self
            .client
            .post(url)
            .header("Referer", referer)
            .form(form)
            .timeout(timeout)
            .send()
            .await?;
        let wrapped = Self::wrap(response);

        tokio::time::sleep(self.request_delay).await;

        Ok(wrapped)
    }

    fn wrap(response: reqwest::Response) -> HttpResponse {
        let status = response.status();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.to_string(), v.to_string());
            }
        }

        HttpResponse {
            status,
            headers,
            response,
        }
    }
}
