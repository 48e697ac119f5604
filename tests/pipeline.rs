//! End-to-end pipeline tests against a mock portal.

use std::path::{Path, PathBuf};

use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gbacquire::captcha::CaptchaVerifier;
use gbacquire::config::Settings;
use gbacquire::prompt::ScriptedPrompt;
use gbacquire::scrapers::HttpClient;
use gbacquire::services::{AcquireOutcome, AcquireService, FileDownloader};

const HCNO: &str = "71F772D81271ED0DE05397BE0A0AB82A";

/// Settings pointed at the mock server, with pacing and backoff delays
/// zeroed so tests run fast. The tesseract path is pinned to a
/// nonexistent binary so OCR degrades deterministically.
fn test_settings(server: &MockServer, save_dir: &Path) -> Settings {
    Settings {
        listing_url: format!("{}/listing", server.uri()),
        download_host: server.uri(),
        save_dir: save_dir.to_path_buf(),
        tesseract_cmd: Some(PathBuf::from("/nonexistent/tesseract")),
        fetch_retries: 2,
        retry_backoff_secs: 0,
        request_delay_ms: 0,
        probe_delay_ms: 0,
        ..Settings::default()
    }
}

fn scripted(codes: &[&str]) -> Box<ScriptedPrompt> {
    Box::new(ScriptedPrompt::new(
        codes.iter().map(|c| Some(c.to_string())).collect::<Vec<_>>(),
    ))
}

/// A tiny valid PNG to stand in for the captcha image.
fn captcha_png() -> Vec<u8> {
    let img = image::GrayImage::from_fn(40, 16, |x, _| image::Luma([if x % 2 == 0 { 0 } else { 255 }]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

async fn mount_challenge_page(server: &MockServer) {
    let html = r#"<html><body>
        <img class="verifyCode" src="captcha.png">
        <input name="verifyCode" type="text">
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/bzgk/gb/showGb"))
        .and(query_param("hcno", HCNO))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c/captcha.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(captcha_png(), "image/png"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn verifier_completes_relative_path_against_host() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&server, dir.path());

    Mock::given(method("POST"))
        .and(path("/bzgk/gb/verifyCode"))
        .and(header(
            "Referer",
            format!("{}/bzgk/gb/showGb?type=download&hcno={}", server.uri(), HCNO).as_str(),
        ))
        .and(body_string_contains("verifyCode=ab12"))
        .respond_with(ResponseTemplate::new(200).set_body_string("/bzgk/gb/download/xyz"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(settings.request_delay());
    let verifier = CaptchaVerifier::new(&client, &settings);

    assert_eq!(
        verifier.verify(HCNO, "ab12").await,
        Some(format!("{}/bzgk/gb/download/xyz", server.uri()))
    );
}

#[tokio::test]
async fn verifier_rejects_error_sentinel_and_implausible_codes() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&server, dir.path());

    Mock::given(method("POST"))
        .and(path("/bzgk/gb/verifyCode"))
        .respond_with(ResponseTemplate::new(200).set_body_string("error"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(settings.request_delay());
    let verifier = CaptchaVerifier::new(&client, &settings);

    assert_eq!(verifier.verify(HCNO, "ab12").await, None);
    // Out-of-shape codes never reach the endpoint (the mock expects
    // exactly one call).
    assert_eq!(verifier.verify(HCNO, "a1").await, None);
    assert_eq!(verifier.verify(HCNO, "toolong99").await, None);
}

#[tokio::test]
async fn downloader_honors_content_disposition() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&server, dir.path());

    Mock::given(method("GET"))
        .and(path("/file"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"std1.pdf\"")
                .set_body_bytes(b"%PDF-1.4 fake".to_vec()),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new(settings.request_delay());
    let downloader = FileDownloader::new(&client, &settings);

    let outcome = downloader
        .download(&format!("{}/file", server.uri()), HCNO)
        .await
        .expect("download succeeds");

    assert_eq!(outcome.path, dir.path().join("std1.pdf"));
    assert_eq!(outcome.bytes, b"%PDF-1.4 fake".len() as u64);
    assert!(outcome.path.exists());
}

#[tokio::test]
async fn downloader_defaults_to_identifier_filename() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&server, dir.path());

    Mock::given(method("GET"))
        .and(path("/file"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 9000]))
        .mount(&server)
        .await;

    let client = HttpClient::new(settings.request_delay());
    let downloader = FileDownloader::new(&client, &settings);

    let outcome = downloader
        .download(&format!("{}/file", server.uri()), HCNO)
        .await
        .expect("download succeeds");

    assert_eq!(outcome.path, dir.path().join(format!("{}.pdf", HCNO)));
    assert_eq!(outcome.bytes, 9000);
}

#[tokio::test]
async fn downloader_fails_on_http_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&server, dir.path());

    Mock::given(method("GET"))
        .and(path("/file"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let client = HttpClient::new(settings.request_delay());
    let downloader = FileDownloader::new(&client, &settings);

    assert!(downloader
        .download(&format!("{}/file", server.uri()), HCNO)
        .await
        .is_none());
}

#[tokio::test]
async fn three_rejections_fall_back_to_direct_probing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&server, dir.path());

    mount_challenge_page(&server).await;

    // Every submitted code is rejected; all three attempts must be
    // consumed before probing starts.
    Mock::given(method("POST"))
        .and(path("/bzgk/gb/verifyCode"))
        .respond_with(ResponseTemplate::new(200).set_body_string("error"))
        .expect(3)
        .mount(&server)
        .await;

    // First probe template misses, second hits.
    Mock::given(method("GET"))
        .and(path("/bzgk/gb/getGbFile"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bzgk/gb/downloadGb"))
        .and(query_param("hcno", HCNO))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(settings.request_delay());
    let service = AcquireService::new(&client, &settings, scripted(&["ab12", "cd34", "ef56"]));

    let outcome = service.acquire(HCNO).await;
    assert!(outcome.is_downloaded());
}

#[tokio::test]
async fn exhausted_when_probes_also_fail() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&server, dir.path());

    mount_challenge_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/bzgk/gb/verifyCode"))
        .respond_with(ResponseTemplate::new(200).set_body_string("error"))
        .expect(3)
        .mount(&server)
        .await;

    // All four direct templates miss.
    Mock::given(method("GET"))
        .and(path("/bzgk/gb/getGbFile"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    for p in ["/bzgk/gb/downloadGb", "/bzgk/gb/fileDownload", "/bzgk/gb/download"] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
    }

    let client = HttpClient::new(settings.request_delay());
    let service = AcquireService::new(&client, &settings, scripted(&["ab12", "cd34", "ef56"]));

    assert!(matches!(
        service.acquire(HCNO).await,
        AcquireOutcome::Exhausted
    ));
}

#[tokio::test]
async fn skipped_attempts_never_reach_the_verifier() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&server, dir.path());

    mount_challenge_page(&server).await;

    // No prompt response and an implausible code both waste the
    // attempt locally.
    Mock::given(method("POST"))
        .and(path("/bzgk/gb/verifyCode"))
        .respond_with(ResponseTemplate::new(200).set_body_string("error"))
        .expect(0)
        .mount(&server)
        .await;

    for p in [
        "/bzgk/gb/getGbFile",
        "/bzgk/gb/downloadGb",
        "/bzgk/gb/fileDownload",
        "/bzgk/gb/download",
    ] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
    }

    let client = HttpClient::new(settings.request_delay());
    let prompt = Box::new(ScriptedPrompt::new([
        None,
        Some("no".to_string()),
        Some("way too long".to_string()),
    ]));
    let service = AcquireService::new(&client, &settings, prompt);

    assert!(matches!(
        service.acquire(HCNO).await,
        AcquireOutcome::Exhausted
    ));
}

#[tokio::test]
async fn verified_download_failure_is_terminal() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&server, dir.path());

    mount_challenge_page(&server).await;

    // First attempt verifies, but the resolved link 404s. No further
    // captcha attempts and no fallback probing may follow.
    Mock::given(method("POST"))
        .and(path("/bzgk/gb/verifyCode"))
        .respond_with(ResponseTemplate::new(200).set_body_string("/bzgk/gb/download/xyz"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bzgk/gb/download/xyz"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bzgk/gb/getGbFile"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let client = HttpClient::new(settings.request_delay());
    let service = AcquireService::new(&client, &settings, scripted(&["ab12", "cd34", "ef56"]));

    assert!(matches!(
        service.acquire(HCNO).await,
        AcquireOutcome::DownloadFailed
    ));
}

#[tokio::test]
async fn run_processes_every_listed_identifier() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&server, dir.path());

    let listing = format!(
        "<html><script>showInfo('{}'); showInfo('{}');</script></html>",
        HCNO, HCNO
    );
    Mock::given(method("GET"))
        .and(path("/listing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .expect(1)
        .mount(&server)
        .await;

    mount_challenge_page(&server).await;

    // Implicit-success body: the service synthesizes the viewGb link.
    Mock::given(method("POST"))
        .and(path("/bzgk/gb/verifyCode"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bzgk/gb/viewGb"))
        .and(query_param("hcno", HCNO))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"GB-T-1.pdf\"")
                .set_body_bytes(b"%PDF-1.4".to_vec()),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new(settings.request_delay());
    let service = AcquireService::new(&client, &settings, scripted(&["ab12"]));

    let report = service.run().await;

    // The duplicated listing entry collapses to one identifier.
    assert_eq!(report.identifiers, vec![HCNO.to_string()]);
    assert_eq!(report.reports.len(), 1);
    assert!(report.reports[0].outcome.is_downloaded());
    assert!(dir.path().join("GB-T-1.pdf").exists());
}

#[tokio::test]
async fn listing_failure_yields_empty_report() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&server, dir.path());

    Mock::given(method("GET"))
        .and(path("/listing"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = HttpClient::new(settings.request_delay());
    let service = AcquireService::new(&client, &settings, scripted(&[]));

    let report = service.run().await;
    assert!(report.identifiers.is_empty());
    assert!(report.reports.is_empty());
}
