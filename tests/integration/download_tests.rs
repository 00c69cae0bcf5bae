//! Integration tests for the download machinery
//!
//! These cover the pieces the URL-list mode is built from: the worker
//! pool fed from a separate task, per-transfer rate limiting, and the
//! transcript narration of a reported fetch.

use kagami::download::{
    build_http_client, fetch_to_file, filename_for, FetchReport, FetchResult, FetchStatus,
    RateLimiter, WorkerPool,
};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::capture_transcript;

async fn mount_text(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "text/plain"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_worker_pool_downloads_every_target() {
    let server = MockServer::start().await;
    mount_text(&server, "/a.txt", "alpha").await;
    mount_text(&server, "/b.txt", "bravo").await;
    mount_text(&server, "/c.txt", "charlie").await;

    let dir = TempDir::new().unwrap();
    let output_dir = dir.path().to_path_buf();
    let client = build_http_client("kagami-test").unwrap();

    let worker_dir = output_dir.clone();
    let mut pool = WorkerPool::start(2, move |url: Url| {
        let client = client.clone();
        let dest = worker_dir.join(filename_for(&url));
        async move {
            match fetch_to_file(&client, &url, &dest, None, None).await {
                Ok(outcome) => FetchResult::success(url.as_str(), dest, outcome.bytes),
                Err(e) => FetchResult::failed(url.as_str(), dest, e.to_string()),
            }
        }
    });

    let targets: Vec<Url> = ["/a.txt", "/b.txt", "/c.txt"]
        .iter()
        .map(|route| Url::parse(&format!("{}{}", server.uri(), route)).unwrap())
        .collect();

    // Feed from a separate task so a small job queue cannot stall the drain
    let feeder_jobs = pool.jobs.clone();
    tokio::spawn(async move {
        for url in targets {
            if feeder_jobs.send(url).await.is_err() {
                break;
            }
        }
    });
    drop(pool.jobs);

    let mut results = Vec::new();
    while let Some(result) = pool.results.recv().await {
        results.push(result);
    }

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.status == FetchStatus::Success));
    assert_eq!(
        std::fs::read_to_string(output_dir.join("a.txt")).unwrap(),
        "alpha"
    );
    assert_eq!(
        std::fs::read_to_string(output_dir.join("b.txt")).unwrap(),
        "bravo"
    );
    assert_eq!(
        std::fs::read_to_string(output_dir.join("c.txt")).unwrap(),
        "charlie"
    );
}

#[tokio::test]
async fn test_worker_pool_reports_failures_per_target() {
    let server = MockServer::start().await;
    mount_text(&server, "/ok.txt", "fine").await;
    Mock::given(method("GET"))
        .and(path("/gone.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output_dir = dir.path().to_path_buf();
    let client = build_http_client("kagami-test").unwrap();

    let worker_dir = output_dir.clone();
    let mut pool = WorkerPool::start(2, move |url: Url| {
        let client = client.clone();
        let dest = worker_dir.join(filename_for(&url));
        async move {
            match fetch_to_file(&client, &url, &dest, None, None).await {
                Ok(outcome) => FetchResult::success(url.as_str(), dest, outcome.bytes),
                Err(e) => FetchResult::failed(url.as_str(), dest, e.to_string()),
            }
        }
    });

    for route in ["/ok.txt", "/gone.txt"] {
        let url = Url::parse(&format!("{}{}", server.uri(), route)).unwrap();
        pool.jobs.send(url).await.unwrap();
    }
    drop(pool.jobs);

    let mut results = Vec::new();
    while let Some(result) = pool.results.recv().await {
        results.push(result);
    }

    assert_eq!(results.len(), 2);
    let failed: Vec<_> = results
        .iter()
        .filter(|r| r.status == FetchStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].url.contains("/gone.txt"));
    assert!(failed[0].error.as_deref().unwrap_or("").contains("404"));

    assert!(output_dir.join("ok.txt").exists());
    assert!(!output_dir.join("gone.txt").exists());
}

#[tokio::test]
async fn test_rate_limited_fetch_completes_with_all_bytes() {
    let server = MockServer::start().await;
    let body = vec![0x55u8; 64 * 1024];
    Mock::given(method("GET"))
        .and(path("/blob.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.clone())
                .insert_header("Content-Type", "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("blob.bin");
    let url = Url::parse(&format!("{}/blob.bin", server.uri())).unwrap();
    let client = build_http_client("kagami-test").unwrap();

    // Limit far above the body size so the transfer fits one quota window
    let mut limiter = RateLimiter::from_limit(10_000_000);
    let outcome = fetch_to_file(&client, &url, &dest, limiter.as_mut(), None)
        .await
        .unwrap();

    assert_eq!(outcome.bytes, body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
}

#[tokio::test]
async fn test_reported_fetch_narrates_start_to_finish() {
    let server = MockServer::start().await;
    mount_text(&server, "/notes.txt", "remember").await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("notes.txt");
    let url = Url::parse(&format!("{}/notes.txt", server.uri())).unwrap();
    let client = build_http_client("kagami-test").unwrap();

    let (buf, mut transcript) = capture_transcript();
    let report = FetchReport {
        transcript: &mut transcript,
        narrate: true,
        progress: true,
    };

    fetch_to_file(&client, &url, &dest, None, Some(report))
        .await
        .unwrap();

    let output = buf.contents();
    assert!(output.contains("sending request, awaiting response... status 200"));
    assert!(output.contains("content size: 8"));
    assert!(output.contains(&format!("Downloaded [{}]", url)));
}
