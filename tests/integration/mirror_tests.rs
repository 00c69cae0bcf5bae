//! Integration tests for the mirror pipeline
//!
//! Each test serves a small site from a mock server, mirrors it into a
//! temporary directory, and asserts on the files written, the link
//! rewriting, and the summary counts.

use std::path::{Path, PathBuf};

use kagami::config::{parse_exclude_list, parse_reject_list, Filters, MirrorOptions};
use kagami::mirror::mirror_site;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::capture_transcript;

/// Mirror options pointed at the mock server
fn mirror_options(server_uri: &str, output_dir: &Path) -> MirrorOptions {
    MirrorOptions {
        seed: Url::parse(&format!("{}/", server_uri)).unwrap(),
        output_dir: output_dir.to_path_buf(),
        convert_links: true,
        filters: Filters::default(),
        concurrency: 3,
        rate_limit: 0,
        dynamic: false,
        user_agent: "kagami-test".to_string(),
    }
}

/// Directory the mirrored site lands in: `<output>/<host>_<port>`
fn site_dir(output_dir: &Path, server_uri: &str) -> PathBuf {
    let url = Url::parse(server_uri).unwrap();
    let host = url.host_str().unwrap().to_string();
    match url.port() {
        Some(port) => output_dir.join(format!("{}_{}", host, port)),
        None => output_dir.join(host),
    }
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

async fn mount_css(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "text/css"),
        )
        .mount(server)
        .await;
}

async fn mount_png(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("Content-Type", "image/png"),
        )
        .mount(server)
        .await;
}

fn read_to_string(path: &Path) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("could not read {}: {}", path.display(), e))
}

#[tokio::test]
async fn test_mirror_fetches_pages_styles_and_assets() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        r#"<html><head>
            <link rel="stylesheet" href="/css/site.css">
        </head><body>
            <a href="/about">About</a>
            <a href="https://external.example/page">Elsewhere</a>
            <img src="/images/logo.png">
        </body></html>"#
            .to_string(),
    )
    .await;
    mount_html(
        &server,
        "/about",
        r#"<html><body><a href="/">Home</a></body></html>"#.to_string(),
    )
    .await;
    mount_css(
        &server,
        "/css/site.css",
        "body { background: url(/images/bg.png); }",
    )
    .await;
    mount_png(&server, "/images/logo.png", vec![0x89, 0x50, 0x4E, 0x47]).await;
    mount_png(&server, "/images/bg.png", vec![0x89, 0x50, 0x4E, 0x47, 0x0D]).await;

    let dir = TempDir::new().unwrap();
    let options = mirror_options(&server.uri(), dir.path());
    let (buf, mut transcript) = capture_transcript();

    let summary = mirror_site(options, None, &mut transcript).await.unwrap();

    // Seed, about page, stylesheet, and both images; bg.png only ever
    // appears inside the stylesheet
    assert_eq!(summary.attempted(), 5);
    assert_eq!(summary.succeeded(), 5);
    assert!(summary.all_succeeded());

    let site = site_dir(dir.path(), &server.uri());

    let index = read_to_string(&site.join("index.html"));
    assert!(index.contains(r#"href="about/index.html""#), "got: {}", index);
    assert!(index.contains(r#"href="css/site.css""#), "got: {}", index);
    assert!(index.contains(r#"src="images/logo.png""#), "got: {}", index);
    // Foreign links are left exactly as written
    assert!(index.contains("https://external.example/page"));

    let about = read_to_string(&site.join("about/index.html"));
    assert!(about.contains(r#"href="../index.html""#), "got: {}", about);

    let css = read_to_string(&site.join("css/site.css"));
    assert!(css.contains("url(../images/bg.png)"), "got: {}", css);

    assert!(site.join("images/logo.png").exists());
    assert_eq!(
        std::fs::read(site.join("images/bg.png")).unwrap(),
        vec![0x89, 0x50, 0x4E, 0x47, 0x0D]
    );

    let output = buf.contents();
    assert!(output.contains("Starting mirror of"));
    assert!(output.contains("Output directory:"));
    assert!(output.contains("Downloading:"));
}

#[tokio::test]
async fn test_mirror_without_convert_links_keeps_documents_as_served() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        r#"<html><body><a href="/about">About</a></body></html>"#.to_string(),
    )
    .await;
    mount_html(
        &server,
        "/about",
        "<html><body>About</body></html>".to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut options = mirror_options(&server.uri(), dir.path());
    options.convert_links = false;
    let (_buf, mut transcript) = capture_transcript();

    let summary = mirror_site(options, None, &mut transcript).await.unwrap();

    assert_eq!(summary.succeeded(), 2);

    // The child was still discovered and fetched, only the rewrite is off
    let site = site_dir(dir.path(), &server.uri());
    assert!(site.join("about/index.html").exists());
    let index = read_to_string(&site.join("index.html"));
    assert!(index.contains(r#"href="/about""#), "got: {}", index);
}

#[tokio::test]
async fn test_mirror_reject_filter_skips_matching_extensions() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        r#"<html><head><link rel="stylesheet" href="/style.css"></head>
           <body><img src="/photo.jpg"></body></html>"#
            .to_string(),
    )
    .await;
    mount_css(&server, "/style.css", "body { color: red; }").await;

    // The rejected extension must never be requested
    Mock::given(method("GET"))
        .and(path("/photo.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8]))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut options = mirror_options(&server.uri(), dir.path());
    options.filters = Filters::new(parse_reject_list("jpg"), Vec::new());
    let (_buf, mut transcript) = capture_transcript();

    let summary = mirror_site(options, None, &mut transcript).await.unwrap();

    assert_eq!(summary.attempted(), 2);
    assert_eq!(summary.succeeded(), 2);

    let site = site_dir(dir.path(), &server.uri());
    assert!(site.join("style.css").exists());
    assert!(!site.join("photo.jpg").exists());
}

#[tokio::test]
async fn test_mirror_excluded_prefix_is_never_entered() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        r#"<html><body>
            <a href="/private/report">Report</a>
            <a href="/about">About</a>
        </body></html>"#
            .to_string(),
    )
    .await;
    mount_html(
        &server,
        "/about",
        "<html><body>About</body></html>".to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/private/report"))
        .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut options = mirror_options(&server.uri(), dir.path());
    options.filters = Filters::new(Default::default(), parse_exclude_list("/private"));
    let (_buf, mut transcript) = capture_transcript();

    let summary = mirror_site(options, None, &mut transcript).await.unwrap();

    assert_eq!(summary.attempted(), 2);

    let site = site_dir(dir.path(), &server.uri());
    assert!(site.join("about/index.html").exists());
    assert!(!site.join("pages").exists());
}

#[tokio::test]
async fn test_mirror_stays_on_the_seed_origin() {
    let server = MockServer::start().await;
    let foreign = MockServer::start().await;

    mount_html(
        &server,
        "/",
        format!(
            r#"<html><body><script src="{}/lib.js"></script></body></html>"#,
            foreign.uri()
        ),
    )
    .await;

    // Nothing on the foreign host may be fetched
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("var x;"))
        .expect(0)
        .mount(&foreign)
        .await;

    let dir = TempDir::new().unwrap();
    let options = mirror_options(&server.uri(), dir.path());
    let (_buf, mut transcript) = capture_transcript();

    let summary = mirror_site(options, None, &mut transcript).await.unwrap();

    assert_eq!(summary.attempted(), 1);

    // The off-origin reference survives the rewrite pass untouched
    let site = site_dir(dir.path(), &server.uri());
    let index = read_to_string(&site.join("index.html"));
    assert!(index.contains(&format!("{}/lib.js", foreign.uri())));
    assert!(!site_dir(dir.path(), &foreign.uri()).exists());
}

#[tokio::test]
async fn test_mirror_records_failures_and_keeps_going() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        r#"<html><head><link rel="stylesheet" href="/broken.css"></head>
           <body><a href="/about">About</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_html(
        &server,
        "/about",
        "<html><body>About</body></html>".to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken.css"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let options = mirror_options(&server.uri(), dir.path());
    let (buf, mut transcript) = capture_transcript();

    let summary = mirror_site(options, None, &mut transcript).await.unwrap();

    assert_eq!(summary.attempted(), 3);
    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failures().len(), 1);
    assert!(summary.failures()[0].0.contains("/broken.css"));

    let site = site_dir(dir.path(), &server.uri());
    assert!(site.join("about/index.html").exists());
    assert!(!site.join("broken.css").exists());
    assert!(buf.contents().contains("Error downloading"));
}
