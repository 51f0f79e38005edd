use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use docfetch::testing::{Reply, StubServer};
use docfetch::{
    Config, ExtractOutcome, ExtractStrategy, FetchError, PackageRef, Workflow, failure_hint,
};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const MISSING_TOOL: &str = "docfetch-test-no-such-unzip";

fn config(root: &Path, server: &StubServer) -> Config {
    Config {
        base_url: server.url("/crate"),
        output_root: root.join("rust-docs"),
        timeout: Duration::from_secs(5),
        unzip_program: None,
        system_proxy: false,
        ..Config::default()
    }
}

fn docs_archive(page: &str) -> Vec<u8> {
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.add_directory("demo_pkg/", stored).unwrap();
    zip.start_file("index.html", stored).unwrap();
    zip.write_all(b"<html>demo-pkg</html>").unwrap();
    zip.start_file(format!("demo_pkg/{page}"), deflated).unwrap();
    zip.write_all(&b"<p>documented item</p>\n".repeat(40)).unwrap();
    zip.finish().unwrap().into_inner()
}

fn entries(dir: &Path) -> Vec<PathBuf> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn exact_version_end_to_end() {
    let server = StubServer::start([(
        "/crate/demo-pkg/1.2.3/download",
        Reply::Body(docs_archive("struct.Thing.html")),
    )])
    .await
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &server);
    let root = config.output_root.clone();

    let report = Workflow::new(config)
        .unwrap()
        .run(&PackageRef::new("demo-pkg", Some("1.2.3")))
        .await
        .unwrap();

    let extract_dir = root.join("demo-pkg-1.2.3");
    assert_eq!(report.extract_dir, extract_dir);
    assert_eq!(report.stub_path, extract_dir.join("README-local.md"));
    assert_eq!(
        report.extraction,
        ExtractOutcome::Extracted {
            strategy: ExtractStrategy::InProcess
        }
    );

    let stub = std::fs::read_to_string(&report.stub_path).unwrap();
    assert!(stub.contains("demo-pkg"));
    assert!(stub.contains("1.2.3"));
    assert!(extract_dir.join("index.html").is_file());
    assert!(extract_dir.join("demo_pkg/struct.Thing.html").is_file());
    assert!(!root.join("demo-pkg-1.2.3.zip").exists());
}

#[tokio::test]
async fn latest_follows_redirect_to_concrete_version() {
    let server = StubServer::start([
        (
            "/crate/demo-pkg/latest/download",
            Reply::Redirect(302, "/crate/demo-pkg/1.2.3/download".to_string()),
        ),
        (
            "/crate/demo-pkg/1.2.3/download",
            Reply::Body(docs_archive("index.html")),
        ),
    ])
    .await
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &server);
    let root = config.output_root.clone();

    let report = Workflow::new(config)
        .unwrap()
        .run(&PackageRef::new("demo-pkg", None))
        .await
        .unwrap();

    assert_eq!(report.extract_dir, root.join("demo-pkg-latest"));
    assert_eq!(report.download.redirects, 1);
    let stub = std::fs::read_to_string(&report.stub_path).unwrap();
    assert!(stub.starts_with("# demo-pkg vlatest Documentation"));
}

#[tokio::test]
async fn fuzzy_version_requests_prefix_match() {
    let server = StubServer::start([(
        "/crate/demo-pkg/~1.2/download",
        Reply::Body(docs_archive("index.html")),
    )])
    .await
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &server);
    let root = config.output_root.clone();

    let report = Workflow::new(config)
        .unwrap()
        .run(&PackageRef::new("demo-pkg", Some("~1.2")))
        .await
        .unwrap();

    assert_eq!(report.extract_dir, root.join("demo-pkg-1.2-latest"));
    assert_eq!(server.requests(), ["/crate/demo-pkg/~1.2/download"]);
}

#[tokio::test]
async fn missing_package_fails_with_existence_hint() {
    let server = StubServer::start(Vec::<(String, Reply)>::new()).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &server);
    let root = config.output_root.clone();
    let site = config.docs_site.clone();

    let err = Workflow::new(config)
        .unwrap()
        .run(&PackageRef::new("no-such-crate", Some("9.9.9")))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Http { status: 404, .. }), "{err:?}");
    let hint = failure_hint(&err, "no-such-crate", &site).unwrap();
    assert!(hint.contains("may not exist"));
    assert!(hint.contains("no-such-crate"));
    assert!(entries(&root).is_empty());
}

#[tokio::test]
async fn rate_limit_fails_with_retry_hint() {
    let server = StubServer::start([(
        "/crate/demo-pkg/latest/download",
        Reply::Status(429, "Too Many Requests"),
    )])
    .await
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &server);
    let site = config.docs_site.clone();

    let err = Workflow::new(config)
        .unwrap()
        .run(&PackageRef::new("demo-pkg", None))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert!(failure_hint(&err, "demo-pkg", &site).unwrap().contains("24 hours"));
}

#[tokio::test]
async fn repeated_runs_replace_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let package = PackageRef::new("demo-pkg", Some("1.2.3"));

    let first = StubServer::start([(
        "/crate/demo-pkg/1.2.3/download",
        Reply::Body(docs_archive("old.html")),
    )])
    .await
    .unwrap();
    let root = config(dir.path(), &first).output_root;
    Workflow::new(config(dir.path(), &first))
        .unwrap()
        .run(&package)
        .await
        .unwrap();

    let second = StubServer::start([(
        "/crate/demo-pkg/1.2.3/download",
        Reply::Body(docs_archive("new.html")),
    )])
    .await
    .unwrap();
    let report = Workflow::new(config(dir.path(), &second))
        .unwrap()
        .run(&package)
        .await
        .unwrap();

    assert_eq!(entries(&root), [root.join("demo-pkg-1.2.3")]);
    assert!(report.extract_dir.join("demo_pkg/new.html").is_file());
    assert!(!report.extract_dir.join("demo_pkg/old.html").exists());
}

#[tokio::test]
async fn unextractable_archive_still_gets_a_guide() {
    let server = StubServer::start([(
        "/crate/demo-pkg/1.2.3/download",
        Reply::Body(b"<html>maintenance page</html>".to_vec()),
    )])
    .await
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        unzip_program: Some(MISSING_TOOL.to_string()),
        ..config(dir.path(), &server)
    };
    let root = config.output_root.clone();

    let report = Workflow::new(config)
        .unwrap()
        .run(&PackageRef::new("demo-pkg", Some("1.2.3")))
        .await
        .unwrap();

    assert!(report.extraction.is_degraded());
    assert!(report.stub_path.is_file());
    assert!(!root.join("demo-pkg-1.2.3.zip").exists());
}

#[tokio::test]
async fn strict_mode_rejects_degraded_extraction() {
    let server = StubServer::start([(
        "/crate/demo-pkg/1.2.3/download",
        Reply::Body(b"not a zip".to_vec()),
    )])
    .await
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        strict_extract: true,
        ..config(dir.path(), &server)
    };
    let root = config.output_root.clone();

    let err = Workflow::new(config)
        .unwrap()
        .run(&PackageRef::new("demo-pkg", Some("1.2.3")))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::ExtractionFailed { .. }), "{err:?}");
    assert!(!root.join("demo-pkg-1.2.3.zip").exists());
}

#[tokio::test]
async fn version_cannot_walk_out_of_the_output_root() {
    let server = StubServer::start([(
        "/crate/demo-pkg/1/../../../victim/download",
        Reply::Body(docs_archive("index.html")),
    )])
    .await
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let victim = dir.path().join("victim");
    std::fs::create_dir_all(&victim).unwrap();
    std::fs::write(victim.join("precious.txt"), b"keep me").unwrap();
    let config = Config {
        output_root: dir.path().join("a").join("b").join("rust-docs"),
        ..config(dir.path(), &server)
    };
    let root = config.output_root.clone();

    let err = Workflow::new(config)
        .unwrap()
        .run(&PackageRef::new("demo-pkg", Some("1/../../../victim")))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::InvalidName { .. }), "{err:?}");
    assert_eq!(std::fs::read(victim.join("precious.txt")).unwrap(), b"keep me");
    assert!(!root.exists());
    assert!(server.requests().is_empty());
}
