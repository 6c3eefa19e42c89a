use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use setkeeper::config::{RemoteFile, SetArgs};
use setkeeper::error::{DownloadError, SetError, SourceError};
use setkeeper::plugin::{DomainSet, IpSet, Registry};
use setkeeper::remote::HttpFetcher;
use std::net::IpAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Rule file served over loopback HTTP; body and failure mode can change
/// while the test runs.
#[derive(Clone, Default)]
struct RemoteList {
    body: Arc<Mutex<String>>,
    fail: Arc<AtomicBool>,
    hits: Arc<AtomicUsize>,
}

impl RemoteList {
    fn new(body: &str) -> Self {
        let list = Self::default();
        list.set_body(body);
        list
    }

    fn set_body(&self, body: &str) {
        *self.body.lock().unwrap() = body.to_string();
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn serve_list(State(list): State<RemoteList>) -> Result<String, StatusCode> {
    list.hits.fetch_add(1, Ordering::SeqCst);
    if list.fail.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(list.body.lock().unwrap().clone())
}

async fn spawn_server(list: RemoteList) -> String {
    let app = Router::new()
        .route("/list.txt", get(serve_list))
        .with_state(list);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/list.txt")
}

fn registry() -> Registry {
    Registry::new(Arc::new(HttpFetcher::new("setkeeper-test").unwrap()))
}

fn remote_args(url: &str, path: &Path, interval: u64) -> SetArgs {
    SetArgs {
        remote_files: vec![RemoteFile {
            url: url.to_string(),
            path: path.to_string_lossy().into_owned(),
            interval,
        }],
        ..Default::default()
    }
}

async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..50 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
async fn test_download_when_missing_then_background_refresh() {
    let list = RemoteList::new("# ads\nads.example.com\n");
    let url = spawn_server(list.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/dir/ads.txt");

    let registry = registry();
    let set = DomainSet::new(&remote_args(&url, &path, 1), &registry)
        .await
        .unwrap();

    // Missing local copy: initial download plus the mandatory refresh.
    assert_eq!(list.hits(), 2);
    assert!(set.is_match("x.ads.example.com"));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "# ads\nads.example.com\n"
    );

    list.set_body("tracker.example.org\n");
    assert!(wait_for(|| set.is_match("tracker.example.org")).await);
    assert!(!set.is_match("ads.example.com"));

    let source = &set.remote_sources()[0];
    assert!(source.stats().refreshed >= 1);
    assert_eq!(source.stats().rules, 1);

    registry.shutdown().await;
}

#[tokio::test]
async fn test_failed_refresh_keeps_last_good_rules() {
    let list = RemoteList::new("198.51.100.0/24\n");
    let url = spawn_server(list.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ips.txt");

    let registry = registry();
    let set = IpSet::new(&remote_args(&url, &path, 1), &registry)
        .await
        .unwrap();
    let inside: IpAddr = "198.51.100.7".parse().unwrap();
    assert!(set.is_match(&inside));

    list.fail.store(true, Ordering::SeqCst);
    let source = Arc::clone(&set.remote_sources()[0]);
    assert!(wait_for(|| source.stats().failed >= 1).await);

    assert!(set.is_match(&inside));
    assert_eq!(source.stats().refreshed, 0);

    registry.shutdown().await;
}

#[tokio::test]
async fn test_stale_copy_is_replaced_by_latest() {
    let list = RemoteList::new("full:latest.example.com\n");
    let url = spawn_server(list.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ads.txt");
    std::fs::write(&path, "full:stale.example.com\n").unwrap();

    let registry = registry();
    let set = DomainSet::new(&remote_args(&url, &path, 0), &registry)
        .await
        .unwrap();

    // Local copy present: only the unconditional refresh is fetched.
    assert_eq!(list.hits(), 1);
    assert!(set.is_match("latest.example.com"));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "full:latest.example.com\n"
    );
}

#[tokio::test]
async fn test_download_failure_fails_construction() {
    let list = RemoteList::new("ads.example.com\n");
    list.fail.store(true, Ordering::SeqCst);
    let url = spawn_server(list.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ads.txt");

    let registry = registry();
    let err = DomainSet::new(&remote_args(&url, &path, 60), &registry)
        .await
        .err()
        .unwrap();

    match err {
        SetError::Remote {
            url: failed,
            source: SourceError::Download(DownloadError::Status(status)),
        } => {
            assert_eq!(failed, url);
            assert_eq!(status.as_u16(), 503);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!path.exists());
}

#[tokio::test]
async fn test_shutdown_stops_refreshing() {
    let list = RemoteList::new("ads.example.com\n");
    let url = spawn_server(list.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ads.txt");

    let registry = registry();
    let _set = DomainSet::new(&remote_args(&url, &path, 1), &registry)
        .await
        .unwrap();
    assert!(wait_for(|| list.hits() >= 3).await);

    registry.shutdown().await;
    let after_shutdown = list.hits();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(list.hits(), after_shutdown);
}
