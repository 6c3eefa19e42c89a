use rand::Rng;
use setkeeper::config::RemoteFile;
use setkeeper::engine::{DomainMixMatcher, LiveMatcher, Matcher, RuleSink};
use setkeeper::error::DownloadError;
use setkeeper::plugin::DomainKind;
use setkeeper::remote::{RemoteSource, RuleFetcher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const COMMON: &[&str] = &["common.example.com", "shared.example.org"];
const ONLY_A: &[&str] = &["a1.example.com", "a2.example.com", "a3.example.com"];
const ONLY_B: &[&str] = &["b1.example.net", "b2.example.net", "b3.example.net"];
const NEITHER: &[&str] = &["nowhere.test", "example.com", "b4.example.net"];

fn rules_a() -> String {
    COMMON.iter().chain(ONLY_A).map(|r| format!("{r}\n")).collect()
}

fn rules_b() -> String {
    COMMON.iter().chain(ONLY_B).map(|r| format!("{r}\n")).collect()
}

fn build(groups: &[&[&str]]) -> Arc<dyn Matcher<str>> {
    let mut m = DomainMixMatcher::new();
    for group in groups {
        for rule in *group {
            m.add_rule(rule).unwrap();
        }
    }
    Arc::new(m)
}

/// A snapshot must answer entirely from rule set A or entirely from B.
fn check_snapshot(m: &dyn Matcher<str>) {
    let in_a = m.is_match(ONLY_A[0]);
    for key in ONLY_A {
        assert_eq!(m.is_match(key), in_a, "torn read on {key}");
    }
    for key in ONLY_B {
        assert_eq!(m.is_match(key), !in_a, "torn read on {key}");
    }
    for key in COMMON {
        assert!(m.is_match(key), "{key} missing");
    }
    for key in NEITHER {
        assert!(!m.is_match(key), "{key} unexpectedly present");
    }
}

fn spawn_readers(
    live: Arc<LiveMatcher<str>>,
    stop: Arc<AtomicBool>,
    count: usize,
) -> Vec<thread::JoinHandle<u64>> {
    (0..count)
        .map(|_| {
            let live = Arc::clone(&live);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                let mut checks = 0u64;
                loop {
                    check_snapshot(live.load().as_ref());
                    for key in COMMON {
                        assert!(live.is_match(key));
                    }
                    for key in NEITHER {
                        assert!(!live.is_match(key));
                    }
                    checks += 1;
                    if rng.gen_bool(0.2) {
                        thread::yield_now();
                    }
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                }
                checks
            })
        })
        .collect()
}

#[test]
fn test_readers_never_see_mixed_rule_sets() {
    let a = build(&[COMMON, ONLY_A]);
    let b = build(&[COMMON, ONLY_B]);
    let live = Arc::new(LiveMatcher::new(Arc::clone(&a)));
    let stop = Arc::new(AtomicBool::new(false));

    let readers = spawn_readers(Arc::clone(&live), Arc::clone(&stop), 4);

    let mut rng = rand::thread_rng();
    for i in 0..5_000 {
        let next = if i % 2 == 0 { &b } else { &a };
        live.install(Arc::clone(next));
        if rng.gen_bool(0.3) {
            thread::yield_now();
        }
    }
    stop.store(true, Ordering::Relaxed);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

/// Serves rule set A for the two provisioning downloads, then alternates.
struct Alternating {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl RuleFetcher for Alternating {
    async fn fetch(&self, _url: &str, dest: &Path) -> Result<(), DownloadError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let body = if n < 2 || n % 2 == 0 {
            rules_a()
        } else {
            rules_b()
        };
        tokio::fs::write(dest, body).await?;
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_background_refresh_under_concurrent_reads() {
    let dir = tempfile::tempdir().unwrap();
    let file = RemoteFile {
        url: "http://127.0.0.1/rules.txt".to_string(),
        path: dir.path().join("rules.txt").to_string_lossy().into_owned(),
        interval: 0,
    };
    let fetcher = Arc::new(Alternating {
        calls: AtomicUsize::new(0),
    });

    let source = RemoteSource::<DomainKind>::provision(&file, fetcher)
        .await
        .unwrap();
    check_snapshot(source.live().load().as_ref());
    assert!(source.matcher().is_match(ONLY_A[0]));

    let stop = Arc::new(AtomicBool::new(false));
    let readers = spawn_readers(source.live(), Arc::clone(&stop), 4);

    for _ in 0..200 {
        source.refresh().await.unwrap();
    }
    stop.store(true, Ordering::Relaxed);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(source.stats().refreshed, 200);
    assert_eq!(source.stats().failed, 0);
}
