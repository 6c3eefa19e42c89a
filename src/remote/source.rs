use super::fetcher::RuleFetcher;
use crate::config::RemoteFile;
use crate::engine::loader::load_text;
use crate::engine::{LiveMatcher, Matcher, RuleSink};
use crate::error::{DownloadError, SourceError};
use crate::plugin::SetKind;
use std::ffi::OsString;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

/// Counters of one remote source, for logs and tests.
#[derive(Debug, Default)]
struct RefreshStats {
    refreshed: AtomicU64,
    failed: AtomicU64,
    rules: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSnapshot {
    /// Successful background refreshes.
    pub refreshed: u64,
    /// Abandoned background refreshes.
    pub failed: u64,
    /// Rule count of the active matcher.
    pub rules: usize,
}

/// One remote rule file: its persisted copy and the live matcher built from it.
pub struct RemoteSource<S: SetKind> {
    url: String,
    path: PathBuf,
    interval: Duration,
    fetcher: Arc<dyn RuleFetcher>,
    live: Arc<LiveMatcher<S::Key>>,
    stats: RefreshStats,
    _kind: PhantomData<fn() -> S>,
}

impl<S: SetKind> RemoteSource<S> {
    /// Brings the source up:
    ///
    /// 1. create the parent directory of the local path,
    /// 2. download the file if there is no local copy,
    /// 3. load the local copy,
    /// 4. download again unconditionally,
    /// 5. load the fresh copy on top.
    ///
    /// Any failure is fatal for the source.
    pub async fn provision(
        file: &RemoteFile,
        fetcher: Arc<dyn RuleFetcher>,
    ) -> Result<Self, SourceError> {
        let url = file.url.as_str();
        let path = PathBuf::from(&file.path);

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| SourceError::CreateDir {
                    dir: dir.to_path_buf(),
                    source,
                })?;
        }

        if let Err(e) = fs::metadata(&path).await {
            if e.kind() == io::ErrorKind::NotFound {
                info!("No local copy of {}, downloading to {}", url, path.display());
                download(fetcher.as_ref(), url, &path).await?;
            }
        }

        let mut builder = S::Builder::default();
        load_path(&path, &mut builder).await?;

        download(fetcher.as_ref(), url, &path)
            .await
            .map_err(SourceError::Update)?;
        load_path(&path, &mut builder).await?;

        let (matcher, rules) = S::build(builder);
        info!(
            "Loaded {} rules from remote file {} ({})",
            rules,
            url,
            path.display()
        );

        let stats = RefreshStats::default();
        stats.rules.store(rules, Ordering::Relaxed);

        Ok(Self {
            url: file.url.clone(),
            path,
            interval: Duration::from_secs(file.interval),
            fetcher,
            live: Arc::new(LiveMatcher::new(matcher)),
            stats,
            _kind: PhantomData,
        })
    }

    /// One refresh tick: download, load into a fresh matcher, install it.
    ///
    /// On error nothing is installed and the previous matcher stays live.
    pub async fn refresh(&self) -> Result<usize, SourceError> {
        match self.rebuild().await {
            Ok(rules) => {
                self.stats.refreshed.fetch_add(1, Ordering::Relaxed);
                self.stats.rules.store(rules, Ordering::Relaxed);
                Ok(rules)
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    async fn rebuild(&self) -> Result<usize, SourceError> {
        let mut builder = S::Builder::default();
        download(self.fetcher.as_ref(), &self.url, &self.path).await?;
        load_path(&self.path, &mut builder).await?;

        let (matcher, rules) = S::build(builder);
        self.live.install(matcher);
        debug!("Installed {} rules for {}", rules, self.url);
        Ok(rules)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Zero means background refresh is disabled.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn live(&self) -> Arc<LiveMatcher<S::Key>> {
        Arc::clone(&self.live)
    }

    pub fn matcher(&self) -> Arc<dyn Matcher<S::Key>> {
        self.live.clone()
    }

    pub fn stats(&self) -> RefreshSnapshot {
        RefreshSnapshot {
            refreshed: self.stats.refreshed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            rules: self.stats.rules.load(Ordering::Relaxed),
        }
    }
}

/// Downloads into a sibling temp file and renames it over `path` once the
/// body is complete, so `path` never holds a partial download. The temp file
/// is removed on failure, and also when the download is dropped midway.
async fn download(fetcher: &dyn RuleFetcher, url: &str, path: &Path) -> Result<(), DownloadError> {
    let tmp = TempDownload::new(temp_path(path));
    fetcher.fetch(url, tmp.path()).await?;
    fs::rename(tmp.path(), path).await?;
    tmp.persisted();
    Ok(())
}

/// Removes the temp file on drop unless it was renamed into place.
struct TempDownload {
    path: PathBuf,
    persisted: bool,
}

impl TempDownload {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            persisted: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn persisted(mut self) {
        self.persisted = true;
    }
}

impl Drop for TempDownload {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        // Also reached when the download future is dropped
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                debug!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".download");
    PathBuf::from(name)
}

async fn load_path<B: RuleSink>(path: &Path, builder: &mut B) -> Result<(), SourceError> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| SourceError::Load {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
    load_text(&text, builder).map_err(|source| SourceError::Load {
        path: path.to_path_buf(),
        source,
    })
}
