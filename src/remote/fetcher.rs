use crate::error::DownloadError;
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::debug;

/// Abstract downloader for mocking and switching implementations.
#[async_trait::async_trait]
pub trait RuleFetcher: Send + Sync {
    /// Downloads `url` and writes the body to `dest`, creating or truncating it.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;
}

/// Plain HTTP(S) GET: no retry, no backoff, no timeout.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, DownloadError> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl RuleFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(DownloadError::Status(resp.status()));
        }

        let stream = resp
            .bytes_stream()
            .map(|result| result.map_err(std::io::Error::other));
        let mut reader = StreamReader::new(stream);

        let mut out = File::create(dest).await?;
        let written = tokio::io::copy(&mut reader, &mut out).await?;
        out.flush().await?;

        debug!("Downloaded {} bytes from {} to {}", written, url, dest.display());
        Ok(())
    }
}
