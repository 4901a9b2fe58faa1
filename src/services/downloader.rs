use crate::config::UploaderConfig;
use crate::error::DownloadError;
use crate::services::download_registry::DownloadRegistry;
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

/// Downloads remote files to local temporary paths, refusing to start a
/// second download of a URL that is already in flight.
pub struct Downloader {
    client: Client,
    registry: Arc<DownloadRegistry>,
    download_dir: PathBuf,
}

impl Downloader {
    pub fn new(client: Client, registry: Arc<DownloadRegistry>, download_dir: PathBuf) -> Self {
        Self {
            client,
            registry,
            download_dir,
        }
    }

    pub fn from_config(
        config: &UploaderConfig,
        registry: Arc<DownloadRegistry>,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()?;
        Ok(Self::new(client, registry, config.download_dir.clone()))
    }

    pub fn registry(&self) -> &Arc<DownloadRegistry> {
        &self.registry
    }

    pub async fn download(&self, url: &Url) -> Result<PathBuf, DownloadError> {
        self.download_with_cancel(url, &CancellationToken::new()).await
    }

    /// Download `url` into the download directory and return the local path.
    ///
    /// The caller owns the returned file. The URL is released from the
    /// registry on every exit path.
    pub async fn download_with_cancel(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        let _guard = self
            .registry
            .acquire(url)
            .ok_or_else(|| DownloadError::AlreadyInFlight(url.clone()))?;

        let destination = self.download_dir.join(download_filename(url));
        tracing::info!("Downloading {} to {}", url, destination.display());

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(DownloadError::Cancelled),
            res = self.fetch(url, &destination) => res,
        };

        match result {
            Ok(bytes) => {
                tracing::info!("Downloaded {} bytes from {}", bytes, url);
                Ok(destination)
            }
            Err(e) => {
                tracing::error!("Download of {} failed: {}", url, e);
                if let Err(rm) = tokio::fs::remove_file(&destination).await {
                    tracing::debug!("No partial download to remove: {}", rm);
                }
                Err(e)
            }
        }
    }

    async fn fetch(&self, url: &Url, destination: &Path) -> Result<u64, DownloadError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut total = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            total += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(total)
    }
}

/// Unique local file name for a download, keeping the remote extension.
pub fn download_filename(url: &Url) -> String {
    let extension = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("tmp");

    format!("{}.{}", Uuid::new_v4().to_string().to_uppercase(), extension)
}
