use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::settings::FetchSettings;

/// A recording made available on the local filesystem for one analysis run.
/// Downloaded copies are deleted when this value is dropped.
#[derive(Debug)]
pub struct FetchedRecording {
    path: PathBuf,
    temporary: bool,
}

impl FetchedRecording {
    pub fn local(path: PathBuf) -> Self {
        Self {
            path,
            temporary: false,
        }
    }

    pub fn temporary(path: PathBuf) -> Self {
        Self {
            path,
            temporary: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

impl Drop for FetchedRecording {
    fn drop(&mut self) {
        if !self.temporary {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(target: "app::fetch", path = %self.path.display(), "removed downloaded recording")
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                target: "app::fetch",
                path = %self.path.display(),
                error = %err,
                "failed to remove downloaded recording"
            ),
        }
    }
}

#[async_trait]
pub trait RecordingFetcher: Send + Sync {
    /// Makes `source_ref` readable locally. Every failure is
    /// [`AppError::SourceUnavailable`].
    async fn fetch(&self, source_ref: &str) -> AppResult<FetchedRecording>;
}

/// Downloads `http(s)` sources into a work directory; accepts existing local
/// paths as they are.
#[derive(Debug, Clone)]
pub struct HttpRecordingFetcher {
    client: Client,
    work_dir: PathBuf,
    timeout: Duration,
}

impl HttpRecordingFetcher {
    pub fn new(settings: &FetchSettings) -> AppResult<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs.max(1));
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|err| AppError::other(format!("failed to build HTTP client: {err}")))?;

        let work_dir = settings
            .work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("oratoria"));

        Ok(Self {
            client,
            work_dir,
            timeout,
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    async fn download(&self, url: &Url, target: &Path) -> AppResult<()> {
        let source = url.as_str();
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| AppError::source_unavailable(source, format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::source_unavailable(
                source,
                format!("server answered {status}"),
            ));
        }

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|err| AppError::source_unavailable(source, format!("work dir: {err}")))?;
        let mut file = File::create(target)
            .await
            .map_err(|err| AppError::source_unavailable(source, format!("create file: {err}")))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| AppError::source_unavailable(source, format!("read body: {err}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|err| AppError::source_unavailable(source, format!("write: {err}")))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|err| AppError::source_unavailable(source, format!("flush: {err}")))?;

        if written == 0 {
            return Err(AppError::source_unavailable(source, "empty response body"));
        }

        info!(target: "app::fetch", url = %source, bytes = written, "recording downloaded");
        Ok(())
    }
}

fn extension_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .unwrap_or("mp4")
        .to_ascii_lowercase()
}

#[async_trait]
impl RecordingFetcher for HttpRecordingFetcher {
    async fn fetch(&self, source_ref: &str) -> AppResult<FetchedRecording> {
        let source_ref = source_ref.trim();
        if source_ref.is_empty() {
            return Err(AppError::source_unavailable(source_ref, "empty source reference"));
        }

        let url = match Url::parse(source_ref) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => {
                let path = PathBuf::from(source_ref);
                if tokio::fs::metadata(&path).await.is_ok_and(|meta| meta.is_file()) {
                    debug!(target: "app::fetch", path = %path.display(), "using local recording");
                    return Ok(FetchedRecording::local(path));
                }
                return Err(AppError::source_unavailable(
                    source_ref,
                    "not an http(s) URL and no such local file",
                ));
            }
        };

        let target = self
            .work_dir
            .join(format!("{}.{}", Uuid::new_v4(), extension_for(&url)));
        // dropping the guard removes a partial download on any failure path
        let recording = FetchedRecording::temporary(target);

        match tokio::time::timeout(self.timeout, self.download(&url, recording.path())).await {
            Ok(Ok(())) => Ok(recording),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(AppError::source_unavailable(
                source_ref,
                format!("download timed out after {}s", self.timeout.as_secs()),
            )),
        }
    }
}
