//! Revision publisher: uploads the archive, then confirms it is retrievable.
//!
//! The store call returning is not enough: the orchestrator fetches the
//! object on its own, so the publisher polls existence until the object is
//! visible or the confirmation ceiling is reached.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cdship_core::{BackendError, ObjectStore, Revision, ShipConfig, Shutdown};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("cannot read archive {}: {source}", path.display())]
    ReadArchive {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("upload failed: {0}")]
    UploadFailed(#[source] BackendError),
    #[error("s3://{bucket}/{key} not retrievable after {}s", waited.as_secs())]
    ConfirmationTimeout {
        bucket: String,
        key: String,
        waited: Duration,
    },
    #[error("publishing cancelled")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    /// Pause between existence probes.
    pub confirm_interval: Duration,
    /// Give up confirming after this long.
    pub confirm_timeout: Duration,
}

impl PublishSettings {
    pub fn from_config(config: &ShipConfig) -> Self {
        Self {
            confirm_interval: config.confirm_interval(),
            confirm_timeout: config.confirm_timeout(),
        }
    }
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            confirm_interval: Duration::from_secs(5),
            confirm_timeout: Duration::from_secs(300),
        }
    }
}

pub struct RevisionPublisher<'a> {
    store: &'a dyn ObjectStore,
    settings: PublishSettings,
}

impl<'a> RevisionPublisher<'a> {
    pub fn new(store: &'a dyn ObjectStore, settings: PublishSettings) -> Self {
        Self { store, settings }
    }

    /// Upload `archive_path` to `bucket`/`key` and wait until it is readable.
    pub async fn publish(
        &self,
        archive_path: &Path,
        bucket: &str,
        key: &str,
        shutdown: &mut Shutdown,
    ) -> Result<Revision, PublishError> {
        if shutdown.is_triggered() {
            return Err(PublishError::Cancelled);
        }
        let body = tokio::fs::read(archive_path)
            .await
            .map_err(|source| PublishError::ReadArchive {
                path: archive_path.to_path_buf(),
                source,
            })?;

        info!(bucket, key, bytes = body.len(), "uploading revision");
        let stored = self
            .store
            .put_object(bucket, key, body)
            .await
            .map_err(PublishError::UploadFailed)?;
        debug!(etag = %stored.etag, url = %stored.url, "upload accepted");

        self.wait_until_exists(bucket, key, shutdown).await?;

        Ok(Revision {
            bucket: bucket.to_string(),
            key: key.to_string(),
            etag: stored.etag,
            url: stored.url,
        })
    }

    async fn wait_until_exists(
        &self,
        bucket: &str,
        key: &str,
        shutdown: &mut Shutdown,
    ) -> Result<(), PublishError> {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.store.object_exists(bucket, key).await {
                Ok(true) => {
                    info!(bucket, key, attempts, "revision confirmed");
                    return Ok(());
                }
                Ok(false) => debug!(bucket, key, attempts, "revision not visible yet"),
                Err(e) => warn!(bucket, key, error = %e, "existence probe failed"),
            }

            if started.elapsed() >= self.settings.confirm_timeout {
                return Err(PublishError::ConfirmationTimeout {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    waited: self.settings.confirm_timeout,
                });
            }
            if !shutdown.sleep(self.settings.confirm_interval).await {
                return Err(PublishError::Cancelled);
            }
        }
    }
}
