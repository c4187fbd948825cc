//! Local filesystem storage backend
//!
//! Payloads live directly under the upload directory, one file per
//! document, named by the caller. Writes go through a temp file and a
//! rename so a crashed upload never leaves a truncated document behind.
//! Every disk operation is bounded by the configured I/O timeout.

use async_trait::async_trait;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::core::config::StorageConfig;
use crate::core::error::AppError;

/// Storage backend for raw document bytes.
///
/// Locations are the opaque strings returned by [`StorageBackend::write`]
/// and persisted alongside the metadata row.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Persist `data` under `name` and return its location.
    async fn write(&self, name: &str, data: &[u8]) -> Result<String, AppError>;

    /// Open the payload at `location` for streaming.
    async fn open(&self, location: &str) -> Result<fs::File, AppError>;

    /// Remove the payload at `location`. Returns `false` if nothing was there.
    async fn delete(&self, location: &str) -> Result<bool, AppError>;

    /// Check whether a payload exists at `location`.
    async fn exists(&self, location: &str) -> Result<bool, AppError>;
}

/// Filesystem storage rooted at the upload directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    upload_dir: PathBuf,
    io_timeout: Duration,
}

impl LocalStorage {
    pub fn new(upload_dir: impl Into<PathBuf>, io_timeout: Duration) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            io_timeout,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.upload_dir.clone(), config.io_timeout)
    }

    #[cfg(test)]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Create the upload directory if it does not exist yet
    pub async fn ensure_upload_dir_exists(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.upload_dir).await?;
        info!("Upload directory ready: {}", self.upload_dir.display());
        Ok(())
    }

    fn location_for(&self, name: &str) -> PathBuf {
        self.upload_dir.join(name)
    }

    async fn bounded<T, F>(&self, operation: &str, location: &Path, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = std::io::Result<T>>,
    {
        match tokio::time::timeout(self.io_timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(self.timeout_error(operation, location)),
        }
    }

    fn timeout_error(&self, operation: &str, location: &Path) -> AppError {
        AppError::Timeout(format!(
            "{} {} exceeded {:?}",
            operation,
            location.display(),
            self.io_timeout
        ))
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut temp_path = target.as_os_str().to_owned();
    temp_path.push(".part");
    PathBuf::from(temp_path)
}

async fn write_atomically(target: PathBuf, data: Vec<u8>) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = part_path(&target);
    let result = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &target).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&temp_path).await;
    }
    result
}

/// Remove both the payload and its temp file left by an abandoned write
async fn discard_abandoned_write(target: &Path) {
    for path in [part_path(target), target.to_path_buf()] {
        match fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "local_storage: discarded abandoned write"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "local_storage: failed to discard abandoned write"),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn write(&self, name: &str, data: &[u8]) -> Result<String, AppError> {
        let target = self.location_for(name);
        debug!(path = %target.display(), size = data.len(), "local_storage: write");

        // Detached so the blocking work can be awaited and undone after a timeout
        let mut task = tokio::spawn(write_atomically(target.clone(), data.to_vec()));

        let outcome = match tokio::time::timeout(self.io_timeout, &mut task).await {
            Ok(Ok(result)) => result.map_err(AppError::from),
            Ok(Err(e)) => Err(AppError::Internal(format!(
                "write task for {} failed: {}",
                target.display(),
                e
            ))),
            Err(_) => {
                let abandoned = target.clone();
                tokio::spawn(async move {
                    let _ = task.await;
                    discard_abandoned_write(&abandoned).await;
                });
                Err(self.timeout_error("write", &target))
            }
        };

        outcome.inspect_err(
            |e| warn!(path = %target.display(), error = %e, "local_storage: write failed"),
        )?;

        Ok(target.to_string_lossy().into_owned())
    }

    async fn open(&self, location: &str) -> Result<fs::File, AppError> {
        let path = Path::new(location);
        self.bounded("open", path, fs::File::open(path)).await
    }

    async fn delete(&self, location: &str) -> Result<bool, AppError> {
        let path = Path::new(location);
        let removed = self
            .bounded("remove", path, async {
                match fs::remove_file(path).await {
                    Ok(()) => Ok(true),
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                    Err(e) => Err(e),
                }
            })
            .await?;

        debug!(path = %location, removed, "local_storage: delete");
        Ok(removed)
    }

    async fn exists(&self, location: &str) -> Result<bool, AppError> {
        let path = Path::new(location);
        self.bounded("stat", path, fs::try_exists(path)).await
    }
}
