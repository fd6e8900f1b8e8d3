// # File State Store
//
// File-based implementation of StateStore.
//
// ## File format
//
// The entire file content is the last authorized CIDR, plain text:
//
// ```text
// 203.0.113.5/32
// ```
//
// A trailing newline is tolerated on read. Writes go to a temporary file in
// the same directory followed by a rename, so a crash mid-write cannot leave
// a truncated state file behind.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::state_store::StateStore;
use async_trait::async_trait;

/// File-based state store
///
/// # Example
///
/// ```rust,no_run
/// use sgsync_core::state::FileStateStore;
/// use sgsync_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/home/op/.aws/lastip");
///
///     store.set_last_cidr("203.0.113.5/32").await?;
///     assert_eq!(
///         store.get_last_cidr().await?,
///         Some("203.0.113.5/32".to_string())
///     );
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by the given path
    ///
    /// The file itself is created lazily on the first write; a missing file
    /// reads as "no state yet".
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path this store writes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get path to the temporary file used for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_last_cidr(&self) -> Result<Option<String>, Error> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => {
                let cidr = content.trim();
                if cidr.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(cidr.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("state file does not exist: {}", self.path.display());
                Ok(None)
            }
            Err(e) => Err(Error::storage(format!(
                "failed to read state file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn set_last_cidr(&self, cidr: &str) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::storage(format!(
                        "failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        // Write to a temporary file first, then rename over the real path.
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::storage(format!(
                    "failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(cidr.as_bytes()).await.map_err(|e| {
                Error::storage(format!(
                    "failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::storage(format!(
                    "failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::storage(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("state written to {}", self.path.display());
        Ok(())
    }
}
