//! Destination files that only become visible once fully written.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{Result, TRACING_TARGET_RETRIEVE, WorkerError};

/// A file written to a hidden sibling and renamed into place on commit.
///
/// Dropping the file without committing removes the temporary sibling.
#[derive(Debug)]
pub struct AtomicFile {
    file: File,
    temp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl AtomicFile {
    /// Creates the parent directories of `path` and opens a temporary sibling for writing.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let final_path = path.into();
        let parent = parent_dir(&final_path);
        let file_name = final_path
            .file_name()
            .ok_or_else(|| {
                WorkerError::io(
                    &final_path,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
                )
            })?
            .to_string_lossy()
            .into_owned();

        fs::create_dir_all(&parent)
            .await
            .map_err(|e| WorkerError::io(&parent, e))?;

        let temp_path = parent.join(format!(".{}.{}.partial", file_name, Uuid::new_v4()));
        let file = File::create(&temp_path)
            .await
            .map_err(|e| WorkerError::io(&temp_path, e))?;

        Ok(Self {
            file,
            temp_path,
            final_path,
            committed: false,
        })
    }

    /// Returns the writer for the temporary file.
    #[inline]
    pub fn writer(&mut self) -> &mut File {
        &mut self.file
    }

    /// Returns the path of the temporary file.
    #[inline]
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Flushes and syncs the content, renames it into place, and syncs the parent directory.
    pub async fn commit(mut self) -> Result<PathBuf> {
        self.file
            .flush()
            .await
            .map_err(|e| WorkerError::io(&self.temp_path, e))?;
        self.file
            .sync_all()
            .await
            .map_err(|e| WorkerError::io(&self.temp_path, e))?;

        fs::rename(&self.temp_path, &self.final_path)
            .await
            .map_err(|e| WorkerError::io(&self.final_path, e))?;
        self.committed = true;

        sync_dir(&parent_dir(&self.final_path)).await?;
        Ok(self.final_path.clone())
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        match std::fs::remove_file(&self.temp_path) {
            Ok(()) => {
                tracing::debug!(
                    target: TRACING_TARGET_RETRIEVE,
                    path = %self.temp_path.display(),
                    "Removed partial file"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET_RETRIEVE,
                    path = %self.temp_path.display(),
                    error = %e,
                    "Failed to remove partial file"
                );
            }
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<()> {
    let handle = File::open(dir).await.map_err(|e| WorkerError::io(dir, e))?;
    handle.sync_all().await.map_err(|e| WorkerError::io(dir, e))
}

// Directories cannot be opened for syncing on this platform.
#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_makes_file_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.csv");

        let mut file = AtomicFile::create(&path).await.unwrap();
        let temp = file.temp_path().to_path_buf();
        file.writer().write_all(b"0123456789").await.unwrap();
        assert!(!path.exists());
        assert!(temp.exists());

        let committed = file.commit().await.unwrap();
        assert_eq!(committed, path);
        assert_eq!(std::fs::read(&path).unwrap(), b"0123456789");
        assert!(!temp.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        let mut file = AtomicFile::create(&path).await.unwrap();
        file.writer().write_all(b"01234").await.unwrap();
        drop(file);

        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_commit_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        std::fs::write(&path, b"stale").unwrap();

        let mut file = AtomicFile::create(&path).await.unwrap();
        file.writer().write_all(b"fresh").await.unwrap();
        file.commit().await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"fresh");
    }
}
