use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

const WRITE_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Absolute path of the persisted file
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File too large: limit is {max_size} bytes")]
    TooLarge { max_size: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Streams `reader` into the store under `filename`, replacing any file
    /// already stored under that name. Fails with `TooLarge` as soon as the
    /// stream reaches `max_size` bytes; nothing is left behind in that case.
    async fn store_stream<'a>(
        &self,
        filename: &str,
        reader: Pin<Box<dyn AsyncRead + Send + 'a>>,
        max_size: usize,
    ) -> Result<StoredFile, StorageError>;

    fn root(&self) -> &Path;
}

/// Flat directory store keyed by the original filename
pub struct LocalStorageService {
    root: PathBuf,
}

impl LocalStorageService {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn part_path(&self) -> PathBuf {
        self.root.join(format!(".upload-{}.part", Uuid::new_v4()))
    }

    async fn write_part(
        &self,
        part_path: &Path,
        mut reader: Pin<Box<dyn AsyncRead + Send + '_>>,
        max_size: usize,
    ) -> Result<u64, StorageError> {
        let mut file = fs::File::create(part_path).await?;
        let mut buffer = vec![0u8; WRITE_BUFFER_SIZE];
        let mut total: usize = 0;

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            total += n;
            if total >= max_size {
                return Err(StorageError::TooLarge { max_size });
            }
            file.write_all(&buffer[..n]).await?;
        }

        file.flush().await?;
        Ok(total as u64)
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn store_stream<'a>(
        &self,
        filename: &str,
        reader: Pin<Box<dyn AsyncRead + Send + 'a>>,
        max_size: usize,
    ) -> Result<StoredFile, StorageError> {
        let part_path = self.part_path();
        let final_path = self.root.join(filename);

        let size = match self.write_part(&part_path, reader, max_size).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&part_path).await {
                    tracing::debug!(
                        "Could not remove partial upload {}: {}",
                        part_path.display(),
                        cleanup
                    );
                }
                return Err(e);
            }
        };

        // Same-named uploads replace each other; last rename wins.
        fs::rename(&part_path, &final_path).await?;

        Ok(StoredFile {
            path: final_path,
            size,
        })
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &'static [u8]) -> Pin<Box<dyn AsyncRead + Send + 'static>> {
        Box::pin(data)
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_store_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorageService::new(dir.path().to_path_buf());

        let first = storage
            .store_stream("resume.pdf", reader(b"%PDF-1.4 first version"), 1024)
            .await
            .unwrap();
        let second = storage
            .store_stream("resume.pdf", reader(b"%PDF-1.7 second"), 1024)
            .await
            .unwrap();

        assert_eq!(first.path, second.path);
        assert_eq!(second.size, 15);
        assert_eq!(std::fs::read(&second.path).unwrap(), b"%PDF-1.7 second");
        assert_eq!(entries(dir.path()), vec!["resume.pdf"]);
    }

    #[tokio::test]
    async fn test_limit_is_exclusive_and_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorageService::new(dir.path().to_path_buf());

        let err = storage
            .store_stream("big.pdf", reader(b"0123456789"), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { max_size: 10 }));
        assert!(entries(dir.path()).is_empty());

        let ok = storage
            .store_stream("fits.pdf", reader(b"012345678"), 10)
            .await
            .unwrap();
        assert_eq!(ok.size, 9);
    }

    #[tokio::test]
    async fn test_rejected_upload_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorageService::new(dir.path().to_path_buf());

        storage
            .store_stream("cv.docx", reader(b"old"), 10)
            .await
            .unwrap();
        assert!(
            storage
                .store_stream("cv.docx", reader(b"far too long for the limit"), 10)
                .await
                .is_err()
        );

        assert_eq!(std::fs::read(dir.path().join("cv.docx")).unwrap(), b"old");
        assert_eq!(entries(dir.path()), vec!["cv.docx"]);
    }
}
