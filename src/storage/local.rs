use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::ObjectStore;
use crate::error::StorageError;

/// Flat-directory filesystem backend; locators are bare filenames.
#[derive(Clone)]
pub struct LocalBackend {
    dir: PathBuf,
}

impl LocalBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn read(&self, name: &str) -> Result<Bytes, StorageError> {
        let path = self.dir.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalBackend {
    async fn put(&self, name: &str, body: Bytes) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, &body).await?;
        debug!(path = %path.display(), "image written");
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_creates_directory_and_read_returns_bytes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = LocalBackend::new(tmp.path().join("nested/avatars"));

        let locator = backend
            .put("1_token.jpg", Bytes::from_static(b"imagebytes"))
            .await
            .unwrap();
        assert_eq!(locator, "1_token.jpg");

        let bytes = backend.read("1_token.jpg").await.unwrap();
        assert_eq!(&bytes[..], b"imagebytes");
    }

    #[tokio::test]
    async fn read_of_absent_file_is_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = LocalBackend::new(tmp.path());
        match backend.read("missing.png").await {
            Err(StorageError::NotFound(name)) => assert_eq!(name, "missing.png"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
