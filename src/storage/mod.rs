mod local;
mod remote;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use tracing::warn;

use crate::config::{BackendKind, StorageConfig};
use crate::error::StorageError;

/// Write side of an asset backend; returns the locator to persist on the
/// owning record.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, name: &str, body: Bytes) -> Result<String, StorageError>;
}

/// True when a locator is an absolute URL rather than a bare filename.
pub fn is_url_locator(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// Persists avatars through the configured backend and resolves stored
/// locators by their shape: absolute URLs go over HTTP, bare names hit
/// the local directory. Locators written under a previously configured
/// backend keep resolving after a switch.
pub struct AvatarStore {
    writer: Arc<dyn ObjectStore>,
    local: LocalBackend,
    remote: Option<RemoteBackend>,
    http: reqwest::Client,
}

impl AvatarStore {
    pub fn new(config: &StorageConfig) -> anyhow::Result<Self> {
        let timeout_secs = config.remote.as_ref().map(|r| r.timeout_secs).unwrap_or(30);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let local = LocalBackend::new(config.local_dir.clone());
        let remote = config
            .remote
            .as_ref()
            .map(|r| RemoteBackend::new(r, http.clone()));

        let writer: Arc<dyn ObjectStore> = match config.backend {
            BackendKind::Local => Arc::new(local.clone()),
            BackendKind::Remote => Arc::new(remote.clone().ok_or_else(|| {
                anyhow::anyhow!("remote backend selected but not configured")
            })?),
        };

        Ok(Self {
            writer,
            local,
            remote,
            http,
        })
    }

    /// Store a blob under `name`, returning the locator to persist.
    pub async fn put(&self, name: &str, body: Bytes) -> Result<String, StorageError> {
        if body.is_empty() {
            return Err(StorageError::EmptyUpload);
        }
        self.writer.put(name, body).await
    }

    /// Resolve a stored locator to its bytes.
    pub async fn get(&self, locator: &str) -> Result<Bytes, StorageError> {
        if is_url_locator(locator) {
            self.fetch_url(locator).await
        } else {
            self.local.read(locator).await
        }
    }

    async fn fetch_url(&self, locator: &str) -> Result<Bytes, StorageError> {
        let url = Url::parse(locator).map_err(|e| StorageError::Fetch(e.to_string()))?;
        let mut request = self.http.get(url.clone());
        if let Some(remote) = &self.remote {
            if remote.authorizes(&url) {
                request = request.bearer_auth(remote.token());
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Fetch(e.to_string()))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(locator.to_string()));
        }
        if !status.is_success() {
            warn!(%status, locator, "image fetch rejected");
            return Err(StorageError::Fetch(format!("unexpected status {status}")));
        }
        response
            .bytes()
            .await
            .map_err(|e| StorageError::Fetch(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::config::RemoteConfig;

    fn local_config(dir: &Path) -> StorageConfig {
        StorageConfig {
            backend: BackendKind::Local,
            local_dir: dir.to_path_buf(),
            remote: None,
        }
    }

    fn remote_config(dir: &Path) -> StorageConfig {
        StorageConfig {
            backend: BackendKind::Remote,
            local_dir: dir.to_path_buf(),
            // port 9 is discard; nothing in these tests ever connects to it
            remote: Some(RemoteConfig {
                api_base: "http://127.0.0.1:9".into(),
                repository: "acme/assets".into(),
                branch: "main".into(),
                token: "tok".into(),
                timeout_secs: 2,
            }),
        }
    }

    #[test]
    fn locator_shape_detection() {
        assert!(is_url_locator("https://store.example.com/raw/a.jpg"));
        assert!(is_url_locator("http://127.0.0.1:8080/a.jpg"));
        assert!(!is_url_locator("42_5bf1a7c0.jpg"));
        assert!(!is_url_locator(""));
    }

    #[tokio::test]
    async fn local_put_and_get_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = AvatarStore::new(&local_config(tmp.path())).unwrap();

        let locator = store
            .put("7_abc.png", Bytes::from_static(b"pngbytes"))
            .await
            .unwrap();
        assert_eq!(locator, "7_abc.png");

        let bytes = store.get(&locator).await.unwrap();
        assert_eq!(&bytes[..], b"pngbytes");
    }

    #[tokio::test]
    async fn empty_payload_is_rejected_before_any_backend() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = AvatarStore::new(&local_config(tmp.path())).unwrap();
        match store.put("7_abc.png", Bytes::new()).await {
            Err(StorageError::EmptyUpload) => {}
            other => panic!("expected EmptyUpload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bare_locators_resolve_locally_even_with_remote_backend_active() {
        let tmp = tempfile::TempDir::new().unwrap();

        let writer = AvatarStore::new(&local_config(tmp.path())).unwrap();
        let locator = writer
            .put("3_old.jpg", Bytes::from_static(b"legacy"))
            .await
            .unwrap();

        // new uploads would go remote, old bare-name locators must keep working
        let switched = AvatarStore::new(&remote_config(tmp.path())).unwrap();
        let bytes = switched.get(&locator).await.unwrap();
        assert_eq!(&bytes[..], b"legacy");
    }

    #[tokio::test]
    async fn missing_local_file_is_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = AvatarStore::new(&local_config(tmp.path())).unwrap();
        match store.get("gone.jpg").await {
            Err(StorageError::NotFound(name)) => assert_eq!(name, "gone.jpg"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    async fn serve_once(status_line: &'static str, body: Vec<u8>) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "{status_line}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn url_locators_fetch_over_http() {
        let addr = serve_once("HTTP/1.1 200 OK", b"jpegbytes".to_vec()).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let store = AvatarStore::new(&local_config(tmp.path())).unwrap();

        let bytes = store
            .get(&format!("http://{addr}/user-images/5_x.jpg"))
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"jpegbytes");
    }

    #[tokio::test]
    async fn url_locator_404_maps_to_not_found() {
        let addr = serve_once("HTTP/1.1 404 Not Found", Vec::new()).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let store = AvatarStore::new(&local_config(tmp.path())).unwrap();

        let locator = format!("http://{addr}/user-images/5_x.jpg");
        match store.get(&locator).await {
            Err(StorageError::NotFound(l)) => assert_eq!(l, locator),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
