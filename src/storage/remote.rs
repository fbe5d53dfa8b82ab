use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use reqwest::{Client, Url};
use serde_json::{json, Value};
use tracing::{debug, error};

use super::ObjectStore;
use crate::config::RemoteConfig;
use crate::error::StorageError;

/// Content-repository backend. Blobs are PUT base64-encoded under an
/// authenticated HTTP API; the locator stored for later reads is the
/// absolute download URL the API hands back.
#[derive(Clone)]
pub struct RemoteBackend {
    http: Client,
    api_base: String,
    repository: String,
    branch: String,
    token: String,
    api_host: Option<String>,
}

impl RemoteBackend {
    pub fn new(config: &RemoteConfig, http: Client) -> Self {
        let api_host = Url::parse(&config.api_base)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            repository: config.repository.clone(),
            branch: config.branch.clone(),
            token: config.token.clone(),
            api_host,
        }
    }

    /// Whether a GET for `url` should carry this backend's credentials:
    /// the host must match and a token must be configured.
    pub fn authorizes(&self, url: &Url) -> bool {
        !self.token.is_empty()
            && self.api_host.is_some()
            && url.host_str() == self.api_host.as_deref()
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

fn download_url(response: &Value) -> Option<&str> {
    response["content"]["download_url"].as_str()
}

#[async_trait]
impl ObjectStore for RemoteBackend {
    async fn put(&self, name: &str, body: Bytes) -> Result<String, StorageError> {
        let target = format!(
            "{}/repos/{}/contents/user-images/{}",
            self.api_base, self.repository, name
        );
        let payload = json!({
            "message": format!("upload {name}"),
            "content": Base64::encode_string(&body),
            "branch": self.branch,
        });

        let response = self
            .http
            .put(&target)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "content repository rejected upload");
            return Err(StorageError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        match download_url(&parsed) {
            Some(url) => {
                debug!(url, "image uploaded to content repository");
                Ok(url.to_string())
            }
            None => Err(StorageError::Backend {
                status: status.as_u16(),
                body: "no download_url in response".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(api_base: &str, token: &str) -> RemoteBackend {
        RemoteBackend::new(
            &RemoteConfig {
                api_base: api_base.into(),
                repository: "acme/assets".into(),
                branch: "main".into(),
                token: token.into(),
                timeout_secs: 5,
            },
            Client::new(),
        )
    }

    #[test]
    fn download_url_is_read_from_response_content() {
        let response = json!({
            "content": { "download_url": "https://store.example.com/raw/user-images/1_t.jpg" }
        });
        assert_eq!(
            download_url(&response),
            Some("https://store.example.com/raw/user-images/1_t.jpg")
        );
        assert_eq!(download_url(&json!({ "content": {} })), None);
        assert_eq!(download_url(&json!({})), None);
    }

    #[test]
    fn authorizes_only_matching_host_with_token() {
        let remote = backend("https://store.example.com/api", "tok");
        let same_host = Url::parse("https://store.example.com/raw/a.jpg").unwrap();
        let other_host = Url::parse("https://elsewhere.example.net/a.jpg").unwrap();
        assert!(remote.authorizes(&same_host));
        assert!(!remote.authorizes(&other_host));

        let anonymous = backend("https://store.example.com/api", "");
        assert!(!anonymous.authorizes(&same_host));
    }
}
