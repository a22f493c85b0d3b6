//! Object store backends for published clips.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mixcut_common::config::StorageConfig;

use crate::error::{RenderError, RenderResult};

/// Folder finished clips are published under.
pub const GENERATED_FOLDER: &str = "generated";

/// Publishes bytes and returns a public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bytes: Vec<u8>, content_type: &str, folder: &str) -> RenderResult<String>;
}

/// Build the configured object store.
pub fn object_store_from_config(config: &StorageConfig) -> RenderResult<Arc<dyn ObjectStore>> {
    Ok(match config {
        StorageConfig::Local {
            root,
            public_base_url,
        } => Arc::new(LocalObjectStore::new(root.clone(), public_base_url.clone())),
        StorageConfig::Http {
            endpoint,
            public_base_url,
            bearer_token,
        } => Arc::new(HttpObjectStore::new(
            endpoint.clone(),
            public_base_url.clone(),
            bearer_token.clone(),
        )?),
    })
}

/// `<folder>/<uuid><ext>` for a new object.
pub fn object_key(folder: &str, content_type: &str) -> String {
    let folder = folder.trim_matches('/');
    let id = uuid::Uuid::new_v4();
    format!("{folder}/{id}{}", extension_for(content_type))
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        "audio/mpeg" => ".mp3",
        "audio/wav" | "audio/x-wav" => ".wav",
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        _ => "",
    }
}

fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// Objects written into a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self {
            root,
            public_base_url,
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, bytes: Vec<u8>, content_type: &str, folder: &str) -> RenderResult<String> {
        let key = object_key(folder, content_type);
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RenderError::upload(format!("{}: {e}", parent.display())))?;
        }
        let size = bytes.len();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| RenderError::upload(format!("{}: {e}", path.display())))?;

        let url = join_url(&self.public_base_url, &key);
        tracing::info!(%url, size, "Stored object locally");
        Ok(url)
    }
}

/// Objects uploaded with HTTP PUT (S3-compatible presigned or open buckets, MinIO, nginx dav).
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    public_base_url: String,
    bearer_token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(
        endpoint: String,
        public_base_url: String,
        bearer_token: Option<String>,
    ) -> RenderResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mixcut/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RenderError::upload(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            public_base_url,
            bearer_token,
        })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, bytes: Vec<u8>, content_type: &str, folder: &str) -> RenderResult<String> {
        let key = object_key(folder, content_type);
        let target = join_url(&self.endpoint, &key);
        let size = bytes.len();

        let mut request = self
            .client
            .put(&target)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RenderError::upload(format!("PUT {target}: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RenderError::upload(format!(
                "PUT {target} returned {status}: {}",
                body.trim()
            )));
        }

        let url = join_url(&self.public_base_url, &key);
        tracing::info!(%url, size, "Uploaded object");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_uses_folder_and_extension() {
        let key = object_key("/generated/", "video/mp4");
        assert!(key.starts_with("generated/"));
        assert!(key.ends_with(".mp4"));
        assert!(!object_key("x", "application/octet-stream").contains('.'));
    }

    #[test]
    fn test_join_url_avoids_double_slash() {
        assert_eq!(
            join_url("https://cdn.example.com/", "generated/a.mp4"),
            "https://cdn.example.com/generated/a.mp4"
        );
    }

    #[tokio::test]
    async fn test_local_store_writes_under_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf(), "https://cdn.test".to_string());

        let url = store
            .put(b"clip".to_vec(), "video/mp4", GENERATED_FOLDER)
            .await
            .unwrap();

        let key = url.strip_prefix("https://cdn.test/").unwrap();
        assert!(key.starts_with("generated/"));
        assert_eq!(std::fs::read(dir.path().join(key)).unwrap(), b"clip");
    }

    #[tokio::test]
    async fn test_unreachable_http_store_is_upload_error() {
        let store = HttpObjectStore::new(
            "http://127.0.0.1:9/bucket".to_string(),
            "https://cdn.test".to_string(),
            None,
        )
        .unwrap();
        let err = store
            .put(b"clip".to_vec(), "video/mp4", GENERATED_FOLDER)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Upload { .. }));
    }
}
