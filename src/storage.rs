use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use tracing::debug;

use crate::config::S3Config;

/// Path-keyed object storage for uploaded images.
///
/// `delete_object` on a key that does not exist succeeds: callers treat an
/// already-absent object as clean.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    async fn exists(&self, key: &str) -> anyhow::Result<bool>;
}

/// Files under a root directory, one file per key.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `key` under the root, refusing anything that could escape it.
    pub fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(key);
        let clean = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        anyhow::ensure!(clean, "invalid storage key {key:?}");
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        debug!(%key, bytes = body.len(), "stored object");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(%key, "object already absent");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("stat {}", path.display()))
    }
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(cfg: &S3Config) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    // S3 DeleteObject already succeeds for missing keys.
    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(e).context("s3 head_object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_for_rejects_escaping_keys() {
        let st = LocalStorage::new("/srv/public");
        assert_eq!(
            st.path_for("uploads/a.png").unwrap(),
            PathBuf::from("/srv/public/uploads/a.png")
        );
        assert!(st.path_for("../etc/passwd").is_err());
        assert!(st.path_for("/etc/passwd").is_err());
        assert!(st.path_for("uploads/../../x").is_err());
        assert!(st.path_for("").is_err());
    }

    #[tokio::test]
    async fn local_put_exists_delete() {
        let dir = tempfile::tempdir().unwrap();
        let st = LocalStorage::new(dir.path());

        st.put_object("uploads/x.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        assert!(st.exists("uploads/x.png").await.unwrap());
        assert_eq!(
            std::fs::read(dir.path().join("uploads/x.png")).unwrap(),
            b"png"
        );

        st.delete_object("uploads/x.png").await.unwrap();
        assert!(!st.exists("uploads/x.png").await.unwrap());
        // second delete is a no-op
        st.delete_object("uploads/x.png").await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn local_delete_surfaces_unexpected_errors() {
        let dir = tempfile::tempdir().unwrap();
        let st = LocalStorage::new(dir.path());
        // a directory where a file is expected cannot be removed with remove_file
        std::fs::create_dir_all(dir.path().join("uploads/dir.png")).unwrap();
        assert!(st.delete_object("uploads/dir.png").await.is_err());
    }
}
