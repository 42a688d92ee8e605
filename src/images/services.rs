use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::storage::StorageClient;

/// An image file received in a request, not yet stored.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

pub const UPLOAD_PREFIX: &str = "uploads";

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Fallback for clients that send `application/octet-stream`.
pub(crate) fn mime_from_file_name(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Checks the upload is an image we accept and returns its storage extension.
pub fn check_upload(item: &UploadItem) -> AppResult<&'static str> {
    if item.body.is_empty() {
        return Err(AppError::BadRequest("image is empty".into()));
    }
    ext_from_mime(&item.content_type).ok_or_else(|| {
        AppError::BadRequest(format!("unsupported image type {}", item.content_type))
    })
}

/// Writes the upload under a fresh key and returns that key.
pub async fn store_image(storage: &dyn StorageClient, item: UploadItem) -> AppResult<String> {
    let ext = check_upload(&item)?;
    let key = format!("{}/{}.{}", UPLOAD_PREFIX, Uuid::new_v4(), ext);
    storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))
        .map_err(AppError::Storage)?;
    info!(%key, "image stored");
    Ok(key)
}

/// Removes a stored image. Already-absent images count as removed.
pub async fn remove_image(storage: &dyn StorageClient, key: &str) -> AppResult<()> {
    if key.is_empty() {
        return Ok(());
    }
    storage
        .delete_object(key)
        .await
        .with_context(|| format!("delete_object {}", key))
        .map_err(AppError::Storage)?;
    info!(%key, "image removed");
    Ok(())
}

/// Cleanup after a failed request: the original error wins, a second failure is only logged.
pub(crate) async fn discard_image(storage: &dyn StorageClient, key: &str) {
    if let Err(e) = remove_image(storage, key).await {
        warn!(error = %e, %key, "could not discard uploaded image");
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::storage::LocalStorage;

    fn png(body: &'static [u8]) -> UploadItem {
        UploadItem {
            body: Bytes::from_static(body),
            content_type: "image/png".into(),
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/gif"), Some("gif"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("whatever/else"), None);
    }

    #[test]
    fn test_mime_from_file_name() {
        assert_eq!(mime_from_file_name("me.JPEG"), Some("image/jpeg"));
        assert_eq!(mime_from_file_name("avatar.png"), Some("image/png"));
        assert_eq!(mime_from_file_name("notes.txt"), None);
        assert_eq!(mime_from_file_name("noext"), None);
    }

    #[test]
    fn check_upload_rejects_empty_and_non_images() {
        assert!(matches!(check_upload(&png(b"")), Err(AppError::BadRequest(_))));
        let mut text = png(b"hello");
        text.content_type = "text/plain".into();
        assert!(matches!(check_upload(&text), Err(AppError::BadRequest(_))));
        assert_eq!(check_upload(&png(b"x")).unwrap(), "png");
    }

    #[tokio::test]
    async fn store_then_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let key = store_image(&storage, png(b"\x89PNG")).await.unwrap();
        assert!(key.starts_with("uploads/") && key.ends_with(".png"));
        assert!(storage.exists(&key).await.unwrap());

        remove_image(&storage, &key).await.unwrap();
        assert!(!storage.exists(&key).await.unwrap());
        remove_image(&storage, &key).await.unwrap();
        remove_image(&storage, "").await.unwrap();
    }

    #[tokio::test]
    async fn remove_image_surfaces_bad_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let err = remove_image(&storage, "../outside.png").await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
