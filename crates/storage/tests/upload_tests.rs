//! Image uploads against in-memory and local-directory stores.

use bytes::Bytes;
use storage::{ImageStore, StorageError};
use wave_common::config::{StorageBackend, StorageConfig};

fn local_config(root: &std::path::Path, prefix: &str) -> StorageConfig {
    StorageConfig {
        backend: StorageBackend::Local,
        bucket: root.to_string_lossy().into_owned(),
        prefix: prefix.to_string(),
        endpoint: None,
        allow_http: false,
    }
}

#[tokio::test]
async fn test_upload_places_file_under_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("45214.png");
    std::fs::write(&image, b"png bytes").unwrap();

    let store = ImageStore::in_memory("ww3");
    let location = store.upload_file(&image).await.unwrap();

    assert_eq!(location.to_string(), "ww3/45214.png");
    assert_eq!(store.get("45214.png").await.unwrap(), Bytes::from_static(b"png bytes"));
}

#[tokio::test]
async fn test_upload_replaces_existing_object() {
    let store = ImageStore::in_memory("ww3");
    store.put("CHII2.png", Bytes::from_static(b"old")).await.unwrap();
    store.put("CHII2.png", Bytes::from_static(b"new")).await.unwrap();

    assert_eq!(store.get("CHII2.png").await.unwrap(), Bytes::from_static(b"new"));
    assert_eq!(store.list().await.unwrap(), vec!["ww3/CHII2.png"]);
}

#[tokio::test]
async fn test_exists() {
    let store = ImageStore::in_memory("");
    assert!(!store.exists("KNSW3.png").await.unwrap());
    store.put("KNSW3.png", Bytes::from_static(b"x")).await.unwrap();
    assert!(store.exists("KNSW3.png").await.unwrap());
}

#[tokio::test]
async fn test_missing_file_does_not_stop_others() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("MLWW3.png");
    std::fs::write(&present, b"x").unwrap();
    let missing = dir.path().join("MCYI3.png");

    let store = ImageStore::in_memory("ww3");
    let results = store.upload_files(&[missing.clone(), present.clone()]).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, missing);
    assert!(matches!(results[0].1, Err(StorageError::Io(_))));
    assert!(results[1].1.is_ok());
    assert_eq!(store.list().await.unwrap(), vec!["ww3/MLWW3.png"]);
}

#[tokio::test]
async fn test_local_backend_writes_below_root() {
    let root = tempfile::tempdir().unwrap();
    let bucket = root.path().join("site");
    let source = tempfile::tempdir().unwrap();
    let image = source.path().join("45214.png");
    std::fs::write(&image, b"chart").unwrap();

    let store = ImageStore::from_config(&local_config(&bucket, "images")).unwrap();
    store.upload_file(&image).await.unwrap();

    let written = std::fs::read(bucket.join("images").join("45214.png")).unwrap();
    assert_eq!(written, b"chart");
}
