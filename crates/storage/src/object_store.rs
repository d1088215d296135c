//! Upload target for rendered images (S3, GCS or local directory).

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{path::Path, ObjectStore};
use tracing::{debug, info, instrument, warn};
use wave_common::config::{StorageBackend, StorageConfig};

use crate::{StorageError, StorageResult};

/// Object store client that keeps every image under one prefix.
pub struct ImageStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    /// Human-readable target for logs
    target: String,
}

impl ImageStore {
    /// Connect to the configured backend.
    ///
    /// S3 and GCS credentials are read from the environment
    /// (`AWS_*`, `GOOGLE_*`). The local backend writes below `bucket` as a
    /// directory, creating it if needed.
    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let store: Arc<dyn ObjectStore> = match config.backend {
            StorageBackend::S3 => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.with_endpoint(endpoint);
                }
                if config.allow_http {
                    builder = builder.with_allow_http(true);
                }
                let store = builder.build().map_err(|source| StorageError::Setup {
                    backend: "s3",
                    source,
                })?;
                Arc::new(store)
            }
            StorageBackend::Gcs => {
                let store = GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(&config.bucket)
                    .build()
                    .map_err(|source| StorageError::Setup {
                        backend: "gcs",
                        source,
                    })?;
                Arc::new(store)
            }
            StorageBackend::Local => {
                std::fs::create_dir_all(&config.bucket)?;
                let store = LocalFileSystem::new_with_prefix(&config.bucket).map_err(|source| {
                    StorageError::Setup {
                        backend: "local",
                        source,
                    }
                })?;
                Arc::new(store)
            }
        };

        let target = format!("{:?}:{}", config.backend, config.bucket).to_lowercase();
        Ok(Self::new(store, &config.prefix, target))
    }

    /// Store kept in memory.
    pub fn in_memory(prefix: &str) -> Self {
        Self::new(Arc::new(InMemory::new()), prefix, "memory".to_string())
    }

    fn new(store: Arc<dyn ObjectStore>, prefix: &str, target: String) -> Self {
        Self {
            store,
            prefix: prefix.trim_matches('/').to_string(),
            target,
        }
    }

    /// `{prefix}/{name}`, or just `name` without a prefix.
    pub fn object_path(&self, name: &str) -> Path {
        if self.prefix.is_empty() {
            Path::from(name)
        } else {
            Path::from(format!("{}/{}", self.prefix, name))
        }
    }

    /// Write `data` as `name`, replacing any existing object.
    #[instrument(skip(self, data), fields(target = %self.target, name = %name))]
    pub async fn put(&self, name: &str, data: Bytes) -> StorageResult<Path> {
        let location = self.object_path(name);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|source| StorageError::Object {
                operation: "write",
                path: location.to_string(),
                source,
            })?;

        Ok(location)
    }

    /// Upload a local file under its file name.
    pub async fn upload_file(&self, path: &FsPath) -> StorageResult<Path> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidName(path.display().to_string()))?;

        let data = tokio::fs::read(path).await?;
        let location = self.put(name, Bytes::from(data)).await?;
        info!(file = %path.display(), object = %location, "Uploaded");
        Ok(location)
    }

    /// Upload each file in turn. A failed upload is logged and the rest are
    /// still attempted.
    pub async fn upload_files(&self, paths: &[PathBuf]) -> Vec<(PathBuf, StorageResult<Path>)> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let result = self.upload_file(path).await;
            if let Err(e) = &result {
                warn!(file = %path.display(), error = %e, "Upload failed");
            }
            results.push((path.clone(), result));
        }
        results
    }

    /// Read an object back.
    pub async fn get(&self, name: &str) -> StorageResult<Bytes> {
        let location = self.object_path(name);
        let wrap = |source| StorageError::Object {
            operation: "read",
            path: location.to_string(),
            source,
        };

        let result = self.store.get(&location).await.map_err(wrap)?;
        result.bytes().await.map_err(wrap)
    }

    /// Check if an object exists.
    pub async fn exists(&self, name: &str) -> StorageResult<bool> {
        let location = self.object_path(name);
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(source) => Err(StorageError::Object {
                operation: "check",
                path: location.to_string(),
                source,
            }),
        }
    }

    /// Object paths below the prefix, sorted.
    pub async fn list(&self) -> StorageResult<Vec<String>> {
        use futures::TryStreamExt;

        let prefix = (!self.prefix.is_empty()).then(|| Path::from(self.prefix.as_str()));
        let mut paths: Vec<String> = self
            .store
            .list(prefix.as_ref())
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .map_err(|source| StorageError::Object {
                operation: "list",
                path: self.prefix.clone(),
                source,
            })?;

        paths.sort();
        Ok(paths)
    }
}
