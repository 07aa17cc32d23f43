//! Remote store sessions backed by `object_store`

use crate::config::{RemoteConfig, RemoteProvider};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{ClientOptions, ObjectStore, path::Path as StoragePath};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote connection failed: {0}")]
    Connect(String),

    #[error("Object store error: {0}")]
    Store(#[from] object_store::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens sessions against the configured remote store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn open_session(
        &self,
        config: &RemoteConfig,
    ) -> Result<Box<dyn RemoteSession>, RemoteError>;
}

/// One connected session; paths are relative to the configured remote root
#[async_trait]
pub trait RemoteSession: Send {
    /// Create `dir` (and missing parents). An existing directory is not an error.
    async fn ensure_dir(&mut self, dir: &str) -> Result<(), RemoteError>;

    /// Store `data` at `path`, returning once the store acknowledged it.
    async fn put(&mut self, path: &str, data: Bytes) -> Result<(), RemoteError>;

    async fn close(self: Box<Self>) -> Result<(), RemoteError>;
}

/// [`RemoteStore`] over the `object_store` backends
#[derive(Debug, Clone)]
pub struct ObjectStoreRemote {
    memory: Arc<InMemory>,
}

impl Default for ObjectStoreRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStoreRemote {
    pub fn new() -> Self {
        Self {
            memory: Arc::new(InMemory::new()),
        }
    }

    /// Backing store of the `memory` provider, shared by all its sessions
    pub fn memory(&self) -> Arc<InMemory> {
        Arc::clone(&self.memory)
    }

    fn open_local(config: &RemoteConfig) -> Result<ObjectStoreSession, RemoteError> {
        let root = PathBuf::from(&config.remote_root);
        std::fs::create_dir_all(&root)?;
        let store = LocalFileSystem::new_with_prefix(&root)?;

        Ok(ObjectStoreSession {
            store: Arc::new(store),
            prefix: String::new(),
            local_root: Some(root),
        })
    }

    async fn open_s3(config: &RemoteConfig) -> Result<ObjectStoreSession, RemoteError> {
        let options = ClientOptions::new()
            .with_connect_timeout(config.connect_timeout())
            .with_timeout(config.request_timeout());

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(DEFAULT_REGION)
            .with_client_options(options);

        if !config.user.is_empty() {
            builder = builder
                .with_access_key_id(&config.user)
                .with_secret_access_key(&config.password);
        }
        if let Some(endpoint) = endpoint(config) {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| RemoteError::Connect(e.to_string()))?;

        let prefix = normalize_root(&config.remote_root);
        // listing the root proves the endpoint is reachable and the keys work
        let probe = (!prefix.is_empty()).then(|| StoragePath::from(prefix.as_str()));
        store
            .list_with_delimiter(probe.as_ref())
            .await
            .map_err(|e| RemoteError::Connect(e.to_string()))?;

        Ok(ObjectStoreSession {
            store: Arc::new(store),
            prefix,
            local_root: None,
        })
    }
}

#[async_trait]
impl RemoteStore for ObjectStoreRemote {
    async fn open_session(
        &self,
        config: &RemoteConfig,
    ) -> Result<Box<dyn RemoteSession>, RemoteError> {
        let session = match config.provider {
            RemoteProvider::Local => Self::open_local(config)?,
            RemoteProvider::S3 => Self::open_s3(config).await?,
            RemoteProvider::Memory => ObjectStoreSession {
                store: self.memory(),
                prefix: normalize_root(&config.remote_root),
                local_root: None,
            },
        };

        info!(provider = ?config.provider, root = %config.remote_root, "Remote session opened");
        Ok(Box::new(session))
    }
}

struct ObjectStoreSession {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    /// Set for the filesystem provider, where directories are real
    local_root: Option<PathBuf>,
}

impl ObjectStoreSession {
    fn key(&self, path: &str) -> StoragePath {
        let path = path.trim_matches('/');
        if self.prefix.is_empty() {
            StoragePath::from(path)
        } else {
            StoragePath::from(format!("{}/{}", self.prefix, path))
        }
    }
}

#[async_trait]
impl RemoteSession for ObjectStoreSession {
    async fn ensure_dir(&mut self, dir: &str) -> Result<(), RemoteError> {
        if let Some(root) = &self.local_root {
            std::fs::create_dir_all(root.join(dir.trim_matches('/')))?;
        }
        // object stores have no directories; keys carry the full path
        Ok(())
    }

    async fn put(&mut self, path: &str, data: Bytes) -> Result<(), RemoteError> {
        let key = self.key(path);
        let size = data.len();
        self.store.put(&key, data.into()).await?;
        debug!(key = %key, size, "Uploaded to remote store");
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), RemoteError> {
        Ok(())
    }
}

fn normalize_root(root: &str) -> String {
    root.trim_matches('/').to_string()
}

fn endpoint(config: &RemoteConfig) -> Option<String> {
    let host = config.host.trim();
    if host.is_empty() {
        return None;
    }
    if host.starts_with("http://") || host.starts_with("https://") {
        return Some(host.to_string());
    }
    Some(match config.port {
        0 => format!("http://{host}"),
        port => format!("http://{host}:{port}"),
    })
}
