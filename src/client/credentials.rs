//! Where the client keeps its access credential between calls.
//!
//! The refresh credential never passes through here: it lives in the HTTP
//! cookie store and is sent by the transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::error::ClientError;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn access_token(&self) -> Result<Option<String>, ClientError>;

    async fn set_access_token(&self, token: &str) -> Result<(), ClientError>;

    async fn clear(&self) -> Result<(), ClientError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn access_token(&self) -> Result<Option<String>, ClientError> {
        Ok(self.token.read().await.clone())
    }

    async fn set_access_token(&self, token: &str) -> Result<(), ClientError> {
        *self.token.write().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        *self.token.write().await = None;
        Ok(())
    }
}

/// Persisted client session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    pub base_url: Option<String>,
    pub access_token: Option<String>,
}

impl SessionFile {
    pub async fn load(path: &Path) -> Result<Self, ClientError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| ClientError::Store(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ClientError::Store(format!("{}: {}", path.display(), e))),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), ClientError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::Store(format!("{}: {}", parent.display(), e)))?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| ClientError::Store(e.to_string()))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| ClientError::Store(format!("{}: {}", path.display(), e)))
    }
}

/// Store backed by a JSON [`SessionFile`]. Writes keep the other fields intact.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn access_token(&self) -> Result<Option<String>, ClientError> {
        let _guard = self.lock.lock().await;
        Ok(SessionFile::load(&self.path).await?.access_token)
    }

    async fn set_access_token(&self, token: &str) -> Result<(), ClientError> {
        let _guard = self.lock.lock().await;
        let mut session = SessionFile::load(&self.path).await?;
        session.access_token = Some(token.to_string());
        session.save(&self.path).await
    }

    async fn clear(&self) -> Result<(), ClientError> {
        let _guard = self.lock.lock().await;
        let mut session = SessionFile::load(&self.path).await?;
        session.access_token = None;
        session.save(&self.path).await
    }
}
