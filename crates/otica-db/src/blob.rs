//! # Blob Store
//!
//! Byte storage for client photos. A blob is addressed by a relative path
//! (`clientes/{id}/foto.jpg`) and answers with a URL the front end can load.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Path-addressed byte storage returning retrievable URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` at `path`, replacing any previous blob, and returns its URL.
    async fn put(&self, path: &str, bytes: &[u8]) -> DbResult<String>;
}

/// Blob store rooted at a local directory. URLs are `file://` URLs.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsBlobStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `path` under the root, refusing anything that could escape it.
    fn resolve(&self, path: &str) -> DbResult<PathBuf> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && !path.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !safe {
            return Err(DbError::Blob(format!("invalid blob path: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> DbResult<String> {
        let target = self.resolve(path)?;
        debug!(path, size = bytes.len(), "Writing blob");

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DbError::Blob(e.to_string()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| DbError::Blob(e.to_string()))?;

        let absolute = tokio::fs::canonicalize(&target)
            .await
            .map_err(|e| DbError::Blob(e.to_string()))?;
        Ok(format!("file://{}", absolute.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("otica-blob-{name}-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_put_writes_file_and_returns_url() {
        let root = temp_root("put");
        let store = FsBlobStore::new(&root);

        let url = store.put("clientes/c1/foto.jpg", b"jpeg").await.unwrap();

        assert!(url.starts_with("file://"));
        assert!(url.ends_with("clientes/c1/foto.jpg"));
        let written = tokio::fs::read(root.join("clientes/c1/foto.jpg")).await.unwrap();
        assert_eq!(written, b"jpeg");

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let store = FsBlobStore::new(temp_root("escape"));

        for path in ["", "../x.jpg", "/etc/passwd", "clientes/../../x", "a\\b"] {
            assert!(
                matches!(store.put(path, b"x").await, Err(DbError::Blob(_))),
                "{path} should be rejected"
            );
        }
    }
}
