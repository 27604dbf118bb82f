use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

/// Where uploaded images live. Kept behind a trait so tests and future
/// object-store backends can swap the implementation.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(&self, filename: &str, body: Bytes) -> anyhow::Result<()>;
    async fn delete(&self, filename: &str) -> anyhow::Result<()>;
}

/// Local-disk implementation: one flat directory of uploaded files.
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub async fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create upload dir {}", root.display()))?;
        Ok(Self { root })
    }

    // Filenames are generated server-side, but delete takes a client-supplied
    // name, so anything that could escape the root is refused.
    fn resolve(&self, filename: &str) -> anyhow::Result<PathBuf> {
        let name = Path::new(filename);
        let is_plain = name.components().count() == 1 && !filename.contains("..");
        anyhow::ensure!(is_plain, "invalid filename {filename:?}");
        Ok(self.root.join(filename))
    }
}

#[async_trait]
impl ImageStore for DiskStore {
    async fn put(&self, filename: &str, body: Bytes) -> anyhow::Result<()> {
        let path = self.resolve(filename)?;
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        debug!(file = %path.display(), bytes = body.len(), "image stored");
        Ok(())
    }

    async fn delete(&self, filename: &str) -> anyhow::Result<()> {
        let path = self.resolve(filename)?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("remove {}", path.display()))?;
        debug!(file = %path.display(), "image removed");
        Ok(())
    }
}
